// Mon Feb 02 2026 - Alex

pub mod logging;

pub use logging::{ScopedTimer, level_from_verbosity};
