// Mon Feb 02 2026 - Alex

pub mod address;
pub mod buffer;
pub mod error;
pub mod image;
pub mod range;
pub mod traits;

pub use address::Address;
pub use buffer::BufferMemory;
pub use error::MemoryError;
pub use image::{ImageMemory, ImageSection, RawSymbol};
pub use range::MemoryRange;
pub use traits::MemoryReader;
