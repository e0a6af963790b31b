// Tue Feb 03 2026 - Alex

pub mod directory;
pub mod error;
pub mod namespace;
pub mod symbol_info;

pub use directory::{SymbolDirectory, PURE_VIRTUAL_FUNCTION_NAMES, TYPEINFO_SYMBOL_NAME, VTABLE_SYMBOL_NAME};
pub use error::SymbolError;
pub use namespace::{parse_type_name_path, NamespaceId, NamespaceKind, NamespaceTable};
pub use symbol_info::{SymbolInfo, SymbolKind};
