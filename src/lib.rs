// Mon Feb 02 2026 - Alex

pub mod catalog;
pub mod config;
pub mod memory;
pub mod rtti;
pub mod symbol;
pub mod utils;

pub use catalog::{CategoryPath, Component, Layout, LayoutKey, TypeCatalog, TypeRef};
pub use config::Config;
pub use memory::{Address, BufferMemory, ImageMemory, MemoryError, MemoryReader};
pub use rtti::{
    CancelToken, ClassId, ClassTypeInfoModel, ReconstructionSession, RttiError, TypeInfoRecord,
    VtableModel, VtableRef,
};
pub use symbol::{NamespaceTable, SymbolDirectory, SymbolInfo};
