// Wed Feb 04 2026 - Alex

pub mod catalog;
pub mod component;
pub mod error;
pub mod layout;
pub mod type_ref;

pub use catalog::{ConflictPolicy, TypeCatalog};
pub use component::Component;
pub use error::CatalogError;
pub use layout::Layout;
pub use type_ref::{CategoryPath, LayoutKey, TypeRef};
