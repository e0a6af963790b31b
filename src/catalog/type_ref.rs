// Wed Feb 04 2026 - Alex

use serde::Serialize;
use std::fmt;

/// Category/grouping path inside the type catalog, e.g. `/game/Actor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// Canonical identity of a layout inside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LayoutKey {
    pub category: CategoryPath,
    pub name: String,
}

impl LayoutKey {
    pub fn new(category: CategoryPath, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// The type carried by a layout component.
///
/// Equality on `Struct` keys is what `delete_virtual_components` uses to
/// recognize a virtual base's sub-object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeRef {
    Undefined,
    Pointer { target: String },
    Struct(LayoutKey),
}

impl TypeRef {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    pub fn struct_key(&self) -> Option<&LayoutKey> {
        match self {
            Self::Struct(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Pointer { target } => write!(f, "*{}", target),
            Self::Struct(key) => write!(f, "struct {}", key),
        }
    }
}
