// Wed Feb 04 2026 - Alex

use crate::catalog::TypeRef;
use serde::Serialize;
use std::fmt;

/// One defined member of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub offset: usize,
    pub length: usize,
    pub type_ref: TypeRef,
    pub field_name: Option<String>,
}

impl Component {
    pub fn new(offset: usize, length: usize, type_ref: TypeRef, field_name: Option<String>) -> Self {
        Self {
            offset,
            length,
            type_ref,
            field_name,
        }
    }

    /// One past the last byte this component occupies.
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    pub fn covers(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end_offset()
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{:#x}+{} {} {}",
            self.offset,
            self.length,
            self.type_ref,
            self.field_name.as_deref().unwrap_or("<anon>")
        )
    }
}
