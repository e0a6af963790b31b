// Wed Feb 04 2026 - Alex

use crate::catalog::{CategoryPath, Component, LayoutKey, TypeRef};
use serde::Serialize;
use std::fmt;

/// An ordered, offset-indexed description of a region of memory.
///
/// Only defined components are stored; every byte not covered by one is
/// implicit undefined padding. Deleting shifts everything after the deleted
/// bytes down, inserting shifts everything at or after the insertion point
/// up, so the total `length` tracks the sum of defined bytes plus padding.
///
/// Invariant: components are sorted by offset and never overlap.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    key: LayoutKey,
    components: Vec<Component>,
    length: usize,
}

impl Layout {
    pub fn new(key: LayoutKey) -> Self {
        Self {
            key,
            components: Vec::new(),
            length: 0,
        }
    }

    pub fn key(&self) -> &LayoutKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn category(&self) -> &CategoryPath {
        &self.key.category
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.key.name = name.into();
    }

    pub fn set_category(&mut self, category: CategoryPath) {
        self.key.category = category;
    }

    /// Total byte length including undefined padding.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn defined_components(&self) -> &[Component] {
        &self.components
    }

    pub fn num_defined(&self) -> usize {
        self.components.len()
    }

    /// The defined component covering `offset`, if any.
    pub fn component_at(&self, offset: usize) -> Option<&Component> {
        self.components.iter().find(|c| c.covers(offset))
    }

    /// One past the end of the last defined component; 0 if none.
    pub fn last_defined_end(&self) -> usize {
        self.components.last().map(|c| c.end_offset()).unwrap_or(0)
    }

    /// Pad with undefined bytes up to `len`. Never shrinks.
    pub fn grow_to(&mut self, len: usize) {
        if len > self.length {
            self.length = len;
        }
    }

    /// Insert a component at a byte offset, shifting every component at or
    /// beyond it up by `length` bytes. The caller clears the target range
    /// first; inserting into the middle of an existing component is a bug.
    pub fn insert_at_offset(
        &mut self,
        offset: usize,
        type_ref: TypeRef,
        length: usize,
        field_name: Option<String>,
    ) {
        debug_assert!(length > 0);
        debug_assert!(
            self.component_at(offset).map(|c| c.offset == offset).unwrap_or(true),
            "insert into the middle of a defined component"
        );
        self.grow_to(offset);
        for comp in self.components.iter_mut() {
            if comp.offset >= offset {
                comp.offset += length;
            }
        }
        let index = self
            .components
            .iter()
            .position(|c| c.offset > offset)
            .unwrap_or(self.components.len());
        self.components
            .insert(index, Component::new(offset, length, type_ref, field_name));
        self.length += length;
    }

    /// Delete whatever occupies `offset`: a whole defined component, or a
    /// single undefined byte. Everything after shifts down. Returns the
    /// number of bytes removed (0 when `offset` is past the end).
    pub fn delete_at_offset(&mut self, offset: usize) -> usize {
        if offset >= self.length {
            return 0;
        }
        let removed = if let Some(index) = self.components.iter().position(|c| c.covers(offset)) {
            let comp = self.components.remove(index);
            let start = comp.offset;
            for later in self.components.iter_mut() {
                if later.offset > start {
                    later.offset -= comp.length;
                }
            }
            comp.length
        } else {
            for later in self.components.iter_mut() {
                if later.offset > offset {
                    later.offset -= 1;
                }
            }
            1
        };
        self.length -= removed;
        removed
    }

    /// Replace the defined component covering `offset` with undefined
    /// padding. Nothing shifts and `length` is unchanged. Returns the
    /// number of bytes cleared (0 when `offset` is padding already).
    pub fn clear_at_offset(&mut self, offset: usize) -> usize {
        match self.components.iter().position(|c| c.covers(offset)) {
            Some(index) => self.components.remove(index).length,
            None => 0,
        }
    }

    /// Drop the defined components from ordinal `from` onward. The bytes
    /// they covered become undefined padding; `length` is unchanged.
    pub fn delete_from_ordinal(&mut self, from: usize) {
        self.components.truncate(from);
    }

    /// Truncate the layout to `len` bytes. Only undefined trailing bytes
    /// may be removed this way.
    pub fn truncate(&mut self, len: usize) {
        debug_assert!(len >= self.last_defined_end());
        if len < self.length {
            self.length = len;
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} bytes)", self.key, self.length)?;
        for comp in &self.components {
            writeln!(f, "  {}", comp)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> LayoutKey {
        LayoutKey::new(CategoryPath::root(), name)
    }

    fn ptr() -> TypeRef {
        TypeRef::Pointer {
            target: "void".into(),
        }
    }

    #[test]
    fn test_insert_shifts_tail_up() {
        let mut layout = Layout::new(key("S"));
        layout.grow_to(16);
        layout.insert_at_offset(8, ptr(), 8, Some("b".into()));
        layout.insert_at_offset(0, ptr(), 8, Some("a".into()));
        // Inserting at 0 pushed "b" from 8 to 16.
        assert_eq!(layout.length(), 32);
        assert_eq!(layout.component_at(16).unwrap().field_name(), Some("b"));
        assert_eq!(layout.component_at(0).unwrap().field_name(), Some("a"));
    }

    #[test]
    fn test_delete_defined_component() {
        let mut layout = Layout::new(key("S"));
        layout.grow_to(4);
        layout.insert_at_offset(4, ptr(), 8, Some("p".into()));
        layout.insert_at_offset(12, ptr(), 8, Some("q".into()));
        assert_eq!(layout.length(), 20);

        // Deleting through any covered byte removes the whole component.
        assert_eq!(layout.delete_at_offset(7), 8);
        assert_eq!(layout.length(), 12);
        assert_eq!(layout.component_at(4).unwrap().field_name(), Some("q"));
    }

    #[test]
    fn test_delete_undefined_byte() {
        let mut layout = Layout::new(key("S"));
        layout.grow_to(4);
        layout.insert_at_offset(4, ptr(), 8, None);
        assert_eq!(layout.delete_at_offset(1), 1);
        assert_eq!(layout.length(), 11);
        assert_eq!(layout.component_at(3).unwrap().offset, 3);
    }

    #[test]
    fn test_delete_past_end_is_noop() {
        let mut layout = Layout::new(key("S"));
        layout.grow_to(8);
        assert_eq!(layout.delete_at_offset(8), 0);
        assert_eq!(layout.length(), 8);
    }

    #[test]
    fn test_delete_from_ordinal_keeps_length() {
        let mut layout = Layout::new(key("S"));
        layout.insert_at_offset(0, ptr(), 8, None);
        layout.insert_at_offset(8, ptr(), 8, None);
        layout.delete_from_ordinal(1);
        assert_eq!(layout.num_defined(), 1);
        assert_eq!(layout.length(), 16);
    }
}
