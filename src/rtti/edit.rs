// Fri Feb 06 2026 - Alex

//! Stateless layout-editing primitives.
//!
//! These operate on an owned [`Layout`] plus ABI metadata; the model layer
//! decides when to call them and commits the result through the catalog.

use crate::catalog::{CatalogError, ConflictPolicy, Layout, LayoutKey, TypeCatalog, TypeRef};
use std::collections::HashSet;
use std::sync::Arc;

/// Field name of the vtable-pointer slot.
pub const VPTR_FIELD_NAME: &str = "_vptr";
/// Reserved prefix marking a base-class placeholder component (and the
/// derived "super" layout itself).
pub const SUPER_PREFIX: &str = "super_";

/// Delete whatever occupies `[offset, offset+length)`: whole components at
/// their full length, undefined padding one byte at a time. Stops early at
/// the end of the layout.
pub fn clear_component(layout: &mut Layout, length: usize, offset: usize) {
    if offset >= layout.length() {
        return;
    }
    let mut cleared = 0usize;
    while cleared < length {
        let removed = layout.delete_at_offset(offset);
        if removed == 0 {
            break;
        }
        cleared += removed;
    }
}

/// Clear `length` bytes at `offset`, then insert a component there.
/// Post-condition: no overlap; net length change is `length` minus the
/// bytes cleared.
pub fn replace_component(
    layout: &mut Layout,
    type_ref: TypeRef,
    length: usize,
    name: &str,
    offset: usize,
) {
    clear_component(layout, length, offset);
    layout.insert_at_offset(offset, type_ref, length, Some(name.to_string()));
}

/// Ensure the vptr slot at offset 0.
///
/// The caller verifies the vtable first; this function only edits. When a
/// `super_`-prefixed placeholder already sits at offset 0, the base it
/// stands for supplies the vptr and the layout is left alone.
pub fn add_vptr(layout: &mut Layout, vptr_type: TypeRef, pointer_size: usize) {
    let occupied = layout.component_at(0);
    let keep = matches!(
        occupied,
        Some(comp) if !comp.type_ref.is_undefined()
            && comp.field_name().map(|n| n.starts_with(SUPER_PREFIX)).unwrap_or(false)
    );
    if keep {
        return;
    }
    clear_component(layout, pointer_size, 0);
    layout.insert_at_offset(0, vptr_type, pointer_size, Some(VPTR_FIELD_NAME.to_string()));
}

/// Remove the vptr slot at offset 0 if and only if that is exactly what is
/// there; any other state is a no-op. The slot becomes undefined padding so
/// the fields after it keep their offsets.
pub fn remove_vptr(layout: &mut Layout) {
    let is_vptr = matches!(
        layout.component_at(0),
        Some(comp) if comp.offset == 0
            && comp.type_ref.is_pointer()
            && comp.field_name() == Some(VPTR_FIELD_NAME)
    );
    if is_vptr {
        layout.clear_at_offset(0);
    }
}

/// Drop undefined bytes past the last defined component. No-op when no
/// component is defined.
pub fn trim_structure(layout: &mut Layout) {
    if layout.defined_components().is_empty() {
        return;
    }
    let end_offset = layout.last_defined_end();
    layout.truncate(end_offset);
}

/// Commit through the catalog with the replace-on-conflict policy; the
/// returned instance is the catalog's canonical one.
pub fn resolve_struct(catalog: &TypeCatalog, layout: Layout) -> Result<Arc<Layout>, CatalogError> {
    catalog.resolve(layout, ConflictPolicy::Replace)
}

/// Remove the virtual-base sub-objects from a layout copy.
///
/// Virtual bases are laid out contiguously at the tail of the non-virtual
/// portion, so the first component typed as any virtual parent's layout
/// marks the start of the whole run; it and everything after it go.
pub fn delete_virtual_components(layout: &mut Layout, parent_keys: &HashSet<LayoutKey>) {
    let first_match = layout
        .defined_components()
        .iter()
        .position(|comp| {
            comp.type_ref
                .struct_key()
                .map(|key| parent_keys.contains(key))
                .unwrap_or(false)
        });
    if let Some(ordinal) = first_match {
        layout.delete_from_ordinal(ordinal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryPath;

    fn empty(name: &str) -> Layout {
        Layout::new(LayoutKey::new(CategoryPath::root(), name))
    }

    fn vptr_type() -> TypeRef {
        TypeRef::Pointer {
            target: "vtable".into(),
        }
    }

    #[test]
    fn test_replace_component_net_length() {
        let mut layout = empty("S");
        layout.grow_to(24);
        // replacing 8 undefined bytes with an 8-byte component: no growth
        replace_component(&mut layout, vptr_type(), 8, "f", 8);
        assert_eq!(layout.length(), 24);
        assert_eq!(layout.component_at(8).unwrap().field_name(), Some("f"));
        // replacing a 8-byte component plus 8 undefined with 16: no growth
        replace_component(&mut layout, vptr_type(), 16, "g", 8);
        assert_eq!(layout.length(), 24);
        // replacing past the end grows by the shortfall
        replace_component(&mut layout, vptr_type(), 8, "h", 20);
        assert_eq!(layout.length(), 28);
    }

    #[test]
    fn test_add_then_remove_vptr_restores_shape() {
        let mut layout = empty("S");
        layout.grow_to(16);
        layout.insert_at_offset(8, vptr_type(), 8, Some("field".into()));
        let length = layout.length();
        let count = layout.num_defined();

        add_vptr(&mut layout, vptr_type(), 8);
        assert_eq!(layout.component_at(0).unwrap().field_name(), Some(VPTR_FIELD_NAME));
        remove_vptr(&mut layout);
        assert_eq!(layout.length(), length);
        assert_eq!(layout.num_defined(), count);
        assert_eq!(layout.component_at(8).unwrap().field_name(), Some("field"));
    }

    #[test]
    fn test_add_vptr_respects_base_placeholder() {
        let mut layout = empty("S");
        let base_key = LayoutKey::new(CategoryPath::root(), "Base");
        layout.insert_at_offset(0, TypeRef::Struct(base_key), 16, Some("super_Base".into()));
        let before = layout.clone();
        add_vptr(&mut layout, vptr_type(), 8);
        assert_eq!(layout.defined_components(), before.defined_components());
    }

    #[test]
    fn test_remove_vptr_other_state_noop() {
        let mut layout = empty("S");
        layout.insert_at_offset(0, vptr_type(), 8, Some("not_vptr".into()));
        remove_vptr(&mut layout);
        assert_eq!(layout.num_defined(), 1);
    }

    #[test]
    fn test_trim_structure_idempotent() {
        let mut layout = empty("S");
        layout.insert_at_offset(0, vptr_type(), 8, None);
        layout.grow_to(64);
        trim_structure(&mut layout);
        assert_eq!(layout.length(), 8);
        trim_structure(&mut layout);
        assert_eq!(layout.length(), 8);

        let mut undefined_only = empty("T");
        undefined_only.grow_to(32);
        trim_structure(&mut undefined_only);
        assert_eq!(undefined_only.length(), 32);
    }

    #[test]
    fn test_delete_virtual_components_removes_tail_run() {
        let mut layout = empty("S");
        let a = LayoutKey::new(CategoryPath::root(), "A");
        let b = LayoutKey::new(CategoryPath::root(), "B");
        layout.insert_at_offset(0, vptr_type(), 8, Some(VPTR_FIELD_NAME.into()));
        layout.insert_at_offset(8, TypeRef::Struct(a.clone()), 8, Some("super_A".into()));
        layout.insert_at_offset(16, TypeRef::Struct(b.clone()), 8, Some("super_B".into()));

        let keys = HashSet::from([a]);
        delete_virtual_components(&mut layout, &keys);
        // A and everything after it went, the vptr stayed
        assert_eq!(layout.num_defined(), 1);
        assert_eq!(layout.component_at(0).unwrap().field_name(), Some(VPTR_FIELD_NAME));
    }

    #[test]
    fn test_delete_virtual_components_no_match_noop() {
        let mut layout = empty("S");
        layout.insert_at_offset(0, vptr_type(), 8, None);
        let keys = HashSet::from([LayoutKey::new(CategoryPath::root(), "Z")]);
        let before = layout.clone();
        delete_virtual_components(&mut layout, &keys);
        assert_eq!(layout.defined_components(), before.defined_components());
    }
}
