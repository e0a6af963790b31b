// Fri Feb 06 2026 - Alex

use crate::memory::{Address, MemoryReader};
use crate::rtti::RttiError;
use crate::symbol::SymbolDirectory;
use std::fmt;
use std::sync::Arc;

/// One virtual-function slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VtableSlot {
    /// Slot holds a null pointer.
    Null,
    /// Slot points at a pure-virtual trap function.
    PureVirtual,
    /// Slot points at a real function.
    Function(Address),
}

impl VtableSlot {
    pub fn is_abstract_marker(&self) -> bool {
        matches!(self, Self::Null | Self::PureVirtual)
    }
}

/// Immutable-once-parsed view of one class's vtable group.
///
/// An Itanium vtable group holds one sub-table per base group: optional
/// vbase/vcall offset words, the offset-to-top, a pointer back to the
/// class's type_info record, then the function slots. The negated
/// offset-to-top values form the base-offset array; exactly one entry means
/// the class has no virtual bases.
#[derive(Debug, Clone)]
pub struct VtableModel {
    address: Address,
    type_info: Address,
    function_tables: Vec<Vec<VtableSlot>>,
    base_offsets: Vec<i64>,
}

// vbase/vcall offsets and offset-to-top entries are object-relative deltas,
// never addresses; this bound separates them from function pointers.
const SMALL_OFFSET_BOUND: i64 = 0x10000;

impl VtableModel {
    /// Parse the vtable group at `address` belonging to the type_info
    /// record at `type_info`.
    pub fn parse(
        reader: &dyn MemoryReader,
        directory: &SymbolDirectory,
        type_info: Address,
        address: Address,
        max_words: usize,
        max_prefix_words: usize,
    ) -> Result<Self, RttiError> {
        let ptr = reader.pointer_size();
        let invalid = |msg: String| RttiError::InvalidDataType(address.as_u64(), msg);

        let word_at = |index: usize| -> Option<u64> {
            match ptr {
                4 => reader.read_u32(address + (index * ptr) as u64).ok().map(u64::from),
                _ => reader.read_u64(address + (index * ptr) as u64).ok(),
            }
        };
        let signed = |value: u64| -> i64 {
            match ptr {
                4 => value as u32 as i32 as i64,
                _ => value as i64,
            }
        };

        // Indices of words holding a pointer back to our type_info record;
        // each marks a sub-table header (offset-to-top precedes it).
        let mut headers = Vec::new();
        let mut limit = 0usize;
        for index in 0..max_words {
            match word_at(index) {
                Some(w) => {
                    limit = index + 1;
                    if w == type_info.as_u64() && index >= 1 {
                        headers.push(index);
                    }
                }
                None => break,
            }
        }
        if headers.is_empty() {
            return Err(invalid("no type_info pointer in vtable group".to_string()));
        }
        if headers[0] > max_prefix_words {
            return Err(invalid(format!(
                "type_info pointer too deep ({} words)",
                headers[0]
            )));
        }

        let mut base_offsets = Vec::with_capacity(headers.len());
        let mut function_tables = Vec::with_capacity(headers.len());
        for (table_index, &header) in headers.iter().enumerate() {
            let off_to_top = signed(word_at(header - 1).unwrap_or(0));
            base_offsets.push(-off_to_top);

            // The function table runs from past the header up to the next
            // sub-table, excluding that sub-table's offset words.
            let mut end = match headers.get(table_index + 1) {
                Some(&next) => {
                    let mut end = next - 1;
                    let mut stripped = 0usize;
                    while end > header + 1 && stripped < max_prefix_words {
                        let value = signed(word_at(end - 1).unwrap_or(0));
                        if value != 0 && value.abs() < SMALL_OFFSET_BOUND {
                            end -= 1;
                            stripped += 1;
                        } else {
                            break;
                        }
                    }
                    end
                }
                None => limit,
            };
            if end <= header {
                end = header + 1;
            }

            let mut slots = Vec::new();
            for index in header + 1..end {
                let word = match word_at(index) {
                    Some(w) => w,
                    None => break,
                };
                if word == 0 {
                    slots.push(VtableSlot::Null);
                    continue;
                }
                let target = Address::new(word);
                if directory.is_pure_virtual_trap(target) {
                    slots.push(VtableSlot::PureVirtual);
                } else if reader.is_mapped(target, 1) {
                    slots.push(VtableSlot::Function(target));
                } else {
                    // End of plausible data for the trailing table.
                    break;
                }
            }
            function_tables.push(slots);
        }

        Ok(Self {
            address,
            type_info,
            function_tables,
            base_offsets,
        })
    }

    /// ABI structural rules: a usable primary function table, and a
    /// self-consistent base-offset array (self first, virtual bases after
    /// it at strictly increasing object offsets).
    pub fn validate(&self) -> Result<(), RttiError> {
        let invalid = |msg: &str| RttiError::InvalidDataType(self.address.as_u64(), msg.to_string());
        if self.function_tables.first().map(|t| t.is_empty()).unwrap_or(true) {
            return Err(invalid("empty primary function table"));
        }
        match self.base_offsets.first() {
            Some(0) => {}
            _ => return Err(invalid("primary base offset is not zero")),
        }
        for pair in self.base_offsets.windows(2) {
            if pair[1] <= pair[0] || pair[1] <= 0 {
                return Err(invalid("base offsets not strictly increasing"));
            }
        }
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn type_info(&self) -> Address {
        self.type_info
    }

    pub fn function_tables(&self) -> &[Vec<VtableSlot>] {
        &self.function_tables
    }

    pub fn base_offsets(&self) -> &[i64] {
        &self.base_offsets
    }

    pub fn has_virtual_bases(&self) -> bool {
        self.base_offsets.len() > 1
    }

    /// True iff any slot across any table is null or a pure-virtual trap.
    pub fn has_abstract_slot(&self) -> bool {
        self.function_tables
            .iter()
            .flatten()
            .any(|slot| slot.is_abstract_marker())
    }
}

impl fmt::Display for VtableModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "vtable @ {} ({} tables, base offsets {:?})",
            self.address,
            self.function_tables.len(),
            self.base_offsets
        )
    }
}

/// Cached vtable resolution state of one class model.
///
/// `Resolved` and `None` are terminal: once a model leaves `Unresolved` it
/// never re-attempts the search, cancelled scans included.
#[derive(Debug, Clone, Default)]
pub enum VtableRef {
    #[default]
    Unresolved,
    Resolved(Arc<VtableModel>),
    None,
}

impl VtableRef {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn model(&self) -> Option<&Arc<VtableModel>> {
        match self {
            Self::Resolved(model) => Some(model),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BufferMemory;
    use crate::symbol::{NamespaceId, SymbolInfo, SymbolKind};

    const BASE: u64 = 0x400000;
    const TI: u64 = BASE + 0x100;
    const FN1: u64 = BASE + 0x800;
    const FN2: u64 = BASE + 0x820;
    const TRAP: u64 = BASE + 0x840;

    fn image_with_group(words: &[u64]) -> BufferMemory {
        let mut mem = BufferMemory::new(Address::new(BASE), vec![0u8; 0x1000]);
        for (i, w) in words.iter().enumerate() {
            mem.write_u64(Address::new(BASE + 0x200 + (i * 8) as u64), *w);
        }
        // terminator that is neither null-slot-plausible forever nor mapped
        mem.write_u64(
            Address::new(BASE + 0x200 + (words.len() * 8) as u64),
            0xffff_ffff_ffff_0000,
        );
        mem
    }

    fn group_addr() -> Address {
        Address::new(BASE + 0x200)
    }

    #[test]
    fn test_parse_single_table() {
        let mem = image_with_group(&[0, TI, FN1, FN2]);
        let dir = SymbolDirectory::new();
        let vt = VtableModel::parse(&mem, &dir, Address::new(TI), group_addr(), 64, 8).unwrap();
        vt.validate().unwrap();
        assert_eq!(vt.base_offsets(), &[0]);
        assert_eq!(vt.function_tables().len(), 1);
        assert_eq!(
            vt.function_tables()[0],
            vec![
                VtableSlot::Function(Address::new(FN1)),
                VtableSlot::Function(Address::new(FN2))
            ]
        );
        assert!(!vt.has_virtual_bases());
        assert!(!vt.has_abstract_slot());
    }

    #[test]
    fn test_parse_group_with_virtual_base() {
        // primary: vbase offset 16, otp 0; secondary at object offset 16
        let words = [
            16, 0, TI, FN1, FN2, // primary sub-table (one vbase offset word)
            (-16i64) as u64, TI, FN1, // secondary sub-table
        ];
        let mem = image_with_group(&words);
        let dir = SymbolDirectory::new();
        let vt = VtableModel::parse(&mem, &dir, Address::new(TI), group_addr(), 64, 8).unwrap();
        vt.validate().unwrap();
        assert_eq!(vt.base_offsets(), &[0, 16]);
        assert_eq!(vt.function_tables().len(), 2);
        assert_eq!(vt.function_tables()[0].len(), 2);
        assert!(vt.has_virtual_bases());
    }

    #[test]
    fn test_abstract_slots() {
        let mem = image_with_group(&[0, TI, FN1, TRAP]);
        let mut dir = SymbolDirectory::new();
        dir.add(SymbolInfo::new(
            "__cxa_pure_virtual".into(),
            Address::new(TRAP),
            NamespaceId::GLOBAL,
            SymbolKind::Function,
        ));
        let vt = VtableModel::parse(&mem, &dir, Address::new(TI), group_addr(), 64, 8).unwrap();
        assert_eq!(vt.function_tables()[0][1], VtableSlot::PureVirtual);
        assert!(vt.has_abstract_slot());
    }

    #[test]
    fn test_validate_rejects_bad_offsets() {
        // offset-to-top of the primary is non-zero
        let mem = image_with_group(&[(-8i64) as u64, TI, FN1]);
        let dir = SymbolDirectory::new();
        let vt = VtableModel::parse(&mem, &dir, Address::new(TI), group_addr(), 64, 8).unwrap();
        assert!(vt.validate().is_err());
    }

    #[test]
    fn test_parse_rejects_missing_typeinfo() {
        let mem = image_with_group(&[0, BASE + 0x999, FN1]);
        let dir = SymbolDirectory::new();
        assert!(
            VtableModel::parse(&mem, &dir, Address::new(TI), group_addr(), 16, 8).is_err()
        );
    }
}
