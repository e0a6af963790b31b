// Thu Feb 05 2026 - Alex

use crate::memory::{Address, MemoryReader};
use crate::rtti::RttiError;
use crate::symbol::{parse_type_name_path, NamespaceId, NamespaceTable, SymbolDirectory, VTABLE_SYMBOL_NAME};
use bitflags::bitflags;

bitflags! {
    /// Flags word of `__vmi_class_type_info`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VmiFlags: u32 {
        const NON_DIAMOND_REPEAT = 0x1;
        const DIAMOND_SHAPED = 0x2;
    }
}

/// One `__base_class_type_info` entry of a `__vmi_class_type_info` record.
#[derive(Debug, Clone, Copy)]
pub struct BaseClassDescriptor {
    pub type_info: Address,
    pub offset_flags: i64,
}

impl BaseClassDescriptor {
    const VIRTUAL_MASK: i64 = 0x1;
    const PUBLIC_MASK: i64 = 0x2;
    const OFFSET_SHIFT: u32 = 8;

    pub fn is_virtual(&self) -> bool {
        self.offset_flags & Self::VIRTUAL_MASK != 0
    }

    pub fn is_public(&self) -> bool {
        self.offset_flags & Self::PUBLIC_MASK != 0
    }

    /// For a non-virtual base: the byte offset of the sub-object. For a
    /// virtual base: the offset of the vbase pointer slot; the real object
    /// offset comes from the vtable's base-offset table.
    pub fn offset(&self) -> i64 {
        self.offset_flags >> Self::OFFSET_SHIFT
    }
}

/// Which `__cxxabiv1` record kind a type_info address holds.
#[derive(Debug, Clone)]
pub enum TypeInfoKind {
    /// `__class_type_info`: no bases.
    Class,
    /// `__si_class_type_info`: one public non-virtual base.
    SingleInheritance { base: Address },
    /// `__vmi_class_type_info`: everything else.
    VirtualMultiple {
        flags: VmiFlags,
        bases: Vec<BaseClassDescriptor>,
    },
}

/// A parsed RTTI record: identity only; relationships live on the model.
#[derive(Debug, Clone)]
pub struct TypeInfoRecord {
    pub address: Address,
    pub mangled_name: String,
    pub type_name: String,
    pub namespace: NamespaceId,
    pub kind: TypeInfoKind,
}

impl TypeInfoRecord {
    /// Lazy revalidation: the record is only as valid as the bytes under it
    /// right now. Never cached across upstream structural changes.
    pub fn validate(&self, reader: &dyn MemoryReader) -> Result<(), RttiError> {
        let ptr = reader.pointer_size();
        let name_ptr = reader
            .read_ptr(self.address + ptr as u64)
            .map_err(|e| RttiError::InvalidDataType(self.address.as_u64(), e.to_string()))?;
        let name = reader
            .read_c_string(name_ptr)
            .map_err(|e| RttiError::InvalidDataType(self.address.as_u64(), e.to_string()))?;
        if name.trim_start_matches('*') != self.mangled_name {
            return Err(RttiError::InvalidDataType(
                self.address.as_u64(),
                "type name changed under the record".to_string(),
            ));
        }
        Ok(())
    }
}

/// Addresses of the `__cxxabiv1` typeinfo-class vtables, used to classify
/// records exactly when the binary still carries those symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiVtables {
    class: Option<Address>,
    si: Option<Address>,
    vmi: Option<Address>,
}

const CXXABI_NAMESPACE: &str = "__cxxabiv1";
const CLASS_TYPE_INFO: &str = "__class_type_info";
const SI_CLASS_TYPE_INFO: &str = "__si_class_type_info";
const VMI_CLASS_TYPE_INFO: &str = "__vmi_class_type_info";

impl AbiVtables {
    /// Resolve from the symbol directory. The record's vptr points past the
    /// vtable header (offset-to-top + typeinfo slot), hence the adjustment.
    pub fn resolve(
        directory: &SymbolDirectory,
        namespaces: &mut NamespaceTable,
        pointer_size: usize,
    ) -> Self {
        let mut out = Self::default();
        for (class_name, slot) in [
            (CLASS_TYPE_INFO, 0usize),
            (SI_CLASS_TYPE_INFO, 1),
            (VMI_CLASS_TYPE_INFO, 2),
        ] {
            let ns = namespaces.get_or_create(&[CXXABI_NAMESPACE.to_string(), class_name.to_string()]);
            let addr = directory
                .symbols_named(VTABLE_SYMBOL_NAME, ns)
                .first()
                .map(|s| s.address() + (2 * pointer_size) as u64);
            match slot {
                0 => out.class = addr,
                1 => out.si = addr,
                _ => out.vmi = addr,
            }
        }
        out
    }

    pub fn any_known(&self) -> bool {
        self.class.is_some() || self.si.is_some() || self.vmi.is_some()
    }
}

/// Parser for candidate type_info addresses.
pub struct TypeInfoParser<'a> {
    reader: &'a dyn MemoryReader,
    abi: AbiVtables,
    max_bases: usize,
}

impl<'a> TypeInfoParser<'a> {
    pub fn new(reader: &'a dyn MemoryReader, abi: AbiVtables, max_bases: usize) -> Self {
        Self {
            reader,
            abi,
            max_bases,
        }
    }

    /// Parse a type_info record. `namespaces` receives the class namespace
    /// derived from the mangled name.
    pub fn parse(
        &self,
        address: Address,
        namespaces: &mut NamespaceTable,
    ) -> Result<TypeInfoRecord, RttiError> {
        let ptr = self.reader.pointer_size();
        let invalid = |msg: &str| RttiError::InvalidDataType(address.as_u64(), msg.to_string());

        let vptr = self
            .reader
            .read_ptr(address)
            .map_err(|e| invalid(&e.to_string()))?;
        if vptr.is_null() {
            return Err(invalid("null typeinfo vptr"));
        }
        let name_ptr = self
            .reader
            .read_ptr(address + ptr as u64)
            .map_err(|e| invalid(&e.to_string()))?;
        let raw_name = self
            .reader
            .read_c_string(name_ptr)
            .map_err(|e| invalid(&e.to_string()))?;
        // GCC prefixes '*' on names compared by address rather than string.
        let mangled = raw_name.trim_start_matches('*').to_string();
        let path = parse_type_name_path(&mangled)
            .map_err(|e| invalid(&e.to_string()))?;
        let type_name = path.last().cloned().unwrap_or_default();
        let namespace = namespaces.get_or_create(&path);

        let kind = self.classify(address, vptr)?;

        Ok(TypeInfoRecord {
            address,
            mangled_name: mangled,
            type_name,
            namespace,
            kind,
        })
    }

    fn classify(&self, address: Address, vptr: Address) -> Result<TypeInfoKind, RttiError> {
        if self.abi.any_known() {
            if Some(vptr) == self.abi.class {
                return Ok(TypeInfoKind::Class);
            }
            if Some(vptr) == self.abi.si {
                return self.parse_si(address);
            }
            if Some(vptr) == self.abi.vmi {
                return self.parse_vmi(address);
            }
            return Err(RttiError::InvalidDataType(
                address.as_u64(),
                "vptr matches no __cxxabiv1 typeinfo class".to_string(),
            ));
        }
        // No ABI symbols in the image: infer structurally. A VMI record has
        // a small flags word and a sane base count where SI has a pointer.
        if let Ok(kind) = self.parse_vmi(address) {
            if let TypeInfoKind::VirtualMultiple { ref bases, .. } = kind {
                if !bases.is_empty() {
                    return Ok(kind);
                }
            }
        }
        if let Ok(kind) = self.parse_si(address) {
            return Ok(kind);
        }
        Ok(TypeInfoKind::Class)
    }

    fn parse_si(&self, address: Address) -> Result<TypeInfoKind, RttiError> {
        let ptr = self.reader.pointer_size();
        let base = self
            .reader
            .read_ptr(address + (2 * ptr) as u64)
            .map_err(|e| RttiError::InvalidDataType(address.as_u64(), e.to_string()))?;
        if base.is_null() || !self.reader.is_mapped(base, ptr) {
            return Err(RttiError::InvalidDataType(
                address.as_u64(),
                "si base pointer not mapped".to_string(),
            ));
        }
        Ok(TypeInfoKind::SingleInheritance { base })
    }

    fn parse_vmi(&self, address: Address) -> Result<TypeInfoKind, RttiError> {
        let ptr = self.reader.pointer_size();
        let invalid = |msg: String| RttiError::InvalidDataType(address.as_u64(), msg);

        let flags_raw = self
            .reader
            .read_u32(address + (2 * ptr) as u64)
            .map_err(|e| invalid(e.to_string()))?;
        let base_count = self
            .reader
            .read_u32(address + (2 * ptr) as u64 + 4)
            .map_err(|e| invalid(e.to_string()))? as usize;
        if flags_raw & !(VmiFlags::all().bits()) != 0 {
            return Err(invalid(format!("implausible vmi flags {:#x}", flags_raw)));
        }
        if base_count == 0 || base_count > self.max_bases {
            return Err(invalid(format!("implausible base count {}", base_count)));
        }

        let mut bases = Vec::with_capacity(base_count);
        let array_base = address + (2 * ptr) as u64 + 8;
        for index in 0..base_count {
            let entry = array_base + (index * 2 * ptr) as u64;
            let type_info = self
                .reader
                .read_ptr(entry)
                .map_err(|e| invalid(e.to_string()))?;
            let offset_flags = self
                .reader
                .read_ptr_sized(entry + ptr as u64)
                .map_err(|e| invalid(e.to_string()))?;
            if type_info.is_null() || !self.reader.is_mapped(type_info, ptr) {
                return Err(invalid(format!("base {} typeinfo not mapped", index)));
            }
            bases.push(BaseClassDescriptor {
                type_info,
                offset_flags,
            });
        }

        Ok(TypeInfoKind::VirtualMultiple {
            flags: VmiFlags::from_bits_truncate(flags_raw),
            bases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BufferMemory;

    const BASE: u64 = 0x10000;

    // A tiny image holding one VMI record with two bases (one virtual).
    fn vmi_image() -> BufferMemory {
        let mut mem = BufferMemory::new(Address::new(BASE), vec![0u8; 0x200]);
        // record at +0x80: vptr, name ptr, flags, count, 2 base entries
        mem.write_u64(Address::new(BASE + 0x80), BASE + 0x10); // vptr (arbitrary, mapped)
        mem.write_u64(Address::new(BASE + 0x88), BASE + 0x40); // name ptr
        mem.write_bytes(Address::new(BASE + 0x40), b"1D\0");
        mem.write_bytes(Address::new(BASE + 0x90), &2u32.to_le_bytes()); // flags: diamond
        mem.write_bytes(Address::new(BASE + 0x94), &2u32.to_le_bytes()); // base count
        mem.write_u64(Address::new(BASE + 0x98), BASE + 0x100); // base 0 typeinfo
        mem.write_u64(Address::new(BASE + 0xa0), (8i64 << 8 | 0x2) as u64); // nonvirt public @8
        mem.write_u64(Address::new(BASE + 0xa8), BASE + 0x120); // base 1 typeinfo
        mem.write_u64(Address::new(BASE + 0xb0), (0x1 | 0x2) as u64); // virtual public
        mem
    }

    #[test]
    fn test_parse_vmi_record() {
        let mem = vmi_image();
        let parser = TypeInfoParser::new(&mem, AbiVtables::default(), 64);
        let mut namespaces = NamespaceTable::new();
        let record = parser.parse(Address::new(BASE + 0x80), &mut namespaces).unwrap();
        assert_eq!(record.type_name, "D");
        match record.kind {
            TypeInfoKind::VirtualMultiple { flags, ref bases } => {
                assert!(flags.contains(VmiFlags::DIAMOND_SHAPED));
                assert_eq!(bases.len(), 2);
                assert!(!bases[0].is_virtual());
                assert_eq!(bases[0].offset(), 8);
                assert!(bases[1].is_virtual());
                assert!(bases[1].is_public());
            }
            _ => panic!("expected vmi record"),
        }
    }

    #[test]
    fn test_validate_detects_changed_name() {
        let mut mem = vmi_image();
        let parser = TypeInfoParser::new(&mem, AbiVtables::default(), 64);
        let mut namespaces = NamespaceTable::new();
        let record = parser.parse(Address::new(BASE + 0x80), &mut namespaces).unwrap();
        assert!(record.validate(&mem).is_ok());
        mem.write_bytes(Address::new(BASE + 0x40), b"1X\0");
        assert!(matches!(
            record.validate(&mem),
            Err(RttiError::InvalidDataType(_, _))
        ));
    }

    #[test]
    fn test_garbage_name_rejected() {
        let mut mem = BufferMemory::new(Address::new(BASE), vec![0u8; 0x100]);
        mem.write_u64(Address::new(BASE), BASE + 0x10);
        mem.write_u64(Address::new(BASE + 8), BASE + 0x40);
        mem.write_bytes(Address::new(BASE + 0x40), b"not mangled\0");
        let parser = TypeInfoParser::new(&mem, AbiVtables::default(), 64);
        let mut namespaces = NamespaceTable::new();
        assert!(parser.parse(Address::new(BASE), &mut namespaces).is_err());
    }
}
