// Mon Feb 02 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRange};

/// Read-only view of a loaded program image.
///
/// Everything the RTTI layer needs from the underlying loader goes through
/// this trait: raw bytes, pointer-sized reads, and the data ranges the
/// heuristic vtable scan is allowed to walk.
pub trait MemoryReader: Send + Sync {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError>;

    fn pointer_size(&self) -> usize;

    /// Ranges that may hold vtables and type_info records (.data.rel.ro,
    /// .rodata and friends).
    fn data_ranges(&self) -> Vec<MemoryRange>;

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        let bytes = self.read_bytes(addr, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_i64(&self, addr: Address) -> Result<i64, MemoryError> {
        Ok(self.read_u64(addr)? as i64)
    }

    /// Pointer-sized read, widened to an `Address`.
    fn read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        match self.pointer_size() {
            4 => Ok(Address::new(self.read_u32(addr)? as u64)),
            _ => Ok(Address::new(self.read_u64(addr)?)),
        }
    }

    /// Signed pointer-sized read (offset-to-top entries are signed).
    fn read_ptr_sized(&self, addr: Address) -> Result<i64, MemoryError> {
        match self.pointer_size() {
            4 => Ok(self.read_u32(addr)? as i32 as i64),
            _ => Ok(self.read_u64(addr)? as i64),
        }
    }

    fn read_c_string(&self, addr: Address) -> Result<String, MemoryError> {
        let mut out = Vec::new();
        let mut cursor = addr;
        loop {
            let chunk = self.read_bytes(cursor, 1)?;
            if chunk[0] == 0 {
                break;
            }
            out.push(chunk[0]);
            if out.len() > 4096 {
                return Err(MemoryError::UnterminatedString(addr.as_u64()));
            }
            cursor = cursor + 1;
        }
        String::from_utf8(out).map_err(|_| MemoryError::ReadFailed(addr.as_u64()))
    }

    fn is_mapped(&self, addr: Address, len: usize) -> bool {
        self.read_bytes(addr, len).is_ok()
    }
}
