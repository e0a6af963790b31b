// Mon Feb 02 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRange, MemoryReader};

/// A single contiguous byte image at a fixed base address.
///
/// The simplest `MemoryReader`: raw section dumps, and every test fixture
/// in the crate.
pub struct BufferMemory {
    data: Vec<u8>,
    base: Address,
    pointer_size: usize,
    data_ranges: Vec<MemoryRange>,
}

impl BufferMemory {
    pub fn new(base: Address, data: Vec<u8>) -> Self {
        let end = base + data.len() as u64;
        Self {
            data,
            base,
            pointer_size: 8,
            data_ranges: vec![MemoryRange::new(base, end)],
        }
    }

    pub fn with_pointer_size(mut self, pointer_size: usize) -> Self {
        self.pointer_size = pointer_size;
        self
    }

    /// Restrict the scannable data window to a sub-range of the buffer.
    pub fn with_data_range(mut self, range: MemoryRange) -> Self {
        self.data_ranges = vec![range];
        self
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Patch bytes in place; fixture setup helper.
    pub fn write_bytes(&mut self, addr: Address, bytes: &[u8]) {
        let off = (addr - self.base) as usize;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
    }

    pub fn write_u64(&mut self, addr: Address, value: u64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }
}

impl MemoryReader for BufferMemory {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let end = self.base + self.data.len() as u64;
        if !addr.is_within_range(self.base, end + 1) {
            return Err(MemoryError::OutOfBounds(addr.as_u64()));
        }
        let off = (addr - self.base) as usize;
        if off + len > self.data.len() {
            return Err(MemoryError::OutOfBounds(addr.as_u64() + len as u64));
        }
        Ok(self.data[off..off + len].to_vec())
    }

    fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    fn data_ranges(&self) -> Vec<MemoryRange> {
        self.data_ranges.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_within_bounds() {
        let mem = BufferMemory::new(Address::new(0x1000), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(mem.read_u64(Address::new(0x1000)).unwrap(), 0x0807060504030201);
        assert!(mem.read_bytes(Address::new(0x1001), 8).is_err());
        assert!(mem.read_bytes(Address::new(0xfff), 1).is_err());
    }

    #[test]
    fn test_c_string() {
        let mut data = b"7MyClass\0".to_vec();
        data.push(0xff);
        let mem = BufferMemory::new(Address::new(0x2000), data);
        assert_eq!(mem.read_c_string(Address::new(0x2000)).unwrap(), "7MyClass");
    }

    #[test]
    fn test_write_patch() {
        let mut mem = BufferMemory::new(Address::new(0x1000), vec![0u8; 16]);
        mem.write_u64(Address::new(0x1008), 0xdead_beef);
        assert_eq!(mem.read_u64(Address::new(0x1008)).unwrap(), 0xdead_beef);
    }
}
