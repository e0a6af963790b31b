// Mon Feb 02 2026 - Alex

use crate::memory::Address;
use std::fmt;

/// Half-open range of mapped addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: Address,
    pub end: Address,
}

impl MemoryRange {
    pub fn new(start: Address, end: Address) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.as_u64().saturating_sub(self.start.as_u64())
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.is_within_range(self.start, self.end)
    }

    pub fn contains_span(&self, addr: Address, len: usize) -> bool {
        match addr.checked_add(len as u64) {
            Some(end) => self.contains(addr) && end.as_u64() <= self.end.as_u64(),
            None => false,
        }
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start, self.end)
    }
}
