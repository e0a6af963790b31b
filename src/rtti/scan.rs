// Fri Feb 06 2026 - Alex

use crate::config::Config;
use crate::memory::{Address, MemoryRange, MemoryReader};
use crate::rtti::{RttiError, VtableModel};
use crate::symbol::SymbolDirectory;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal, checked at scan checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), RttiError> {
        if self.is_cancelled() {
            Err(RttiError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Binary-wide heuristic search for a class's vtable.
///
/// A vtable group must embed a pointer back to the class's type_info
/// record, so the scan looks for that pointer value across the image's data
/// ranges and validates each hit as a vtable. Hits are tried in ascending
/// address order, which keeps the outcome deterministic regardless of the
/// parallel chunking.
pub struct VtableScanner<'a> {
    reader: &'a dyn MemoryReader,
    directory: &'a SymbolDirectory,
    config: &'a Config,
}

impl<'a> VtableScanner<'a> {
    pub fn new(reader: &'a dyn MemoryReader, directory: &'a SymbolDirectory, config: &'a Config) -> Self {
        Self {
            reader,
            directory,
            config,
        }
    }

    /// Find and parse a plausible vtable for `type_info`.
    ///
    /// Distinguishes cancellation (`Err(Cancelled)`) from a clean miss
    /// (`Ok(None)`); the model layer collapses both into its cached `None`.
    pub fn find_vtable(
        &self,
        type_info: Address,
        token: &CancelToken,
    ) -> Result<Option<VtableModel>, RttiError> {
        token.check()?;

        let chunks = self.chunked_ranges();
        let hits: Vec<Address> = chunks
            .par_iter()
            .flat_map_iter(|range| self.scan_chunk(*range, type_info, token))
            .collect();
        token.check()?;

        let mut hits = hits;
        hits.sort_unstable();
        log::debug!(
            "heuristic scan for typeinfo {}: {} candidate reference(s)",
            type_info,
            hits.len()
        );

        for hit in hits {
            token.check()?;
            // The hit is the type_info slot; offset-to-top sits one word
            // before it, which is where the model parse wants to start.
            let ptr = self.reader.pointer_size() as u64;
            if hit.as_u64() < ptr {
                continue;
            }
            let start = hit - ptr;
            match VtableModel::parse(
                self.reader,
                self.directory,
                type_info,
                start,
                self.config.max_vtable_words,
                self.config.max_prefix_words,
            ) {
                Ok(model) => match model.validate() {
                    Ok(()) => return Ok(Some(model)),
                    Err(e) => log::debug!("candidate at {} rejected: {}", start, e),
                },
                Err(e) => log::debug!("candidate at {} unparsable: {}", start, e),
            }
        }
        Ok(None)
    }

    fn chunked_ranges(&self) -> Vec<MemoryRange> {
        let chunk = self.config.scan_chunk_bytes.max(self.reader.pointer_size()) as u64;
        let mut out = Vec::new();
        for range in self.reader.data_ranges() {
            let mut start = range.start;
            while start < range.end {
                let end = Address::new((start.as_u64() + chunk).min(range.end.as_u64()));
                out.push(MemoryRange::new(start, end));
                start = end;
            }
        }
        out
    }

    /// One chunk = one cancellation checkpoint.
    fn scan_chunk(&self, range: MemoryRange, type_info: Address, token: &CancelToken) -> Vec<Address> {
        if token.is_cancelled() {
            return Vec::new();
        }
        let ptr = self.reader.pointer_size();
        let len = range.len() as usize;
        let bytes = match self.reader.read_bytes(range.start, len) {
            Ok(b) => b,
            Err(_) => return Vec::new(),
        };
        let needle = type_info.as_u64();
        let mut hits = Vec::new();
        let mut offset = 0usize;
        while offset + ptr <= len {
            let value = match ptr {
                4 => u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as u64,
                _ => u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()),
            };
            if value == needle {
                hits.push(range.start + offset as u64);
            }
            offset += ptr;
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BufferMemory;

    const BASE: u64 = 0x500000;
    const TI: u64 = BASE + 0x40;
    const FN: u64 = BASE + 0x900;

    fn scan_image() -> BufferMemory {
        let mut mem = BufferMemory::new(Address::new(BASE), vec![0u8; 0x1000]);
        // a decoy reference with nothing vtable-like around it
        mem.write_u64(Address::new(BASE + 0x100), TI);
        mem.write_u64(Address::new(BASE + 0x108), 3); // not a function pointer
        // the real group: otp 0, typeinfo, one function slot
        mem.write_u64(Address::new(BASE + 0x200), 0);
        mem.write_u64(Address::new(BASE + 0x208), TI);
        mem.write_u64(Address::new(BASE + 0x210), FN);
        mem.write_u64(Address::new(BASE + 0x218), 0xffff_ffff_0000_0000);
        mem
    }

    #[test]
    fn test_scan_finds_and_validates() {
        let mem = scan_image();
        let dir = SymbolDirectory::new();
        let config = Config::default();
        let scanner = VtableScanner::new(&mem, &dir, &config);
        let token = CancelToken::new();
        let found = scanner.find_vtable(Address::new(TI), &token).unwrap().unwrap();
        assert_eq!(found.address(), Address::new(BASE + 0x200));
        assert_eq!(found.base_offsets(), &[0]);
    }

    #[test]
    fn test_scan_miss_is_ok_none() {
        let mem = BufferMemory::new(Address::new(BASE), vec![0u8; 0x400]);
        let dir = SymbolDirectory::new();
        let config = Config::default();
        let scanner = VtableScanner::new(&mem, &dir, &config);
        let found = scanner.find_vtable(Address::new(TI), &CancelToken::new()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_cancelled_scan_reports_cancelled() {
        let mem = scan_image();
        let dir = SymbolDirectory::new();
        let config = Config::default();
        let scanner = VtableScanner::new(&mem, &dir, &config);
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            scanner.find_vtable(Address::new(TI), &token),
            Err(RttiError::Cancelled)
        ));
    }
}
