// Tue Feb 03 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRange, MemoryReader};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One loadable segment, backed by a slice of the mapped file.
#[derive(Debug, Clone)]
struct LoadedSegment {
    vaddr: u64,
    memsz: u64,
    file_off: u64,
    filesz: u64,
}

/// An ELF section we care about for scanning purposes.
#[derive(Debug, Clone)]
pub struct ImageSection {
    pub name: String,
    pub addr: Address,
    pub size: u64,
}

/// A raw (still mangled) symbol from the image's symbol tables.
#[derive(Debug, Clone)]
pub struct RawSymbol {
    pub name: String,
    pub address: Address,
}

/// An ELF program image mapped read-only from disk.
///
/// Itanium-ABI RTTI lives in ELF binaries, so this is the production
/// `MemoryReader`. Section and symbol extraction happen once at load; byte
/// reads resolve virtual addresses through the PT_LOAD table.
pub struct ImageMemory {
    map: Mmap,
    path: PathBuf,
    pointer_size: usize,
    segments: Vec<LoadedSegment>,
    sections: Vec<ImageSection>,
    symbols: Vec<RawSymbol>,
}

impl ImageMemory {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let file = File::open(path.as_ref())?;
        let map = unsafe { Mmap::map(&file)? };

        let elf = Elf::parse(&map).map_err(|e| MemoryError::BinaryParseError(e.to_string()))?;
        let pointer_size = if elf.is_64 { 8 } else { 4 };

        let segments = elf
            .program_headers
            .iter()
            .filter(|ph| ph.p_type == PT_LOAD)
            .map(|ph| LoadedSegment {
                vaddr: ph.p_vaddr,
                memsz: ph.p_memsz,
                file_off: ph.p_offset,
                filesz: ph.p_filesz,
            })
            .collect();

        let mut sections = Vec::new();
        for sh in &elf.section_headers {
            if let Some(name) = elf.shdr_strtab.get_at(sh.sh_name) {
                if sh.sh_addr != 0 {
                    sections.push(ImageSection {
                        name: name.to_string(),
                        addr: Address::new(sh.sh_addr),
                        size: sh.sh_size,
                    });
                }
            }
        }

        let mut symbols = Vec::new();
        for sym in elf.syms.iter() {
            if sym.st_value == 0 {
                continue;
            }
            if let Some(name) = elf.strtab.get_at(sym.st_name) {
                symbols.push(RawSymbol {
                    name: name.to_string(),
                    address: Address::new(sym.st_value),
                });
            }
        }
        for sym in elf.dynsyms.iter() {
            if sym.st_value == 0 {
                continue;
            }
            if let Some(name) = elf.dynstrtab.get_at(sym.st_name) {
                symbols.push(RawSymbol {
                    name: name.to_string(),
                    address: Address::new(sym.st_value),
                });
            }
        }

        log::debug!(
            "loaded image {}: {} segments, {} sections, {} symbols",
            path.as_ref().display(),
            elf.program_headers.len(),
            sections.len(),
            symbols.len()
        );

        Ok(Self {
            map,
            path: path.as_ref().to_path_buf(),
            pointer_size,
            segments,
            sections,
            symbols,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sections(&self) -> &[ImageSection] {
        &self.sections
    }

    pub fn symbols(&self) -> &[RawSymbol] {
        &self.symbols
    }

    fn segment_for(&self, addr: u64) -> Option<&LoadedSegment> {
        self.segments
            .iter()
            .find(|s| addr >= s.vaddr && addr < s.vaddr + s.memsz)
    }
}

const DATA_SECTION_NAMES: &[&str] = &[".data.rel.ro", ".rodata", ".data", ".data.rel.ro.local"];

impl MemoryReader for ImageMemory {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let seg = self
            .segment_for(addr.as_u64())
            .ok_or(MemoryError::OutOfBounds(addr.as_u64()))?;
        let rel = addr.as_u64() - seg.vaddr;
        if rel + len as u64 > seg.memsz {
            return Err(MemoryError::OutOfBounds(addr.as_u64() + len as u64));
        }
        // Bytes past p_filesz are .bss fill.
        let mut out = vec![0u8; len];
        let file_avail = seg.filesz.saturating_sub(rel);
        let copy = (len as u64).min(file_avail) as usize;
        if copy > 0 {
            let start = (seg.file_off + rel) as usize;
            if start + copy > self.map.len() {
                return Err(MemoryError::ReadFailed(addr.as_u64()));
            }
            out[..copy].copy_from_slice(&self.map[start..start + copy]);
        }
        Ok(out)
    }

    fn pointer_size(&self) -> usize {
        self.pointer_size
    }

    fn data_ranges(&self) -> Vec<MemoryRange> {
        let mut ranges: Vec<MemoryRange> = self
            .sections
            .iter()
            .filter(|s| DATA_SECTION_NAMES.contains(&s.name.as_str()))
            .map(|s| MemoryRange::new(s.addr, s.addr + s.size))
            .collect();
        if ranges.is_empty() {
            // Stripped section headers: fall back to the writable segments.
            ranges = self
                .segments
                .iter()
                .map(|s| MemoryRange::new(Address::new(s.vaddr), Address::new(s.vaddr + s.memsz)))
                .collect();
        }
        ranges
    }
}
