// Mon Feb 02 2026 - Alex

use serde::{Deserialize, Serialize};

/// Tunables for one reconstruction session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hard cap on words considered part of one vtable group.
    pub max_vtable_words: usize,
    /// Most vbase/vcall offset words tolerated before a sub-table header.
    pub max_prefix_words: usize,
    /// Most bases accepted in a `__vmi_class_type_info` record.
    pub max_bases: usize,
    /// Run the heuristic scan when symbol lookup finds no valid vtable.
    pub enable_heuristic_scan: bool,
    /// Chunk granularity of the heuristic scan; one chunk is one
    /// cancellation checkpoint.
    pub scan_chunk_bytes: usize,
    pub max_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_vtable_words: 512,
            max_prefix_words: 8,
            max_bases: 64,
            enable_heuristic_scan: true,
            scan_chunk_bytes: 0x10000,
            max_threads: num_cpus::get(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heuristic_scan(mut self, enable: bool) -> Self {
        self.enable_heuristic_scan = enable;
        self
    }

    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = threads;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_vtable_words == 0 {
            return Err("max_vtable_words must be greater than 0".to_string());
        }
        if self.max_bases == 0 {
            return Err("max_bases must be greater than 0".to_string());
        }
        if self.scan_chunk_bytes == 0 {
            return Err("scan_chunk_bytes must be greater than 0".to_string());
        }
        if self.max_threads == 0 {
            return Err("max_threads must be greater than 0".to_string());
        }
        Ok(())
    }
}
