// Thu Feb 05 2026 - Alex

use crate::catalog::CatalogError;
use crate::memory::MemoryError;
use crate::symbol::SymbolError;
use thiserror::Error;

/// Error taxonomy of the reconstruction layer.
///
/// Everything here is recoverable by design: validation failures degrade to
/// conservative defaults at the call site, cancellation degrades to "vtable
/// not found", naming conflicts abandon one edit. Anything that escapes the
/// layer is a programming defect, not a data-quality problem.
#[derive(Error, Debug)]
pub enum RttiError {
    #[error("No valid data type at {0:#x}: {1}")]
    InvalidDataType(u64, String),
    #[error("Naming conflict: {0}")]
    NamingConflict(#[from] CatalogError),
    #[error("Search cancelled")]
    Cancelled,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl From<SymbolError> for RttiError {
    fn from(e: SymbolError) -> Self {
        RttiError::InvalidInput(e.to_string())
    }
}
