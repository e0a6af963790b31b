// Tue Feb 03 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Malformed type name: {0:?}")]
    InvalidTypeName(String),
    #[error("Invalid namespace id {0}")]
    InvalidNamespace(usize),
}
