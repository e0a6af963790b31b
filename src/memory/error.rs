// Mon Feb 02 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read failed at address {0:#x}")]
    ReadFailed(u64),
    #[error("Out of bounds: address {0:#x} not in any mapped range")]
    OutOfBounds(u64),
    #[error("Unterminated string at address {0:#x}")]
    UnterminatedString(u64),
    #[error("Binary parse error: {0}")]
    BinaryParseError(String),
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),
}
