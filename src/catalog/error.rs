// Wed Feb 04 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid layout name: {0:?}")]
    InvalidName(String),
    #[error("Naming conflict for {0}")]
    NamingConflict(String),
}
