// Thu Feb 05 2026 - Alex

pub mod edit;
pub mod error;
pub mod model;
pub mod scan;
pub mod type_info;
pub mod vtable;

pub use error::RttiError;
pub use model::{ClassId, ClassTypeInfoModel, ReconstructionSession};
pub use scan::{CancelToken, VtableScanner};
pub use type_info::{AbiVtables, BaseClassDescriptor, TypeInfoKind, TypeInfoParser, TypeInfoRecord, VmiFlags};
pub use vtable::{VtableModel, VtableRef, VtableSlot};
