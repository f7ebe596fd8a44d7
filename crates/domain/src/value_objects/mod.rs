//! Value Objects - Immutable, identity-less domain primitives

mod branch;
mod draft_status;
mod local_id;
mod numbering;
mod reference;
mod remote_id;

pub use branch::{BranchCode, BranchId};
pub use draft_status::{DraftStatus, SyncStatus};
pub use local_id::LocalId;
pub use numbering::{NumberingScope, SequenceNumber};
pub use reference::ReferenceString;
pub use remote_id::RemoteId;
