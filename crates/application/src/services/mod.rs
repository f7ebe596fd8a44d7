//! Application services - drafting, numbering and sync use cases

mod autosave;
mod connectivity;
mod local_tier;
mod notifier;
mod reference_allocator;
mod remote_tier;
mod sync_coordinator;

pub use autosave::{AutosaveConfig, AutosaveSession, EditKind};
pub use connectivity::{Connectivity, ConnectivityConfig, ConnectivityMonitor};
pub use local_tier::LocalDraftTier;
pub use notifier::Notifier;
pub use reference_allocator::{AllocatorConfig, ReferenceAllocator};
pub use remote_tier::RemoteLetterTier;
pub use sync_coordinator::{FinalizeOutcome, ResyncReport, SyncConfig, SyncCoordinator};
