mod config;
mod dirty;
mod linking;
mod ordering;
mod reconcile;
mod registry;
mod report;
mod requirements;
mod scheduler;

pub use config::SyncConfig;
pub use dirty::{compute_dirty, subtrees_equal, ComparisonOptions, DirtyTracker};
pub use linking::{
    adopt_new_root, create_linked_root, link_by_name, strip_duplicate_index, unique_name,
};
pub use ordering::{add_components, remove_all_components, remove_component, Exemptions};
pub use reconcile::{
    direct_linked_descendants, ApplyOutcome, HierarchySynchronizer, ReconcileFlags, SyncError,
};
pub use registry::LinkRegistry;
pub use report::{ReconcileReport, SoftFailure};
pub use requirements::{RequirementError, RequirementTable};
pub use scheduler::{SyncOutcome, SyncRequest, SyncScheduler, TickReport};
