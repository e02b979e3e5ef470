pub mod graph;
pub mod sync;

pub use graph::{
    ComponentId, ComponentType, HostError, Node, NodeId, NodeSeed, SceneGraph, SceneHost,
};
pub use sync::{
    HierarchySynchronizer, LinkRegistry, ReconcileReport, RequirementTable, SyncConfig, SyncError,
    SyncRequest, SyncScheduler,
};
