mod host;
mod ids;
mod node;
mod scene_graph;

pub use host::{HostError, SceneHost, UndoableMutation};
pub use ids::{ComponentId, ComponentType, NodeId, PREFAB_LINK, TRANSFORM};
pub use node::{link_data, Component, Node};
pub use scene_graph::{default_transform_data, GraphError, NodeSeed, SceneGraph, UndoRecord};
