use thiserror::Error;

use crate::graph::{ComponentId, ComponentType, HostError, NodeId};

/// A single host refusal that was logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoftFailure {
    #[error("failed to destroy child {node}: {error}")]
    DestroyNode { node: NodeId, error: HostError },
    #[error("failed to destroy {ty} component {component} on {node}: {error}")]
    DestroyComponent {
        node: NodeId,
        component: ComponentId,
        ty: ComponentType,
        error: HostError,
    },
    #[error("failed to add {ty} component to {node}: {error}")]
    AddComponent {
        node: NodeId,
        ty: ComponentType,
        error: HostError,
    },
    #[error("failed to copy child {source_node} under {parent}: {error}")]
    InstantiateChild {
        parent: NodeId,
        source_node: NodeId,
        error: HostError,
    },
    #[error("failed to copy structural data onto {node}: {error}")]
    CopyTransform { node: NodeId, error: HostError },
    #[error("failed to rename {node}: {error}")]
    Rename { node: NodeId, error: HostError },
    #[error("failed to re-link {node}: {error}")]
    Relink { node: NodeId, error: HostError },
    #[error("kept {ty} component {component} on {node}: a component requiring it could not be removed")]
    RequiredByRemaining {
        node: NodeId,
        component: ComponentId,
        ty: ComponentType,
    },
    #[error("skipped {node}: its root {root} is already being synchronized above it")]
    LinkCycle { node: NodeId, root: NodeId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    noop: bool,
    pub nodes_reconciled: usize,
    pub children_removed: usize,
    pub children_created: usize,
    pub components_removed: usize,
    pub components_added: usize,
    pub failures: Vec<SoftFailure>,
}

impl ReconcileReport {
    pub fn noop() -> Self {
        Self {
            noop: true,
            ..Self::default()
        }
    }

    /// Report for a pass that touched `nodes` nodes without further detail.
    pub fn reconciled(nodes: usize) -> Self {
        Self {
            nodes_reconciled: nodes,
            ..Self::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// True when no host operation was refused.
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record(&mut self, failure: SoftFailure) {
        tracing::warn!(failure = %failure, "reconcile_soft_failure");
        self.failures.push(failure);
    }

    pub fn merge(&mut self, other: ReconcileReport) {
        self.noop = self.noop && other.noop;
        self.nodes_reconciled += other.nodes_reconciled;
        self.children_removed += other.children_removed;
        self.children_created += other.children_created;
        self.components_removed += other.components_removed;
        self.components_added += other.components_added;
        self.failures.extend(other.failures);
    }
}
