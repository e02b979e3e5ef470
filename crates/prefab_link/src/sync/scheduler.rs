use std::collections::VecDeque;

use tracing::{info, warn};

use crate::graph::{NodeId, SceneHost, UndoableMutation};

use super::linking::{adopt_new_root, create_linked_root, unique_name};
use super::reconcile::{ApplyOutcome, HierarchySynchronizer, SyncError};
use super::registry::LinkRegistry;
use super::report::ReconcileReport;

const MAX_PENDING_REQUESTS: usize = 128;

/// Mutation requested from a callback, executed on the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    Revert { nodes: Vec<NodeId> },
    RevertHierarchy { nodes: Vec<NodeId> },
    RevertAllInstances { roots: Vec<NodeId> },
    Apply { nodes: Vec<NodeId> },
    ApplyAll { nodes: Vec<NodeId> },
    CreateRoot { nodes: Vec<NodeId> },
    /// Wires up a root the host copied from `instance` on its own.
    AdoptRoot { root: NodeId, instance: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Reverted {
        node: NodeId,
        report: ReconcileReport,
    },
    Applied {
        node: NodeId,
        outcome: ApplyOutcome,
    },
    RootCreated {
        node: NodeId,
        root: NodeId,
        report: ReconcileReport,
    },
    RootAdopted {
        node: NodeId,
        root: NodeId,
    },
    Skipped {
        node: NodeId,
        error: SyncError,
    },
}

impl SyncOutcome {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Reverted { node, .. }
            | Self::Applied { node, .. }
            | Self::RootCreated { node, .. }
            | Self::RootAdopted { node, .. }
            | Self::Skipped { node, .. } => *node,
        }
    }

    pub fn succeeded(&self) -> bool {
        match self {
            Self::Reverted { report, .. } | Self::RootCreated { report, .. } => report.succeeded(),
            Self::Applied { outcome, .. } => outcome.report.succeeded(),
            Self::RootAdopted { .. } => true,
            Self::Skipped { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub requests_run: usize,
    pub outcomes: Vec<SyncOutcome>,
}

impl TickReport {
    pub fn skipped(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SyncOutcome::Skipped { .. }))
    }
}

/// One-shot request queue drained once per tick, so that mutations asked
/// for inside a host callback run outside of it.
#[derive(Debug, Default)]
pub struct SyncScheduler {
    pending: VecDeque<SyncRequest>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, request: SyncRequest) {
        if self.pending.len() == MAX_PENDING_REQUESTS {
            if let Some(dropped) = self.pending.pop_front() {
                warn!(request = ?dropped, "sync_request_dropped_queue_full");
            }
        }
        self.pending.push_back(request);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Runs the requests queued before this call, in order, then closes
    /// the host's undo group.
    pub fn tick<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        synchronizer: &HierarchySynchronizer,
        registry: &mut LinkRegistry,
    ) -> TickReport {
        let batch: Vec<SyncRequest> = self.pending.drain(..).collect();
        let mut report = TickReport {
            requests_run: batch.len(),
            outcomes: Vec::new(),
        };

        for request in batch {
            match request {
                SyncRequest::Revert { nodes } => {
                    revert_nodes(host, synchronizer, &nodes, false, &mut report)
                }
                SyncRequest::RevertHierarchy { nodes } => {
                    revert_nodes(host, synchronizer, &nodes, true, &mut report)
                }
                SyncRequest::RevertAllInstances { roots } => {
                    for root in roots {
                        for (node, result) in synchronizer.revert_all_instances(host, registry, root)
                        {
                            report.outcomes.push(reverted(node, result));
                        }
                    }
                }
                SyncRequest::Apply { nodes } => {
                    apply_nodes(host, synchronizer, &nodes, false, &mut report)
                }
                SyncRequest::ApplyAll { nodes } => {
                    apply_nodes(host, synchronizer, &nodes, true, &mut report)
                }
                SyncRequest::CreateRoot { nodes } => {
                    for node in nodes {
                        report.outcomes.push(create_root(host, node));
                    }
                }
                SyncRequest::AdoptRoot { root, instance } => {
                    let outcome = match adopt_new_root(host, root, instance) {
                        Ok(()) => {
                            host.mark_modified(root);
                            SyncOutcome::RootAdopted {
                                node: instance,
                                root,
                            }
                        }
                        Err(error) => SyncOutcome::Skipped {
                            node: instance,
                            error,
                        },
                    };
                    report.outcomes.push(outcome);
                }
            }
        }

        host.flush_undo();
        for outcome in report.skipped() {
            if let SyncOutcome::Skipped { node, error } = outcome {
                warn!(node = %node, error = %error, "sync_request_skipped");
            }
        }
        if report.requests_run > 0 {
            info!(
                requests = report.requests_run,
                outcomes = report.outcomes.len(),
                "sync_tick_complete"
            );
        }
        report
    }
}

fn revert_nodes<H: SceneHost + ?Sized>(
    host: &mut H,
    synchronizer: &HierarchySynchronizer,
    nodes: &[NodeId],
    hierarchy: bool,
    report: &mut TickReport,
) {
    for node in nodes {
        let result = synchronizer.revert_selected(host, *node, hierarchy);
        report.outcomes.push(reverted(*node, result));
    }
}

fn apply_nodes<H: SceneHost + ?Sized>(
    host: &mut H,
    synchronizer: &HierarchySynchronizer,
    nodes: &[NodeId],
    hierarchy: bool,
    report: &mut TickReport,
) {
    for node in nodes {
        let outcome = match synchronizer.apply_selected(host, *node, hierarchy) {
            Ok(outcome) => SyncOutcome::Applied {
                node: *node,
                outcome,
            },
            Err(error) => SyncOutcome::Skipped { node: *node, error },
        };
        report.outcomes.push(outcome);
    }
}

fn reverted(node: NodeId, result: Result<ReconcileReport, SyncError>) -> SyncOutcome {
    match result {
        Ok(report) => SyncOutcome::Reverted { node, report },
        Err(error) => SyncOutcome::Skipped { node, error },
    }
}

fn create_root<H: SceneHost + ?Sized>(host: &mut H, node: NodeId) -> SyncOutcome {
    let Some(base) = host.node(node).map(|n| n.name().to_string()) else {
        return SyncOutcome::Skipped {
            node,
            error: SyncError::MissingNode(node),
        };
    };
    let asset_names: Vec<String> = host
        .node_ids()
        .into_iter()
        .filter_map(|id| host.node(id))
        .filter(|candidate| candidate.is_asset() && candidate.parent().is_none())
        .map(|candidate| candidate.name().to_string())
        .collect();
    let name = unique_name(asset_names.iter().map(String::as_str), &base);

    match create_linked_root(host, node, &name) {
        Ok(root) => {
            host.record_undo("Prefab Link: Create root", UndoableMutation::CreatedNode(root));
            host.mark_modified(root);
            SyncOutcome::RootCreated {
                node,
                root,
                report: ReconcileReport::reconciled(1),
            }
        }
        Err(error) => SyncOutcome::Skipped { node, error },
    }
}
