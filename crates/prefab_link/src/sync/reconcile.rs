use thiserror::Error;
use tracing::{debug, info, warn};

use crate::graph::{HostError, NodeId, SceneHost, UndoableMutation};

use super::config::SyncConfig;
use super::ordering::{add_components, remove_all_components, Exemptions};
use super::registry::LinkRegistry;
use super::report::{ReconcileReport, SoftFailure};
use super::requirements::RequirementTable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
    #[error("node {0} has no linked root to synchronize with")]
    NoLinkedRoot(NodeId),
    #[error("native apply needs an asset root but {root} is a scene object")]
    NativeApplyRequiresAsset { root: NodeId },
    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileFlags {
    pub recurse_children: bool,
    pub skip_top_transform: bool,
    pub skip_link_component: bool,
}

impl Default for ReconcileFlags {
    fn default() -> Self {
        Self {
            recurse_children: true,
            skip_top_transform: true,
            skip_link_component: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Root the scene node is linked to after the apply. Differs from the
    /// previous root when the host had to replace it.
    pub root: NodeId,
    pub report: ReconcileReport,
}

/// Two-way reconciliation between scene subtrees and their linked roots.
#[derive(Debug, Clone, Default)]
pub struct HierarchySynchronizer {
    config: SyncConfig,
    requirements: RequirementTable,
}

impl HierarchySynchronizer {
    pub fn new(config: SyncConfig, requirements: RequirementTable) -> Self {
        Self {
            config,
            requirements,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Makes `target` structurally and data-equal to `source`. With
    /// `recurse_children`, linked descendants of `target` are then reverted
    /// against their own roots.
    pub fn reconcile<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        source: NodeId,
        target: NodeId,
        flags: ReconcileFlags,
    ) -> ReconcileReport {
        let mut active = vec![source];
        self.reconcile_within(host, source, target, flags, &mut active)
    }

    /// Pulls the linked root's content into `scene`.
    pub fn revert<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        scene: NodeId,
        recurse_children: bool,
        skip_top_transform: bool,
    ) -> Result<ReconcileReport, SyncError> {
        self.revert_within(
            host,
            scene,
            recurse_children,
            skip_top_transform,
            &mut Vec::new(),
        )
    }

    /// Pushes `scene`'s content into its linked root. Linked descendants are
    /// applied first so the root receives their updated links.
    pub fn apply<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        scene: NodeId,
        recurse_children: bool,
        skip_top_transform: bool,
    ) -> Result<ApplyOutcome, SyncError> {
        self.apply_within(
            host,
            scene,
            recurse_children,
            skip_top_transform,
            &mut Vec::new(),
        )
    }

    // `active` holds the roots being synchronized by the enclosing passes.
    fn reconcile_within<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        source: NodeId,
        target: NodeId,
        flags: ReconcileFlags,
        active: &mut Vec<NodeId>,
    ) -> ReconcileReport {
        let mut report = self.copy_node(host, source, target, flags);
        if report.is_noop() || !flags.recurse_children {
            return report;
        }

        for descendant in direct_linked_descendants(host, target) {
            match self.revert_within(host, descendant, true, true, active) {
                Ok(child_report) => report.merge(child_report),
                Err(error) => warn!(node = %descendant, error = %error, "linked_descendant_skipped"),
            }
        }
        report
    }

    fn revert_within<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        scene: NodeId,
        recurse_children: bool,
        skip_top_transform: bool,
        active: &mut Vec<NodeId>,
    ) -> Result<ReconcileReport, SyncError> {
        let Some(root) = linked_root(host, scene)? else {
            return Ok(ReconcileReport::noop());
        };
        if active.contains(&root) {
            return Ok(cycle_report(scene, root));
        }

        let flags = ReconcileFlags {
            recurse_children,
            skip_top_transform,
            skip_link_component: false,
        };
        active.push(root);
        let mut report = self.reconcile_within(host, root, scene, flags, active);
        active.pop();

        let still_linked = host
            .node(scene)
            .and_then(|node| node.link_target())
            .is_some();
        if !still_linked {
            if let Err(error) = host.set_link(scene, Some(root)) {
                report.record(SoftFailure::Relink { node: scene, error });
            }
        }

        self.log_pass("revert_complete", scene, root, &report);
        Ok(report)
    }

    fn apply_within<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        scene: NodeId,
        recurse_children: bool,
        skip_top_transform: bool,
        active: &mut Vec<NodeId>,
    ) -> Result<ApplyOutcome, SyncError> {
        let Some(root) = linked_root(host, scene)? else {
            return Ok(ApplyOutcome {
                root: scene,
                report: ReconcileReport::noop(),
            });
        };
        if active.contains(&root) {
            return Ok(ApplyOutcome {
                root,
                report: cycle_report(scene, root),
            });
        }

        let mut report = ReconcileReport::noop();
        if recurse_children {
            active.push(root);
            for descendant in direct_linked_descendants(host, scene) {
                match self.apply_within(host, descendant, true, true, active) {
                    Ok(outcome) => report.merge(outcome.report),
                    Err(error) => {
                        warn!(node = %descendant, error = %error, "linked_descendant_skipped")
                    }
                }
            }
            active.pop();
        }

        let flags = ReconcileFlags {
            recurse_children: false,
            skip_top_transform,
            skip_link_component: false,
        };
        let copied = self.copy_node(host, scene, root, flags);
        if copied.is_noop() {
            debug!(scene = %scene, root = %root, "apply_skipped_noop_copy");
            return Ok(ApplyOutcome { root, report });
        }
        report.merge(copied);
        relink(host, scene, root, &mut report);

        self.log_pass("apply_complete", scene, root, &report);
        Ok(ApplyOutcome { root, report })
    }

    /// Editor-level revert: honors the native-revert setting, records the
    /// undo group and marks the node modified.
    pub fn revert_selected<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        scene: NodeId,
        hierarchy: bool,
    ) -> Result<ReconcileReport, SyncError> {
        if self.config.use_host_native_revert || host.is_asset(scene) {
            if linked_root(host, scene)?.is_none() {
                return Ok(ReconcileReport::noop());
            }
            host.native_revert(scene)?;
            host.mark_modified(scene);
            info!(node = %scene, "native_revert_complete");
            return Ok(ReconcileReport::reconciled(1));
        }

        host.record_undo("Prefab Link Revert", UndoableMutation::FullHierarchy(scene));
        let report = self.revert(host, scene, hierarchy, self.config.skip_top_transform)?;
        host.mark_modified(scene);
        Ok(report)
    }

    /// Editor-level apply: honors the native-apply setting, records the
    /// undo group and marks the root modified.
    pub fn apply_selected<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        scene: NodeId,
        hierarchy: bool,
    ) -> Result<ApplyOutcome, SyncError> {
        if self.config.use_host_native_apply {
            let Some(root) = linked_root(host, scene)? else {
                return Ok(ApplyOutcome {
                    root: scene,
                    report: ReconcileReport::noop(),
                });
            };
            if !host.is_asset(root) {
                return Err(SyncError::NativeApplyRequiresAsset { root });
            }
            let new_root = host.native_apply(scene, root)?;
            let mut report = ReconcileReport::reconciled(1);
            relink(host, scene, new_root, &mut report);
            host.mark_modified(new_root);
            info!(node = %scene, old_root = %root, root = %new_root, "native_apply_complete");
            return Ok(ApplyOutcome {
                root: new_root,
                report,
            });
        }

        if let Some(root) = host
            .node(scene)
            .and_then(|node| node.link_target())
            .filter(|root| *root != scene)
        {
            host.record_undo("Prefab Link Apply", UndoableMutation::FullHierarchy(root));
        }
        let outcome = self.apply(host, scene, hierarchy, self.config.skip_top_transform)?;
        host.mark_modified(outcome.root);
        Ok(outcome)
    }

    /// Reverts every scene instance linked to `root`, rebuilding the
    /// registry first.
    pub fn revert_all_instances<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        registry: &mut LinkRegistry,
        root: NodeId,
    ) -> Vec<(NodeId, Result<ReconcileReport, SyncError>)> {
        registry.rebuild(host);
        let instances = registry.instances_of(root);
        info!(root = %root, instance_count = instances.len(), "revert_all_instances");
        instances
            .into_iter()
            .map(|instance| (instance, self.revert_selected(host, instance, false)))
            .collect()
    }

    fn copy_node<H: SceneHost + ?Sized>(
        &self,
        host: &mut H,
        source: NodeId,
        target: NodeId,
        flags: ReconcileFlags,
    ) -> ReconcileReport {
        if source == target || host.node(source).is_none() || host.node(target).is_none() {
            return ReconcileReport::noop();
        }
        if is_ancestor(host, source, target) || is_ancestor(host, target, source) {
            warn!(source = %source, target = %target, "reconcile_nested_pair_skipped");
            return ReconcileReport::noop();
        }

        let mut report = ReconcileReport::reconciled(1);
        let exemptions = Exemptions {
            skip_link_component: flags.skip_link_component,
        };

        let stale_children = host
            .node(target)
            .map(|node| node.children().to_vec())
            .unwrap_or_default();
        for child in stale_children.into_iter().rev() {
            match host.destroy_node(child) {
                Ok(()) => report.children_removed += 1,
                Err(error) => report.record(SoftFailure::DestroyNode { node: child, error }),
            }
        }

        remove_all_components(host, &self.requirements, target, exemptions, &mut report);

        let (source_components, source_children, source_name) = match host.node(source) {
            Some(node) => (
                node.components().to_vec(),
                node.children().to_vec(),
                node.name().to_string(),
            ),
            None => return report,
        };
        add_components(
            host,
            &self.requirements,
            &source_components,
            target,
            exemptions,
            &mut report,
        );

        if !flags.skip_top_transform {
            copy_transform(host, source, target, &mut report);
        }

        for child in source_children {
            match host.instantiate_subtree(child, target) {
                Ok(created) => {
                    host.record_undo(
                        "Prefab Link: Copy child node",
                        UndoableMutation::CreatedNode(created),
                    );
                    report.children_created += 1;
                }
                Err(error) => report.record(SoftFailure::InstantiateChild {
                    parent: target,
                    source_node: child,
                    error,
                }),
            }
        }

        if self.config.change_names {
            if let Err(error) = host.set_name(target, &source_name) {
                report.record(SoftFailure::Rename {
                    node: target,
                    error,
                });
            }
        }

        if self.config.verbose {
            info!(
                source = %source,
                target = %target,
                children_removed = report.children_removed,
                children_created = report.children_created,
                components_removed = report.components_removed,
                components_added = report.components_added,
                "node_reconciled"
            );
        } else {
            debug!(source = %source, target = %target, "node_reconciled");
        }
        report
    }

    fn log_pass(&self, event: &'static str, scene: NodeId, root: NodeId, report: &ReconcileReport) {
        if report.succeeded() {
            info!(
                scene = %scene,
                root = %root,
                nodes = report.nodes_reconciled,
                event,
                "sync_pass_complete"
            );
        } else {
            warn!(
                scene = %scene,
                root = %root,
                nodes = report.nodes_reconciled,
                failures = report.failures.len(),
                event,
                "sync_pass_incomplete"
            );
        }
    }
}

fn cycle_report(scene: NodeId, root: NodeId) -> ReconcileReport {
    warn!(node = %scene, root = %root, "linked_descendant_cycle_skipped");
    let mut report = ReconcileReport::default();
    report.record(SoftFailure::LinkCycle { node: scene, root });
    report
}

/// `Ok(None)` when the node is its own root, which makes any sync a no-op.
fn linked_root<H: SceneHost + ?Sized>(
    host: &H,
    node: NodeId,
) -> Result<Option<NodeId>, SyncError> {
    let target = host
        .node(node)
        .ok_or(SyncError::MissingNode(node))?
        .link_target();
    match target {
        Some(root) if root == node => Ok(None),
        Some(root) if host.node(root).is_some() => Ok(Some(root)),
        _ => Err(SyncError::NoLinkedRoot(node)),
    }
}

fn relink<H: SceneHost + ?Sized>(
    host: &mut H,
    scene: NodeId,
    root: NodeId,
    report: &mut ReconcileReport,
) {
    if let Err(error) = host.set_link(scene, Some(root)) {
        report.record(SoftFailure::Relink { node: scene, error });
    }
    let root_has_link = host
        .node(root)
        .is_some_and(|node| node.link_component().is_some());
    if root_has_link {
        if let Err(error) = host.set_link(root, Some(root)) {
            report.record(SoftFailure::Relink { node: root, error });
        }
    }
}

fn copy_transform<H: SceneHost + ?Sized>(
    host: &mut H,
    source: NodeId,
    target: NodeId,
    report: &mut ReconcileReport,
) {
    let data = host
        .node(source)
        .and_then(|node| node.transform())
        .map(|component| component.data().clone());
    let target_transform = host
        .node(target)
        .and_then(|node| node.transform())
        .map(|component| component.id());
    if let (Some(data), Some(component)) = (data, target_transform) {
        if let Err(error) = host.set_component_data(target, component, &data) {
            report.record(SoftFailure::CopyTransform {
                node: target,
                error,
            });
        }
    }
}

/// Nearest descendants of `node` carrying their own link component. The
/// search does not descend below a linked descendant.
pub fn direct_linked_descendants<H: SceneHost + ?Sized>(host: &H, node: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    let Some(parent) = host.node(node) else {
        return found;
    };
    for child in parent.children() {
        match host.node(*child) {
            Some(child_node) if child_node.link_component().is_some() => found.push(*child),
            Some(_) => found.extend(direct_linked_descendants(host, *child)),
            None => {}
        }
    }
    found
}

fn is_ancestor<H: SceneHost + ?Sized>(host: &H, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = host.node(node).and_then(|n| n.parent());
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = host.node(id).and_then(|n| n.parent());
    }
    false
}
