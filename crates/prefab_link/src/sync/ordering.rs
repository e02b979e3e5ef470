use std::collections::BTreeMap;

use tracing::debug;

use crate::graph::{Component, ComponentId, ComponentType, NodeId, SceneHost};

use super::report::{ReconcileReport, SoftFailure};
use super::requirements::RequirementTable;

/// Component types the add/remove procedures never touch. The structural
/// component is always exempt; the link component only on request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exemptions {
    pub skip_link_component: bool,
}

impl Exemptions {
    pub fn is_exempt(&self, ty: &ComponentType) -> bool {
        ty.is_transform() || (self.skip_link_component && ty.is_prefab_link())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Removed,
    Kept,
}

/// Removes every non-exempt component of `node`, dependents before the
/// components they require.
pub fn remove_all_components<H: SceneHost + ?Sized>(
    host: &mut H,
    requirements: &RequirementTable,
    node: NodeId,
    exemptions: Exemptions,
    report: &mut ReconcileReport,
) {
    let mut pending: Vec<Component> = match host.node(node) {
        Some(target) => target.components().to_vec(),
        None => return,
    };
    let mut visits = BTreeMap::new();

    while !pending.is_empty() {
        let component = pending.remove(0);
        if exemptions.is_exempt(component.ty()) || visits.contains_key(&component.id()) {
            continue;
        }
        remove_with_dependents(
            host,
            requirements,
            node,
            &component,
            exemptions,
            &mut visits,
            report,
        );
        pending.retain(|candidate| !visits.contains_key(&candidate.id()));
    }
}

/// Removes one component after first removing everything on the node that
/// requires it.
pub fn remove_component<H: SceneHost + ?Sized>(
    host: &mut H,
    requirements: &RequirementTable,
    node: NodeId,
    component: ComponentId,
    exemptions: Exemptions,
    report: &mut ReconcileReport,
) {
    let Some(target) = host
        .node(node)
        .and_then(|owner| owner.components().iter().find(|c| c.id() == component))
        .cloned()
    else {
        return;
    };
    if exemptions.is_exempt(target.ty()) {
        return;
    }
    let mut visits = BTreeMap::new();
    remove_with_dependents(
        host,
        requirements,
        node,
        &target,
        exemptions,
        &mut visits,
        report,
    );
}

/// Returns whether `component` is gone. It stays on the node when any of
/// its dependents could not be removed.
fn remove_with_dependents<H: SceneHost + ?Sized>(
    host: &mut H,
    requirements: &RequirementTable,
    node: NodeId,
    component: &Component,
    exemptions: Exemptions,
    visits: &mut BTreeMap<ComponentId, Visit>,
    report: &mut ReconcileReport,
) -> bool {
    visits.insert(component.id(), Visit::InProgress);

    let dependents: Vec<Component> = host
        .node(node)
        .map(|owner| {
            owner
                .components()
                .iter()
                .filter(|candidate| {
                    candidate.id() != component.id()
                        && !exemptions.is_exempt(candidate.ty())
                        && requirements.requires(candidate.ty(), component.ty())
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let mut blocked = false;
    for dependent in dependents {
        let removed = match visits.get(&dependent.id()) {
            // In progress: an enclosing call of a requirement cycle.
            Some(Visit::InProgress) | Some(Visit::Removed) => true,
            Some(Visit::Kept) => false,
            None => remove_with_dependents(
                host,
                requirements,
                node,
                &dependent,
                exemptions,
                visits,
                report,
            ),
        };
        blocked |= !removed;
    }

    let removed = if blocked {
        report.record(SoftFailure::RequiredByRemaining {
            node,
            component: component.id(),
            ty: component.ty().clone(),
        });
        false
    } else {
        match host.destroy_component(node, component.id()) {
            Ok(()) => {
                report.components_removed += 1;
                true
            }
            Err(error) => {
                report.record(SoftFailure::DestroyComponent {
                    node,
                    component: component.id(),
                    ty: component.ty().clone(),
                    error,
                });
                false
            }
        }
    };
    let visit = if removed { Visit::Removed } else { Visit::Kept };
    visits.insert(component.id(), visit);
    removed
}

/// Adds clones of `source_components` onto `target`, adding each
/// component's required types from the same pool first.
pub fn add_components<H: SceneHost + ?Sized>(
    host: &mut H,
    requirements: &RequirementTable,
    source_components: &[Component],
    target: NodeId,
    exemptions: Exemptions,
    report: &mut ReconcileReport,
) {
    let mut pool = source_components.to_vec();
    while !pool.is_empty() {
        let next = pool.remove(0);
        add_with_requirements(
            host,
            requirements,
            next,
            &mut pool,
            target,
            exemptions,
            report,
        );
    }
}

fn add_with_requirements<H: SceneHost + ?Sized>(
    host: &mut H,
    requirements: &RequirementTable,
    component: Component,
    pool: &mut Vec<Component>,
    target: NodeId,
    exemptions: Exemptions,
    report: &mut ReconcileReport,
) {
    if exemptions.is_exempt(component.ty()) {
        return;
    }

    for required in requirements.required_types(component.ty()) {
        let present = host
            .node(target)
            .is_some_and(|node| node.has_component(required));
        if present {
            continue;
        }
        match pool.iter().position(|candidate| candidate.ty() == required) {
            Some(index) => {
                let dependency = pool.remove(index);
                add_with_requirements(
                    host,
                    requirements,
                    dependency,
                    pool,
                    target,
                    exemptions,
                    report,
                );
            }
            None => debug!(
                node = %target,
                component = %component.ty(),
                required = %required,
                "required_component_unavailable"
            ),
        }
    }

    match host.add_component(target, component.ty(), component.data()) {
        Ok(_) => report.components_added += 1,
        Err(error) => report.record(SoftFailure::AddComponent {
            node: target,
            ty: component.ty().clone(),
            error,
        }),
    }
}
