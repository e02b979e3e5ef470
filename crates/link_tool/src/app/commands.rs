use std::io::Write;
use std::time::Instant;

use prefab_link::graph::{NodeId, SceneGraph, SceneHost};
use prefab_link::sync::{
    link_by_name, DirtyTracker, HierarchySynchronizer, LinkRegistry, RequirementTable,
    SyncConfig, SyncOutcome, SyncRequest, SyncScheduler, TickReport,
};
use tracing::info;

use super::error::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Revert(NodeId),
    RevertHierarchy(NodeId),
    RevertInstances(NodeId),
    Apply(NodeId),
    ApplyAll(NodeId),
    CreateRoot(NodeId),
    AdoptRoot { root: NodeId, instance: NodeId },
    LinkByName(Vec<NodeId>),
    Registry,
    Dirty(NodeId),
    Tick,
}

impl Command {
    pub(crate) fn parse(line: &str) -> Result<Self, ToolError> {
        let mut parts = line.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| ToolError::Usage("empty command".to_string()))?;
        let ids = parts.map(|raw| parse_node_id(name, raw)).collect::<Result<Vec<_>, _>>()?;

        let single = |ids: &[NodeId]| match ids {
            [id] => Ok(*id),
            _ => Err(ToolError::Usage(format!("{name} takes exactly one node id"))),
        };
        let none = |ids: &[NodeId], command: Command| {
            if ids.is_empty() {
                Ok(command)
            } else {
                Err(ToolError::Usage(format!("{name} takes no arguments")))
            }
        };

        match name {
            "revert" => single(&ids).map(Self::Revert),
            "revert-hierarchy" => single(&ids).map(Self::RevertHierarchy),
            "revert-instances" => single(&ids).map(Self::RevertInstances),
            "apply" => single(&ids).map(Self::Apply),
            "apply-all" => single(&ids).map(Self::ApplyAll),
            "create-root" => single(&ids).map(Self::CreateRoot),
            "adopt-root" => match ids.as_slice() {
                [root, instance] => Ok(Self::AdoptRoot {
                    root: *root,
                    instance: *instance,
                }),
                _ => Err(ToolError::Usage(
                    "adopt-root takes a root id and an instance id".to_string(),
                )),
            },
            "dirty" => single(&ids).map(Self::Dirty),
            "link-by-name" if ids.is_empty() => Err(ToolError::Usage(
                "link-by-name requires at least one node id".to_string(),
            )),
            "link-by-name" => Ok(Self::LinkByName(ids)),
            "registry" => none(&ids, Self::Registry),
            "tick" => none(&ids, Self::Tick),
            other => Err(ToolError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_node_id(command: &str, raw: &str) -> Result<NodeId, ToolError> {
    raw.trim_start_matches('#')
        .parse::<u64>()
        .map(NodeId)
        .map_err(|_| ToolError::Usage(format!("invalid node id '{raw}' for {command}")))
}

/// Scene plus the synchronizer state that lives across commands.
pub(crate) struct Session {
    graph: SceneGraph,
    synchronizer: HierarchySynchronizer,
    registry: LinkRegistry,
    scheduler: SyncScheduler,
    dirty: DirtyTracker,
    started: Instant,
    changed: bool,
}

impl Session {
    pub(crate) fn new(graph: SceneGraph, config: SyncConfig) -> Self {
        let registry = LinkRegistry::build(&graph);
        Self {
            graph,
            synchronizer: HierarchySynchronizer::new(config, RequirementTable::with_builtin_types()),
            registry,
            scheduler: SyncScheduler::new(),
            dirty: DirtyTracker::new(),
            started: Instant::now(),
            changed: false,
        }
    }

    pub(crate) fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub(crate) fn changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub(crate) fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), ToolError> {
        match command {
            Command::Revert(node) => self.queue(node, SyncRequest::Revert { nodes: vec![node] }, out),
            Command::RevertHierarchy(node) => {
                self.queue(node, SyncRequest::RevertHierarchy { nodes: vec![node] }, out)
            }
            Command::RevertInstances(root) => {
                self.queue(root, SyncRequest::RevertAllInstances { roots: vec![root] }, out)
            }
            Command::Apply(node) => self.queue(node, SyncRequest::Apply { nodes: vec![node] }, out),
            Command::ApplyAll(node) => {
                self.queue(node, SyncRequest::ApplyAll { nodes: vec![node] }, out)
            }
            Command::CreateRoot(node) => {
                self.queue(node, SyncRequest::CreateRoot { nodes: vec![node] }, out)
            }
            Command::AdoptRoot { root, instance } => {
                self.require(root)?;
                self.queue(instance, SyncRequest::AdoptRoot { root, instance }, out)
            }
            Command::LinkByName(nodes) => self.link_by_name(&nodes, out),
            Command::Registry => self.print_registry(out),
            Command::Dirty(node) => {
                self.require(node)?;
                let dirty = self.dirty.refresh(
                    &self.graph,
                    node,
                    self.synchronizer.config(),
                    self.started.elapsed(),
                );
                emit(out, &format!("dirty {node}: {dirty}"))
            }
            Command::Tick => self.tick(out),
        }
    }

    pub(crate) fn tick<W: Write>(&mut self, out: &mut W) -> Result<(), ToolError> {
        let report = self
            .scheduler
            .tick(&mut self.graph, &self.synchronizer, &mut self.registry);
        if report.outcomes.iter().any(|outcome| !matches!(outcome, SyncOutcome::Skipped { .. })) {
            self.changed = true;
        }
        self.dirty.retain_live(&self.graph);
        emit_tick(out, &report)
    }

    fn queue<W: Write>(&mut self, node: NodeId, request: SyncRequest, out: &mut W) -> Result<(), ToolError> {
        self.require(node)?;
        info!(request = ?request, "sync_request_queued");
        self.scheduler.request(request);
        emit(out, &format!("queued: {node} ({} pending)", self.scheduler.pending_len()))
    }

    fn link_by_name<W: Write>(&mut self, nodes: &[NodeId], out: &mut W) -> Result<(), ToolError> {
        for node in nodes {
            self.require(*node)?;
        }
        let candidates: Vec<NodeId> = self
            .graph
            .roots()
            .into_iter()
            .filter(|root| self.graph.is_asset(*root))
            .collect();
        let linked = link_by_name(&mut self.graph, nodes, &candidates)?;
        if !linked.is_empty() {
            self.changed = true;
            self.registry.rebuild(&self.graph);
        }
        for (node, root) in &linked {
            emit(out, &format!("linked: {node} -> {root}"))?;
        }
        emit(out, &format!("link-by-name: {} of {} linked", linked.len(), nodes.len()))
    }

    fn print_registry<W: Write>(&mut self, out: &mut W) -> Result<(), ToolError> {
        self.registry.rebuild(&self.graph);
        if self.registry.is_empty() {
            return emit(out, "registry: empty");
        }
        for root in self.registry.roots() {
            let instances = self
                .registry
                .instances_of(root)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            emit(out, &format!("registry: {root} -> {instances}"))?;
        }
        Ok(())
    }

    fn require(&self, node: NodeId) -> Result<(), ToolError> {
        if self.graph.contains(node) {
            Ok(())
        } else {
            Err(ToolError::UnknownNode(node))
        }
    }
}

fn emit<W: Write>(out: &mut W, line: &str) -> Result<(), ToolError> {
    writeln!(out, "{line}").map_err(ToolError::Output)
}

fn emit_tick<W: Write>(out: &mut W, report: &TickReport) -> Result<(), ToolError> {
    for outcome in &report.outcomes {
        let line = match outcome {
            SyncOutcome::Reverted { node, report } => format!(
                "reverted {node}: {} nodes, {} failures",
                report.nodes_reconciled,
                report.failures.len()
            ),
            SyncOutcome::Applied { node, outcome } => format!(
                "applied {node} -> {}: {} nodes, {} failures",
                outcome.root,
                outcome.report.nodes_reconciled,
                outcome.report.failures.len()
            ),
            SyncOutcome::RootCreated { node, root, .. } => {
                format!("created root {root} for {node}")
            }
            SyncOutcome::RootAdopted { node, root } => {
                format!("adopted root {root} for {node}")
            }
            SyncOutcome::Skipped { node, error } => format!("skipped {node}: {error}"),
        };
        emit(out, &line)?;
    }
    emit(out, &format!("tick: {} requests", report.requests_run))
}
