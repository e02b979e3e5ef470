    use super::*;
    use crate::graph::{
        Component, ComponentId, ComponentType, NodeId, SceneGraph, SceneHost, UndoableMutation,
    };
    use serde_json::{json, Value};

    fn synchronizer() -> HierarchySynchronizer {
        synchronizer_with(SyncConfig::default())
    }

    fn synchronizer_with(config: SyncConfig) -> HierarchySynchronizer {
        HierarchySynchronizer::new(config, RequirementTable::with_builtin_types())
    }

    /// Asset root "Crate" with a physics body and two children.
    fn crate_root(graph: &mut SceneGraph) -> NodeId {
        let root = graph.spawn_asset("Crate");
        graph
            .attach(root, "Collider", json!({ "size": [1.0, 1.0, 1.0] }))
            .expect("collider");
        graph
            .attach(root, "Rigidbody", json!({ "mass": 4.0 }))
            .expect("rigidbody");
        graph.set_link(root, Some(root)).expect("root link");
        let lid = graph.spawn("Lid", Some(root)).expect("lid");
        graph
            .attach(lid, "HingeJoint", json!({ "axis": [1.0, 0.0, 0.0] }))
            .expect("hinge");
        graph
            .attach(lid, "Rigidbody", json!({ "mass": 0.5 }))
            .expect("lid body");
        graph.spawn("Label", Some(root)).expect("label");
        root
    }

    fn linked_instance(graph: &mut SceneGraph, root: NodeId, name: &str) -> NodeId {
        let scene = graph.spawn(name, None).expect("scene");
        graph.set_link(scene, Some(root)).expect("link");
        scene
    }

    fn options() -> ComparisonOptions {
        ComparisonOptions::from_config(&SyncConfig::default())
    }

    fn child_names(graph: &SceneGraph, node: NodeId) -> Vec<String> {
        graph
            .node(node)
            .expect("node")
            .children()
            .iter()
            .map(|child| graph.node(*child).expect("child").name().to_string())
            .collect()
    }

    fn component_data(graph: &SceneGraph, node: NodeId, ty: &str) -> Value {
        graph
            .node(node)
            .expect("node")
            .component_of_type(&ComponentType::new(ty))
            .map(|component| component.data().clone())
            .unwrap_or(Value::Null)
    }

    fn digest(graph: &SceneGraph, node: NodeId) -> Vec<(String, Vec<(String, Value)>)> {
        graph
            .walk(node)
            .into_iter()
            .filter_map(|id| graph.node(id))
            .map(|node| {
                let components = node
                    .components()
                    .iter()
                    .map(|component| (component.ty().as_str().to_string(), component.data().clone()))
                    .collect();
                (node.name().to_string(), components)
            })
            .collect()
    }

    /// `digest` with each node's components in type order.
    fn sorted_digest(graph: &SceneGraph, node: NodeId) -> Vec<(String, Vec<(String, Value)>)> {
        let mut nodes = digest(graph, node);
        for (_, components) in &mut nodes {
            components.sort_by(|a, b| a.0.cmp(&b.0));
        }
        nodes
    }

    fn destroyed_components(graph: &SceneGraph) -> Vec<ComponentId> {
        graph
            .pending_undo()
            .iter()
            .filter_map(|record| match record.mutation {
                UndoableMutation::DestroyedComponent { component, .. } => Some(component),
                _ => None,
            })
            .collect()
    }

    /// Cart asset holding an embedded wheel that is itself linked to a wheel
    /// root. The embedded copy is stale: grip 1 against the root's grip 2.
    fn cart_fixture(graph: &mut SceneGraph) -> (NodeId, NodeId, NodeId) {
        let wheel_root = graph.spawn_asset("Wheel");
        graph.attach(wheel_root, "Tire", json!({ "grip": 2 })).expect("tire");
        let cart_root = graph.spawn_asset("Cart");
        let embedded = graph.spawn("Wheel", Some(cart_root)).expect("embedded");
        graph.set_link(embedded, Some(wheel_root)).expect("embedded link");
        graph.attach(embedded, "Tire", json!({ "grip": 1 })).expect("tire");
        let cart = linked_instance(graph, cart_root, "Cart");
        (wheel_root, cart_root, cart)
    }

    #[test]
    fn revert_makes_instance_equal_to_root() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate (1)");
        graph.attach(scene, "Light", json!({ "range": 3 })).expect("light");
        let junk = graph.spawn("Junk", Some(scene)).expect("junk");

        let report = synchronizer()
            .revert(&mut graph, scene, true, true)
            .expect("revert");

        assert!(report.succeeded());
        assert_eq!(report.children_removed, 1);
        assert_eq!(report.children_created, 2);
        assert_eq!(report.components_removed, 2);
        assert_eq!(report.components_added, 3);
        assert!(!graph.contains(junk));
        assert_eq!(graph.node(scene).expect("scene").name(), "Crate");
        assert_eq!(graph.resolve_linked_origin(scene), Some(root));
        assert!(subtrees_equal(&graph, scene, root, options()));
        assert!(!compute_dirty(&graph, scene, &SyncConfig::default()));
    }

    #[test]
    fn repeated_revert_changes_nothing_observable() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate (1)");
        let sync = synchronizer();

        sync.revert(&mut graph, scene, true, true).expect("first");
        let first = digest(&graph, scene);
        let report = sync.revert(&mut graph, scene, true, true).expect("second");

        assert_eq!(digest(&graph, scene), first);
        assert_eq!(report.children_removed, 2);
        assert_eq!(report.children_created, 2);
        assert!(subtrees_equal(&graph, scene, root, options()));
    }

    #[test]
    fn revert_removes_dependents_first_and_adds_requirements_first() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        let rigidbody = graph
            .attach(scene, "Rigidbody", json!({ "mass": 9.0 }))
            .expect("rb");
        let collider = graph.attach(scene, "Collider", json!({})).expect("col");

        synchronizer()
            .revert(&mut graph, scene, false, true)
            .expect("revert");

        let physics: Vec<ComponentId> = destroyed_components(&graph)
            .into_iter()
            .filter(|id| *id == rigidbody || *id == collider)
            .collect();
        assert_eq!(physics, vec![collider, rigidbody]);

        let types: Vec<&str> = graph
            .node(scene)
            .expect("scene")
            .components()
            .iter()
            .map(|component| component.ty().as_str())
            .collect();
        assert_eq!(types, vec!["Transform", "Rigidbody", "Collider", "PrefabLink"]);
        assert_eq!(component_data(&graph, scene, "Rigidbody"), json!({ "mass": 4.0 }));
    }

    #[test]
    fn revert_recreates_children_with_fresh_ids() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");

        synchronizer()
            .revert(&mut graph, scene, true, true)
            .expect("revert");

        let root_children = graph.node(root).expect("root").children().to_vec();
        let scene_children = graph.node(scene).expect("scene").children().to_vec();
        assert_eq!(scene_children.len(), 2);
        assert!(scene_children.iter().all(|id| !root_children.contains(id)));
        assert_eq!(child_names(&graph, scene), vec!["Lid", "Label"]);
        assert!(scene_children
            .iter()
            .all(|id| !graph.is_asset(*id) && graph.node(*id).expect("child").parent() == Some(scene)));
    }

    #[test]
    fn apply_then_revert_carries_edits_to_other_instances() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let edited = linked_instance(&mut graph, root, "Crate");
        let sync = synchronizer();
        sync.revert(&mut graph, edited, true, true).expect("revert");
        graph.attach(edited, "Light", json!({ "range": 3 })).expect("light");
        graph.spawn("Handle", Some(edited)).expect("handle");

        let outcome = sync.apply(&mut graph, edited, true, true).expect("apply");
        assert_eq!(outcome.root, root);
        assert!(outcome.report.succeeded());
        assert_eq!(child_names(&graph, root), vec!["Lid", "Label", "Handle"]);
        assert_eq!(graph.node(root).expect("root").link_target(), Some(root));
        assert!(graph.is_asset(graph.node(root).expect("root").children()[2]));

        let other = linked_instance(&mut graph, root, "Crate (2)");
        sync.revert(&mut graph, other, true, true).expect("revert other");

        assert!(subtrees_equal(&graph, other, edited, options()));
        assert!(!compute_dirty(&graph, edited, &SyncConfig::default()));
        assert!(!compute_dirty(&graph, other, &SyncConfig::default()));
    }

    #[test]
    fn dirty_flag_follows_edits_and_reverts() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        let sync = synchronizer();
        sync.revert(&mut graph, scene, true, true).expect("revert");
        assert!(!compute_dirty(&graph, scene, sync.config()));

        graph.attach(scene, "Light", json!({ "range": 3 })).expect("light");
        assert!(compute_dirty(&graph, scene, sync.config()));

        sync.revert(&mut graph, scene, true, true).expect("revert again");
        assert!(!compute_dirty(&graph, scene, sync.config()));
    }

    #[test]
    fn refused_destroy_is_reported_and_pass_continues() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        let stuck = graph.spawn("Stuck", Some(scene)).expect("stuck");
        let loose = graph.spawn("Loose", Some(scene)).expect("loose");
        graph.pin_node(stuck);

        let report = synchronizer()
            .revert(&mut graph, scene, true, true)
            .expect("revert");

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            SoftFailure::DestroyNode { node, .. } if node == stuck
        ));
        assert!(!graph.contains(loose));
        assert_eq!(report.children_created, 2);
        assert_eq!(child_names(&graph, scene), vec!["Stuck", "Lid", "Label"]);
        assert_eq!(component_data(&graph, scene, "Rigidbody"), json!({ "mass": 4.0 }));
    }

    #[test]
    fn revert_recurses_into_linked_descendants() {
        let mut graph = SceneGraph::new();
        let (wheel_root, _, cart) = cart_fixture(&mut graph);

        let report = synchronizer()
            .revert(&mut graph, cart, true, true)
            .expect("revert");

        let wheel = graph.node(cart).expect("cart").children()[0];
        assert_eq!(component_data(&graph, wheel, "Tire"), json!({ "grip": 2 }));
        assert_eq!(graph.resolve_linked_origin(wheel), Some(wheel_root));
        assert_eq!(report.nodes_reconciled, 2);
    }

    #[test]
    fn revert_without_recursion_keeps_embedded_copy() {
        let mut graph = SceneGraph::new();
        let (wheel_root, _, cart) = cart_fixture(&mut graph);

        let report = synchronizer()
            .revert(&mut graph, cart, false, true)
            .expect("revert");

        let wheel = graph.node(cart).expect("cart").children()[0];
        assert_eq!(component_data(&graph, wheel, "Tire"), json!({ "grip": 1 }));
        assert_eq!(graph.resolve_linked_origin(wheel), Some(wheel_root));
        assert_eq!(report.nodes_reconciled, 1);
    }

    #[test]
    fn apply_pushes_linked_descendants_to_their_roots() {
        let mut graph = SceneGraph::new();
        let (wheel_root, cart_root, cart) = cart_fixture(&mut graph);
        let sync = synchronizer();
        sync.revert(&mut graph, cart, true, true).expect("revert");
        let wheel = graph.node(cart).expect("cart").children()[0];
        let tire = graph
            .node(wheel)
            .expect("wheel")
            .component_of_type(&ComponentType::new("Tire"))
            .map(Component::id)
            .expect("tire");
        graph
            .set_component_data(wheel, tire, &json!({ "grip": 3 }))
            .expect("edit");

        sync.apply(&mut graph, cart, true, true).expect("apply");

        assert_eq!(component_data(&graph, wheel_root, "Tire"), json!({ "grip": 3 }));
        let embedded = graph.node(cart_root).expect("cart root").children()[0];
        assert_eq!(component_data(&graph, embedded, "Tire"), json!({ "grip": 3 }));
        assert_eq!(graph.resolve_linked_origin(embedded), Some(wheel_root));
        assert_eq!(
            graph.node(wheel_root).expect("wheel root").link_target(),
            Some(wheel_root)
        );
    }

    #[test]
    fn native_apply_relinks_to_replacement_root() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        let sync = synchronizer_with(SyncConfig {
            use_host_native_apply: true,
            ..SyncConfig::default()
        });
        sync.revert(&mut graph, scene, true, true).expect("revert");
        graph.attach(scene, "Light", json!({ "range": 3 })).expect("light");

        let outcome = sync.apply_selected(&mut graph, scene, false).expect("apply");

        assert_ne!(outcome.root, root);
        assert!(!graph.contains(root));
        assert_eq!(graph.resolve_linked_origin(scene), Some(outcome.root));
        let new_root = graph.node(outcome.root).expect("new root");
        assert_eq!(new_root.name(), "Crate");
        assert_eq!(new_root.link_target(), Some(outcome.root));
        assert!(new_root.has_component(&ComponentType::new("Light")));
        assert!(graph.modified().contains(&outcome.root));
    }

    #[test]
    fn native_apply_onto_scene_root_is_rejected() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn("Crate", None).expect("scene root");
        let scene = linked_instance(&mut graph, root, "Crate (1)");
        let sync = synchronizer_with(SyncConfig {
            use_host_native_apply: true,
            ..SyncConfig::default()
        });

        assert_eq!(
            sync.apply_selected(&mut graph, scene, false),
            Err(SyncError::NativeApplyRequiresAsset { root })
        );
    }

    #[test]
    fn native_revert_keeps_link_and_structural_data() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        graph
            .set_transform(scene, json!({ "position": [5.0, 0.0, 0.0] }))
            .expect("move");
        graph.attach(scene, "Light", json!({})).expect("light");
        graph.spawn("Junk", Some(scene)).expect("junk");
        let sync = synchronizer_with(SyncConfig {
            use_host_native_revert: true,
            ..SyncConfig::default()
        });

        let report = sync.revert_selected(&mut graph, scene, true).expect("revert");

        assert_eq!(report.nodes_reconciled, 1);
        assert_eq!(child_names(&graph, scene), vec!["Lid", "Label"]);
        assert_eq!(graph.resolve_linked_origin(scene), Some(root));
        assert_eq!(
            component_data(&graph, scene, "Transform"),
            json!({ "position": [5.0, 0.0, 0.0] })
        );
        assert!(!compute_dirty(&graph, scene, sync.config()));
    }

    #[test]
    fn structural_data_is_copied_only_when_not_skipped() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        graph
            .set_transform(root, json!({ "position": [1.0, 2.0, 3.0] }))
            .expect("move root");
        let kept = linked_instance(&mut graph, root, "Crate");
        let copied = linked_instance(&mut graph, root, "Crate (1)");

        synchronizer()
            .revert_selected(&mut graph, kept, true)
            .expect("revert kept");
        synchronizer_with(SyncConfig {
            skip_top_transform: false,
            ..SyncConfig::default()
        })
        .revert_selected(&mut graph, copied, true)
        .expect("revert copied");

        assert_eq!(
            component_data(&graph, kept, "Transform"),
            json!({ "position": [0.0, 0.0, 0.0] })
        );
        assert_eq!(
            component_data(&graph, copied, "Transform"),
            json!({ "position": [1.0, 2.0, 3.0] })
        );
    }

    #[test]
    fn names_are_left_alone_when_disabled() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate (7)");
        let sync = synchronizer_with(SyncConfig {
            change_names: false,
            ..SyncConfig::default()
        });

        sync.revert(&mut graph, scene, true, true).expect("revert");

        assert_eq!(graph.node(scene).expect("scene").name(), "Crate (7)");
        assert!(!compute_dirty(&graph, scene, sync.config()));
    }

    #[test]
    fn revert_selected_groups_undo_and_marks_modified() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");

        synchronizer()
            .revert_selected(&mut graph, scene, true)
            .expect("revert");
        graph.flush_undo();

        let group = &graph.undo_groups()[0];
        assert_eq!(group[0].label, "Prefab Link Revert");
        assert_eq!(group[0].mutation, UndoableMutation::FullHierarchy(scene));
        let created = group
            .iter()
            .filter(|record| record.label == "Prefab Link: Copy child node")
            .count();
        assert_eq!(created, 2);
        assert!(graph.modified().contains(&scene));
    }

    #[test]
    fn misuse_is_reported_as_errors() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let unlinked = graph.spawn("Loose", None).expect("loose");
        let dangling = linked_instance(&mut graph, NodeId(999), "Ghost");
        let sync = synchronizer();

        assert_eq!(
            sync.revert(&mut graph, unlinked, true, true),
            Err(SyncError::NoLinkedRoot(unlinked))
        );
        assert_eq!(
            sync.apply(&mut graph, unlinked, true, true).map(|outcome| outcome.root),
            Err(SyncError::NoLinkedRoot(unlinked))
        );
        assert_eq!(
            sync.revert(&mut graph, dangling, true, true),
            Err(SyncError::NoLinkedRoot(dangling))
        );
        assert_eq!(
            sync.revert(&mut graph, NodeId(4242), true, true),
            Err(SyncError::MissingNode(NodeId(4242)))
        );

        let before = digest(&graph, root);
        let report = sync.revert(&mut graph, root, true, true).expect("self linked");
        assert!(report.is_noop());
        assert_eq!(digest(&graph, root), before);
    }

    #[test]
    fn nested_pair_is_left_untouched() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn("Parent", None).expect("parent");
        let child = graph.spawn("Child", Some(parent)).expect("child");
        graph.attach(parent, "Light", json!({})).expect("light");
        let before = digest(&graph, parent);

        let report = synchronizer().reconcile(&mut graph, parent, child, ReconcileFlags::default());

        assert!(report.is_noop());
        assert_eq!(digest(&graph, parent), before);
    }

    #[test]
    fn revert_then_apply_leaves_root_content_unchanged() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate (3)");
        graph.attach(scene, "Light", json!({ "range": 3 })).expect("light");
        let before = sorted_digest(&graph, root);
        let sync = synchronizer();

        sync.revert(&mut graph, scene, true, true).expect("revert");
        let outcome = sync.apply(&mut graph, scene, true, true).expect("apply");

        assert_eq!(outcome.root, root);
        assert!(outcome.report.succeeded());
        assert_eq!(sorted_digest(&graph, root), before);
        assert_eq!(graph.node(root).expect("root").link_target(), Some(root));
    }

    #[test]
    fn self_containing_root_does_not_recurse_forever() {
        let mut graph = SceneGraph::new();
        let ring = graph.spawn_asset("Ring");
        let inner = graph.spawn("Inner", Some(ring)).expect("inner");
        graph.set_link(inner, Some(ring)).expect("inner link");
        let scene = linked_instance(&mut graph, ring, "Ring");
        let sync = synchronizer();

        let report = sync.revert(&mut graph, scene, true, true).expect("revert");

        assert_eq!(child_names(&graph, scene), vec!["Inner"]);
        let copy = graph.node(scene).expect("scene").children()[0];
        assert!(graph.node(copy).expect("copy").children().is_empty());
        assert_eq!(
            report.failures,
            vec![SoftFailure::LinkCycle {
                node: copy,
                root: ring
            }]
        );

        let outcome = sync.apply(&mut graph, scene, true, true).expect("apply");
        assert_eq!(outcome.root, ring);
        assert_eq!(outcome.report.failures.len(), 1);
        assert_eq!(child_names(&graph, ring), vec!["Inner"]);
    }

    #[test]
    fn pinned_dependent_keeps_its_requirement() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        let rigidbody = graph
            .attach(scene, "Rigidbody", json!({ "mass": 9.0 }))
            .expect("rb");
        let collider = graph.attach(scene, "Collider", json!({})).expect("col");
        graph.pin_component(collider);

        let report = synchronizer()
            .revert(&mut graph, scene, false, true)
            .expect("revert");

        let node = graph.node(scene).expect("scene");
        assert!(node.components().iter().any(|c| c.id() == collider));
        assert!(node.components().iter().any(|c| c.id() == rigidbody));
        assert!(!destroyed_components(&graph).contains(&rigidbody));
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[1],
            SoftFailure::RequiredByRemaining { component, .. } if component == rigidbody
        ));
        assert_eq!(graph.resolve_linked_origin(scene), Some(root));
    }

    #[test]
    fn apply_on_nested_pair_leaves_links_alone() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_asset("Shelf");
        graph.set_link(root, None).expect("root link");
        let part = graph.spawn("Board", Some(root)).expect("part");
        graph.set_link(part, Some(root)).expect("part link");
        let before = digest(&graph, root);

        let outcome = synchronizer()
            .apply(&mut graph, part, true, true)
            .expect("apply");

        assert!(outcome.report.is_noop());
        assert_eq!(graph.node(root).expect("root").link_target(), None);
        assert_eq!(digest(&graph, root), before);
    }

    #[test]
    fn registry_tracks_every_instance_for_bulk_revert() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let instances: Vec<NodeId> = ["Crate", "Crate (1)", "Crate (2)"]
            .into_iter()
            .map(|name| linked_instance(&mut graph, root, name))
            .collect();
        let mut registry = LinkRegistry::build(&graph);
        assert_eq!(registry.instances_of(root), instances);

        let sync = synchronizer();
        let results = sync.revert_all_instances(&mut graph, &mut registry, root);

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        for instance in &instances {
            assert!(!compute_dirty(&graph, *instance, sync.config()));
        }
    }

    #[test]
    fn scheduler_runs_queued_requests_once() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let scene = linked_instance(&mut graph, root, "Crate");
        let barrel = graph.spawn("Barrel", None).expect("barrel");
        graph.attach(barrel, "Light", json!({})).expect("light");
        let sync = synchronizer();
        let mut registry = LinkRegistry::new();
        let mut scheduler = SyncScheduler::new();

        scheduler.request(SyncRequest::Revert { nodes: vec![scene] });
        scheduler.request(SyncRequest::CreateRoot {
            nodes: vec![barrel],
        });
        assert_eq!(scheduler.pending_len(), 2);

        let report = scheduler.tick(&mut graph, &sync, &mut registry);

        assert_eq!(report.requests_run, 2);
        assert!(report.outcomes.iter().all(SyncOutcome::succeeded));
        assert!(scheduler.is_idle());
        assert_eq!(graph.undo_groups().len(), 1);
        assert!(!compute_dirty(&graph, scene, sync.config()));

        let SyncOutcome::RootCreated { root: barrel_root, .. } = report.outcomes[1] else {
            panic!("expected a created root, got {:?}", report.outcomes[1]);
        };
        assert!(graph.is_asset(barrel_root));
        assert_eq!(graph.node(barrel_root).expect("root").name(), "Barrel");
        assert_eq!(graph.resolve_linked_origin(barrel), Some(barrel_root));
        assert!(graph.node(barrel_root).expect("root").has_component(&ComponentType::new("Light")));

        let idle = scheduler.tick(&mut graph, &sync, &mut registry);
        assert_eq!(idle.requests_run, 0);
        assert_eq!(graph.undo_groups().len(), 1);
    }

    #[test]
    fn created_root_name_avoids_existing_roots() {
        let mut graph = SceneGraph::new();
        crate_root(&mut graph);
        let loose = graph.spawn("Crate", None).expect("loose");
        let mut scheduler = SyncScheduler::new();
        scheduler.request(SyncRequest::CreateRoot { nodes: vec![loose] });

        let report = scheduler.tick(&mut graph, &synchronizer(), &mut LinkRegistry::new());

        let SyncOutcome::RootCreated { root, .. } = report.outcomes[0] else {
            panic!("expected a created root, got {:?}", report.outcomes[0]);
        };
        assert_eq!(graph.node(root).expect("root").name(), "Crate (1)");
    }

    #[test]
    fn scheduler_reports_skipped_requests() {
        let mut graph = SceneGraph::new();
        let loose = graph.spawn("Loose", None).expect("loose");
        let mut scheduler = SyncScheduler::new();
        scheduler.request(SyncRequest::Apply { nodes: vec![loose] });

        let report = scheduler.tick(&mut graph, &synchronizer(), &mut LinkRegistry::new());

        assert_eq!(report.skipped().count(), 1);
        assert_eq!(
            report.outcomes[0],
            SyncOutcome::Skipped {
                node: loose,
                error: SyncError::NoLinkedRoot(loose)
            }
        );
    }

    #[test]
    fn scheduler_drops_oldest_request_when_full() {
        let mut graph = SceneGraph::new();
        let mut scheduler = SyncScheduler::new();
        for index in 0..130 {
            scheduler.request(SyncRequest::Revert {
                nodes: vec![NodeId(1_000 + index)],
            });
        }
        assert_eq!(scheduler.pending_len(), 128);

        let report = scheduler.tick(&mut graph, &synchronizer(), &mut LinkRegistry::new());

        assert_eq!(report.requests_run, 128);
        assert_eq!(report.outcomes[0].node(), NodeId(1_002));
    }

    #[test]
    fn scheduler_reverts_all_instances_of_a_root() {
        let mut graph = SceneGraph::new();
        let root = crate_root(&mut graph);
        let first = linked_instance(&mut graph, root, "Crate");
        let second = linked_instance(&mut graph, root, "Crate (1)");
        let mut registry = LinkRegistry::new();
        let mut scheduler = SyncScheduler::new();
        scheduler.request(SyncRequest::RevertAllInstances { roots: vec![root] });

        let report = scheduler.tick(&mut graph, &synchronizer(), &mut registry);

        let reverted: Vec<NodeId> = report.outcomes.iter().map(SyncOutcome::node).collect();
        assert_eq!(reverted, vec![first, second]);
        assert_eq!(registry.instance_count(), 2);
        assert_eq!(child_names(&graph, second), vec!["Lid", "Label"]);
    }
