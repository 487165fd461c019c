use std::sync::{Arc, Weak};

use fabric_core::{
    CommitOptions, CommitStatus, EventDispatcher, EventPriority, MutationKind, RawEvent, RawProps,
    RendererConfig, ScriptRuntime, ShadowNode, ShadowNodeFragment, ShadowTree, ShadowTreeRegistry,
    SharedState, State, StateCoordinator, StateUpdate, StateUpdateCallback,
};
use fabric_testing::{
    component_registry, init_logging, Element, ImmediateRuntimeExecutor, ManualBeats,
    RecordingScriptRuntime,
};

const SURFACE: i32 = 42;

#[test]
fn surface_commits_mount_and_unregister() {
    init_logging();
    let registry = ShadowTreeRegistry::new();
    registry.add(ShadowTree::new(SURFACE, &RendererConfig::default(), None));

    let descriptors = component_registry();
    let child = Arc::new(
        Element::view(7)
            .props(RawProps::new().with("opacity", 0.5))
            .build_detached(&descriptors, SURFACE)
            .unwrap(),
    );

    let mut first_transaction = None;
    assert!(registry.visit(SURFACE, |tree| {
        let status = tree.commit(
            |root| {
                let mut root = root.clone_with(ShadowNodeFragment::new());
                root.append_child(Arc::clone(&child));
                Some(root)
            },
            CommitOptions::default(),
        );
        assert_eq!(status, CommitStatus::Succeeded);
        first_transaction = tree.mounting_coordinator().pull_transaction();
    }));

    let mut transaction = first_transaction.expect("revision 1 is ready to mount");
    assert_eq!(transaction.number(), 1);
    let mutations = transaction.take_mutations();
    let summary: Vec<_> = mutations
        .iter()
        .map(|m| (m.kind(), m.target_tag(), m.parent_tag(), m.index()))
        .collect();
    assert_eq!(
        summary,
        [
            (MutationKind::Create, SURFACE, None, None),
            (MutationKind::Create, 7, None, None),
            (MutationKind::Insert, 7, Some(SURFACE), Some(0)),
        ]
    );
    drop(transaction);

    let mut observed = None;
    assert!(registry.visit(SURFACE, |tree| observed = Some(tree.current_revision().number)));
    assert_eq!(observed, Some(1));

    let view = descriptors.at("View").unwrap();
    registry.visit(SURFACE, |tree| {
        tree.commit(
            |root| {
                let old_child = &root.children()[0];
                let fainter = RawProps::new().with("opacity", 0.25);
                let props = view.clone_props(Some(old_child.props()), &fainter);
                let new_child = old_child.clone_with(ShadowNodeFragment::new().with_props(props));
                Some(root.clone_with(
                    ShadowNodeFragment::new().with_children(Arc::new(vec![Arc::new(new_child)])),
                ))
            },
            CommitOptions::default(),
        );
        let coordinator = tree.mounting_coordinator();
        let mut transaction = coordinator.pull_transaction().expect("revision 2 is ready");
        assert_eq!(transaction.number(), 2);
        let kinds: Vec<_> = transaction.take_mutations().iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, [MutationKind::Update]);
        drop(transaction);
        assert!(coordinator.pull_transaction().is_none());
        assert_eq!(coordinator.last_mounted_revision_number(), Some(2));
    });

    let removed = registry.remove(SURFACE);
    assert_eq!(removed.current_revision().number, 2);
    let mut called = false;
    assert!(!registry.visit(SURFACE, |_| called = true));
    assert!(!called);
}

#[test]
fn coalesced_revisions_are_never_exposed_out_of_order() {
    let tree = ShadowTree::new(SURFACE, &RendererConfig::default(), None);
    let descriptors = component_registry();
    for tag in 1..=3 {
        let node = Arc::new(Element::view(tag).build_detached(&descriptors, SURFACE).unwrap());
        tree.commit(
            |root| {
                let mut root = root.clone_with(ShadowNodeFragment::new());
                root.append_child(Arc::clone(&node));
                Some(root)
            },
            CommitOptions::default(),
        );
    }

    let coordinator = tree.mounting_coordinator();
    let transaction = coordinator.pull_transaction().unwrap();
    assert_eq!(transaction.number(), 3);
    drop(transaction);
    assert!(coordinator.pull_transaction().is_none());
}

#[test]
fn dispatching_state_without_a_target_does_nothing() {
    let callback: StateUpdateCallback =
        Arc::new(|previous: &SharedState| Arc::new(State::next(previous, ())));

    let orphan = StateCoordinator::new(Weak::new());
    orphan.dispatch_raw_state(Arc::clone(&callback), EventPriority::SynchronousUnbatched);
    assert!(orphan.target().is_none());

    let executor = ImmediateRuntimeExecutor::new(RecordingScriptRuntime::new());
    let beats = ManualBeats::new(executor.clone());
    let dispatcher = Arc::new(EventDispatcher::new(
        Arc::new(|_: &mut dyn ScriptRuntime, _: &RawEvent| {}),
        Arc::new(|_: StateUpdate| panic!("no update may be delivered")),
        &beats.factory(),
        &beats.factory(),
    ));
    let coordinator = StateCoordinator::new(Arc::downgrade(&dispatcher));
    coordinator.dispatch_raw_state(callback, EventPriority::AsynchronousBatched);
    assert_eq!(
        dispatcher
            .queue(EventPriority::AsynchronousBatched)
            .pending_state_update_count(),
        0
    );
    assert_eq!(beats.induce_count(), 0);
}

#[test]
fn detached_nodes_are_unsealed_until_committed() {
    let descriptors = component_registry();
    let node: ShadowNode = Element::view(3)
        .child(Element::view(4))
        .build_detached(&descriptors, SURFACE)
        .unwrap();
    assert!(!node.is_sealed());

    let tree = ShadowTree::new(SURFACE, &RendererConfig::default(), None);
    let node = Arc::new(node);
    tree.commit(
        |root| {
            Some(root.clone_with(
                ShadowNodeFragment::new().with_children(Arc::new(vec![Arc::clone(&node)])),
            ))
        },
        CommitOptions::default(),
    );
    assert!(node.is_sealed());
    assert!(node.children()[0].is_sealed());
    assert!(node.props().is_sealed());
}
