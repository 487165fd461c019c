use super::*;
use crate::component_descriptor::ConcreteComponentDescriptor;
use crate::mounting::MutationKind;
use crate::props::{Props, RootProps};
use crate::state::{SharedState, State, StateUpdateCallback};
use std::sync::Mutex;

const SURFACE: SurfaceId = 11;

#[derive(Default)]
struct RecordingDelegate {
    created: Mutex<Vec<Tag>>,
    finished: Mutex<Vec<(SurfaceId, Vec<Tag>)>>,
}

impl UiManagerDelegate for RecordingDelegate {
    fn ui_manager_did_finish_transaction(
        &self,
        surface_id: SurfaceId,
        root_children: &SharedChildren,
        commit_start_time: Option<Instant>,
    ) {
        assert!(commit_start_time.is_some());
        let tags = root_children.iter().map(|child| child.tag()).collect();
        self.finished.lock().unwrap().push((surface_id, tags));
    }

    fn ui_manager_did_create_shadow_node(&self, node: &ShadowNode) {
        self.created.lock().unwrap().push(node.tag());
    }
}

fn ui_manager() -> (Arc<UiManager>, Arc<RecordingDelegate>) {
    let registry = Arc::new(ComponentDescriptorRegistry::new());
    registry.add(Arc::new(ConcreteComponentDescriptor::<RootProps>::new("View")));
    registry.add(Arc::new(
        ConcreteComponentDescriptor::<RootProps>::new("Counter")
            .with_initial_state(|_, family| State::new(0_u32, family)),
    ));
    let manager = UiManager::new(registry, RendererConfig::default());
    let delegate = Arc::new(RecordingDelegate::default());
    let weak = Arc::downgrade(&delegate) as Weak<dyn UiManagerDelegate>;
    manager.set_delegate(weak);
    (manager, delegate)
}

fn view(manager: &UiManager, tag: Tag) -> ShadowNode {
    manager
        .create_node(tag, "View", SURFACE, &RawProps::new(), None)
        .unwrap()
}

#[test]
fn surfaces_move_through_their_lifecycle() {
    let (manager, _) = ui_manager();
    assert_eq!(manager.surface_lifecycle(SURFACE), SurfaceLifecycle::NoTree);

    manager.start_surface(SURFACE).unwrap();
    assert_eq!(
        manager.start_surface(SURFACE),
        Err(UiManagerError::SurfaceAlreadyRunning { surface_id: SURFACE })
    );
    assert_eq!(manager.surface_lifecycle(SURFACE), SurfaceLifecycle::TreeBuilding);

    let child = Arc::new(view(&manager, 2));
    manager
        .complete_surface(SURFACE, Arc::new(vec![child]))
        .unwrap();
    assert_eq!(manager.surface_lifecycle(SURFACE), SurfaceLifecycle::TreeCommitted);

    view(&manager, 3);
    assert_eq!(manager.surface_lifecycle(SURFACE), SurfaceLifecycle::TreeBuilding);

    manager.stop_surface(SURFACE).unwrap();
    assert_eq!(manager.surface_lifecycle(SURFACE), SurfaceLifecycle::Stopped);
    assert!(!manager.shadow_tree_registry().contains(SURFACE));
}

#[test]
fn nodes_need_a_running_surface_and_a_known_component() {
    let (manager, _) = ui_manager();
    assert_eq!(
        manager
            .create_node(1, "View", SURFACE, &RawProps::new(), None)
            .err(),
        Some(UiManagerError::SurfaceNotRunning { surface_id: SURFACE })
    );

    manager.start_surface(SURFACE).unwrap();
    assert_eq!(
        manager
            .create_node(1, "Slider", SURFACE, &RawProps::new(), None)
            .err(),
        Some(UiManagerError::UnknownComponent {
            name: "Slider".to_owned()
        })
    );

    manager.stop_surface(SURFACE).unwrap();
    assert_eq!(
        manager
            .create_node(1, "View", SURFACE, &RawProps::new(), None)
            .err(),
        Some(UiManagerError::SurfaceStopped { surface_id: SURFACE })
    );
    assert!(manager.stop_surface(SURFACE).is_err());
}

#[test]
fn only_fresh_nodes_are_reported_as_created() {
    let (manager, delegate) = ui_manager();
    manager.start_surface(SURFACE).unwrap();

    let mut parent = view(&manager, 2);
    let child = Arc::new(view(&manager, 3));
    manager.append_child(&mut parent, Arc::clone(&child)).unwrap();
    let clone = manager
        .clone_node(&parent, None, Some(&RawProps::new().with("nativeID", "p")))
        .unwrap();

    assert_eq!(*delegate.created.lock().unwrap(), [2, 3]);
    assert!(Arc::ptr_eq(&clone.children()[0], &child));
    assert_eq!(clone.props().base().native_id(), "p");
}

#[test]
fn clone_without_overrides_shares_everything() {
    let (manager, _) = ui_manager();
    manager.start_surface(SURFACE).unwrap();
    let mut parent = view(&manager, 2);
    manager
        .append_child(&mut parent, Arc::new(view(&manager, 3)))
        .unwrap();

    let clone = manager
        .clone_node(&parent, None, Some(&RawProps::new()))
        .unwrap();
    assert!(Arc::ptr_eq(clone.props(), parent.props()));
    assert!(Arc::ptr_eq(clone.shared_children(), parent.shared_children()));
}

#[test]
fn every_commit_is_reported_once() {
    let (manager, delegate) = ui_manager();
    manager.start_surface(SURFACE).unwrap();
    let first = Arc::new(view(&manager, 2));
    manager
        .complete_surface(SURFACE, Arc::new(vec![Arc::clone(&first)]))
        .unwrap();
    let second = Arc::new(view(&manager, 3));
    manager
        .complete_surface(SURFACE, Arc::new(vec![first, second]))
        .unwrap();

    assert_eq!(
        *delegate.finished.lock().unwrap(),
        [(SURFACE, vec![2]), (SURFACE, vec![2, 3])]
    );
}

#[test]
fn state_updates_commit_a_new_revision() {
    let (manager, delegate) = ui_manager();
    manager.start_surface(SURFACE).unwrap();
    let counter = Arc::new(
        manager
            .create_node(5, "Counter", SURFACE, &RawProps::new(), None)
            .unwrap(),
    );
    assert_eq!(counter.state().unwrap().data::<u32>(), Some(&0));
    manager
        .complete_surface(SURFACE, Arc::new(vec![Arc::clone(&counter)]))
        .unwrap();

    let callback: StateUpdateCallback =
        Arc::new(|previous: &SharedState| Arc::new(State::next(previous, 7_u32)));
    let status = manager.update_state(StateUpdate {
        family: Arc::clone(counter.family()),
        callback,
    });
    assert_eq!(status, CommitStatus::Succeeded);

    let revision = manager.current_revision(SURFACE).unwrap();
    assert_eq!(revision.number, 2);
    let state = revision.root.children()[0].state().unwrap();
    assert_eq!(state.data::<u32>(), Some(&7));
    assert_eq!(state.revision(), 2);
    assert_eq!(delegate.finished.lock().unwrap().len(), 2);
}

#[test]
fn state_update_for_a_removed_node_is_cancelled() {
    let (manager, _) = ui_manager();
    manager.start_surface(SURFACE).unwrap();
    let counter = manager
        .create_node(5, "Counter", SURFACE, &RawProps::new(), None)
        .unwrap();
    let family = Arc::clone(counter.family());
    manager
        .complete_surface(SURFACE, Arc::new(vec![Arc::new(counter)]))
        .unwrap();
    manager
        .complete_surface(SURFACE, Arc::new(Vec::new()))
        .unwrap();

    let callback: StateUpdateCallback =
        Arc::new(|previous: &SharedState| Arc::new(State::next(previous, 1_u32)));
    let status = manager.update_state(StateUpdate { family, callback });
    assert_eq!(status, CommitStatus::Cancelled);
    assert_eq!(manager.current_revision(SURFACE).unwrap().number, 2);
}

#[test]
fn stopping_leaves_a_teardown_transaction() {
    let (manager, _) = ui_manager();
    manager.start_surface(SURFACE).unwrap();
    let mut parent = view(&manager, 2);
    manager
        .append_child(&mut parent, Arc::new(view(&manager, 3)))
        .unwrap();
    manager
        .complete_surface(SURFACE, Arc::new(vec![Arc::new(parent)]))
        .unwrap();

    let coordinator = manager.mounting_coordinator(SURFACE).unwrap();
    drop(coordinator.pull_transaction().unwrap());

    let coordinator = manager.stop_surface(SURFACE).unwrap();
    let mut transaction = coordinator.pull_transaction().unwrap();
    let kinds: Vec<_> = transaction
        .take_mutations()
        .iter()
        .map(|mutation| mutation.kind())
        .collect();
    assert_eq!(
        kinds,
        [
            MutationKind::Remove,
            MutationKind::Remove,
            MutationKind::Delete,
            MutationKind::Delete
        ]
    );

    manager.start_surface(SURFACE).unwrap();
    assert_eq!(manager.current_revision(SURFACE).unwrap().number, 0);
}
