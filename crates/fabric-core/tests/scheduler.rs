use std::sync::{Arc, Mutex, Weak};

use fabric_core::{
    build_stub_view_tree, EventPriority, RawProps, RawValue, RendererConfig, RuntimeError,
    Scheduler, SchedulerDelegate, SchedulerToolbox, SharedShadowNode, SurfaceLifecycle,
    DISPATCH_EVENT_FUNCTION,
};
use fabric_testing::{
    component_registry, init_logging, Element, FunctionCall, ImageState, ImmediateRuntimeExecutor,
    ManualBeats, RecordingSchedulerDelegate, RecordingScriptRuntime,
};

const SURFACE: i32 = 5;

struct Harness {
    executor: Arc<ImmediateRuntimeExecutor>,
    beats: Arc<ManualBeats>,
    scheduler: Arc<Scheduler>,
    delegate: Arc<RecordingSchedulerDelegate>,
}

fn harness_with(runtime: RecordingScriptRuntime, config: RendererConfig) -> Harness {
    init_logging();
    let executor = ImmediateRuntimeExecutor::new(runtime);
    let beats = ManualBeats::new(executor.clone());
    let toolbox = SchedulerToolbox::new(executor.clone(), component_registry())
        .with_config(config)
        .with_beat_factories(beats.factory(), beats.factory());
    let delegate = RecordingSchedulerDelegate::auto_mounting();
    let weak = Arc::downgrade(&delegate) as Weak<dyn SchedulerDelegate>;
    let scheduler = Scheduler::new(toolbox, weak);
    Harness {
        executor,
        beats,
        scheduler,
        delegate,
    }
}

fn harness() -> Harness {
    harness_with(RecordingScriptRuntime::new(), RendererConfig::default())
}

impl Harness {
    fn render(&self, element: Element) -> SharedShadowNode {
        let ui_manager = self.scheduler.ui_manager();
        let node = element.build(ui_manager, SURFACE).unwrap();
        ui_manager
            .complete_surface(SURFACE, Arc::new(vec![Arc::clone(&node)]))
            .unwrap();
        node
    }
}

#[test]
fn unbatched_events_flush_within_the_dispatch_call() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let button = harness.render(Element::view(2).instance_handle(40));

    button.family().event_emitter().unwrap().dispatch_event(
        "press",
        RawValue::from(1),
        EventPriority::AsynchronousUnbatched,
    );

    assert_eq!(harness.beats.induce_count(), 1);
    assert_eq!(
        harness.executor.calls(),
        [FunctionCall {
            name: DISPATCH_EVENT_FUNCTION.to_owned(),
            args: vec![
                RawValue::from(40_u64),
                RawValue::from("topPress"),
                RawValue::from(1)
            ],
        }]
    );
}

#[test]
fn batched_events_wait_for_the_next_beat() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let list = harness.render(Element::view(2).instance_handle(40));
    let emitter = list.family().event_emitter().unwrap();

    emitter.dispatch_event("scroll", RawValue::from(1), EventPriority::SynchronousBatched);
    emitter.dispatch_event("scroll", RawValue::from(2), EventPriority::SynchronousBatched);
    assert_eq!(harness.beats.induce_count(), 0);
    assert!(harness.executor.calls().is_empty());

    harness.beats.tick();
    let payloads: Vec<_> = harness
        .executor
        .calls()
        .into_iter()
        .map(|call| call.args[2].clone())
        .collect();
    assert_eq!(payloads, [RawValue::from(1), RawValue::from(2)]);

    harness.beats.tick();
    assert_eq!(harness.executor.calls().len(), 2);
}

#[test]
fn unique_events_keep_only_the_latest_payload() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let list = harness.render(Element::view(2).instance_handle(40));
    let emitter = list.family().event_emitter().unwrap();

    for offset in [10, 20, 30] {
        emitter.dispatch_unique_event("scroll", RawValue::from(offset));
    }
    harness.beats.tick();

    let calls = harness.executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args[2], RawValue::from(30));
}

#[test]
fn events_without_an_instance_handle_are_not_emitted() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let plain = harness.render(Element::view(2));
    assert!(plain.family().event_emitter().is_none());
}

#[test]
fn state_updates_commit_and_mount() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let image = harness.render(
        Element::image(3).props(RawProps::new().with("source", "cat.png")),
    );
    assert_eq!(harness.delegate.mounted_revisions(SURFACE), [1]);

    let state = image.state().unwrap();
    let loaded = state.data::<ImageState>().unwrap().loaded(64.0, 48.0);
    state.update_state(loaded, EventPriority::SynchronousUnbatched);

    assert_eq!(harness.delegate.mounted_revisions(SURFACE), [1, 2]);
    let root = harness.scheduler.ui_manager().current_revision(SURFACE).unwrap().root;
    let committed = &root.children()[0];
    let data = committed.state().unwrap().data::<ImageState>().unwrap();
    assert!(data.loaded);
    assert_eq!((data.width, data.height), (64.0, 48.0));
    assert_eq!(data.source, "cat.png");
    assert_eq!(
        harness.delegate.views(SURFACE).unwrap(),
        build_stub_view_tree(&root)
    );
}

#[test]
fn batched_state_updates_to_one_node_collapse() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let image = harness.render(Element::image(3));

    let state = image.state().unwrap();
    let initial = state.data::<ImageState>().unwrap().clone();
    state.update_state(initial.loaded(1.0, 1.0), EventPriority::AsynchronousBatched);
    state.update_state(initial.loaded(2.0, 2.0), EventPriority::AsynchronousBatched);
    assert_eq!(harness.delegate.mounted_revisions(SURFACE), [1]);

    harness.beats.tick();
    assert_eq!(harness.delegate.mounted_revisions(SURFACE), [1, 2]);
    let root = harness.scheduler.ui_manager().current_revision(SURFACE).unwrap().root;
    let data = root.children()[0].state().unwrap().data::<ImageState>().cloned();
    assert_eq!(data, Some(initial.loaded(2.0, 2.0)));
}

#[test]
fn created_nodes_are_offered_for_preallocation() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    harness.render(
        Element::view(2)
            .collapsable(false)
            .children([Element::view(3), Element::image(4)]),
    );

    // The plain view is flattened away, so nothing is built for it.
    assert_eq!(
        harness.delegate.preallocated_views(),
        [(SURFACE, 2), (SURFACE, 4)]
    );
    assert_eq!(harness.delegate.finished_transactions(), [SURFACE]);
}

#[test]
fn stopping_a_surface_mounts_the_teardown() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    harness.render(
        Element::view(2)
            .collapsable(false)
            .child(Element::view(3).collapsable(false)),
    );
    assert_eq!(harness.delegate.views(SURFACE).unwrap().len(), 3);

    harness.scheduler.stop_surface(SURFACE).unwrap();
    assert_eq!(harness.delegate.mounted_revisions(SURFACE), [1, 2]);
    let views = harness.delegate.views(SURFACE).unwrap();
    assert_eq!(views.len(), 1);
    assert!(views.children_of(SURFACE).is_empty());
    assert!(harness.scheduler.running_surfaces().is_empty());
    assert!(harness.scheduler.mounting_coordinator(SURFACE).is_none());
}

#[test]
fn events_after_stop_reach_the_runtime_but_state_does_not_commit() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    let image = harness.render(Element::image(3).instance_handle(8));
    harness.scheduler.stop_surface(SURFACE).unwrap();

    image.family().event_emitter().unwrap().dispatch_event(
        "load",
        RawValue::object(),
        EventPriority::SynchronousUnbatched,
    );
    assert_eq!(harness.executor.calls().len(), 1);

    let state = image.state().unwrap();
    let loaded = state.data::<ImageState>().unwrap().loaded(1.0, 1.0);
    state.update_state(loaded, EventPriority::SynchronousUnbatched);
    assert_eq!(harness.delegate.mounted_revisions(SURFACE), [1, 2]);
}

#[test]
fn runtime_errors_go_to_the_runtime_first() {
    let harness = harness_with(
        RecordingScriptRuntime::new().failing_with("boom"),
        RendererConfig::default(),
    );
    harness.scheduler.start_surface(SURFACE).unwrap();
    let button = harness.render(Element::view(2).instance_handle(1));
    button.family().event_emitter().unwrap().dispatch_event(
        "press",
        RawValue::Null,
        EventPriority::SynchronousUnbatched,
    );

    assert_eq!(harness.executor.reported_errors(), [RuntimeError::new("boom")]);
}

#[test]
fn unreportable_runtime_errors_reach_the_fatal_handler() {
    let fatal = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fatal);
    let config = RendererConfig::default().with_fatal_error_handler(Arc::new(
        move |error: &RuntimeError| sink.lock().unwrap().push(error.message.clone()),
    ));
    let harness = harness_with(
        RecordingScriptRuntime::new()
            .failing_with("boom")
            .rejecting_reports(),
        config,
    );
    harness.scheduler.start_surface(SURFACE).unwrap();
    let button = harness.render(Element::view(2).instance_handle(1));
    button.family().event_emitter().unwrap().dispatch_event(
        "press",
        RawValue::Null,
        EventPriority::SynchronousUnbatched,
    );

    assert!(harness.executor.reported_errors().is_empty());
    assert_eq!(*fatal.lock().unwrap(), ["boom"]);
}

#[test]
fn dropping_the_scheduler_stops_running_surfaces() {
    let harness = harness();
    harness.scheduler.start_surface(SURFACE).unwrap();
    harness.render(Element::view(2));
    let ui_manager = Arc::clone(harness.scheduler.ui_manager());
    let Harness {
        scheduler, delegate, ..
    } = harness;

    drop(scheduler);
    assert_eq!(ui_manager.surface_lifecycle(SURFACE), SurfaceLifecycle::Stopped);
    assert_eq!(delegate.mounted_revisions(SURFACE), [1]);
}
