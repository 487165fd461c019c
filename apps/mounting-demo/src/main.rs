use std::any::Any;
use std::sync::{mpsc, Arc, Mutex, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use fabric_core::event::{asynchronous_beat_factory, synchronous_beat_factory};
use fabric_core::{
    BaseProps, ComponentDescriptorRegistry, ConcreteComponentDescriptor, ConcreteProps,
    EventPriority, MountingCoordinator, MountingPolicy, Props, RawProps, RawValue,
    RendererConfig, RuntimeError, RuntimeExecutor, Scheduler, SchedulerDelegate,
    SchedulerToolbox, ScriptRuntime, ShadowView, SharedShadowNode, StubViewTree, SurfaceId,
    Tag, UiManager,
};
use fabric_runtime_std::{FrameTicker, ThreadRuntimeExecutor};

const SURFACE: SurfaceId = 1;
const LIST_TAG: Tag = 10;
const ROW_TAG_OFFSET: Tag = 100;

#[derive(Debug, Clone, Default)]
struct LabelProps {
    base: BaseProps,
    text: String,
}

impl Props for LabelProps {
    fn base(&self) -> &BaseProps {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ConcreteProps for LabelProps {
    fn from_raw(source: &Self, raw: &RawProps) -> Self {
        Self {
            base: BaseProps::from_raw(&source.base, raw),
            text: raw.string_or("text", &source.text),
        }
    }
}

/// Layout-only container: flattened unless its base props ask for a view.
#[derive(Debug, Clone, Default)]
struct ContainerProps {
    base: BaseProps,
}

impl Props for ContainerProps {
    fn base(&self) -> &BaseProps {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn forms_view(&self) -> bool {
        self.base.forms_view()
    }

    fn forms_stacking_context(&self) -> bool {
        self.base.forms_stacking_context()
    }
}

impl ConcreteProps for ContainerProps {
    fn from_raw(source: &Self, raw: &RawProps) -> Self {
        Self {
            base: BaseProps::from_raw(&source.base, raw),
        }
    }
}

/// Stands in for a script engine: logs every call.
struct ConsoleRuntime;

impl ScriptRuntime for ConsoleRuntime {
    fn call_function(&mut self, name: &str, args: &[RawValue]) -> Result<RawValue, RuntimeError> {
        log::info!("script: {name}({args:?})");
        Ok(RawValue::Null)
    }
}

/// Hands coordinators with ready transactions to the UI thread.
struct ChannelDelegate {
    sender: Mutex<mpsc::Sender<Arc<MountingCoordinator>>>,
}

impl SchedulerDelegate for ChannelDelegate {
    fn scheduler_did_finish_transaction(&self, coordinator: &Arc<MountingCoordinator>) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.send(Arc::clone(coordinator)).is_err() {
            log::warn!("ui thread is gone");
        }
    }

    fn scheduler_did_request_preliminary_view_allocation(
        &self,
        surface_id: SurfaceId,
        view: &ShadowView,
    ) {
        log::trace!("surface {surface_id}: preallocate [{}] {}", view.tag, view.component_name);
    }
}

fn mount_loop(receiver: mpsc::Receiver<Arc<MountingCoordinator>>) -> anyhow::Result<StubViewTree> {
    let mut views = StubViewTree::new();
    for coordinator in receiver {
        while let Some(mut transaction) = coordinator.pull_transaction() {
            transaction.telemetry_mut().will_mount();
            let mutations = transaction.take_mutations();
            for mutation in &mutations {
                log::debug!("  {mutation}");
            }
            views
                .mutate(&mutations)
                .with_context(|| format!("mounting transaction {}", transaction.number()))?;
            transaction.telemetry_mut().did_mount();
            log::info!(
                "ui: mounted revision {} ({} mutations, diff {:?})",
                transaction.number(),
                mutations.len(),
                transaction.telemetry().diff_duration().unwrap_or_default()
            );
        }
    }
    Ok(views)
}

/// Renders the list. Every label sits in its own row container; the rows
/// are flattened, so the labels mount straight into the list.
fn render(
    ui_manager: &UiManager,
    items: &[(Tag, &str)],
) -> anyhow::Result<Vec<SharedShadowNode>> {
    let list_props = RawProps::new().with("nativeID", "fruit-list");
    let mut list = ui_manager.create_node(LIST_TAG, "View", SURFACE, &list_props, None)?;
    let mut labels = Vec::with_capacity(items.len());
    for &(tag, text) in items {
        let label = Arc::new(ui_manager.create_node(
            tag,
            "Label",
            SURFACE,
            &RawProps::new().with("text", text),
            Some(tag as u64),
        )?);
        let row_tag = tag + ROW_TAG_OFFSET;
        let mut row = ui_manager.create_node(row_tag, "View", SURFACE, &RawProps::new(), None)?;
        ui_manager.append_child(&mut row, Arc::clone(&label))?;
        ui_manager.append_child(&mut list, Arc::new(row))?;
        labels.push(label);
    }
    ui_manager.complete_surface(SURFACE, Arc::new(vec![Arc::new(list)]))?;
    Ok(labels)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let policy = if std::env::args().any(|arg| arg == "--queue") {
        MountingPolicy::Queue
    } else {
        MountingPolicy::Coalesce
    };
    println!("=== Fabric-RS mounting demo ({policy:?}) ===");

    let registry = ComponentDescriptorRegistry::new();
    registry.add(Arc::new(ConcreteComponentDescriptor::<ContainerProps>::new("View")));
    registry.add(Arc::new(ConcreteComponentDescriptor::<LabelProps>::new("Label")));

    let executor = ThreadRuntimeExecutor::spawn("script", || ConsoleRuntime)
        .context("spawning the script thread")?;
    let shared: Arc<dyn RuntimeExecutor> = executor.clone();
    let ticker = FrameTicker::sixty_hertz();
    let toolbox = SchedulerToolbox::new(Arc::clone(&shared), Arc::new(registry))
        .with_config(
            RendererConfig::default()
                .with_mounting_policy(policy)
                .with_shadow_tree_introspection(true),
        )
        .with_beat_factories(
            ticker.wrap(synchronous_beat_factory(Arc::clone(&shared))),
            ticker.wrap(asynchronous_beat_factory(shared)),
        );
    ticker.start().context("starting the frame ticker")?;

    let (sender, receiver) = mpsc::channel();
    let delegate = Arc::new(ChannelDelegate {
        sender: Mutex::new(sender),
    });
    let weak = Arc::downgrade(&delegate) as Weak<dyn SchedulerDelegate>;
    let scheduler = Scheduler::new(toolbox, weak);
    let ui_thread = thread::Builder::new()
        .name("ui".to_owned())
        .spawn(move || mount_loop(receiver))
        .context("spawning the ui thread")?;

    scheduler.start_surface(SURFACE)?;
    let ui_manager = scheduler.ui_manager();
    let labels = render(ui_manager, &[(21, "apples"), (22, "pears")])?;
    labels[0]
        .family()
        .event_emitter()
        .ok_or_else(|| anyhow!("labels carry an instance handle"))?
        .dispatch_event("press", RawValue::object(), EventPriority::AsynchronousBatched);

    render(ui_manager, &[(21, "apples"), (22, "pears"), (23, "plums")])?;
    render(ui_manager, &[(23, "plums"), (21, "apples"), (22, "ripe pears")])?;
    render(ui_manager, &[(23, "plums"), (22, "ripe pears")])?;
    thread::sleep(Duration::from_millis(50));

    scheduler.stop_surface(SURFACE)?;
    ticker.stop();
    drop(scheduler);
    drop(delegate);

    let views = ui_thread
        .join()
        .map_err(|_| anyhow!("ui thread panicked"))??;
    println!("views left after teardown:\n{}", views.dump());
    executor.shutdown();
    Ok(())
}
