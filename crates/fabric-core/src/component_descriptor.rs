//! Per-component factories for props, state and nodes.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::error::UiManagerError;
use crate::event::EventDispatcher;
use crate::family::{ShadowNodeFamily, ShadowNodeFamilyFragment};
use crate::hash::{component_handle_for, HashMap};
use crate::props::{props_as, ConcreteProps, RawProps, RootProps, SharedProps};
use crate::shadow_node::{empty_children, ShadowNode, ShadowNodeFragment, SharedShadowNode};
use crate::state::{SharedState, State};
use crate::{ComponentHandle, ComponentName};

pub const ROOT_COMPONENT_NAME: ComponentName = "RootView";

pub trait ComponentDescriptor: Send + Sync {
    fn component_handle(&self) -> ComponentHandle;

    fn component_name(&self) -> ComponentName;

    fn create_family(
        &self,
        fragment: ShadowNodeFamilyFragment,
        event_dispatcher: Weak<EventDispatcher>,
    ) -> Arc<ShadowNodeFamily> {
        Arc::new(ShadowNodeFamily::new(
            fragment,
            self.component_handle(),
            self.component_name(),
            event_dispatcher,
        ))
    }

    fn create_shadow_node(
        &self,
        family: Arc<ShadowNodeFamily>,
        props: SharedProps,
        state: Option<SharedState>,
    ) -> ShadowNode {
        ShadowNode::new(family, props, empty_children(), state)
    }

    fn clone_shadow_node(&self, source: &ShadowNode, fragment: ShadowNodeFragment) -> ShadowNode {
        source.clone_with(fragment)
    }

    fn append_child(&self, parent: &mut ShadowNode, child: SharedShadowNode) {
        parent.append_child(child);
    }

    /// Derives props from `previous` and a raw delta. An empty delta on
    /// existing props returns the same instance.
    fn clone_props(&self, previous: Option<&SharedProps>, raw: &RawProps) -> SharedProps;

    fn create_initial_state(
        &self,
        _props: &SharedProps,
        _family: &Arc<ShadowNodeFamily>,
    ) -> Option<SharedState> {
        None
    }
}

pub type InitialStateFactory = Arc<dyn Fn(&SharedProps, &ShadowNodeFamily) -> State + Send + Sync>;

/// Descriptor for components whose props are a single [`ConcreteProps`]
/// type.
pub struct ConcreteComponentDescriptor<P> {
    name: ComponentName,
    handle: ComponentHandle,
    initial_state: Option<InitialStateFactory>,
    _props: PhantomData<fn() -> P>,
}

impl<P: ConcreteProps> ConcreteComponentDescriptor<P> {
    pub fn new(name: ComponentName) -> Self {
        Self {
            name,
            handle: component_handle_for(name),
            initial_state: None,
            _props: PhantomData,
        }
    }

    pub fn with_initial_state(
        mut self,
        factory: impl Fn(&SharedProps, &ShadowNodeFamily) -> State + Send + Sync + 'static,
    ) -> Self {
        self.initial_state = Some(Arc::new(factory));
        self
    }
}

impl<P: ConcreteProps> ComponentDescriptor for ConcreteComponentDescriptor<P> {
    fn component_handle(&self) -> ComponentHandle {
        self.handle
    }

    fn component_name(&self) -> ComponentName {
        self.name
    }

    fn clone_props(&self, previous: Option<&SharedProps>, raw: &RawProps) -> SharedProps {
        let Some(previous) = previous else {
            return Arc::new(P::from_raw(&P::default(), raw));
        };
        if raw.is_empty() {
            return Arc::clone(previous);
        }
        match props_as::<P>(previous) {
            Some(source) => Arc::new(P::from_raw(source, raw)),
            None => {
                log::warn!(
                    "`{}` received props of another component; starting from defaults",
                    self.name
                );
                Arc::new(P::from_raw(&P::default(), raw))
            }
        }
    }

    fn create_initial_state(
        &self,
        props: &SharedProps,
        family: &Arc<ShadowNodeFamily>,
    ) -> Option<SharedState> {
        self.initial_state
            .as_ref()
            .map(|factory| Arc::new(factory(props, family)))
    }
}

impl<P> fmt::Debug for ConcreteComponentDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcreteComponentDescriptor")
            .field("name", &self.name)
            .field("has_initial_state", &self.initial_state.is_some())
            .finish()
    }
}

pub fn root_component_descriptor() -> Arc<dyn ComponentDescriptor> {
    Arc::new(ConcreteComponentDescriptor::<RootProps>::new(ROOT_COMPONENT_NAME))
}

/// Maps component names to descriptors. Always knows `RootView`.
pub struct ComponentDescriptorRegistry {
    descriptors: RwLock<HashMap<ComponentHandle, Arc<dyn ComponentDescriptor>>>,
    fallback: RwLock<Option<Arc<dyn ComponentDescriptor>>>,
}

impl Default for ComponentDescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentDescriptorRegistry {
    pub fn new() -> Self {
        let registry = Self {
            descriptors: RwLock::new(HashMap::new()),
            fallback: RwLock::new(None),
        };
        registry.add(root_component_descriptor());
        registry
    }

    pub fn add(&self, descriptor: Arc<dyn ComponentDescriptor>) {
        self.descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor.component_handle(), descriptor);
    }

    /// Used for names nothing was registered for.
    pub fn set_fallback(&self, descriptor: Arc<dyn ComponentDescriptor>) {
        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = Some(descriptor);
    }

    pub fn has(&self, name: &str) -> bool {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&component_handle_for(name))
    }

    pub fn at_handle(&self, handle: ComponentHandle) -> Option<Arc<dyn ComponentDescriptor>> {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }

    pub fn at(&self, name: &str) -> Result<Arc<dyn ComponentDescriptor>, UiManagerError> {
        if let Some(descriptor) = self.at_handle(component_handle_for(name)) {
            return Ok(descriptor);
        }
        if let Some(fallback) = self
            .fallback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            log::debug!("no descriptor for `{name}`, using `{}`", fallback.component_name());
            return Ok(fallback);
        }
        Err(UiManagerError::UnknownComponent {
            name: name.to_owned(),
        })
    }

    pub fn len(&self) -> usize {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ComponentDescriptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptorRegistry")
            .field("descriptors", &self.len())
            .finish_non_exhaustive()
    }
}
