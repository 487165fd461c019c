//! Declarative node trees for tests.

use std::sync::{Arc, Weak};

use fabric_core::{
    ComponentDescriptorRegistry, InstanceHandle, RawProps, ShadowNode, ShadowNodeFamilyFragment,
    SharedShadowNode, SurfaceId, Tag, UiManager, UiManagerError,
};

use crate::components::{IMAGE_COMPONENT_NAME, VIEW_COMPONENT_NAME};

/// A node to be built, with its children.
#[derive(Debug, Clone)]
pub struct Element {
    tag: Tag,
    component_name: String,
    props: RawProps,
    instance_handle: Option<InstanceHandle>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(component_name: &str, tag: Tag) -> Self {
        Self {
            tag,
            component_name: component_name.to_owned(),
            props: RawProps::new(),
            instance_handle: None,
            children: Vec::new(),
        }
    }

    pub fn view(tag: Tag) -> Self {
        Self::new(VIEW_COMPONENT_NAME, tag)
    }

    pub fn image(tag: Tag) -> Self {
        Self::new(IMAGE_COMPONENT_NAME, tag)
    }

    /// Merges `props` over the props set so far.
    pub fn props(mut self, props: RawProps) -> Self {
        for (key, value) in props.iter() {
            self.props = self.props.with(key, value.clone());
        }
        self
    }

    /// Views are collapsable by default; a non-collapsable one is always
    /// mounted and hosts its children.
    pub fn collapsable(self, collapsable: bool) -> Self {
        self.props(RawProps::new().with("collapsable", collapsable))
    }

    pub fn instance_handle(mut self, instance_handle: InstanceHandle) -> Self {
        self.instance_handle = Some(instance_handle);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Builds the tree through `ui_manager`, as a render pass would.
    pub fn build(
        &self,
        ui_manager: &UiManager,
        surface_id: SurfaceId,
    ) -> Result<SharedShadowNode, UiManagerError> {
        let mut node = ui_manager.create_node(
            self.tag,
            &self.component_name,
            surface_id,
            &self.props,
            self.instance_handle,
        )?;
        for child in &self.children {
            let child = child.build(ui_manager, surface_id)?;
            ui_manager.append_child(&mut node, child)?;
        }
        Ok(Arc::new(node))
    }

    /// Builds the tree straight from component descriptors. The nodes have
    /// no event dispatcher.
    pub fn build_detached(
        &self,
        registry: &ComponentDescriptorRegistry,
        surface_id: SurfaceId,
    ) -> Result<ShadowNode, UiManagerError> {
        let descriptor = registry.at(&self.component_name)?;
        let family = descriptor.create_family(
            ShadowNodeFamilyFragment {
                tag: self.tag,
                surface_id,
                instance_handle: self.instance_handle,
            },
            Weak::new(),
        );
        let props = descriptor.clone_props(None, &self.props);
        let state = descriptor.create_initial_state(&props, &family);
        let mut node = descriptor.create_shadow_node(family, props, state);
        for child in &self.children {
            let child = child.build_detached(registry, surface_id)?;
            descriptor.append_child(&mut node, Arc::new(child));
        }
        Ok(node)
    }
}
