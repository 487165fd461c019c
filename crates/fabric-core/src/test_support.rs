use std::sync::{Arc, Weak};

use crate::family::{ShadowNodeFamily, ShadowNodeFamilyFragment};
use crate::hash::component_handle_for;
use crate::props::{RootProps, SharedProps};
use crate::shadow_node::{ShadowNode, SharedShadowNode};
use crate::{SurfaceId, Tag};

pub(crate) const TEST_SURFACE: SurfaceId = 1;

pub(crate) fn family(tag: Tag) -> Arc<ShadowNodeFamily> {
    family_named(tag, "TestView")
}

pub(crate) fn family_named(tag: Tag, name: &'static str) -> Arc<ShadowNodeFamily> {
    Arc::new(ShadowNodeFamily::new(
        ShadowNodeFamilyFragment {
            tag,
            surface_id: TEST_SURFACE,
            instance_handle: None,
        },
        component_handle_for(name),
        name,
        Weak::new(),
    ))
}

pub(crate) fn props() -> SharedProps {
    Arc::new(RootProps::default())
}

pub(crate) fn node(tag: Tag, children: Vec<SharedShadowNode>) -> ShadowNode {
    ShadowNode::new(family(tag), props(), Arc::new(children), None)
}

pub(crate) fn leaf(tag: Tag) -> SharedShadowNode {
    Arc::new(node(tag, Vec::new()))
}

pub(crate) fn sealed(node: ShadowNode) -> SharedShadowNode {
    let node = Arc::new(node);
    node.seal_recursive();
    node
}
