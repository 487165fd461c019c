//! Immutable, structurally shared tree nodes.
//!
//! A node is built as an owned value, mutated while unsealed, then shared as
//! a [`SharedShadowNode`]. Commits seal the whole new tree, after which the
//! same instances can be read from any thread without locks. Cloning
//! replaces only what the [`ShadowNodeFragment`] names; everything else,
//! including the children vector, is shared with the source.

use std::fmt;
use std::sync::Arc;

use crate::family::ShadowNodeFamily;
use crate::props::SharedProps;
use crate::sealable::Sealable;
use crate::state::SharedState;
use crate::{ComponentHandle, ComponentName, SurfaceId, Tag};

pub type SharedShadowNode = Arc<ShadowNode>;
pub type SharedChildren = Arc<Vec<SharedShadowNode>>;

/// Overrides applied when creating or cloning a node.
#[derive(Clone, Default)]
pub struct ShadowNodeFragment {
    pub props: Option<SharedProps>,
    pub children: Option<SharedChildren>,
    pub state: Option<SharedState>,
}

impl ShadowNodeFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_props(mut self, props: SharedProps) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_children(mut self, children: SharedChildren) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = Some(state);
        self
    }
}

pub struct ShadowNode {
    sealable: Sealable,
    family: Arc<ShadowNodeFamily>,
    props: SharedProps,
    children: SharedChildren,
    state: Option<SharedState>,
}

pub fn empty_children() -> SharedChildren {
    Arc::new(Vec::new())
}

impl ShadowNode {
    pub fn new(
        family: Arc<ShadowNodeFamily>,
        props: SharedProps,
        children: SharedChildren,
        state: Option<SharedState>,
    ) -> Self {
        Self {
            sealable: Sealable::new(),
            family,
            props,
            children,
            state,
        }
    }

    /// Copy-on-write clone. The result is unsealed.
    pub fn clone_with(&self, fragment: ShadowNodeFragment) -> ShadowNode {
        Self {
            sealable: Sealable::new(),
            family: Arc::clone(&self.family),
            props: fragment.props.unwrap_or_else(|| Arc::clone(&self.props)),
            children: fragment
                .children
                .unwrap_or_else(|| Arc::clone(&self.children)),
            state: fragment.state.or_else(|| self.state.clone()),
        }
    }

    pub fn seal(&self) {
        self.sealable.seal();
    }

    /// Seals this node, its props, and every descendant. Stops descending at
    /// nodes that are already sealed since their subtrees were sealed with
    /// them.
    pub fn seal_recursive(&self) {
        if self.sealable.is_sealed() {
            return;
        }
        self.sealable.seal();
        self.props.seal();
        for child in self.children.iter() {
            child.seal_recursive();
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealable.is_sealed()
    }

    pub fn append_child(&mut self, child: SharedShadowNode) {
        self.sealable.ensure_unsealed();
        Arc::make_mut(&mut self.children).push(child);
    }

    /// Replaces `old` (matched by identity) with `new`. Returns whether
    /// `old` was found among the direct children.
    pub fn replace_child(&mut self, old: &ShadowNode, new: SharedShadowNode) -> bool {
        self.sealable.ensure_unsealed();
        let Some(index) = self
            .children
            .iter()
            .position(|child| std::ptr::eq(child.as_ref(), old))
        else {
            return false;
        };
        Arc::make_mut(&mut self.children)[index] = new;
        true
    }

    pub fn set_state(&mut self, state: SharedState) {
        self.sealable.ensure_unsealed();
        self.state = Some(state);
    }

    pub fn family(&self) -> &Arc<ShadowNodeFamily> {
        &self.family
    }

    pub fn tag(&self) -> Tag {
        self.family.tag()
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.family.surface_id()
    }

    pub fn component_handle(&self) -> ComponentHandle {
        self.family.component_handle()
    }

    pub fn component_name(&self) -> ComponentName {
        self.family.component_name()
    }

    pub fn props(&self) -> &SharedProps {
        &self.props
    }

    pub fn state(&self) -> Option<&SharedState> {
        self.state.as_ref()
    }

    pub fn children(&self) -> &[SharedShadowNode] {
        &self.children
    }

    pub fn shared_children(&self) -> &SharedChildren {
        &self.children
    }

    pub fn same_family(a: &ShadowNode, b: &ShadowNode) -> bool {
        Arc::ptr_eq(&a.family, &b.family)
    }

    fn is_of_family(&self, family: &ShadowNodeFamily) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.family), family)
    }

    fn path_to<'a>(
        &'a self,
        family: &ShadowNodeFamily,
        path: &mut Vec<(&'a ShadowNode, usize)>,
    ) -> bool {
        for (index, child) in self.children.iter().enumerate() {
            path.push((self, index));
            if child.is_of_family(family) || child.path_to(family, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Finds the node of `family` in this subtree.
    pub fn find(&self, family: &ShadowNodeFamily) -> Option<&ShadowNode> {
        if self.is_of_family(family) {
            return Some(self);
        }
        let mut path = Vec::new();
        if !self.path_to(family, &mut path) {
            return None;
        }
        let (parent, index) = *path.last()?;
        Some(parent.children[index].as_ref())
    }

    /// Replaces the node of `family` with `callback(node)` and clones every
    /// ancestor up to (and including) `self`. Subtrees off that path are
    /// shared with the original. Returns `None` if the family is not part of
    /// this tree.
    pub fn clone_tree(
        &self,
        family: &ShadowNodeFamily,
        callback: impl FnOnce(&ShadowNode) -> ShadowNode,
    ) -> Option<ShadowNode> {
        if self.is_of_family(family) {
            return Some(callback(self));
        }
        let mut path = Vec::new();
        if !self.path_to(family, &mut path) {
            return None;
        }
        let (parent, index) = *path.last()?;
        let mut replacement = callback(parent.children[index].as_ref());
        for &(ancestor, index) in path.iter().rev() {
            let mut children = ancestor.children.as_ref().clone();
            children[index] = Arc::new(replacement);
            replacement =
                ancestor.clone_with(ShadowNodeFragment::new().with_children(Arc::new(children)));
        }
        Some(replacement)
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk(&self, visitor: &mut impl FnMut(&ShadowNode)) {
        visitor(self);
        for child in self.children.iter() {
            child.walk(visitor);
        }
    }

    pub fn dump_tree(&self) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, 0);
        output
    }

    fn dump_node(&self, output: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        output.push_str(&format!(
            "{}[{}] {}{}\n",
            indent,
            self.tag(),
            self.component_name(),
            if self.is_sealed() { "" } else { " (unsealed)" }
        ));
        for child in self.children.iter() {
            child.dump_node(output, depth + 1);
        }
    }
}

impl fmt::Debug for ShadowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowNode")
            .field("tag", &self.tag())
            .field("component_name", &self.component_name())
            .field("sealed", &self.is_sealed())
            .field("props", &self.props)
            .field("state", &self.state)
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/shadow_node_tests.rs"]
mod tests;
