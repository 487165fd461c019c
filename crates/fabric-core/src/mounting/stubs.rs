//! In-memory model of a platform view hierarchy.
//!
//! [`StubViewTree`] applies mutations with the same preconditions a real
//! platform would enforce and reports the first violation. It backs
//! shadow tree introspection and the mounting tests.

use std::fmt;
use std::sync::Arc;

use super::differentiator::view_children;
use super::shadow_view::{ShadowView, ShadowViewMutation};
use crate::error::MountingError;
use crate::hash::HashMap;
use crate::props::SharedProps;
use crate::shadow_node::ShadowNode;
use crate::state::SharedState;
use crate::{ComponentName, SurfaceId, Tag};

#[derive(Clone)]
pub struct StubView {
    pub tag: Tag,
    pub surface_id: SurfaceId,
    pub component_name: ComponentName,
    pub props: SharedProps,
    pub state: Option<SharedState>,
    pub parent_tag: Option<Tag>,
    pub children: Vec<Tag>,
}

impl StubView {
    fn from_view(view: &ShadowView) -> Self {
        Self {
            tag: view.tag,
            surface_id: view.surface_id,
            component_name: view.component_name,
            props: Arc::clone(&view.props),
            state: view.state.clone(),
            parent_tag: None,
            children: Vec::new(),
        }
    }
}

impl PartialEq for StubView {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.surface_id == other.surface_id
            && self.component_name == other.component_name
            && Arc::ptr_eq(&self.props, &other.props)
            && match (&self.state, &other.state) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && self.parent_tag == other.parent_tag
            && self.children == other.children
    }
}

impl fmt::Debug for StubView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubView")
            .field("tag", &self.tag)
            .field("component_name", &self.component_name)
            .field("parent_tag", &self.parent_tag)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct StubViewTree {
    root_tag: Option<Tag>,
    views: HashMap<Tag, StubView>,
}

impl StubViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_tag(&self) -> Option<Tag> {
        self.root_tag
    }

    pub fn get(&self, tag: Tag) -> Option<&StubView> {
        self.views.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn children_of(&self, tag: Tag) -> &[Tag] {
        self.views
            .get(&tag)
            .map(|view| view.children.as_slice())
            .unwrap_or(&[])
    }

    /// Applies `mutations` in order, stopping at the first one that is not
    /// valid for the current hierarchy.
    pub fn mutate(&mut self, mutations: &[ShadowViewMutation]) -> Result<(), MountingError> {
        for mutation in mutations {
            self.apply(mutation)?;
        }
        Ok(())
    }

    fn view_mut(&mut self, tag: Tag) -> Result<&mut StubView, MountingError> {
        self.views
            .get_mut(&tag)
            .ok_or(MountingError::MissingView { tag })
    }

    pub fn apply(&mut self, mutation: &ShadowViewMutation) -> Result<(), MountingError> {
        match mutation {
            ShadowViewMutation::Create { new } => {
                if self.views.contains_key(&new.tag) {
                    return Err(MountingError::DuplicateTag { tag: new.tag });
                }
                if self.root_tag.is_none() {
                    self.root_tag = Some(new.tag);
                }
                self.views.insert(new.tag, StubView::from_view(new));
            }
            ShadowViewMutation::Delete { old } => {
                let view = self.view_mut(old.tag)?;
                if let Some(parent) = view.parent_tag {
                    return Err(MountingError::StillAttached {
                        tag: old.tag,
                        parent,
                    });
                }
                if !view.children.is_empty() {
                    return Err(MountingError::HasChildren {
                        tag: old.tag,
                        count: view.children.len(),
                    });
                }
                self.views.remove(&old.tag);
                if self.root_tag == Some(old.tag) {
                    self.root_tag = None;
                }
            }
            ShadowViewMutation::Insert { parent, new, index } => {
                let len = self
                    .views
                    .get(&parent.tag)
                    .ok_or(MountingError::MissingView { tag: parent.tag })?
                    .children
                    .len();
                if *index > len {
                    return Err(MountingError::IndexOutOfBounds {
                        parent: parent.tag,
                        index: *index,
                        len,
                    });
                }
                let child = self.view_mut(new.tag)?;
                if let Some(current) = child.parent_tag {
                    return Err(MountingError::StillAttached {
                        tag: new.tag,
                        parent: current,
                    });
                }
                child.parent_tag = Some(parent.tag);
                self.view_mut(parent.tag)?.children.insert(*index, new.tag);
            }
            ShadowViewMutation::Remove { parent, old, index } => {
                let parent_view = self.view_mut(parent.tag)?;
                let found = parent_view.children.get(*index).copied();
                if found != Some(old.tag) {
                    return Err(MountingError::ChildMismatch {
                        parent: parent.tag,
                        index: *index,
                        expected: old.tag,
                        found,
                    });
                }
                parent_view.children.remove(*index);
                self.detach(old.tag);
            }
            ShadowViewMutation::Update { new, .. } => {
                let view = self.view_mut(new.tag)?;
                view.props = Arc::clone(&new.props);
                view.state = new.state.clone();
            }
        }
        Ok(())
    }

    fn detach(&mut self, tag: Tag) {
        if let Some(view) = self.views.get_mut(&tag) {
            view.parent_tag = None;
        }
    }

    pub fn dump(&self) -> String {
        let mut output = String::new();
        if let Some(root) = self.root_tag {
            self.dump_view(root, 0, &mut output);
        }
        output
    }

    fn dump_view(&self, tag: Tag, depth: usize, output: &mut String) {
        let Some(view) = self.views.get(&tag) else {
            return;
        };
        output.push_str(&format!(
            "{}[{}] {}\n",
            "  ".repeat(depth),
            tag,
            view.component_name
        ));
        for child in &view.children {
            self.dump_view(*child, depth + 1, output);
        }
    }
}

impl fmt::Debug for StubViewTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubViewTree")
            .field("root_tag", &self.root_tag)
            .field("views", &self.views.len())
            .finish()
    }
}

/// Builds the hierarchy `root` describes directly from the node tree,
/// without going through the differ. Flattening and stacking order are the
/// ones the differ applies.
pub fn build_stub_view_tree(root: &ShadowNode) -> StubViewTree {
    let mut tree = StubViewTree::new();
    tree.root_tag = Some(root.tag());
    add_subtree(&mut tree, root, None);
    tree
}

fn add_subtree(tree: &mut StubViewTree, node: &ShadowNode, parent_tag: Option<Tag>) {
    let children = view_children(node);
    let mut view = StubView::from_view(&ShadowView::new(node));
    view.parent_tag = parent_tag;
    view.children = children.iter().map(|child| child.tag()).collect();
    tree.views.insert(node.tag(), view);
    for child in children {
        add_subtree(tree, child, Some(node.tag()));
    }
}
