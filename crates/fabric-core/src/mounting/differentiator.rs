//! Tree differ.
//!
//! The differ works on the view hierarchy, not on the node tree: nodes that
//! do not form a view are flattened away, and the descendants of nodes that
//! do not form a stacking context are hoisted into the nearest ancestor that
//! does. Within one stacking context views are ordered by
//! [`Props::order_index`] (stable, so equal indices keep tree order).
//!
//! Children are matched by tag within one parent. The longest common prefix
//! of siblings stays in place; everything after it is removed and the new
//! tail is inserted, so reordered children cost a remove and an insert but
//! keep their view. Subtrees whose children vector is shared between the
//! two trees are skipped without being walked.

use std::sync::Arc;

use super::shadow_view::{ShadowView, ShadowViewMutation};
use crate::hash::HashMap;
use crate::props::Props;
use crate::shadow_node::ShadowNode;
use crate::Tag;

fn forms_stacking_context(node: &ShadowNode) -> bool {
    node.props().forms_stacking_context()
}

fn forms_view(node: &ShadowNode) -> bool {
    let props = node.props();
    props.forms_view() || props.forms_stacking_context()
}

/// Views mounted directly inside `node`'s view, in mounting order. Empty
/// for nodes that do not form a stacking context.
pub(crate) fn view_children(node: &ShadowNode) -> Vec<&ShadowNode> {
    let mut children = Vec::new();
    if forms_stacking_context(node) {
        collect_view_children(node, &mut children);
        children.sort_by_key(|child| child.props().order_index());
    }
    children
}

fn collect_view_children<'a>(node: &'a ShadowNode, children: &mut Vec<&'a ShadowNode>) {
    for child in node.children() {
        let child = child.as_ref();
        if forms_view(child) {
            children.push(child);
        }
        if !forms_stacking_context(child) {
            collect_view_children(child, children);
        }
    }
}

#[derive(Default)]
struct MutationBuckets {
    removes: Vec<ShadowViewMutation>,
    deletes: Vec<ShadowViewMutation>,
    creates: Vec<ShadowViewMutation>,
    inserts: Vec<ShadowViewMutation>,
    updates: Vec<ShadowViewMutation>,
}

impl MutationBuckets {
    fn into_mutations(self) -> Vec<ShadowViewMutation> {
        let mut mutations = Vec::with_capacity(
            self.removes.len()
                + self.deletes.len()
                + self.creates.len()
                + self.inserts.len()
                + self.updates.len(),
        );
        mutations.extend(self.removes);
        mutations.extend(self.deletes);
        mutations.extend(self.creates);
        mutations.extend(self.inserts);
        mutations.extend(self.updates);
        mutations
    }

    fn create_subtree(&mut self, node: &ShadowNode) {
        let parent = ShadowView::new(node);
        self.creates.push(ShadowViewMutation::Create {
            new: parent.clone(),
        });
        for (index, child) in view_children(node).into_iter().enumerate() {
            self.create_subtree(child);
            self.inserts.push(ShadowViewMutation::Insert {
                parent: parent.clone(),
                new: ShadowView::new(child),
                index,
            });
        }
    }

    /// Detaches and deletes every descendant, then deletes `node`. The
    /// caller removes `node` from its own parent.
    fn delete_subtree(&mut self, node: &ShadowNode) {
        let parent = ShadowView::new(node);
        for (index, child) in view_children(node).into_iter().enumerate().rev() {
            self.removes.push(ShadowViewMutation::Remove {
                parent: parent.clone(),
                old: ShadowView::new(child),
                index,
            });
            self.delete_subtree(child);
        }
        self.deletes.push(ShadowViewMutation::Delete { old: parent });
    }

    fn diff_pair(&mut self, old: &ShadowNode, new: &ShadowNode) {
        if std::ptr::eq(old, new) {
            return;
        }
        let old_view = ShadowView::new(old);
        let new_view = ShadowView::new(new);
        if old_view != new_view {
            self.updates.push(ShadowViewMutation::Update {
                old: old_view,
                new: new_view,
            });
        }
        self.diff_children(old, new);
    }

    fn diff_children(&mut self, old: &ShadowNode, new: &ShadowNode) {
        if Arc::ptr_eq(old.shared_children(), new.shared_children())
            && forms_stacking_context(old) == forms_stacking_context(new)
        {
            return;
        }
        let old_children = view_children(old);
        let new_children = view_children(new);

        let mut prefix = 0;
        while prefix < old_children.len()
            && prefix < new_children.len()
            && old_children[prefix].tag() == new_children[prefix].tag()
        {
            self.diff_pair(old_children[prefix], new_children[prefix]);
            prefix += 1;
        }
        if prefix == old_children.len() && prefix == new_children.len() {
            return;
        }

        let old_tail: HashMap<Tag, &ShadowNode> = old_children[prefix..]
            .iter()
            .map(|child| (child.tag(), *child))
            .collect();
        let new_tail: HashMap<Tag, &ShadowNode> = new_children[prefix..]
            .iter()
            .map(|child| (child.tag(), *child))
            .collect();

        let old_parent = ShadowView::new(old);
        for index in (prefix..old_children.len()).rev() {
            let child = old_children[index];
            self.removes.push(ShadowViewMutation::Remove {
                parent: old_parent.clone(),
                old: ShadowView::new(child),
                index,
            });
            if !new_tail.contains_key(&child.tag()) {
                self.delete_subtree(child);
            }
        }

        let new_parent = ShadowView::new(new);
        for (index, child) in new_children.iter().copied().enumerate().skip(prefix) {
            match old_tail.get(&child.tag()) {
                Some(old_child) => self.diff_pair(old_child, child),
                None => self.create_subtree(child),
            }
            self.inserts.push(ShadowViewMutation::Insert {
                parent: new_parent.clone(),
                new: ShadowView::new(child),
                index,
            });
        }
    }
}

/// Computes the ordered mutations that turn the view hierarchy of `old_root`
/// into that of `new_root`.
///
/// Output order: removes (descending index per parent), deletes, creates,
/// inserts (ascending index per parent), updates. Without an old root the
/// whole new tree is created; the root itself is never inserted anywhere.
pub fn calculate_shadow_view_mutations(
    old_root: Option<&ShadowNode>,
    new_root: &ShadowNode,
) -> Vec<ShadowViewMutation> {
    let mut buckets = MutationBuckets::default();
    match old_root {
        None => buckets.create_subtree(new_root),
        Some(old_root) => buckets.diff_pair(old_root, new_root),
    }
    buckets.into_mutations()
}

#[cfg(test)]
#[path = "../tests/differentiator_tests.rs"]
mod tests;
