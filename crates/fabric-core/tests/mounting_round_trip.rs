//! Replaying every transaction a coordinator hands out must rebuild exactly
//! the hierarchy of the last committed tree.

use std::sync::Arc;

use fabric_core::{
    build_stub_view_tree, CommitOptions, ComponentDescriptorRegistry, MountingPolicy, RawProps,
    RendererConfig, ShadowNode, ShadowNodeFragment, ShadowTree, SharedShadowNode, StubViewTree,
    Tag,
};
use fabric_testing::{component_registry, init_logging, Element};

const SURFACE: i32 = 1;

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

struct Mutator {
    rng: Lcg,
    next_tag: Tag,
    descriptors: Arc<ComponentDescriptorRegistry>,
}

impl Mutator {
    fn new(seed: u64) -> Self {
        Self {
            rng: Lcg(seed),
            next_tag: 100,
            descriptors: component_registry(),
        }
    }

    fn fresh_subtree(&mut self) -> SharedShadowNode {
        let tag = self.next_tag;
        self.next_tag += 3;
        let element = Element::view(tag)
            .props(RawProps::new().with("testID", format!("row-{tag}")))
            .children([Element::view(tag + 1), Element::image(tag + 2)]);
        Arc::new(element.build_detached(&self.descriptors, SURFACE).unwrap())
    }

    fn with_opacity(&mut self, node: &ShadowNode) -> ShadowNode {
        let descriptor = self.descriptors.at(node.component_name()).unwrap();
        let opacity = self.rng.below(100) as f64 / 100.0;
        let props = descriptor.clone_props(
            Some(node.props()),
            &RawProps::new().with("opacity", opacity),
        );
        node.clone_with(ShadowNodeFragment::new().with_props(props))
    }

    /// Children of the next root, derived from the current one.
    fn next_children(&mut self, root: &ShadowNode) -> Vec<SharedShadowNode> {
        let mut children = root.children().to_vec();
        if children.is_empty() {
            children.push(self.fresh_subtree());
            return children;
        }
        let index = self.rng.below(children.len());
        match self.rng.below(5) {
            0 => {
                let at = self.rng.below(children.len() + 1);
                let subtree = self.fresh_subtree();
                children.insert(at, subtree);
            }
            1 => {
                children.remove(index);
            }
            2 => {
                let moved = children.remove(index);
                let at = self.rng.below(children.len() + 1);
                children.insert(at, moved);
            }
            3 => {
                let updated = self.with_opacity(&children[index]);
                children[index] = Arc::new(updated);
            }
            _ => {
                let row = Arc::clone(&children[index]);
                if let Some(leaf) = row.children().first().cloned() {
                    let replacement = self.with_opacity(&leaf);
                    let row = row
                        .clone_tree(leaf.family(), |_| replacement)
                        .unwrap();
                    children[index] = Arc::new(row);
                }
            }
        }
        children
    }
}

fn commit_children(tree: &ShadowTree, children: Vec<SharedShadowNode>) {
    let children = Arc::new(children);
    tree.commit(
        |root| {
            Some(root.clone_with(ShadowNodeFragment::new().with_children(Arc::clone(&children))))
        },
        CommitOptions::default(),
    );
}

fn replay(tree: &ShadowTree, views: &mut StubViewTree) -> usize {
    let mut mounted = 0;
    while let Some(mut transaction) = tree.mounting_coordinator().pull_transaction() {
        let mutations = transaction.take_mutations();
        if let Err(error) = views.mutate(&mutations) {
            panic!("transaction {} does not apply: {error}", transaction.number());
        }
        mounted += 1;
    }
    mounted
}

#[test]
fn queued_transactions_replay_every_revision() {
    init_logging();
    let config = RendererConfig::default().with_mounting_policy(MountingPolicy::Queue);
    let tree = ShadowTree::new(SURFACE, &config, None);
    let mut mutator = Mutator::new(7);
    let mut views = StubViewTree::new();

    for _ in 0..60 {
        let children = mutator.next_children(&tree.root());
        commit_children(&tree, children);
        assert_eq!(replay(&tree, &mut views), 1);
        assert_eq!(views, build_stub_view_tree(&tree.root()));
    }
}

#[test]
fn coalesced_transactions_skip_to_the_latest_revision() {
    init_logging();
    let tree = ShadowTree::new(SURFACE, &RendererConfig::default(), None);
    let mut mutator = Mutator::new(1234);
    let mut views = StubViewTree::new();

    for round in 0..12 {
        for _ in 0..=round % 4 {
            let children = mutator.next_children(&tree.root());
            commit_children(&tree, children);
        }
        assert_eq!(replay(&tree, &mut views), 1);
        assert_eq!(views, build_stub_view_tree(&tree.root()));
    }
}

#[test]
fn introspection_keeps_its_own_replica_in_sync() {
    init_logging();
    let config = RendererConfig::default()
        .with_mounting_policy(MountingPolicy::Queue)
        .with_shadow_tree_introspection(true);
    let tree = ShadowTree::new(SURFACE, &config, None);
    let mut mutator = Mutator::new(99);
    let mut views = StubViewTree::new();

    for _ in 0..20 {
        let children = mutator.next_children(&tree.root());
        commit_children(&tree, children);
    }
    assert_eq!(replay(&tree, &mut views), 20);
    assert_eq!(views, build_stub_view_tree(&tree.root()));

    tree.commit_empty_tree();
    replay(&tree, &mut views);
    assert_eq!(views.len(), 1);
    assert_eq!(views.root_tag(), Some(SURFACE));
}
