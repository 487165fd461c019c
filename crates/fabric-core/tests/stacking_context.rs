//! Flattening and z-ordering of the mounted hierarchy.
//!
//! Every check runs against three hierarchies that must agree: one created
//! from scratch by the differ, one built directly from the nodes, and one
//! kept up to date by replaying each transaction on top of the previous one.

use std::sync::Arc;

use fabric_core::{
    build_stub_view_tree, calculate_shadow_view_mutations, CommitOptions, ComponentDescriptor,
    ComponentDescriptorRegistry, RawProps, RawValue, RendererConfig, ShadowNodeFragment,
    ShadowTree, SharedShadowNode, StubViewTree, Tag,
};
use fabric_testing::{component_registry, init_logging, Element, VIEW_COMPONENT_NAME};

const SURFACE: i32 = 1;

const A: Tag = 2;
const AA: Tag = 3;
const B: Tag = 4;
const BA: Tag = 5;
const BB: Tag = 6;
const BBA: Tag = 7;
const BBB: Tag = 8;
const BC: Tag = 9;
const BD: Tag = 10;

struct Fixture {
    descriptors: Arc<ComponentDescriptorRegistry>,
    tree: ShadowTree,
    mounted: StubViewTree,
}

fn find(node: &SharedShadowNode, tag: Tag) -> Option<SharedShadowNode> {
    if node.tag() == tag {
        return Some(Arc::clone(node));
    }
    node.children().iter().find_map(|child| find(child, tag))
}

impl Fixture {
    /// Root
    /// ├── A
    /// │   └── AA
    /// └── B
    ///     ├── BA
    ///     ├── BB
    ///     │   ├── BBA
    ///     │   └── BBB
    ///     ├── BC
    ///     └── BD
    fn new() -> Self {
        init_logging();
        let descriptors = component_registry();
        let content = [
            Element::view(A).child(Element::view(AA)),
            Element::view(B).children([
                Element::view(BA),
                Element::view(BB).children([Element::view(BBA), Element::view(BBB)]),
                Element::view(BC),
                Element::view(BD),
            ]),
        ]
        .iter()
        .map(|element| Arc::new(element.build_detached(&descriptors, SURFACE).unwrap()))
        .collect::<Vec<_>>();

        let tree = ShadowTree::new(SURFACE, &RendererConfig::default(), None);
        let children = Arc::new(content);
        tree.commit(
            |root| {
                let fragment = ShadowNodeFragment::new().with_children(Arc::clone(&children));
                Some(root.clone_with(fragment))
            },
            CommitOptions::default(),
        );
        let mut fixture = Self {
            descriptors,
            tree,
            mounted: StubViewTree::new(),
        };
        fixture.mount();
        fixture
    }

    /// Replaces the props of view `tag` with fresh ones built from `raw`
    /// alone.
    fn set_view_props(&self, tag: Tag, raw: RawProps) {
        let descriptor = self.descriptors.at(VIEW_COMPONENT_NAME).unwrap();
        let props = descriptor.clone_props(None, &raw);
        let target = find(&self.tree.root(), tag).unwrap();
        self.tree.commit(
            |root| {
                root.clone_tree(target.family(), |old| {
                    old.clone_with(ShadowNodeFragment::new().with_props(Arc::clone(&props)))
                })
            },
            CommitOptions::default(),
        );
    }

    fn mount(&mut self) {
        let coordinator = self.tree.mounting_coordinator();
        while let Some(mut transaction) = coordinator.pull_transaction() {
            self.mounted.mutate(&transaction.take_mutations()).unwrap();
        }
    }

    fn check(&mut self, expect: impl Fn(&StubViewTree)) {
        let root = self.tree.root();

        let mut created = StubViewTree::new();
        created
            .mutate(&calculate_shadow_view_mutations(None, &root))
            .unwrap();
        expect(&created);

        let built = build_stub_view_tree(&root);
        expect(&built);

        self.mount();
        expect(&self.mounted);
        assert_eq!(self.mounted, built);
    }
}

fn mounted_under(views: &StubViewTree, tag: Tag) -> Vec<Tag> {
    views.children_of(tag).to_vec()
}

#[test]
fn default_props_flatten_everything() {
    let mut fixture = Fixture::new();
    fixture.check(|views| {
        assert_eq!(views.len(), 1);
        assert!(mounted_under(views, SURFACE).is_empty());
    });
}

#[test]
fn neutral_props_do_not_force_views_to_materialize() {
    let mut fixture = Fixture::new();
    fixture.set_view_props(AA, RawProps::new().with("backgroundColor", "transparent"));
    fixture.set_view_props(BA, RawProps::new().with("zIndex", RawValue::Null));
    fixture.set_view_props(BBA, RawProps::new().with("collapsable", true));
    fixture.set_view_props(BD, RawProps::new().with("opacity", 1.0).with("nativeID", ""));

    fixture.check(|views| {
        assert_eq!(views.len(), 1);
        assert!(mounted_under(views, SURFACE).is_empty());
    });
}

#[test]
fn visible_props_materialize_views_in_the_nearest_stacking_context() {
    let mut fixture = Fixture::new();
    fixture.set_view_props(AA, RawProps::new().with("backgroundColor", "black"));
    fixture.set_view_props(BA, RawProps::new().with("backgroundColor", "white"));
    fixture.set_view_props(BBA, RawProps::new().with("opacity", 0.5));

    fixture.check(|views| {
        assert_eq!(views.len(), 4);
        assert_eq!(mounted_under(views, SURFACE), [AA, BA, BBA]);
    });
}

#[test]
fn views_without_a_stacking_context_do_not_host_their_descendants() {
    let mut fixture = Fixture::new();
    fixture.set_view_props(A, RawProps::new().with("backgroundColor", "black"));
    fixture.set_view_props(AA, RawProps::new().with("collapsable", false));
    fixture.set_view_props(B, RawProps::new().with("testID", "42"));
    fixture.set_view_props(BA, RawProps::new().with("nativeID", "42"));
    fixture.set_view_props(BB, RawProps::new().with("backgroundColor", "black"));
    fixture.set_view_props(BBA, RawProps::new().with("opacity", 0.5));
    fixture.set_view_props(BBB, RawProps::new().with("zIndex", 42));
    fixture.set_view_props(BC, RawProps::new().with("collapsable", false));
    fixture.set_view_props(BD, RawProps::new().with("opacity", 0.42));

    fixture.check(|views| {
        assert_eq!(views.len(), 10);
        // BBB sorts last on its z-index; the rest keep tree order.
        assert_eq!(
            mounted_under(views, SURFACE),
            [A, AA, B, BA, BB, BBA, BC, BD, BBB]
        );
        assert!(mounted_under(views, A).is_empty());
        assert!(mounted_under(views, BB).is_empty());
    });
}

#[test]
fn z_index_orders_views_across_flattened_parents() {
    let mut fixture = Fixture::new();
    for (tag, z_index) in [
        (AA, 9001),
        (BA, 9000),
        (BBA, 8999),
        (BBB, 8998),
        (BC, 8997),
        (BD, 8996),
    ] {
        fixture.set_view_props(tag, RawProps::new().with("zIndex", z_index));
    }
    fixture.check(|views| {
        assert_eq!(views.len(), 7);
        assert_eq!(mounted_under(views, SURFACE), [BD, BC, BBB, BBA, BA, AA]);
    });

    // BB becomes a stacking context with a low order index and takes its
    // children along.
    fixture.set_view_props(BB, RawProps::new().with("zIndex", 42));
    fixture.check(|views| {
        assert_eq!(views.len(), 8);
        assert_eq!(mounted_under(views, SURFACE), [BB, BD, BC, BA, AA]);
        assert_eq!(mounted_under(views, BB), [BBB, BBA]);
    });

    fixture.set_view_props(BB, RawProps::new());
    fixture.check(|views| {
        assert_eq!(views.len(), 7);
        assert_eq!(mounted_under(views, SURFACE), [BD, BC, BBB, BBA, BA, AA]);
        assert!(views.get(BB).is_none());
    });
}

#[test]
fn equal_z_indices_keep_tree_order() {
    let mut fixture = Fixture::new();
    for tag in [BD, AA, BBA] {
        fixture.set_view_props(tag, RawProps::new().with("zIndex", 1));
    }
    fixture.set_view_props(BC, RawProps::new().with("zIndex", -1));
    fixture.check(|views| {
        assert_eq!(mounted_under(views, SURFACE), [BC, AA, BBA, BD]);
    });
}
