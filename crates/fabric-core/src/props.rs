//! Immutable property bags.
//!
//! Every component has its own props type. New props are always derived
//! from the previous instance plus a [`RawProps`] delta: keys missing from the
//! delta keep the previous value, so the runtime only ever sends what
//! changed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::raw_value::{RawObject, RawValue};
use crate::sealable::Sealable;

/// Raw key/value props as produced by the script runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProps {
    values: RawObject,
}

impl RawProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds raw props from a runtime value; anything but an object yields
    /// empty props.
    pub fn from_value(value: RawValue) -> Self {
        match value {
            RawValue::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn f32_or(&self, key: &str, fallback: f32) -> f32 {
        self.get(key)
            .and_then(RawValue::as_f64)
            .map(|value| value as f32)
            .unwrap_or(fallback)
    }

    pub fn string_or(&self, key: &str, fallback: &str) -> String {
        self.get(key)
            .and_then(RawValue::as_str)
            .unwrap_or(fallback)
            .to_owned()
    }

    pub fn bool_or(&self, key: &str, fallback: bool) -> bool {
        self.get(key)
            .and_then(RawValue::as_bool)
            .unwrap_or(fallback)
    }
}

/// Fields every props type carries.
///
/// Besides the raw lineage these are the view-level props that decide how a
/// node takes part in the mounted hierarchy; see [`Props::forms_view`].
#[derive(Debug, Clone)]
pub struct BaseProps {
    sealable: Sealable,
    native_id: String,
    test_id: String,
    opacity: f32,
    z_index: Option<i32>,
    collapsable: bool,
    raw: RawObject,
}

impl Default for BaseProps {
    fn default() -> Self {
        Self {
            sealable: Sealable::new(),
            native_id: String::new(),
            test_id: String::new(),
            opacity: 1.0,
            z_index: None,
            collapsable: true,
            raw: RawObject::new(),
        }
    }
}

impl BaseProps {
    pub fn from_raw(source: &BaseProps, raw: &RawProps) -> Self {
        let mut merged = source.raw.clone();
        for (key, value) in raw.iter() {
            merged.insert(key.to_owned(), value.clone());
        }
        // An explicit null clears the z-index.
        let z_index = match raw.get("zIndex") {
            Some(RawValue::Null) => None,
            Some(value) => value.as_f64().map(|z| z as i32).or(source.z_index),
            None => source.z_index,
        };
        Self {
            sealable: Sealable::new(),
            native_id: raw.string_or("nativeID", &source.native_id),
            test_id: raw.string_or("testID", &source.test_id),
            opacity: raw.f32_or("opacity", source.opacity),
            z_index,
            collapsable: raw.bool_or("collapsable", source.collapsable),
            raw: merged,
        }
    }

    pub fn sealable(&self) -> &Sealable {
        &self.sealable
    }

    pub fn native_id(&self) -> &str {
        &self.native_id
    }

    pub fn set_native_id(&mut self, native_id: impl Into<String>) {
        self.sealable.ensure_unsealed();
        self.native_id = native_id.into();
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn z_index(&self) -> Option<i32> {
        self.z_index
    }

    pub fn collapsable(&self) -> bool {
        self.collapsable
    }

    /// Every raw key ever applied to this lineage of props.
    pub fn raw(&self) -> &RawObject {
        &self.raw
    }

    /// Props that give the node its own compositing layer.
    pub fn forms_stacking_context(&self) -> bool {
        !self.collapsable
            || self.z_index.is_some()
            || self.opacity != 1.0
            || !self.native_id.is_empty()
    }

    /// Props that need a platform view even without a stacking context.
    pub fn forms_view(&self) -> bool {
        self.forms_stacking_context() || !self.test_id.is_empty()
    }
}

pub trait Props: Any + Send + Sync + fmt::Debug {
    fn base(&self) -> &BaseProps;

    fn as_any(&self) -> &dyn Any;

    fn seal(&self) {
        self.base().sealable().seal();
    }

    fn is_sealed(&self) -> bool {
        self.base().sealable().is_sealed()
    }

    /// Whether the node is mounted as a platform view. Nodes that are not
    /// get flattened away and only their descendants are mounted.
    ///
    /// Every component forms a view unless it says otherwise; flattenable
    /// components usually delegate to [`BaseProps::forms_view`].
    fn forms_view(&self) -> bool {
        true
    }

    /// Whether the node's view hosts the views of its descendants. The
    /// descendants of a node that does not are hoisted into the nearest
    /// ancestor that does. Implies [`Props::forms_view`].
    fn forms_stacking_context(&self) -> bool {
        true
    }

    /// Position among the views of one stacking context; lower indices are
    /// mounted first.
    fn order_index(&self) -> i32 {
        self.base().z_index().unwrap_or(0)
    }
}

pub type SharedProps = Arc<dyn Props>;

/// Props types that can be derived from a previous instance and a raw delta.
pub trait ConcreteProps: Props + Default + Clone + Sized {
    fn from_raw(source: &Self, raw: &RawProps) -> Self;
}

/// Downcasts shared props to a concrete type.
pub fn props_as<P: Props>(props: &SharedProps) -> Option<&P> {
    props.as_any().downcast_ref::<P>()
}

/// Props of the surface root node.
#[derive(Debug, Clone, Default)]
pub struct RootProps {
    base: BaseProps,
}

impl Props for RootProps {
    fn base(&self) -> &BaseProps {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ConcreteProps for RootProps {
    fn from_raw(source: &Self, raw: &RawProps) -> Self {
        Self {
            base: BaseProps::from_raw(&source.base, raw),
        }
    }
}
