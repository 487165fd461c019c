//! Dynamic values exchanged with the script runtime.
//!
//! Props arrive from the runtime and event payloads travel back to it as
//! [`RawValue`]s. Objects keep insertion order so that props merged from
//! several updates stay deterministic.

use indexmap::IndexMap;

pub type RawObject = IndexMap<String, RawValue>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<RawValue>),
    Object(RawObject),
}

impl RawValue {
    pub fn object() -> Self {
        RawValue::Object(RawObject::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Array(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&RawObject> {
        match self {
            RawValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` when this value is an object.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Builder-style insertion; turns `Null` into an empty object first.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        if self.is_null() {
            self = RawValue::object();
        }
        if let RawValue::Object(map) = &mut self {
            map.insert(key.into(), value.into());
        }
        self
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<f32> for RawValue {
    fn from(value: f32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(values: Vec<RawValue>) -> Self {
        RawValue::Array(values)
    }
}

impl From<RawObject> for RawValue {
    fn from(map: RawObject) -> Self {
        RawValue::Object(map)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}
