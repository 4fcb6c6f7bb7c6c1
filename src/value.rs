//! Token payloads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A payload element held in a bundle's mapping or sequence field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

/// Up to five independent, optional values attached to one token.
///
/// A bundle is plain data; the string value becomes mandatory only once the
/// bundle is attached to a [`Token`](crate::Token), where it is the token's
/// name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    int_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    float_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_value: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list_value: Option<Vec<Value>>,
}

impl ValueBundle {
    pub fn new(
        string_value: Option<String>,
        int_value: Option<i64>,
        float_value: Option<f64>,
        map_value: Option<IndexMap<String, Value>>,
        list_value: Option<Vec<Value>>,
    ) -> Self {
        Self {
            string_value,
            int_value,
            float_value,
            map_value,
            list_value,
        }
    }

    /// A bundle holding only a string value.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            string_value: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_int(mut self, value: i64) -> Self {
        self.int_value = Some(value);
        self
    }

    pub fn with_float(mut self, value: f64) -> Self {
        self.float_value = Some(value);
        self
    }

    pub fn with_map(mut self, value: IndexMap<String, Value>) -> Self {
        self.map_value = Some(value);
        self
    }

    pub fn with_list(mut self, value: impl IntoIterator<Item = Value>) -> Self {
        self.list_value = Some(value.into_iter().collect());
        self
    }

    #[inline]
    pub fn string_value(&self) -> Option<&str> {
        self.string_value.as_deref()
    }

    #[inline]
    pub fn int_value(&self) -> Option<i64> {
        self.int_value
    }

    #[inline]
    pub fn float_value(&self) -> Option<f64> {
        self.float_value
    }

    #[inline]
    pub fn map_value(&self) -> Option<&IndexMap<String, Value>> {
        self.map_value.as_ref()
    }

    #[inline]
    pub fn list_value(&self) -> Option<&[Value]> {
        self.list_value.as_deref()
    }
}

impl From<&str> for ValueBundle {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ValueBundle {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl From<(&str, i64)> for ValueBundle {
    fn from((name, int): (&str, i64)) -> Self {
        Self::named(name).with_int(int)
    }
}
