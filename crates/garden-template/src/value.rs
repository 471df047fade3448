/*
 * value.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! The value model shared by configuration documents and template results.
//!
//! "Undefined" is not a value: it is `Option::None` wherever a result may be
//! missing (an optional template whose key was not found, or an `$if` without
//! `$else` whose condition was false).

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<TemplateValue>),
    /// Keys keep document order.
    Object(IndexMap<String, TemplateValue>),
}

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl TemplateValue {
    /// Falsy: `null`, `false`, `0`, NaN and `""`. Everything else is truthy,
    /// including empty arrays and objects.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Null => false,
            TemplateValue::Bool(b) => *b,
            TemplateValue::Number(n) => *n != 0.0 && !n.is_nan(),
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::Array(_) | TemplateValue::Object(_) => true,
        }
    }

    /// Whether this is a scalar (not an array or object).
    pub fn is_primitive(&self) -> bool {
        !matches!(self, TemplateValue::Array(_) | TemplateValue::Object(_))
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateValue::Null => "null",
            TemplateValue::Bool(_) => "boolean",
            TemplateValue::Number(_) => "number",
            TemplateValue::String(_) => "string",
            TemplateValue::Array(_) => "array",
            TemplateValue::Object(_) => "object",
        }
    }

    /// Result of the `typeof` operator.
    pub fn typeof_name(&self) -> &'static str {
        match self {
            TemplateValue::Bool(_) => "boolean",
            TemplateValue::Number(_) => "number",
            TemplateValue::String(_) => "string",
            TemplateValue::Null | TemplateValue::Array(_) | TemplateValue::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TemplateValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TemplateValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TemplateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number as an array index, if it is a non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            TemplateValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= MAX_SAFE_INTEGER => {
                Some(*n as usize)
            }
            _ => None,
        }
    }

    /// Render a scalar for string interpolation. Arrays and objects have no
    /// interpolated form and yield `None`.
    pub fn to_interpolated(&self) -> Option<String> {
        match self {
            TemplateValue::Array(_) | TemplateValue::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Convert to a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TemplateValue::Null => serde_json::Value::Null,
            TemplateValue::Bool(b) => serde_json::Value::Bool(*b),
            TemplateValue::Number(n) => number_to_json(*n),
            TemplateValue::String(s) => serde_json::Value::String(s.clone()),
            TemplateValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(TemplateValue::to_json).collect())
            }
            TemplateValue::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Some(n as i64)
    } else {
        None
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    match integral(n) {
        Some(i) => serde_json::Value::from(i),
        None => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateValue::Null => write!(f, "null"),
            TemplateValue::Bool(b) => write!(f, "{b}"),
            TemplateValue::Number(n) => match integral(*n) {
                Some(i) => write!(f, "{i}"),
                None if n.is_nan() => write!(f, "NaN"),
                None => write!(f, "{n}"),
            },
            TemplateValue::String(s) => write!(f, "{s}"),
            TemplateValue::Array(_) | TemplateValue::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(b),
            serde_json::Value::Number(n) => TemplateValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => TemplateValue::String(s),
            serde_json::Value::Array(items) => {
                TemplateValue::Array(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(map) => TemplateValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl From<f64> for TemplateValue {
    fn from(n: f64) -> Self {
        TemplateValue::Number(n)
    }
}

impl From<i64> for TemplateValue {
    fn from(n: i64) -> Self {
        TemplateValue::Number(n as f64)
    }
}

impl From<Vec<TemplateValue>> for TemplateValue {
    fn from(items: Vec<TemplateValue>) -> Self {
        TemplateValue::Array(items)
    }
}

impl From<IndexMap<String, TemplateValue>> for TemplateValue {
    fn from(map: IndexMap<String, TemplateValue>) -> Self {
        TemplateValue::Object(map)
    }
}

impl Serialize for TemplateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TemplateValue::Null => serializer.serialize_unit(),
            TemplateValue::Bool(b) => serializer.serialize_bool(*b),
            TemplateValue::Number(n) => match integral(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            TemplateValue::String(s) => serializer.serialize_str(s),
            TemplateValue::Array(items) => items.serialize(serializer),
            TemplateValue::Object(map) => map.serialize(serializer),
        }
    }
}

struct TemplateValueVisitor;

impl<'de> Visitor<'de> for TemplateValueVisitor {
    type Value = TemplateValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<TemplateValue, E> {
        Ok(TemplateValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<TemplateValue, E> {
        Ok(TemplateValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<TemplateValue, D::Error> {
        TemplateValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<TemplateValue, E> {
        Ok(TemplateValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TemplateValue, E> {
        Ok(TemplateValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TemplateValue, E> {
        Ok(TemplateValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TemplateValue, E> {
        Ok(TemplateValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TemplateValue, E> {
        Ok(TemplateValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TemplateValue, E> {
        Ok(TemplateValue::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TemplateValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(TemplateValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TemplateValue, A::Error> {
        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<TemplateValue, TemplateValue>()? {
            // YAML allows non-string keys; they become their display form.
            map.insert(key.to_string(), value);
        }
        Ok(TemplateValue::Object(map))
    }
}

impl<'de> Deserialize<'de> for TemplateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TemplateValueVisitor)
    }
}
