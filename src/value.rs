//! Closed JSON value model used for the output template.
//!
//! Merge and projection match on this enum instead of inspecting
//! `serde_json::Value` numbers at runtime.

use crate::error::ConversionError;

use indexmap::IndexMap;
use serde::Serialize;

/// Nesting limit for converted values.
pub const MAX_DEPTH: usize = 128;

pub type TemplateObject = IndexMap<String, TemplateValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<TemplateValue>),
    Object(TemplateObject),
}

impl TemplateValue {
    pub fn empty_object() -> Self {
        TemplateValue::Object(TemplateObject::new())
    }

    pub fn as_object(&self) -> Option<&TemplateObject> {
        match self {
            TemplateValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert a parsed JSON value.
    ///
    /// Integer-valued numbers that fit in `i64` become `Integer`; every other
    /// number becomes `Float`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConversionError> {
        convert(value, 0)
    }

    /// Render back into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            TemplateValue::Null => Value::Null,
            TemplateValue::Bool(b) => Value::Bool(*b),
            TemplateValue::Integer(i) => Value::from(*i),
            // from_json never produces a non-finite float
            TemplateValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TemplateValue::String(s) => Value::String(s.clone()),
            TemplateValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            TemplateValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn convert(value: &serde_json::Value, depth: usize) -> Result<TemplateValue, ConversionError> {
    use serde_json::Value;

    if depth > MAX_DEPTH {
        return Err(ConversionError::TooDeep(MAX_DEPTH));
    }

    Ok(match value {
        Value::Null => TemplateValue::Null,
        Value::Bool(b) => TemplateValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                TemplateValue::Integer(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => TemplateValue::Float(f),
                    _ => return Err(ConversionError::NonFiniteNumber(n.to_string())),
                }
            }
        }
        Value::String(s) => TemplateValue::String(s.clone()),
        Value::Array(items) => TemplateValue::Array(
            items
                .iter()
                .map(|item| convert(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = TemplateObject::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), convert(v, depth + 1)?);
            }
            TemplateValue::Object(out)
        }
    })
}
