//! Hyperparameter values and concrete configurations.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::errors::{AetResult, SearchError};

/// A single candidate or chosen hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One concrete configuration: a value for every key of the search space it
/// was drawn from, in the space's key order.
///
/// Serializes as a JSON object whose keys keep that order. Equality ignores
/// key order.
#[derive(Debug, Clone, Default)]
pub struct Hyperparameters {
    entries: Vec<(String, ParameterValue)>,
}

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A repeated key replaces the earlier value in place.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.insert(name.into(), value.into());
        self
    }

    fn insert(&mut self, name: String, value: ParameterValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    fn require(&self, name: &str) -> AetResult<&ParameterValue> {
        self.get(name).ok_or_else(|| {
            SearchError::MissingParameter {
                parameter: name.to_string(),
            }
            .into()
        })
    }

    fn type_error(name: &str, expected: &str, actual: &ParameterValue) -> SearchError {
        SearchError::ParameterType {
            parameter: name.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }

    pub fn get_int(&self, name: &str) -> AetResult<i64> {
        let value = self.require(name)?;
        value
            .as_i64()
            .ok_or_else(|| Self::type_error(name, "int", value).into())
    }

    /// Integer hyperparameter that must be a non-negative size (dimensions, widths).
    pub fn get_usize(&self, name: &str) -> AetResult<usize> {
        let value = self.require(name)?;
        match value {
            ParameterValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(Self::type_error(name, "non-negative int", other).into()),
        }
    }

    pub fn get_float(&self, name: &str) -> AetResult<f64> {
        let value = self.require(name)?;
        value
            .as_f64()
            .ok_or_else(|| Self::type_error(name, "float", value).into())
    }

    pub fn get_bool(&self, name: &str) -> AetResult<bool> {
        match self.require(name)? {
            ParameterValue::Bool(v) => Ok(*v),
            other => Err(Self::type_error(name, "bool", other).into()),
        }
    }

    pub fn get_str(&self, name: &str) -> AetResult<&str> {
        match self.require(name)? {
            ParameterValue::Text(v) => Ok(v.as_str()),
            other => Err(Self::type_error(name, "string", other).into()),
        }
    }

    /// Format as a compact `key=value` string for log lines.
    pub fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PartialEq for Hyperparameters {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<ParameterValue>> FromIterator<(K, V)> for Hyperparameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k.into(), v.into());
        }
        params
    }
}

impl Serialize for Hyperparameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Hyperparameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Hyperparameters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of hyperparameter names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut params = Hyperparameters::new();
                while let Some((k, v)) = access.next_entry::<String, ParameterValue>()? {
                    params.insert(k, v);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
