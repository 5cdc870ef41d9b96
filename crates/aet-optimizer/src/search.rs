//! Search space definitions and exhaustive grid enumeration.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use aet_types::{AetResult, Hyperparameters, ParameterValue, SearchError};

/// A single parameter dimension: a name and its ordered candidate values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    /// Hyperparameter name (e.g. "latent_dim").
    pub name: String,
    pub values: Vec<ParameterValue>,
}

/// The full search space: an ordered list of parameter definitions.
///
/// Key order is significant; it fixes the enumeration order of the grid.
/// Serializes as `{name: [values]}` with keys in definition order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add<V, I>(mut self, name: impl Into<String>, values: I) -> Self
    where
        V: Into<ParameterValue>,
        I: IntoIterator<Item = V>,
    {
        self.parameters.push(ParameterDef {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn add_ints(self, name: impl Into<String>, values: &[i64]) -> Self {
        self.add(name, values.iter().copied())
    }

    pub fn add_floats(self, name: impl Into<String>, values: &[f64]) -> Self {
        self.add(name, values.iter().copied())
    }

    pub fn add_choice(self, name: impl Into<String>, values: &[&str]) -> Self {
        self.add(name, values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Total number of grid points, or `None` on overflow.
    ///
    /// An empty candidate list makes this zero; see [`SearchSpace::validate`].
    pub fn grid_size(&self) -> Option<usize> {
        self.parameters
            .iter()
            .try_fold(1usize, |total, p| total.checked_mul(p.values.len()))
    }

    /// Check that the space describes at least one configuration and return
    /// how many it describes.
    pub fn validate(&self) -> AetResult<usize> {
        if self.parameters.is_empty() {
            return Err(SearchError::EmptySearchSpace.into());
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(SearchError::DuplicateParameter {
                    parameter: param.name.clone(),
                }
                .into());
            }
            if param.values.is_empty() {
                return Err(SearchError::EmptyCandidates {
                    parameter: param.name.clone(),
                }
                .into());
            }
        }

        self.grid_size().ok_or_else(|| SearchError::GridTooLarge.into())
    }
}

impl Serialize for SearchSpace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parameters.len()))?;
        for param in &self.parameters {
            map.serialize_entry(&param.name, &param.values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SearchSpace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpaceVisitor;

        impl<'de> Visitor<'de> for SpaceVisitor {
            type Value = SearchSpace;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to candidate lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut parameters = Vec::new();
                while let Some((name, values)) =
                    access.next_entry::<String, Vec<ParameterValue>>()?
                {
                    parameters.push(ParameterDef { name, values });
                }
                Ok(SearchSpace { parameters })
            }
        }

        deserializer.deserialize_map(SpaceVisitor)
    }
}

/// Exhaustive grid over a validated search space.
///
/// Yields configurations in nested-loop order: the last parameter varies
/// fastest, the first slowest.
#[derive(Debug, Clone)]
pub struct GridSearch {
    space: SearchSpace,
    total: usize,
    cursor: usize,
}

impl GridSearch {
    pub fn new(space: SearchSpace) -> AetResult<Self> {
        let total = space.validate()?;
        Ok(Self {
            space,
            total,
            cursor: 0,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// The configuration at a zero-based position in enumeration order.
    pub fn combination(&self, index: usize) -> Option<Hyperparameters> {
        if index >= self.total {
            return None;
        }

        let mut picks = vec![0usize; self.space.parameters.len()];
        let mut rem = index;
        for (slot, param) in picks.iter_mut().zip(&self.space.parameters).rev() {
            *slot = rem % param.values.len();
            rem /= param.values.len();
        }

        Some(
            self.space
                .parameters
                .iter()
                .zip(picks)
                .map(|(param, pick)| (param.name.clone(), param.values[pick].clone()))
                .collect(),
        )
    }
}

impl Iterator for GridSearch {
    type Item = Hyperparameters;

    fn next(&mut self) -> Option<Self::Item> {
        let combo = self.combination(self.cursor)?;
        self.cursor += 1;
        Some(combo)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridSearch {}
