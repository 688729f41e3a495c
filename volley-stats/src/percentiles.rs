use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolved percentiles, keyed by the requested fraction in `[0, 1]`.
///
/// Entries are kept in ascending percentile order; each fraction appears once.
#[derive(Debug, Clone, PartialEq)]
pub struct Percentiles<V> {
    entries: Vec<(f64, V)>,
}

impl<V> Default for Percentiles<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> Percentiles<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// `p` must not be NaN. Replaces the value if `p` is already present.
    pub(crate) fn insert(&mut self, p: f64, value: V) {
        let at = self.position(p);
        match self.entries.get_mut(at) {
            Some(entry) if entry.0 == p => entry.1 = value,
            _ => self.entries.insert(at, (p, value)),
        }
    }

    fn position(&self, p: f64) -> usize {
        self.entries.partition_point(|&(q, _)| q < p)
    }

    /// Whether a numerically equal fraction has been resolved (`0.0` equals `-0.0`).
    pub fn contains(&self, p: f64) -> bool {
        self.entries.get(self.position(p)).is_some_and(|&(q, _)| q == p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(fraction, value)` in ascending fraction order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &V)> + '_ {
        self.entries.iter().map(|(p, v)| (*p, v))
    }
}

impl<V: Copy> Percentiles<V> {
    pub fn get(&self, p: f64) -> Option<V> {
        self.entries
            .get(self.position(p))
            .filter(|&&(q, _)| q == p)
            .map(|&(_, v)| v)
    }
}

/// Written as a JSON object keyed by the fraction's shortest decimal form (`"0.5"`, `"1"`).
impl<V: Serialize> Serialize for Percentiles<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (p, value) in &self.entries {
            map.serialize_entry(&p.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Percentiles<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, V>::deserialize(deserializer)?;
        let mut percentiles = Self::with_capacity(raw.len());
        for (key, value) in raw {
            let p: f64 = key
                .parse()
                .map_err(|_| D::Error::custom(format!("percentile key {key:?} is not a number")))?;
            if p.is_nan() {
                return Err(D::Error::custom("percentile key must not be NaN"));
            }
            percentiles.insert(p, value);
        }
        Ok(percentiles)
    }
}
