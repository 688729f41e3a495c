use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A key domain a histogram can be bucketed by.
///
/// Latency histograms use `u64` (microseconds), request-rate histograms use `f64`
/// (requests per second).
pub trait HistogramKey: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// Value used for mean and deviation arithmetic.
    fn to_f64(self) -> f64;

    /// Bucket identity for point lookups. Keys that compare equal share an identity.
    fn identity(self) -> u64;

    /// Total order over keys; never panics, even on NaN.
    fn key_cmp(&self, other: &Self) -> Ordering;

    /// Whether statistics should ignore a bucket with this key.
    fn is_excluded(self) -> bool {
        false
    }

    /// The key a `null` wire key decodes to, if the domain has one.
    fn from_missing() -> Option<Self>;
}

impl HistogramKey for u64 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn identity(self) -> u64 {
        self
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_missing() -> Option<Self> {
        None
    }
}

impl HistogramKey for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn identity(self) -> u64 {
        if self.is_nan() {
            f64::NAN.to_bits()
        } else if self == 0.0 {
            // -0.0 and 0.0 are the same bucket
            0
        } else {
            self.to_bits()
        }
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    /// Rate samples taken over a zero-length window come out as NaN or infinity.
    fn is_excluded(self) -> bool {
        !self.is_finite()
    }

    fn from_missing() -> Option<Self> {
        Some(f64::NAN)
    }
}

/// Read-only view of a weighted frequency table.
///
/// `visit_all` calls the visitor once per populated key and returns only after the
/// traversal is finished (or the visitor returned `false`). Traversal order is
/// unspecified.
pub trait ReadonlyHistogram {
    type Key: HistogramKey;

    /// Weighted count stored at `key`, 0 if the key was never recorded.
    fn get(&self, key: Self::Key) -> u64;

    /// Total weighted count across all keys.
    fn count(&self) -> u64;

    fn visit_all(&self, visitor: &mut dyn FnMut(Self::Key, u64) -> bool);
}

impl<H: ReadonlyHistogram + ?Sized> ReadonlyHistogram for &H {
    type Key = H::Key;

    fn get(&self, key: Self::Key) -> u64 {
        (**self).get(key)
    }

    fn count(&self) -> u64 {
        (**self).count()
    }

    fn visit_all(&self, visitor: &mut dyn FnMut(Self::Key, u64) -> bool) {
        (**self).visit_all(visitor)
    }
}

impl<H: ReadonlyHistogram + ?Sized> ReadonlyHistogram for Box<H> {
    type Key = H::Key;

    fn get(&self, key: Self::Key) -> u64 {
        (**self).get(key)
    }

    fn count(&self) -> u64 {
        (**self).count()
    }

    fn visit_all(&self, visitor: &mut dyn FnMut(Self::Key, u64) -> bool) {
        (**self).visit_all(visitor)
    }
}

impl<H: ReadonlyHistogram + ?Sized> ReadonlyHistogram for Arc<H> {
    type Key = H::Key;

    fn get(&self, key: Self::Key) -> u64 {
        (**self).get(key)
    }

    fn count(&self) -> u64 {
        (**self).count()
    }

    fn visit_all(&self, visitor: &mut dyn FnMut(Self::Key, u64) -> bool) {
        (**self).visit_all(visitor)
    }
}

/// Exact in-memory frequency table: one bucket per distinct key.
///
/// This is the frozen form a finished run hands to [`crate::Results`]. Buckets are
/// kept in order of first insertion.
#[derive(Debug, Clone)]
pub struct FrequencyTable<K: HistogramKey> {
    buckets: Vec<(K, u64)>,
    index: HashMap<u64, usize>,
    total: u64,
}

impl<K: HistogramKey> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            index: HashMap::new(),
            total: 0,
        }
    }
}

impl<K: HistogramKey> FrequencyTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single occurrence of `key`.
    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    /// Record `n` occurrences of `key`. Weights saturate at `u64::MAX`.
    pub fn add_n(&mut self, key: K, n: u64) {
        let next = self.buckets.len();
        let slot = *self.index.entry(key.identity()).or_insert(next);
        if slot == next {
            self.buckets.push((key, 0));
        }
        let weight = &mut self.buckets[slot].1;
        *weight = weight.saturating_add(n);
        self.total = self.total.saturating_add(n);
    }

    /// Number of distinct buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn bucket(&self, key: K) -> Option<u64> {
        self.index.get(&key.identity()).map(|&slot| self.buckets[slot].1)
    }
}

impl<K: HistogramKey> ReadonlyHistogram for FrequencyTable<K> {
    type Key = K;

    fn get(&self, key: K) -> u64 {
        self.bucket(key).unwrap_or(0)
    }

    fn count(&self) -> u64 {
        self.total
    }

    fn visit_all(&self, visitor: &mut dyn FnMut(K, u64) -> bool) {
        for &(key, count) in &self.buckets {
            if !visitor(key, count) {
                break;
            }
        }
    }
}

impl<K: HistogramKey> PartialEq for FrequencyTable<K> {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total
            && self.buckets.len() == other.buckets.len()
            && self
                .buckets
                .iter()
                .all(|&(key, count)| other.bucket(key) == Some(count))
    }
}

impl<K: HistogramKey> FromIterator<(K, u64)> for FrequencyTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<K: HistogramKey> Extend<(K, u64)> for FrequencyTable<K> {
    fn extend<I: IntoIterator<Item = (K, u64)>>(&mut self, iter: I) {
        for (key, count) in iter {
            self.add_n(key, count);
        }
    }
}

/// Written as an array of `[key, count]` pairs.
impl<K: HistogramKey + Serialize> Serialize for FrequencyTable<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.buckets.len()))?;
        for bucket in &self.buckets {
            seq.serialize_element(bucket)?;
        }
        seq.end()
    }
}

/// JSON has no NaN or infinity; they are written as `null` and read back as the
/// domain's missing key.
impl<'de, K: HistogramKey + Deserialize<'de>> Deserialize<'de> for FrequencyTable<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(Option<K>, u64)>::deserialize(deserializer)?;
        let mut table = Self::new();
        for (key, count) in pairs {
            let key = key
                .or_else(K::from_missing)
                .ok_or_else(|| D::Error::custom("null key in a histogram without a missing key"))?;
            table.add_n(key, count);
        }
        Ok(table)
    }
}
