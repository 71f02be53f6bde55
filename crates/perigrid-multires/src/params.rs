//! Keyed, indexed parameter storage.
//!
//! The configuration surface the registration pipeline hands to this
//! subsystem: every key maps to an ordered list of string values, addressed
//! by index (per axis, per level, or per matrix entry depending on the key).

use crate::error::{GridError, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Ordered keyed store of parameter entries.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl ParameterMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entries of `key`.
    pub fn set<K, I, V>(&mut self, key: K, values: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.entries
            .insert(key.into(), values.into_iter().map(|v| v.to_string()).collect());
    }

    /// Number of entries stored under `key` (0 if absent).
    pub fn count(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }

    /// Raw entry `index` of `key`, if present.
    pub fn raw(&self, key: &str, index: usize) -> Option<&str> {
        self.entries.get(key)?.get(index).map(String::as_str)
    }

    fn parse_at<T: FromStr>(&self, key: &str, index: usize) -> Result<Option<T>> {
        match self.raw(key, index) {
            None => Ok(None),
            Some(text) => text.parse::<T>().map(Some).map_err(|_| GridError::InvalidParameter {
                key: key.to_string(),
                index,
                value: text.to_string(),
            }),
        }
    }

    /// Entry `index` of `key` parsed as `f64`; `None` if absent.
    pub fn f64_at(&self, key: &str, index: usize) -> Result<Option<f64>> {
        self.parse_at(key, index)
    }

    /// Entry `index` of `key` parsed as `usize`; `None` if absent.
    pub fn usize_at(&self, key: &str, index: usize) -> Result<Option<usize>> {
        self.parse_at(key, index)
    }

    /// Entry `index` of `key` parsed as `i64`; `None` if absent.
    pub fn i64_at(&self, key: &str, index: usize) -> Result<Option<i64>> {
        self.parse_at(key, index)
    }

    /// Entry `index` of `key` parsed as `f64`, falling back to the last
    /// entry when `index` is past the end. `None` only if the key is absent.
    ///
    /// This is the indexed lookup used for per-axis and per-level keys where
    /// a single value may stand for all remaining positions.
    pub fn f64_at_or_last(&self, key: &str, index: usize) -> Result<Option<f64>> {
        let count = self.count(key);
        if count == 0 {
            return Ok(None);
        }
        self.f64_at(key, index.min(count - 1))
    }
}
