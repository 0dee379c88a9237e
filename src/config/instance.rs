//! Materialized configuration snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{SchemaLayout, Value};
use crate::store::AccessorCache;

/// One fully populated configuration. Instances are never mutated once
/// published; updates build a new instance and swap it in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigInstance {
    version: u32,
    generation: u64,
    values: BTreeMap<String, Value>,
}

impl ConfigInstance {
    /// Instance holding every leaf's declared default.
    pub fn defaults(layout: &SchemaLayout, version: u32) -> Self {
        let values = layout
            .leaves()
            .iter()
            .map(|leaf| (leaf.path.clone(), leaf.default.clone()))
            .collect();
        Self {
            version,
            generation: 0,
            values,
        }
    }

    /// Pull every leaf through the accessor cache.
    pub fn materialize(layout: &SchemaLayout, cache: &AccessorCache, version: u32) -> Self {
        let values = layout
            .leaves()
            .iter()
            .map(|leaf| (leaf.path.clone(), cache.get(leaf)))
            .collect();
        Self {
            version,
            generation: 0,
            values,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Publication counter, bumped every time a new instance goes live.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Copy of this instance with one value replaced.
    pub(crate) fn with_value(&self, path: &str, value: Value) -> Self {
        let mut next = self.clone();
        next.values.insert(path.to_string(), value);
        next
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn get_int(&self, path: &str) -> Option<i32> {
        match self.get(path) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_long(&self, path: &str) -> Option<i64> {
        match self.get(path) {
            Some(Value::Long(v)) => Some(*v),
            Some(Value::Int(v)) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn get_double(&self, path: &str) -> Option<f64> {
        match self.get(path) {
            Some(Value::Double(v)) => Some(*v),
            _ => None,
        }
    }

    /// String or enum variant name.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_list(&self, path: &str) -> Option<&[String]> {
        self.get(path).and_then(Value::as_list)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
