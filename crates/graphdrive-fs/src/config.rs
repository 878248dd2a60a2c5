//! Per-call options passed down to adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Explicit content type for uploads.
pub const KEY_MIMETYPE: &str = "mimetype";
/// Skip the facade's existence checks.
pub const KEY_DISABLE_ASSERTS: &str = "disable_asserts";
/// Name-collision behaviour (`fail`, `replace`, `rename`).
pub const KEY_CONFLICT: &str = "conflict";

/// What a backend should do when the target name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Fail,
    Replace,
    Rename,
}

impl ConflictPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Some(Self::Fail),
            "replace" => Some(Self::Replace),
            "rename" => Some(Self::Rename),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
            Self::Rename => "rename",
        }
    }
}

/// Loosely-typed option bag with typed accessors for the known keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    values: HashMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Return a copy where keys missing from `self` are taken from `fallback`.
    pub fn with_fallback(&self, fallback: &Config) -> Config {
        let mut merged = fallback.clone();
        for (k, v) in &self.values {
            merged.values.insert(k.clone(), v.clone());
        }
        merged
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.get_str(KEY_MIMETYPE)
    }

    pub fn disable_asserts(&self) -> bool {
        self.get_bool(KEY_DISABLE_ASSERTS).unwrap_or(false)
    }

    pub fn conflict(&self) -> Option<ConflictPolicy> {
        self.get_str(KEY_CONFLICT).and_then(ConflictPolicy::parse)
    }
}
