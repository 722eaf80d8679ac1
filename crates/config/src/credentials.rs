//! Provider credentials
//!
//! A read-only snapshot of secret values keyed by environment-variable name.
//! Built once at startup and passed explicitly to whatever needs it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Key for the default completion backend
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the named variables from the process environment.
    /// Unset or empty variables are skipped.
    pub fn from_env<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            if let Ok(value) = std::env::var(name) {
                if !value.trim().is_empty() {
                    values.insert(name.to_string(), value);
                }
            }
        }
        debug!("◆ {} CREDENTIALS LOADED FROM ENVIRONMENT", values.len());
        Self { values }
    }

    /// Credentials stored in the config file
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// File-sourced values overlaid by the environment
    pub fn load<I, S>(file_values: &HashMap<String, String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_map(file_values).merged(&Self::from_env(names))
    }

    /// New set where `other` wins on conflicting non-empty values
    pub fn merged(&self, other: &Credentials) -> Credentials {
        let mut values = self.values.clone();
        for (name, value) in &other.values {
            if !value.trim().is_empty() {
                values.insert(name.clone(), value.clone());
            }
        }
        Credentials { values }
    }

    /// Value for `name` if present and non-empty
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|k| (k, "[redacted]")))
            .finish()
    }
}
