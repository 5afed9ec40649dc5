//! Interface property cache
//!
//! Holds the last seen properties per interface name. Entries are only
//! hints: they are refreshed whenever the kernel reports them and dropped
//! when the interface is created or deleted.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LinkCache {
    cache: HashMap<String, HashMap<String, String>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property
    pub fn get(&self, name: &str, prop: &str) -> Option<&str> {
        self.cache
            .get(name)
            .and_then(|props| props.get(prop))
            .map(|v| v.as_str())
    }

    /// Set a property, creating the interface entry if needed
    pub fn set(&mut self, name: &str, prop: &str, value: impl Into<String>) {
        self.cache
            .entry(name.to_string())
            .or_default()
            .insert(prop.to_string(), value.into());
    }

    /// Forget everything about an interface
    pub fn remove(&mut self, name: &str) {
        self.cache.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }
}
