//! Environment variable abstraction.
//!
//! Configuration overrides are read through [`Environment`] so tests can
//! supply a [`MapEnvironment`] instead of mutating the process environment.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Read access to environment-style key-value configuration.
pub trait Environment: Send + Sync {
    /// Get the value of a variable, or `None` if it is not set.
    fn get_var(&self, name: &str) -> Option<String>;
}

/// The process environment.
pub struct NativeEnvironment;

impl Environment for NativeEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// An in-memory environment for tests and embedding.
#[derive(Default)]
pub struct MapEnvironment {
    vars: RwLock<HashMap<String, String>>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, name: &str, value: &str) -> Self {
        self.set_var(name, value);
        self
    }

    pub fn set_var(&self, name: &str, value: &str) {
        self.vars.write().insert(name.to_owned(), value.to_owned());
    }

    pub fn remove_var(&self, name: &str) {
        self.vars.write().remove(name);
    }
}

impl Environment for MapEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        self.vars.read().get(name).cloned()
    }
}
