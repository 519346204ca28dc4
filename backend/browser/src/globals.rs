//! Host page global functions.
//!
//! Legacy pages open their overlays through global entry points. The scope keeps
//! those functions by name so they can be looked up, called, and replaced.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ScriptError;

/// A callable global. Errors model exceptions thrown by the host function.
pub type HostFunction = Arc<dyn Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync>;

#[derive(Default, Clone)]
pub struct GlobalScope {
    functions: HashMap<String, HostFunction>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or overwrite) `name`, returning the previous function.
    pub fn define(&mut self, name: impl Into<String>, function: HostFunction) -> Option<HostFunction> {
        self.functions.insert(name.into(), function)
    }

    /// Install a stand-in that returns `null`, unless `name` already exists.
    ///
    /// Recorded sessions announce late-loaded globals this way.
    pub fn define_stub(&mut self, name: &str) {
        self.functions
            .entry(name.to_string())
            .or_insert_with(|| {
                let stub: HostFunction = Arc::new(|_: &[Value]| Ok::<_, ScriptError>(Value::Null));
                stub
            });
    }

    /// Swap `name` for whatever `wrap` builds around the current function.
    /// Returns `false` (and does nothing) when `name` is not defined.
    pub fn replace<F>(&mut self, name: &str, wrap: F) -> bool
    where
        F: FnOnce(HostFunction) -> HostFunction,
    {
        match self.functions.get_mut(name) {
            Some(slot) => {
                *slot = wrap(slot.clone());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<HostFunction> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Call `name` with `args`, the way the host page would.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        let function = self
            .get(name)
            .ok_or_else(|| ScriptError::new(name, format!("{name} is not a function")))?;
        function(args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("GlobalScope").field("functions", &names).finish()
    }
}
