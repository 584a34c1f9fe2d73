use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Address;

/// A helper symbol the instrumentation runtime injected into the image
/// (counters, timers, trampolines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalSym {
    name: String,
    addr: Address,
}

impl InternalSym {
    pub fn new(name: impl Into<String>, addr: Address) -> Self {
        Self { name: name.into(), addr }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> Address {
        self.addr
    }
}

/// Name-keyed table of internal symbols, filled once at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InternalSymbols {
    by_name: HashMap<String, InternalSym>,
}

impl InternalSymbols {
    /// First definition wins.
    pub(crate) fn add(&mut self, name: &str, addr: Address) {
        self.by_name.entry(name.to_string()).or_insert_with(|| InternalSym::new(name, addr));
    }

    pub fn get(&self, name: &str) -> Option<&InternalSym> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
