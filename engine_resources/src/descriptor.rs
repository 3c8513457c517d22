//! Descriptor store: per-kind bookkeeping for every known resource name.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use serde_json::Value;

use crate::{resource::Resource, watcher::WatcherId};

/// Bookkeeping for one `(kind, name)`.
pub(crate) struct Descriptor<T: Resource> {
    pub name: Rc<str>,
    /// Last accepted document. Replaced wholesale, never edited in place.
    pub data: Value,
    /// Bumped on every accepted update; 0 means the kind's default data.
    pub generation: u64,
    pub instance: Option<Rc<RefCell<T>>>,
    pub refcount: usize,
    /// Set while an entry for this descriptor sits in the unload queue.
    pub pending_unload: bool,
    /// In registration order.
    pub watchers: Vec<WatcherId>,
}

impl<T: Resource> Descriptor<T> {
    pub fn new(name: &str, data: Value) -> Self {
        Self {
            name: Rc::from(name),
            data,
            generation: 0,
            instance: None,
            refcount: 0,
            pending_unload: false,
            watchers: Vec::new(),
        }
    }
}

/// All descriptors of one kind. Names are unique within a kind only.
pub(crate) struct Registry<T: Resource> {
    pub descriptors: HashMap<String, Descriptor<T>>,
}

impl<T: Resource> Default for Registry<T> {
    fn default() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }
}

impl<T: Resource> Registry<T> {
    pub fn get(&self, name: &str) -> Option<&Descriptor<T>> {
        self.descriptors.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Descriptor<T>> {
        self.descriptors.get_mut(name)
    }

    /// Names of descriptors that currently hold an instance, sorted for stable teardown order.
    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .descriptors
            .iter()
            .filter(|(_, d)| d.instance.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
