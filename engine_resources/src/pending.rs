//! Deferred-unload queue.

use std::collections::VecDeque;

use crate::manager::ResourceManager;

/// Drains one descriptor; returns whether an instance was destroyed.
pub(crate) type DrainFn = fn(&mut ResourceManager, &str) -> bool;

/// A zero-refcount resource waiting for the next checkpoint.
pub(crate) struct PendingUnload {
    pub class: &'static str,
    pub name: String,
    pub drain: DrainFn,
}

/// FIFO of resources whose refcount reached zero.
#[derive(Default)]
pub(crate) struct UnloadQueue {
    entries: VecDeque<PendingUnload>,
}

impl UnloadQueue {
    pub fn push(&mut self, entry: PendingUnload) {
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<PendingUnload> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `Class 'name'` labels in queue order.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{} '{}'", e.class, e.name))
            .collect()
    }
}
