//! Watcher registrations.
//!
//! The manager never owns a watcher. Registrations live in a slot arena with
//! generation-checked ids and hold only `Weak` references, so a watcher can be
//! dropped without unregistering and the manager will skip it.

use std::{cell::RefCell, rc::Weak};

use crate::{manager::ResourceManager, resource::ResourceWatcher};

/// Identifies one watcher registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId {
    index: u32,
    generation: u32,
}

/// Removes a registration id from its descriptor's watcher list.
pub(crate) type DetachFn = fn(&mut ResourceManager, &str, WatcherId);

pub(crate) struct WatcherEntry {
    pub class: &'static str,
    pub name: String,
    pub watcher: Weak<RefCell<dyn ResourceWatcher>>,
    pub detach: DetachFn,
}

struct WatcherSlot {
    generation: u32,
    entry: Option<WatcherEntry>,
}

/// Slot arena of registrations with a free list.
#[derive(Default)]
pub(crate) struct WatcherSlots {
    slots: Vec<WatcherSlot>,
    free_list: Vec<u32>,
}

impl WatcherSlots {
    pub fn insert(&mut self, entry: WatcherEntry) -> WatcherId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return WatcherId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(WatcherSlot {
            generation: 0,
            entry: Some(entry),
        });
        WatcherId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: WatcherId) -> Option<&WatcherEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Removes a live registration. Stale or unknown ids return `None`.
    pub fn remove(&mut self, id: WatcherId) -> Option<WatcherEntry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(index as u32);
            }
        }
    }
}
