//! Resource and watcher capabilities.
//!
//! Every resource kind publishes a class name and a built-in default document,
//! so any `(kind, name)` can be requested before the host supplies real data.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::manager::ResourceManager;

/// A resource kind that can be materialized from a JSON document.
///
/// Lifecycle: `Default::default()` -> `load` -> (used) -> `unload` -> dropped.
pub trait Resource: Default + 'static {
    /// Class name used by host documents (`{"type": CLASS_NAME, ...}`).
    const CLASS_NAME: &'static str;

    /// Built-in default document. Must parse into `Desc`.
    const DEFAULT_DATA: &'static str;

    /// Typed view of the document.
    type Desc: DeserializeOwned;

    /// Builds all derived state from `desc`, acquiring sub-resources through `manager`.
    ///
    /// Always reconstructs from scratch; never skip work based on previous state.
    fn load(&mut self, manager: &mut ResourceManager, desc: Self::Desc) -> anyhow::Result<()>;

    /// Releases everything acquired in `load`. Must tolerate a partial or absent load.
    fn unload(&mut self, manager: &mut ResourceManager);
}

/// Parses a document into the kind's descriptor without consuming it.
pub fn parse_desc<T: Resource>(data: &Value) -> serde_json::Result<T::Desc> {
    T::Desc::deserialize(data)
}

/// The kind's default document.
///
/// # Panics
/// If `T::DEFAULT_DATA` is not valid JSON; that is a build error of the kind.
pub fn default_data<T: Resource>() -> Value {
    serde_json::from_str(T::DEFAULT_DATA).unwrap_or_else(|e| {
        panic!(
            "default data of resource class {} is malformed: {e}",
            T::CLASS_NAME
        )
    })
}

/// Notification payload delivered to watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUpdate {
    pub class: &'static str,
    pub name: String,
    /// Generation of the data now in effect.
    pub generation: u64,
}

/// Receives a callback after the observed resource's data was replaced.
///
/// Called synchronously once per accepted update, after the resource itself
/// has been reloaded. Implementers should rebuild derived state from scratch.
pub trait ResourceWatcher {
    fn on_resource_updated(&mut self, update: &ResourceUpdate);
}
