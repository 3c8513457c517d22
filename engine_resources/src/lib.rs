//! `engine_resources`
//!
//! Resource cache shared by every engine subsystem.
//!
//! Design goals:
//! - Resources are named, typed and lazily materialized from JSON documents.
//! - One instance per `(kind, name)`, refcounted, destroyed only at an explicit
//!   checkpoint (`clear_pending_unloads`).
//! - Hot reload replaces a resource's state in place; outstanding handles stay valid.
//! - Watchers are notified synchronously after a reload has completed.
//! - Single owner: the manager is `!Send` and every operation runs to completion.

pub mod error;
pub mod handle;
pub mod manager;
pub mod resource;
pub mod watcher;

mod descriptor;
mod pending;

pub use error::ResourceError;
pub use handle::Handle;
pub use manager::{ManagerStats, ResourceManager};
pub use resource::{Resource, ResourceUpdate, ResourceWatcher};
pub use watcher::WatcherId;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::error::ResourceError;
    pub use crate::handle::Handle;
    pub use crate::manager::ResourceManager;
    pub use crate::resource::{Resource, ResourceUpdate, ResourceWatcher};
    pub use crate::watcher::WatcherId;
}
