//! `engine_assets`
//!
//! Resource kinds and the engine facade built on `engine_resources`.
//!
//! Modules:
//! - `kinds`: every resource kind (images up to scenes).
//! - `particles`: particle systems that watch their settings.
//! - `device`: the device collaborator kinds allocate through.
//! - `documents`: host envelopes.
//! - `engine`: frame protocol and lifetime of the whole stack.

pub mod animation;
pub mod config;
pub mod device;
pub mod documents;
pub mod engine;
pub mod kinds;
pub mod math;
pub mod particles;
pub mod render_list;

pub use config::EngineConfig;
pub use device::{GpuDevice, NullDevice, SharedDevice};
pub use documents::{HostDocument, LoadReport};
pub use engine::{Engine, FULLSCREEN_QUAD};
