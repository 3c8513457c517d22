//! `engine_host`
//!
//! Host side of the engine:
//! - Scans an asset directory for JSON payloads
//! - Re-sends edited files (hot reload)
//! - Runs the frame clock and ends every frame

pub mod assets;
pub mod host;

pub use assets::AssetDirectory;
pub use host::{FrameStats, Host};
