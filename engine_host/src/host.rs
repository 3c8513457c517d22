//! Host frame loop.
//!
//! Drives an [`Engine`] the way an editor bridge would: poll the asset
//! directory every few frames, push changed payloads, advance animation,
//! build the frame and end it.

use std::path::Path;

use anyhow::Context;
use engine_assets::{
    documents::RejectedDocument, Engine, EngineConfig, LoadReport, SharedDevice,
};
use tracing::{info, warn};

use crate::assets::AssetDirectory;

/// Aspect ratio used for the headless frame.
const VIEWPORT_ASPECT: f32 = 16.0 / 9.0;

/// Per-frame counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frame: u64,
    pub jobs: usize,
    pub lights: usize,
    pub particles: usize,
    pub destroyed: usize,
}

pub struct Host {
    engine: Engine,
    assets: AssetDirectory,
    frames_until_poll: u32,
    scene_pending: Option<String>,
}

impl Host {
    pub fn new(config: EngineConfig, device: SharedDevice) -> anyhow::Result<Self> {
        let assets = AssetDirectory::new(&config.asset_dir);
        let scene_pending = config.scene.clone();
        let engine = Engine::new(config, device).context("failed to start engine")?;
        Ok(Self {
            engine,
            assets,
            frames_until_poll: 0,
            scene_pending,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Pushes every new or edited payload file to the engine.
    pub fn poll_assets(&mut self) -> anyhow::Result<LoadReport> {
        let mut report = LoadReport::default();
        for path in self.assets.scan()? {
            report.merge(self.load_file(&path));
        }
        if !report.applied.is_empty() || !report.rejected.is_empty() {
            info!(%report, dir = %self.assets.root().display(), "asset scan applied");
        }
        Ok(report)
    }

    fn load_file(&mut self, path: &Path) -> LoadReport {
        let loaded = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .and_then(|text| self.engine.load_data(&text));
        match loaded {
            Ok(report) => {
                for rejected in &report.rejected {
                    warn!(
                        file = %path.display(),
                        entry = rejected.index,
                        label = rejected.label.as_deref().unwrap_or("?"),
                        error = %rejected.error,
                        "host document rejected"
                    );
                }
                report
            }
            Err(err) => {
                warn!(file = %path.display(), error = %format!("{err:#}"), "payload file skipped");
                LoadReport {
                    applied: Vec::new(),
                    rejected: vec![RejectedDocument {
                        index: 0,
                        label: Some(path.display().to_string()),
                        error: format!("{err:#}"),
                    }],
                }
            }
        }
    }

    /// Runs one frame at absolute `time` (seconds).
    pub fn frame(&mut self, time: f32) -> anyhow::Result<FrameStats> {
        if self.frames_until_poll == 0 {
            self.poll_assets()?;
            self.frames_until_poll = self.engine.config().poll_interval_frames.max(1);
            if let Some(scene) = self.scene_pending.take() {
                self.engine.set_scene(&scene)?;
            }
        }
        self.frames_until_poll -= 1;

        self.engine.update_animation(time);
        let list = self.engine.render(VIEWPORT_ASPECT);
        let destroyed = self.engine.end_frame();
        Ok(FrameStats {
            frame: self.engine.frame(),
            jobs: list.jobs.len(),
            lights: list.lights.len(),
            particles: list.particles.len(),
            destroyed,
        })
    }

    /// Runs the frame clock until `max_frames` (forever when unset).
    pub async fn run(&mut self) -> anyhow::Result<u64> {
        let config = self.engine.config().clone();
        let mut interval = tokio::time::interval(config.frame_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let start = tokio::time::Instant::now();

        loop {
            if config.max_frames.is_some_and(|max| self.engine.frame() >= max) {
                break;
            }
            interval.tick().await;
            let time = start.elapsed().as_secs_f32();
            let stats = self.frame(time)?;
            if stats.destroyed > 0 {
                info!(frame = stats.frame, destroyed = stats.destroyed, "frame ended");
            }
        }
        Ok(self.engine.frame())
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use engine_assets::{kinds::Light, NullDevice};

    use super::*;

    #[test]
    fn edited_file_is_reloaded_on_next_poll() {
        let dir = std::env::temp_dir().join(format!("engine_host_loop_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("lights.json"),
            r#"{"type": "Light", "name": "sun", "data": {"color": [1, 0, 0]}}"#,
        )
        .unwrap();

        let config = EngineConfig {
            asset_dir: dir.display().to_string(),
            poll_interval_frames: 2,
            ..EngineConfig::default()
        };
        let mut host = Host::new(config, NullDevice::shared()).unwrap();
        host.frame(0.0).unwrap();
        let rm = host.engine().resources();
        assert_eq!(rm.generation::<Light>("sun"), Some(1));

        fs::write(
            dir.join("lights.json"),
            r#"{"type": "Light", "name": "sun", "data": {"color": [0.5, 0.5, 0.5], "radius": 3}}"#,
        )
        .unwrap();
        // second frame of the interval does not poll
        host.frame(0.1).unwrap();
        assert_eq!(host.engine().resources().generation::<Light>("sun"), Some(1));
        host.frame(0.2).unwrap();
        assert_eq!(host.engine().resources().generation::<Light>("sun"), Some(2));

        host.shutdown();
        fs::remove_dir_all(&dir).unwrap();
    }
}
