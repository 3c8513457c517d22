//! Emitter parameters shared by particle systems.

use anyhow::ensure;
use engine_resources::{Resource, ResourceManager};
use serde::Deserialize;

use crate::math::Vec3;

#[derive(Debug, Deserialize)]
pub struct ParticleSettingsDesc {
    pub count: u32,
    pub lifetime: f32,
    pub start_velocity: [f32; 3],
    #[serde(default)]
    pub spread: f32,
    pub size: f32,
    #[serde(default)]
    pub gravity: [f32; 3],
    /// Time over which all particles are emitted; defaults to `lifetime`.
    #[serde(default)]
    pub emit_duration: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleSettings {
    pub count: u32,
    pub lifetime: f32,
    pub start_velocity: Vec3,
    pub spread: f32,
    pub size: f32,
    pub gravity: Vec3,
    pub emit_duration: f32,
}

/// Upper bound on particles per system.
pub const MAX_PARTICLES: u32 = 100_000;

impl Resource for ParticleSettings {
    const CLASS_NAME: &'static str = "ParticleSettings";
    const DEFAULT_DATA: &'static str = r#"{"count": 100, "lifetime": 1.0, "start_velocity": [0.0, 0.0, 1.0], "spread": 0.5, "size": 0.05, "gravity": [0.0, 0.0, -9.81]}"#;

    type Desc = ParticleSettingsDesc;

    fn load(
        &mut self,
        _manager: &mut ResourceManager,
        desc: ParticleSettingsDesc,
    ) -> anyhow::Result<()> {
        ensure!(desc.lifetime > 0.0, "particle lifetime must be positive");
        ensure!(
            desc.count <= MAX_PARTICLES,
            "particle count {} exceeds {MAX_PARTICLES}",
            desc.count
        );
        ensure!(desc.spread >= 0.0, "particle spread must not be negative");
        let emit_duration = desc.emit_duration.unwrap_or(desc.lifetime);
        ensure!(emit_duration >= 0.0, "emit_duration must not be negative");

        *self = ParticleSettings {
            count: desc.count,
            lifetime: desc.lifetime,
            start_velocity: Vec3::from_array(desc.start_velocity),
            spread: desc.spread,
            size: desc.size,
            gravity: Vec3::from_array(desc.gravity),
            emit_duration,
        };
        Ok(())
    }

    fn unload(&mut self, _manager: &mut ResourceManager) {}
}
