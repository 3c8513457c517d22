//! Shared fixtures for the integration tests.

use std::{path::PathBuf, rc::Rc};

use engine_assets::{Engine, EngineConfig, LoadReport, NullDevice};

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// An engine on a fresh null device.
pub fn engine() -> anyhow::Result<(Engine, Rc<NullDevice>)> {
    init_tracing();
    let device = NullDevice::shared();
    let engine = Engine::new(EngineConfig::default(), device.clone())?;
    Ok((engine, device))
}

/// Applies `payload` and fails unless every entry was accepted.
pub fn load_clean(engine: &mut Engine, payload: &str) -> anyhow::Result<LoadReport> {
    let report = engine.load_data(payload)?;
    anyhow::ensure!(report.is_clean(), "payload rejected: {:?}", report.rejected);
    Ok(report)
}

/// A fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> anyhow::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("engine_tests_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// A small level: two mesh instances sharing a mesh, two materials sharing a
/// texture, an animated instance, a light, a camera and one particle system.
///
/// Device objects held while `level` is current (besides the engine's quad):
/// mesh buffers (2), material constant buffers (2), textures `checker` and
/// `__default` (a sampler and an image texture each, 4).
pub const LEVEL: &str = r#"[
    {"type": "Image", "name": "checker", "data": {
        "width": 2, "height": 1, "format": "rgba8",
        "pixels": [0, 0, 0, 255, 255, 255, 255, 255]}},
    {"type": "Texture", "name": "checker", "data": {"image": "checker", "filter": "nearest"}},
    {"type": "Material", "name": "brick", "data": {
        "baseColorMultiplier": [1.0, 0.5, 0.5], "emissive": [0.0, 0.0, 0.0],
        "metallicOffset": 0.0, "roughnessOffset": 0.2,
        "baseColorMap": "checker", "normalMap": "__default",
        "metallicMap": "__default", "roughnessMap": "__default"}},
    {"type": "Material", "name": "glow", "data": {
        "baseColorMultiplier": [1.0, 1.0, 1.0], "emissive": [0.0, 1.0, 0.0],
        "metallicOffset": 0.0, "roughnessOffset": 0.0,
        "baseColorMap": "checker", "normalMap": "__default",
        "metallicMap": "__default", "roughnessMap": "__default",
        "animation": {"curves": [{"path": "emissive", "index": 0, "keyframes": [[0.0, 0.0], [1.0, 1.0]]}]}}},
    {"type": "Mesh", "name": "tri", "data": {
        "vertices": [{"position": [0, 0, 0]}, {"position": [1, 0, 0]}, {"position": [0, 1, 0]}],
        "indices": [0, 1, 2]}},
    {"type": "Action", "name": "rise", "data": {
        "curves": [{"path": "location", "index": 2, "keyframes": [[0.0, 0.0], [2.0, 4.0]]}]}},
    {"type": "Light", "name": "key", "data": {"color": [1.0, 0.9, 0.8], "radius": 5.0}},
    {"type": "Camera", "name": "main", "data": {
        "lens": 50.0, "ortho_scale": 1.0, "clip_start": 0.1, "clip_end": 100.0,
        "sensor_height": 24.0, "type": 0, "shutter_speed": 0.01}},
    {"type": "ParticleSettings", "name": "sparks", "data": {
        "count": 8, "lifetime": 1.0, "start_velocity": [0.0, 0.0, 1.0], "size": 0.1}},
    {"type": "Scene", "name": "level", "data": {
        "instances": [
            {"mesh": "tri", "material": "brick", "position": [0, 0, 0]},
            {"mesh": "tri", "material": "glow", "position": [2, 0, 0], "action": "rise"}
        ],
        "lights": [{"light": "key", "position": [0, 0, 5]}],
        "camera": "main",
        "particle_systems": [{"settings": "sparks", "seed": 42}]}}
]"#;

/// Device objects owned by the engine itself (the fullscreen quad's buffers).
pub const ENGINE_OBJECTS: usize = 2;

/// Device objects held by `LEVEL` while it is current.
pub const LEVEL_OBJECTS: usize = 8;
