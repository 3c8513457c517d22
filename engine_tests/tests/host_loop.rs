//! Host payload dispatch and the asset-directory frame loop.

use std::fs;

use engine_assets::{
    kinds::{Light, ParticleSettings},
    EngineConfig, NullDevice,
};
use engine_host::Host;
use engine_tests::{engine, init_tracing, scratch_dir, LEVEL};

#[test]
fn mixed_payload_applies_good_entries_and_reports_bad_ones() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    engine.resources_mut().update_resource_data::<Light>(
        "loaded",
        &serde_json::json!({"color": [1, 1, 1]}),
    )?;
    let held = engine.resources_mut().request_resource::<Light>("loaded")?;

    let report = engine.load_data(
        r#"[
            {"type": "Light", "name": "a", "data": {"color": [1, 0, 0]}},
            {"name": "no-type", "data": {}},
            {"type": "Shader", "name": "s", "data": {}},
            {"type": "Light", "name": "b", "data": {"color": "blue"}},
            {"type": "Light", "name": "loaded", "data": {"color": [0, 0, 0], "radius": 0}},
            {"type": "Light", "name": "c", "data": {"color": [0, 0, 1]}}
        ]"#,
    )?;

    let applied: Vec<&str> = report.applied.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(applied, ["a", "c"]);
    let rejected: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
    assert_eq!(rejected, [1, 2, 3, 4]);
    assert_eq!(report.rejected[0].label, None);
    assert_eq!(report.rejected[3].label.as_deref(), Some("Light/loaded"));
    assert_eq!(held.get().radius(), 10.0);

    engine.resources_mut().release_resource(held);
    Ok(())
}

#[test]
fn non_json_payload_is_an_error() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    assert!(engine.load_data("{ not json").is_err());
    Ok(())
}

#[test]
fn host_loads_directory_sets_scene_and_hot_reloads() -> anyhow::Result<()> {
    init_tracing();
    let dir = scratch_dir("host_reload")?;
    fs::write(dir.join("level.json"), LEVEL)?;

    let config = EngineConfig {
        asset_dir: dir.display().to_string(),
        poll_interval_frames: 1,
        scene: Some("level".to_string()),
        ..EngineConfig::default()
    };
    let mut host = Host::new(config, NullDevice::shared())?;

    let stats = host.frame(0.5)?;
    assert_eq!(stats.frame, 1);
    assert_eq!(stats.jobs, 2);
    assert_eq!(stats.lights, 1);
    assert_eq!(stats.particles, 5);

    fs::write(
        dir.join("particles.json"),
        r#"{"type": "ParticleSettings", "name": "sparks", "data": {
            "count": 2, "lifetime": 5.0, "emit_duration": 0.0,
            "start_velocity": [0, 0, 1], "size": 0.2}}"#,
    )?;
    let stats = host.frame(1.0)?;
    assert_eq!(stats.particles, 2);
    assert_eq!(
        host.engine().resources().generation::<ParticleSettings>("sparks"),
        Some(2)
    );

    host.shutdown();
    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn broken_file_does_not_stop_the_loop() -> anyhow::Result<()> {
    init_tracing();
    let dir = scratch_dir("host_broken")?;
    fs::write(dir.join("a_broken.json"), "{ nope")?;
    fs::write(
        dir.join("b_light.json"),
        r#"{"type": "Light", "name": "sun", "data": {"color": [1, 1, 1]}}"#,
    )?;

    let config = EngineConfig {
        asset_dir: dir.display().to_string(),
        ..EngineConfig::default()
    };
    let mut host = Host::new(config, NullDevice::shared())?;
    let report = host.poll_assets()?;
    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.rejected.len(), 1);
    assert!(host.poll_assets()?.applied.is_empty());

    host.shutdown();
    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn run_stops_after_max_frames() -> anyhow::Result<()> {
    init_tracing();
    let config = EngineConfig {
        asset_dir: "/nonexistent/engine_tests/assets".to_string(),
        frame_hz: 1000,
        max_frames: Some(3),
        ..EngineConfig::default()
    };
    let mut host = Host::new(config, NullDevice::shared())?;
    assert_eq!(host.run().await?, 3);
    host.shutdown();
    Ok(())
}
