//! Hot reload through the engine facade: edits to leaf resources propagate
//! to everything that references them, in place, between two frames.

use std::{cell::RefCell, rc::Rc};

use engine_assets::{
    device::GpuDevice,
    kinds::{Image, MapSlot, Material, Mesh, ParticleSettings, Scene, Texture},
    math::Vec3,
};
use engine_resources::{ResourceUpdate, ResourceWatcher};
use engine_tests::{engine, load_clean, ENGINE_OBJECTS, LEVEL, LEVEL_OBJECTS};
use serde_json::json;

#[test]
fn level_loads_and_renders() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + LEVEL_OBJECTS);

    let rm = engine.resources();
    assert_eq!(rm.refcount::<Mesh>("tri"), Some(2));
    assert_eq!(rm.refcount::<Texture>("checker"), Some(2));
    assert_eq!(rm.refcount::<Texture>("__default"), Some(6));
    assert_eq!(rm.refcount::<Image>("checker"), Some(1));

    engine.update_animation(0.5);
    let frame = engine.render(1.0);
    assert_eq!(frame.jobs.len(), 2);
    assert_eq!(frame.lights.len(), 1);
    // spawn times 0, 0.125, ... 0.875 with a one second lifetime
    assert_eq!(frame.particles.len(), 5);
    assert!(frame.projection.is_some());

    engine.update_animation(1.0);
    let frame = engine.render(1.0);
    let materials: Vec<&str> = frame.jobs.iter().map(|j| j.material.as_str()).collect();
    assert_eq!(materials, ["brick", "glow"]);
    let glow = &frame.jobs[1];
    assert_eq!(glow.transform.transform_point(Vec3::ZERO), Vec3::new(2.0, 0.0, 2.0));
    assert_eq!(glow.constants.emissive, Vec3::new(1.0, 1.0, 0.0));

    assert_eq!(engine.end_frame(), 0);
    Ok(())
}

#[test]
fn image_edit_is_visible_through_shared_textures() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;

    load_clean(
        &mut engine,
        r#"{"type": "Image", "name": "checker", "data": {
            "width": 4, "height": 1, "format": "r8", "pixels": [0, 64, 128, 255]}}"#,
    )?;

    let scene = engine.scene().expect("scene is set").get();
    for instance in scene.instances() {
        let material = instance.material.get();
        let base = material.map(MapSlot::BaseColor).expect("base color map");
        assert_eq!(base.get().size(), (4, 1));
    }
    drop(scene);

    // new image texture allocated, old one freed during the swap
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + LEVEL_OBJECTS);
    assert_eq!(engine.end_frame(), 0);
    Ok(())
}

#[test]
fn particle_settings_edit_rebuilds_simulation() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;

    load_clean(
        &mut engine,
        r#"{"type": "ParticleSettings", "name": "sparks", "data": {
            "count": 3, "lifetime": 10.0, "start_velocity": [1.0, 0.0, 0.0], "size": 0.5}}"#,
    )?;

    {
        let scene = engine.scene().expect("scene is set").get();
        let system = scene.particle_systems().next().expect("one system").borrow();
        assert_eq!(system.rebuilds(), 1);
        assert_eq!(system.settings_generation(), 2);
        assert_eq!(system.particles().len(), 3);
    }

    engine.update_animation(9.0);
    let frame = engine.render(1.0);
    assert_eq!(frame.particles.len(), 3);
    assert!(frame.particles.iter().all(|p| p.size == 0.5));
    Ok(())
}

#[test]
fn scene_edit_reloads_in_place_and_releases_dropped_parts() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;

    load_clean(
        &mut engine,
        r#"{"type": "Scene", "name": "level", "data": {
            "instances": [{"mesh": "tri", "material": "brick"}],
            "lights": [{"light": "key"}],
            "camera": "main"}}"#,
    )?;

    let frame = engine.render(1.0);
    assert_eq!(frame.jobs.len(), 1);
    assert!(frame.particles.is_empty());
    assert_eq!(engine.resources().refcount::<Mesh>("tri"), Some(1));
    assert_eq!(engine.resources().refcount::<Material>("glow"), Some(0));

    // glow material, rise action and sparks settings
    assert_eq!(engine.end_frame(), 3);
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + LEVEL_OBJECTS - 1);
    assert_eq!(engine.resources().watcher_count(), 0);
    Ok(())
}

#[test]
fn scene_reload_keeps_the_engine_time() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;
    engine.update_animation(0.5);
    let before = engine.render(1.0);

    load_clean(
        &mut engine,
        r#"{"type": "Scene", "name": "level", "data": {
            "instances": [
                {"mesh": "tri", "material": "brick", "position": [0, 0, 0]},
                {"mesh": "tri", "material": "glow", "position": [2, 0, 0], "action": "rise"}
            ],
            "lights": [{"light": "key", "position": [0, 0, 5]}],
            "camera": "main",
            "particle_systems": [{"settings": "sparks", "seed": 42}]}}"#,
    )?;
    assert_eq!(engine.resources().generation::<Scene>("level"), Some(2));
    assert_eq!(engine.scene().expect("scene is set").get().time(), 0.5);

    // no update_animation in between
    let after = engine.render(1.0);
    assert_eq!(after.particles.len(), 5);
    assert_eq!(after.particles, before.particles);
    let glow = &after.jobs[1];
    assert_eq!(glow.transform.transform_point(Vec3::ZERO), Vec3::new(2.0, 0.0, 1.0));
    assert_eq!(glow.constants.emissive.x, 0.5);

    assert_eq!(engine.end_frame(), 0);
    Ok(())
}

#[test]
fn rejected_scene_edit_keeps_the_old_scene() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;

    let report = engine.load_data(r#"{"type": "Scene", "name": "level", "data": {"instances": 5}}"#)?;
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(engine.resources().generation::<Scene>("level"), Some(1));
    assert_eq!(engine.render(1.0).jobs.len(), 2);
    assert_eq!(engine.end_frame(), 0);
    Ok(())
}

#[test]
fn switching_scenes_destroys_the_old_one_at_end_of_frame() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    load_clean(&mut engine, LEVEL)?;
    engine.set_scene("level")?;

    engine.set_scene("empty")?;
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + LEVEL_OBJECTS);
    assert!(engine.resources().is_loaded::<Scene>("level"));

    // level, tri, brick, glow, rise, key, main, sparks, two textures, two images
    assert_eq!(engine.end_frame(), 12);
    assert_eq!(device.live_objects(), ENGINE_OBJECTS);
    assert!(engine.render(1.0).is_empty());
    Ok(())
}

struct Tagged {
    tag: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl ResourceWatcher for Tagged {
    fn on_resource_updated(&mut self, update: &ResourceUpdate) {
        self.log
            .borrow_mut()
            .push(format!("{} {} {}", self.tag, update.name, update.generation));
    }
}

#[test]
fn watchers_fire_in_registration_order_once_per_update() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    let log = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::new(RefCell::new(Tagged {
        tag: "first",
        log: log.clone(),
    }));
    let second = Rc::new(RefCell::new(Tagged {
        tag: "second",
        log: log.clone(),
    }));

    let rm = engine.resources_mut();
    let first_id = rm.register_watcher::<ParticleSettings, _>("dust", &first);
    let second_id = rm.register_watcher::<ParticleSettings, _>("dust", &second);

    let doc = json!({"count": 1, "lifetime": 1.0, "start_velocity": [0, 0, 0], "size": 1.0});
    rm.update_resource_data::<ParticleSettings>("dust", &doc)?;
    assert_eq!(*log.borrow(), ["first dust 1", "second dust 1"]);

    rm.unregister_watcher(first_id);
    rm.update_resource_data::<ParticleSettings>("dust", &doc)?;
    assert_eq!(*log.borrow(), ["first dust 1", "second dust 1", "second dust 2"]);

    rm.unregister_watcher(second_id);
    assert_eq!(rm.watcher_count(), 0);
    Ok(())
}
