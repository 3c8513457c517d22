//! Lifecycle properties of the resource cache, exercised through real kinds
//! on a null device.

use std::{cell::RefCell, rc::Rc};

use engine_assets::{
    device::{Filter, GpuDevice},
    kinds::{Image, Light, MapSlot, Material, Texture},
};
use engine_resources::{ResourceError, ResourceUpdate, ResourceWatcher};
use engine_tests::{engine, ENGINE_OBJECTS};
use serde_json::json;

#[derive(Default)]
struct Generations(Vec<u64>);

impl ResourceWatcher for Generations {
    fn on_resource_updated(&mut self, update: &ResourceUpdate) {
        self.0.push(update.generation);
    }
}

/// Default data -> request -> update -> notify -> release -> drain -> rebuild from the update.
#[test]
fn texture_lifecycle_scenario() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    let rm = engine.resources_mut();

    let seen = Rc::new(RefCell::new(Generations::default()));
    let watcher = rm.register_watcher::<Texture, _>("tex_a", &seen);

    let handle = rm.request_resource::<Texture>("tex_a")?;
    assert_eq!(rm.refcount::<Texture>("tex_a"), Some(1));
    assert_eq!(handle.get().image_name(), Some("__default"));
    assert_eq!(rm.generation::<Texture>("tex_a"), Some(0));

    rm.update_resource_data::<Image>(
        "img_a",
        &json!({"width": 1, "height": 1, "pixels": [1, 2, 3, 4]}),
    )?;
    let generation = rm.update_resource_data::<Texture>(
        "tex_a",
        &json!({"image": "img_a", "filter": "nearest"}),
    )?;
    assert_eq!(generation, 1);
    assert_eq!(seen.borrow().0, vec![1]);
    // the outstanding handle observes the reload
    assert_eq!(handle.get().image_name(), Some("img_a"));
    assert_eq!(handle.get().filter(), Filter::Nearest);

    rm.release_resource(handle);
    assert_eq!(rm.refcount::<Texture>("tex_a"), Some(0));
    assert!(rm.is_loaded::<Texture>("tex_a"));

    rm.clear_pending_unloads();
    assert!(!rm.is_loaded::<Texture>("tex_a"));
    assert!(!rm.is_loaded::<Image>("img_a"));
    assert_eq!(device.live_objects(), ENGINE_OBJECTS);

    let rebuilt = rm.request_resource::<Texture>("tex_a")?;
    assert_eq!(rebuilt.get().image_name(), Some("img_a"));
    assert_eq!(rebuilt.get().filter(), Filter::Nearest);
    assert_eq!(seen.borrow().0, vec![1]);

    rm.release_resource(rebuilt);
    rm.unregister_watcher(watcher);
    engine.end_frame();
    assert_eq!(device.live_objects(), ENGINE_OBJECTS);
    Ok(())
}

#[test]
fn malformed_update_leaves_loaded_resource_unchanged() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    let rm = engine.resources_mut();

    rm.update_resource_data::<Light>("sun", &json!({"color": [1.0, 0.0, 0.0], "radius": 4.0}))?;
    let sun = rm.request_resource::<Light>("sun")?;

    let err = rm
        .update_resource_data::<Light>("sun", &json!({"color": "red"}))
        .unwrap_err();
    assert!(matches!(err, ResourceError::MalformedData { class: "Light", .. }));

    let err = rm
        .update_resource_data::<Light>("sun", &json!({"color": [0.0, 0.0, 1.0], "radius": -1.0}))
        .unwrap_err();
    assert!(matches!(err, ResourceError::Load { class: "Light", .. }));

    assert_eq!(sun.get().radius(), 4.0);
    assert_eq!(sun.get().color().x, 1.0);
    assert_eq!(rm.generation::<Light>("sun"), Some(1));
    assert_eq!(rm.stats().rejected_updates, 2);
    assert_eq!(rm.data::<Light>("sun"), Some(&json!({"color": [1.0, 0.0, 0.0], "radius": 4.0})));

    rm.release_resource(sun);
    Ok(())
}

#[test]
fn invalid_data_for_unloaded_resource_is_rejected() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    let rm = engine.resources_mut();

    let err = rm
        .update_resource_data::<Light>("lamp", &json!({"color": [1, 1, 1], "radius": -1.0}))
        .unwrap_err();
    assert!(matches!(err, ResourceError::Load { class: "Light", .. }));
    assert_eq!(rm.generation::<Light>("lamp"), Some(0));
    assert!(!rm.is_loaded::<Light>("lamp"));

    let lamp = rm.request_resource::<Light>("lamp")?;
    assert_eq!(lamp.get().radius(), 10.0);
    assert_eq!(rm.stats().fallbacks, 0);

    rm.release_resource(lamp);
    Ok(())
}

/// Load -> release -> drain -> bad update -> re-request still sees the last good data.
#[test]
fn bad_update_after_drain_keeps_last_good_data() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    let rm = engine.resources_mut();
    let good = json!({"width": 2, "height": 1, "format": "rgba8",
                      "pixels": [0, 0, 0, 255, 255, 255, 255, 255]});

    rm.update_resource_data::<Image>("x", &good)?;
    let x = rm.request_resource::<Image>("x")?;
    assert_eq!(x.get().size(), (2, 1));
    rm.release_resource(x);
    assert_eq!(rm.clear_pending_unloads(), 1);

    let seen = Rc::new(RefCell::new(Generations::default()));
    let watcher = rm.register_watcher::<Image, _>("x", &seen);
    let err = rm
        .update_resource_data::<Image>(
            "x",
            &json!({"width": 2, "height": 2, "format": "rgba8",
                    "pixels": [0, 0, 0, 255, 255, 255, 255, 255]}),
        )
        .unwrap_err();
    assert!(matches!(err, ResourceError::Load { class: "Image", .. }));
    assert_eq!(rm.data::<Image>("x"), Some(&good));
    assert_eq!(rm.generation::<Image>("x"), Some(1));
    assert!(seen.borrow().0.is_empty());
    assert_eq!(device.live_objects(), ENGINE_OBJECTS);

    let x = rm.request_resource::<Image>("x")?;
    assert_eq!(x.get().size(), (2, 1));
    assert_eq!(rm.stats().fallbacks, 0);

    rm.release_resource(x);
    rm.unregister_watcher(watcher);
    Ok(())
}

#[test]
fn release_defers_destruction_until_drain() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    let rm = engine.resources_mut();
    rm.update_resource_data::<Image>(
        "img",
        &json!({"width": 1, "height": 1, "format": "r8", "pixels": [7]}),
    )?;

    let img = rm.request_resource::<Image>("img")?;
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + 1);

    rm.release_resource(img);
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + 1);
    assert_eq!(rm.pending_unloads(), 1);

    // Re-requesting before the drain resurrects the same instance.
    let created = rm.stats().instances_created;
    let again = rm.request_resource::<Image>("img")?;
    assert_eq!(rm.stats().instances_created, created);
    assert_eq!(rm.clear_pending_unloads(), 0);
    assert_eq!(device.live_objects(), ENGINE_OBJECTS + 1);

    rm.release_resource(again);
    assert_eq!(rm.clear_pending_unloads(), 1);
    assert_eq!(rm.clear_pending_unloads(), 0);
    assert_eq!(device.live_objects(), ENGINE_OBJECTS);
    Ok(())
}

#[test]
fn repeated_requests_share_one_instance() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    let rm = engine.resources_mut();

    let a = rm.request_resource::<Material>("m")?;
    let b = rm.request_resource::<Material>("m")?;
    assert!(a.same_instance(&b));
    assert_eq!(rm.refcount::<Material>("m"), Some(2));
    // all four slots point at the one default texture
    assert_eq!(rm.refcount::<Texture>("__default"), Some(4));

    rm.release_resource(a);
    rm.release_resource(b);
    Ok(())
}

/// Updating a loaded material yields the same state as loading it after the update.
#[test]
fn reload_matches_fresh_load() -> anyhow::Result<()> {
    let doc = json!({
        "baseColorMultiplier": [0.2, 0.4, 0.6], "emissive": [0.0, 0.0, 0.0],
        "metallicOffset": 0.5, "roughnessOffset": 0.1,
        "baseColorMap": "stone", "normalMap": "__default",
        "metallicMap": "__default", "roughnessMap": "__default"
    });

    let (mut reloaded_engine, _d1) = engine()?;
    let rm = reloaded_engine.resources_mut();
    let reloaded = rm.request_resource::<Material>("m")?;
    rm.update_resource_data::<Material>("m", &doc)?;

    let (mut fresh_engine, _d2) = engine()?;
    let rm2 = fresh_engine.resources_mut();
    rm2.update_resource_data::<Material>("m", &doc)?;
    let fresh = rm2.request_resource::<Material>("m")?;

    {
        let (r, f) = (reloaded.get(), fresh.get());
        assert_eq!(r.constants(), f.constants());
        let base = |m: &Material| m.map(MapSlot::BaseColor).map(|t| t.name().to_string());
        assert_eq!(base(&r), Some("stone".to_string()));
        assert_eq!(base(&r), base(&f));
    }

    reloaded_engine.resources_mut().release_resource(reloaded);
    fresh_engine.resources_mut().release_resource(fresh);
    Ok(())
}

#[test]
fn unknown_class_is_recoverable() -> anyhow::Result<()> {
    let (mut engine, _device) = engine()?;
    let err = engine
        .resources_mut()
        .update_by_class("Shader", "x", &json!({}))
        .unwrap_err();
    assert!(matches!(err, ResourceError::UnknownClass(ref class) if class == "Shader"));
    Ok(())
}

#[test]
fn shutdown_frees_everything_despite_outstanding_handles() -> anyhow::Result<()> {
    let (mut engine, device) = engine()?;
    let held = engine.resources_mut().request_resource::<Material>("m")?;
    assert!(device.live_objects() > ENGINE_OBJECTS);

    engine.shutdown();
    assert_eq!(device.live_objects(), 0);
    drop(held);
    Ok(())
}
