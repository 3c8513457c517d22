//! Engine facade.
//!
//! Owns the resource manager and the device, and fixes the frame protocol:
//!
//! 1. `load_data` applies host documents (hot reload included).
//! 2. `update_animation` advances the current scene.
//! 3. `render` builds the frame's [`RenderList`].
//! 4. `end_frame` drains deferred unloads, after the frame's device work.
//!
//! `shutdown` (or drop) releases the built-ins, drains, and forces the manager
//! down while the device is still attached.

use anyhow::Context;
use engine_resources::{Handle, ResourceManager};
use tracing::{info, warn};

use crate::{
    config::EngineConfig,
    device::SharedDevice,
    documents::{parse_documents, AppliedDocument, LoadReport, RejectedDocument},
    kinds::{register_kinds, Mesh, Scene, FULLSCREEN_QUAD_DATA},
    render_list::RenderList,
};

/// Name of the built-in mesh held for the engine's lifetime.
pub const FULLSCREEN_QUAD: &str = "__fullscreenQuad";

pub struct Engine {
    config: EngineConfig,
    resources: ResourceManager,
    device: SharedDevice,
    fullscreen_quad: Option<Handle<Mesh>>,
    scene: Option<Handle<Scene>>,
    time: f32,
    frame: u64,
    shut_down: bool,
}

impl Engine {
    pub fn new(config: EngineConfig, device: SharedDevice) -> anyhow::Result<Self> {
        let mut resources = ResourceManager::new();
        register_kinds(&mut resources);
        resources.insert_context::<SharedDevice>(device.clone());

        let quad_data =
            serde_json::from_str(FULLSCREEN_QUAD_DATA).context("built-in quad is not JSON")?;
        resources
            .update_resource_data::<Mesh>(FULLSCREEN_QUAD, &quad_data)
            .context("failed to register the fullscreen quad")?;
        let fullscreen_quad = resources
            .request_resource::<Mesh>(FULLSCREEN_QUAD)
            .context("failed to load the fullscreen quad")?;

        info!(classes = ?resources.classes(), "engine initialized");
        Ok(Self {
            config,
            resources,
            device,
            fullscreen_quad: Some(fullscreen_quad),
            scene: None,
            time: 0.0,
            frame: 0,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    pub fn fullscreen_quad(&self) -> Option<&Handle<Mesh>> {
        self.fullscreen_quad.as_ref()
    }

    pub fn scene(&self) -> Option<&Handle<Scene>> {
        self.scene.as_ref()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Applies every envelope in `text`.
    ///
    /// Returns `Err` only if `text` is not JSON; per-entry failures are
    /// collected in the report and logged. The current scene is brought back
    /// to the engine's animation time afterwards, so a `render` right after
    /// a reload shows the same moment as before it.
    pub fn load_data(&mut self, text: &str) -> anyhow::Result<LoadReport> {
        let mut report = LoadReport::default();
        for (index, entry) in parse_documents(text)?.into_iter().enumerate() {
            let doc = match entry {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(index, error = %err, "malformed host envelope");
                    report.rejected.push(RejectedDocument {
                        index,
                        label: None,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            match self
                .resources
                .update_by_class(&doc.class, &doc.name, &doc.data)
            {
                Ok(generation) => report.applied.push(AppliedDocument {
                    class: doc.class,
                    name: doc.name,
                    generation,
                }),
                Err(err) => {
                    report.rejected.push(RejectedDocument {
                        index,
                        label: Some(format!("{}/{}", doc.class, doc.name)),
                        error: format!("{:#}", anyhow::Error::new(err)),
                    });
                }
            }
        }
        // Reloaded scenes and rebuilt particle systems start at time zero.
        if let Some(scene) = &self.scene {
            scene.get().update_animation(self.time);
        }
        info!(%report, "host data loaded");
        Ok(report)
    }

    /// Makes `name` the current scene. The previous scene is released and
    /// destroyed at the next `end_frame` unless still referenced.
    pub fn set_scene(&mut self, name: &str) -> anyhow::Result<()> {
        let scene = self
            .resources
            .request_resource::<Scene>(name)
            .with_context(|| format!("failed to set scene '{name}'"))?;
        scene.get().update_animation(self.time);
        if let Some(previous) = self.scene.replace(scene) {
            self.resources.release_resource(previous);
        }
        info!(scene = name, "scene changed");
        Ok(())
    }

    pub fn clear_scene(&mut self) {
        if let Some(previous) = self.scene.take() {
            self.resources.release_resource(previous);
        }
    }

    pub fn update_animation(&mut self, time: f32) {
        self.time = time;
        if let Some(scene) = &self.scene {
            scene.get().update_animation(time);
        }
    }

    /// Builds this frame's render list for a viewport of the given aspect ratio.
    pub fn render(&self, aspect: f32) -> RenderList {
        let mut list = RenderList::default();
        if let Some(scene) = &self.scene {
            let scene = scene.get();
            scene.fill_render_list(&mut list);
            list.projection = scene
                .camera()
                .and_then(|camera| camera.get().projection_matrix(aspect, self.time));
        }
        list.sort_by_material();
        list
    }

    /// Ends the frame: destroys every resource released to zero since the last call.
    pub fn end_frame(&mut self) -> usize {
        self.frame += 1;
        self.resources.clear_pending_unloads()
    }

    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.clear_scene();
        if let Some(quad) = self.fullscreen_quad.take() {
            self.resources.release_resource(quad);
        }
        self.resources.clear_pending_unloads();
        self.resources.shutdown();
        self.resources.remove_context::<SharedDevice>();

        let live = self.device.live_objects();
        if live > 0 {
            warn!(live, "device objects leaked at shutdown");
        } else {
            info!(frames = self.frame, "engine shut down");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.teardown();
        }
    }
}
