//! Scenes: mesh instances, lights, a camera and particle systems.

use std::cell::Cell;

use engine_resources::{Handle, Resource, ResourceManager, WatcherId};
use serde::Deserialize;

use crate::{
    math::{Mat4, Vec3},
    particles::{ParticleSystem, ParticleSystemDesc, SharedParticleSystem},
    render_list::{RenderJob, RenderLight, RenderList},
};

use super::{Action, Camera, Light, Material, Mesh};

#[derive(Debug, Deserialize)]
pub struct InstanceDesc {
    pub mesh: String,
    #[serde(default = "default_material")]
    pub material: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub action: Option<String>,
}

fn default_material() -> String {
    "__default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SceneLightDesc {
    pub light: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_direction")]
    pub direction: [f32; 3],
}

fn default_direction() -> [f32; 3] {
    [0.0, 0.0, -1.0]
}

#[derive(Debug, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub instances: Vec<InstanceDesc>,
    #[serde(default)]
    pub lights: Vec<SceneLightDesc>,
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub particle_systems: Vec<ParticleSystemDesc>,
}

pub struct MeshInstance {
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
    pub position: Vec3,
    pub action: Option<Handle<Action>>,
}

impl MeshInstance {
    pub fn position_at(&self, time: f32) -> Vec3 {
        match &self.action {
            Some(action) => action.get().location_at(self.position, time),
            None => self.position,
        }
    }
}

pub struct SceneLight {
    pub light: Handle<Light>,
    pub position: Vec3,
    pub direction: Vec3,
}

#[derive(Default)]
pub struct Scene {
    instances: Vec<MeshInstance>,
    lights: Vec<SceneLight>,
    camera: Option<Handle<Camera>>,
    particle_systems: Vec<(SharedParticleSystem, WatcherId)>,
    time: Cell<f32>,
}

impl Scene {
    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    pub fn lights(&self) -> &[SceneLight] {
        &self.lights
    }

    pub fn camera(&self) -> Option<&Handle<Camera>> {
        self.camera.as_ref()
    }

    pub fn particle_systems(&self) -> impl Iterator<Item = &SharedParticleSystem> {
        self.particle_systems.iter().map(|(system, _)| system)
    }

    /// Animation time last passed to [`Scene::update_animation`].
    pub fn time(&self) -> f32 {
        self.time.get()
    }

    /// Moves every animated part of the scene to absolute `time`.
    pub fn update_animation(&self, time: f32) {
        self.time.set(time);
        for (system, _) in &self.particle_systems {
            system.borrow_mut().update(time);
        }
    }

    /// Appends this frame's draw jobs, lights and particles to `list`.
    pub fn fill_render_list(&self, list: &mut RenderList) {
        let time = self.time.get();
        for instance in &self.instances {
            let transform = Mat4::translation(instance.position_at(time));
            let constants = instance.material.get().constants_at(time);
            let mesh = instance.mesh.get();
            for submesh in 0..mesh.submeshes().len() {
                list.jobs.push(RenderJob {
                    mesh: instance.mesh.name().to_string(),
                    submesh,
                    material: instance.material.name().to_string(),
                    constants,
                    transform,
                });
            }
        }
        for scene_light in &self.lights {
            let light = scene_light.light.get();
            list.lights.push(RenderLight {
                position: scene_light.position,
                direction: scene_light.direction,
                color: light.color_at(time),
                radius: light.radius(),
                spot: light.spot(),
            });
        }
        for (system, _) in &self.particle_systems {
            system.borrow().fill_render_list(list);
        }
    }

    fn load_instance(
        manager: &mut ResourceManager,
        desc: &InstanceDesc,
    ) -> anyhow::Result<MeshInstance> {
        let mesh = manager.request_resource::<Mesh>(&desc.mesh)?;
        let material = match manager.request_resource::<Material>(&desc.material) {
            Ok(material) => material,
            Err(err) => {
                manager.release_resource(mesh);
                return Err(err.into());
            }
        };
        let action = match desc.action.as_deref().map(|name| manager.request_resource::<Action>(name)) {
            None => None,
            Some(Ok(action)) => Some(action),
            Some(Err(err)) => {
                manager.release_resource(mesh);
                manager.release_resource(material);
                return Err(err.into());
            }
        };
        Ok(MeshInstance {
            mesh,
            material,
            position: Vec3::from_array(desc.position),
            action,
        })
    }
}

impl Resource for Scene {
    const CLASS_NAME: &'static str = "Scene";
    const DEFAULT_DATA: &'static str = r#"{"instances": [], "lights": []}"#;

    type Desc = SceneDesc;

    fn load(&mut self, manager: &mut ResourceManager, desc: SceneDesc) -> anyhow::Result<()> {
        for instance in &desc.instances {
            let instance = Self::load_instance(manager, instance)?;
            self.instances.push(instance);
        }
        for light in &desc.lights {
            self.lights.push(SceneLight {
                light: manager.request_resource::<Light>(&light.light)?,
                position: Vec3::from_array(light.position),
                direction: Vec3::from_array(light.direction),
            });
        }
        if let Some(camera) = &desc.camera {
            self.camera = Some(manager.request_resource::<Camera>(camera)?);
        }
        for system in &desc.particle_systems {
            let spawned = ParticleSystem::spawn(manager, system)?;
            self.particle_systems.push(spawned);
        }
        Ok(())
    }

    fn unload(&mut self, manager: &mut ResourceManager) {
        for (system, id) in self.particle_systems.drain(..) {
            ParticleSystem::despawn(&system, id, manager);
        }
        if let Some(camera) = self.camera.take() {
            manager.release_resource(camera);
        }
        for scene_light in self.lights.drain(..) {
            manager.release_resource(scene_light.light);
        }
        for instance in self.instances.drain(..) {
            manager.release_resource(instance.mesh);
            manager.release_resource(instance.material);
            if let Some(action) = instance.action {
                manager.release_resource(action);
            }
        }
    }
}
