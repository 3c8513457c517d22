//! Particle systems.
//!
//! A particle system is not a resource: it is owned by a scene, holds a
//! handle to its `ParticleSettings`, and watches them. Every accepted settings
//! update re-seeds and rebuilds the simulation, so an edit is visible on the
//! next frame without reloading the scene.
//!
//! Simulation is closed-form and seeded, so the same `(seed, settings, time)`
//! always yields the same particles.

use std::{cell::RefCell, rc::Rc};

use engine_resources::{
    Handle, ResourceError, ResourceManager, ResourceUpdate, ResourceWatcher, WatcherId,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use crate::{kinds::ParticleSettings, math::Vec3, render_list::RenderList};

/// How a scene document describes one particle system.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParticleSystemDesc {
    pub settings: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub start_time: f32,
    pub end_time: f32,
    pub visible: bool,
    pub spawn_velocity: Vec3,
    pub position: Vec3,
    pub size: f32,
}

pub struct ParticleSystem {
    settings: Option<Handle<ParticleSettings>>,
    emitter: Vec3,
    seed: u64,
    simulation_time: f32,
    particles: Vec<Particle>,
    rebuilds: u32,
    settings_generation: u64,
}

/// A particle system as stored by its owner.
pub type SharedParticleSystem = Rc<RefCell<ParticleSystem>>;

impl ParticleSystem {
    /// Acquires the settings, builds the simulation and starts watching the settings.
    pub fn spawn(
        manager: &mut ResourceManager,
        desc: &ParticleSystemDesc,
    ) -> Result<(SharedParticleSystem, WatcherId), ResourceError> {
        let settings = manager.request_resource::<ParticleSettings>(&desc.settings)?;
        let settings_generation = manager
            .generation::<ParticleSettings>(&desc.settings)
            .unwrap_or(0);

        let mut system = ParticleSystem {
            settings: Some(settings),
            emitter: Vec3::from_array(desc.position),
            seed: desc.seed,
            simulation_time: 0.0,
            particles: Vec::new(),
            rebuilds: 0,
            settings_generation,
        };
        system.create_simulation();

        let system = Rc::new(RefCell::new(system));
        let id = manager.register_watcher::<ParticleSettings, _>(&desc.settings, &system);
        Ok((system, id))
    }

    /// Stops watching and gives the settings handle back.
    pub fn despawn(system: &SharedParticleSystem, id: WatcherId, manager: &mut ResourceManager) {
        manager.unregister_watcher(id);
        let settings = system.borrow_mut().settings.take();
        if let Some(settings) = settings {
            manager.release_resource(settings);
        }
    }

    fn current_settings(&self) -> ParticleSettings {
        self.settings
            .as_ref()
            .map(|s| *s.get())
            .unwrap_or_default()
    }

    fn create_simulation(&mut self) {
        let settings = self.current_settings();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let count = settings.count.max(1) as f32;

        self.particles = (0..settings.count)
            .map(|i| {
                let start_time = settings.emit_duration * i as f32 / count;
                let jitter = random_in_unit_sphere(&mut rng) * settings.spread;
                Particle {
                    start_time,
                    end_time: start_time + settings.lifetime,
                    visible: false,
                    spawn_velocity: settings.start_velocity + jitter,
                    position: self.emitter,
                    size: settings.size,
                }
            })
            .collect();
        self.step(self.simulation_time);
    }

    fn step(&mut self, time: f32) {
        let gravity = self.current_settings().gravity;
        for p in &mut self.particles {
            p.visible = time >= p.start_time && time < p.end_time;
            let age = (time - p.start_time).max(0.0);
            p.position = self.emitter + p.spawn_velocity * age + gravity * (0.5 * age * age);
        }
    }

    /// Advances the simulation to absolute `time`.
    pub fn update(&mut self, time: f32) {
        self.simulation_time = time;
        self.step(time);
    }

    pub fn fill_render_list(&self, list: &mut RenderList) {
        list.particles.extend(
            self.particles
                .iter()
                .filter(|p| p.visible)
                .map(|p| crate::render_list::RenderParticle {
                    position: p.position,
                    size: p.size,
                }),
        );
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn visible_count(&self) -> usize {
        self.particles.iter().filter(|p| p.visible).count()
    }

    /// Number of rebuilds triggered by settings updates.
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    pub fn settings_generation(&self) -> u64 {
        self.settings_generation
    }

    pub fn settings_name(&self) -> Option<&str> {
        self.settings.as_ref().map(Handle::name)
    }
}

fn random_in_unit_sphere(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.len_sq() <= 1.0 {
            return v;
        }
    }
}

impl ResourceWatcher for ParticleSystem {
    fn on_resource_updated(&mut self, update: &ResourceUpdate) {
        self.settings_generation = update.generation;
        self.rebuilds += 1;
        self.create_simulation();
        debug!(
            settings = %update.name,
            generation = update.generation,
            particles = self.particles.len(),
            "particle simulation rebuilt"
        );
    }
}
