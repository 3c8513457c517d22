//! Per-frame draw submission.
//!
//! A `RenderList` is rebuilt every frame from the current scene; it only holds
//! plain values so it can outlive any borrow of the resources it came from.

use crate::{
    kinds::{MaterialConstants, SpotParams},
    math::{Mat4, Vec3},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub mesh: String,
    pub submesh: usize,
    pub material: String,
    pub constants: MaterialConstants,
    pub transform: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub radius: f32,
    pub spot: Option<SpotParams>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParticle {
    pub position: Vec3,
    pub size: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RenderList {
    pub jobs: Vec<RenderJob>,
    pub lights: Vec<RenderLight>,
    pub particles: Vec<RenderParticle>,
    pub projection: Option<Mat4>,
}

impl RenderList {
    pub fn clear(&mut self) {
        self.jobs.clear();
        self.lights.clear();
        self.particles.clear();
        self.projection = None;
    }

    /// Groups jobs sharing a material so state changes are minimized.
    pub fn sort_by_material(&mut self) {
        self.jobs.sort_by(|a, b| a.material.cmp(&b.material));
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.lights.is_empty() && self.particles.is_empty()
    }
}
