//! Point and spot lights.

use engine_resources::{Resource, ResourceManager};
use serde::Deserialize;

use crate::{
    animation::{self, Animation, AnimationDesc},
    math::Vec3,
};

#[derive(Debug, Deserialize)]
pub struct LightDesc {
    pub color: [f32; 3],
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub spot: bool,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub blend: f32,
    #[serde(default)]
    pub scattering: f32,
    #[serde(default)]
    pub animation: Option<AnimationDesc>,
}

fn default_radius() -> f32 {
    10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpotParams {
    pub angle: f32,
    pub blend: f32,
}

#[derive(Debug, Default)]
pub struct Light {
    color: Vec3,
    radius: f32,
    spot: Option<SpotParams>,
    scattering: f32,
    animation: Option<Animation>,
}

impl Light {
    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn color_at(&self, time: f32) -> Vec3 {
        let mut color = self.color;
        if let Some(anim) = &self.animation {
            anim.apply_vec3("color", time, &mut color);
        }
        color
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn spot(&self) -> Option<SpotParams> {
        self.spot
    }

    pub fn scattering(&self) -> f32 {
        self.scattering
    }
}

impl Resource for Light {
    const CLASS_NAME: &'static str = "Light";
    const DEFAULT_DATA: &'static str = r#"{"color": [1.0, 1.0, 1.0], "radius": 10.0}"#;

    type Desc = LightDesc;

    fn load(&mut self, _manager: &mut ResourceManager, desc: LightDesc) -> anyhow::Result<()> {
        anyhow::ensure!(desc.radius > 0.0, "light radius must be positive");
        self.color = Vec3::from_array(desc.color);
        self.radius = desc.radius;
        self.spot = desc.spot.then_some(SpotParams {
            angle: desc.angle,
            blend: desc.blend,
        });
        self.scattering = desc.scattering;
        self.animation = animation::parse_optional(desc.animation)?;
        Ok(())
    }

    fn unload(&mut self, _manager: &mut ResourceManager) {
        self.animation = None;
    }
}
