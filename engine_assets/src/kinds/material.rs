//! Surface shading parameters and texture maps.

use engine_resources::{Handle, Resource, ResourceManager};
use serde::Deserialize;

use crate::{
    animation::{self, Animation, AnimationDesc},
    device::{attached_device, BufferUsage, GpuAllocation, GpuHandle},
    math::Vec3,
};

use super::Texture;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDesc {
    pub base_color_multiplier: [f32; 3],
    pub emissive: [f32; 3],
    pub metallic_offset: f32,
    pub roughness_offset: f32,
    pub base_color_map: String,
    pub normal_map: String,
    pub metallic_map: String,
    pub roughness_map: String,
    #[serde(default)]
    pub animation: Option<AnimationDesc>,
}

/// Texture slots, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSlot {
    BaseColor = 0,
    Normal = 1,
    Metallic = 2,
    Roughness = 3,
}

/// Values fed to the standard shader.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialConstants {
    pub base_color_multiplier: Vec3,
    pub emissive: Vec3,
    pub metallic_offset: f32,
    pub roughness_offset: f32,
}

impl MaterialConstants {
    fn to_bytes(self) -> Vec<u8> {
        let floats = [
            self.base_color_multiplier.x,
            self.base_color_multiplier.y,
            self.base_color_multiplier.z,
            self.metallic_offset,
            self.emissive.x,
            self.emissive.y,
            self.emissive.z,
            self.roughness_offset,
        ];
        floats.iter().flat_map(|f| f.to_le_bytes()).collect()
    }
}

#[derive(Debug, Default)]
pub struct Material {
    constants: MaterialConstants,
    /// Acquired maps in [`MapSlot`] order; shorter than four only after a failed load.
    maps: Vec<Handle<Texture>>,
    animation: Option<Animation>,
    constant_buffer: Option<GpuAllocation>,
}

impl Material {
    pub fn constants(&self) -> MaterialConstants {
        self.constants
    }

    /// Constants with the inline animation (if any) applied at `time`.
    pub fn constants_at(&self, time: f32) -> MaterialConstants {
        let mut c = self.constants;
        if let Some(anim) = &self.animation {
            anim.apply_vec3("diffuse_color", time, &mut c.base_color_multiplier);
            anim.apply_vec3("emissive", time, &mut c.emissive);
            anim.apply_scalar("metallic_offset", time, &mut c.metallic_offset);
            anim.apply_scalar("roughness_offset", time, &mut c.roughness_offset);
        }
        c
    }

    pub fn map(&self, slot: MapSlot) -> Option<&Handle<Texture>> {
        self.maps.get(slot as usize)
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn constant_buffer(&self) -> Option<GpuHandle> {
        self.constant_buffer.as_ref().map(GpuAllocation::handle)
    }
}

impl Resource for Material {
    const CLASS_NAME: &'static str = "Material";
    const DEFAULT_DATA: &'static str = r#"{
        "baseColorMultiplier": [1.0, 1.0, 1.0],
        "emissive": [0.0, 0.0, 0.0],
        "metallicOffset": 0.0,
        "roughnessOffset": 0.0,
        "baseColorMap": "__default",
        "normalMap": "__default",
        "metallicMap": "__default",
        "roughnessMap": "__default"
    }"#;

    type Desc = MaterialDesc;

    fn load(&mut self, manager: &mut ResourceManager, desc: MaterialDesc) -> anyhow::Result<()> {
        self.constants = MaterialConstants {
            base_color_multiplier: Vec3::from_array(desc.base_color_multiplier),
            emissive: Vec3::from_array(desc.emissive),
            metallic_offset: desc.metallic_offset,
            roughness_offset: desc.roughness_offset,
        };
        self.animation = animation::parse_optional(desc.animation)?;

        for name in [
            &desc.base_color_map,
            &desc.normal_map,
            &desc.metallic_map,
            &desc.roughness_map,
        ] {
            let texture = manager.request_resource::<Texture>(name)?;
            self.maps.push(texture);
        }

        let device = attached_device(manager)?;
        let cb = device.create_buffer(BufferUsage::Constant, &self.constants.to_bytes())?;
        self.constant_buffer = Some(GpuAllocation::new(device, cb));
        Ok(())
    }

    fn unload(&mut self, manager: &mut ResourceManager) {
        if let Some(cb) = self.constant_buffer.take() {
            cb.free();
        }
        for texture in self.maps.drain(..) {
            manager.release_resource(texture);
        }
        self.animation = None;
    }
}
