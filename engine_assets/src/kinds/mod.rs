//! Resource kinds.
//!
//! Dependency order (a kind only requests kinds listed before it):
//! `Image`, `Texture`, `Mesh`, `Material`, `Camera`, `Light`, `Action`,
//! `ParticleSettings`, `Scene`.

mod action;
mod camera;
mod image;
mod light;
mod material;
mod mesh;
mod particle_settings;
mod scene;
mod texture;

pub use action::Action;
pub use camera::{Camera, CameraDesc, LensParams, Projection};
pub use image::{Image, ImageDesc};
pub use light::{Light, LightDesc, SpotParams};
pub use material::{MapSlot, Material, MaterialConstants, MaterialDesc};
pub use mesh::{Bounds, Mesh, MeshDesc, SubMesh, Vertex, FULLSCREEN_QUAD_DATA};
pub use particle_settings::{ParticleSettings, ParticleSettingsDesc, MAX_PARTICLES};
pub use scene::{InstanceDesc, MeshInstance, Scene, SceneDesc, SceneLight, SceneLightDesc};
pub use texture::{Texture, TextureDesc};

use engine_resources::ResourceManager;

/// Registers every kind with `manager`, in dependency order.
pub fn register_kinds(manager: &mut ResourceManager) {
    manager.register_class::<Image>();
    manager.register_class::<Texture>();
    manager.register_class::<Mesh>();
    manager.register_class::<Material>();
    manager.register_class::<Camera>();
    manager.register_class::<Light>();
    manager.register_class::<Action>();
    manager.register_class::<ParticleSettings>();
    manager.register_class::<Scene>();
}
