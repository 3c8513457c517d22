//! Named, reusable animation clips.

use engine_resources::{Resource, ResourceManager};

use crate::{
    animation::{Animation, AnimationDesc},
    math::Vec3,
};

#[derive(Debug, Default)]
pub struct Action {
    animation: Animation,
}

impl Action {
    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    /// Instance position at `time`, starting from `rest`.
    pub fn location_at(&self, rest: Vec3, time: f32) -> Vec3 {
        let mut p = rest;
        self.animation.apply_vec3("location", time, &mut p);
        p
    }
}

impl Resource for Action {
    const CLASS_NAME: &'static str = "Action";
    const DEFAULT_DATA: &'static str = r#"{"curves": []}"#;

    type Desc = AnimationDesc;

    fn load(&mut self, _manager: &mut ResourceManager, desc: AnimationDesc) -> anyhow::Result<()> {
        self.animation = Animation::from_desc(desc)?;
        Ok(())
    }

    fn unload(&mut self, _manager: &mut ResourceManager) {
        self.animation = Animation::default();
    }
}
