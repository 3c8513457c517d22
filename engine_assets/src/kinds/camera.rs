//! Camera lens parameters.

use engine_resources::{Resource, ResourceManager};
use serde::Deserialize;

use crate::{
    animation::{self, Animation, AnimationDesc},
    math::Mat4,
};

#[derive(Debug, Deserialize)]
pub struct CameraDesc {
    pub lens: f32,
    pub ortho_scale: f32,
    pub clip_start: f32,
    pub clip_end: f32,
    pub sensor_height: f32,
    #[serde(rename = "type")]
    pub projection: u8,
    pub shutter_speed: f32,
    #[serde(default)]
    pub animation: Option<AnimationDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
    /// Accepted but not rendered.
    Panoramic,
}

impl TryFrom<u8> for Projection {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> anyhow::Result<Self> {
        match value {
            0 => Ok(Projection::Perspective),
            1 => Ok(Projection::Orthographic),
            2 => Ok(Projection::Panoramic),
            other => anyhow::bail!("unknown camera type {other}"),
        }
    }
}

/// Lens values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LensParams {
    pub lens: f32,
    pub ortho_scale: f32,
    pub clip_start: f32,
    pub clip_end: f32,
    pub sensor_height: f32,
    pub shutter_speed: f32,
}

#[derive(Debug, Default)]
pub struct Camera {
    projection: Projection,
    params: LensParams,
    animation: Option<Animation>,
}

impl Camera {
    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn params(&self) -> LensParams {
        self.params
    }

    pub fn params_at(&self, time: f32) -> LensParams {
        let mut p = self.params;
        if let Some(anim) = &self.animation {
            anim.apply_scalar("lens", time, &mut p.lens);
            anim.apply_scalar("ortho_scale", time, &mut p.ortho_scale);
            anim.apply_scalar("clip_start", time, &mut p.clip_start);
            anim.apply_scalar("clip_end", time, &mut p.clip_end);
            anim.apply_scalar("shutter_speed", time, &mut p.shutter_speed);
        }
        p
    }

    /// Projection matrix for `aspect` (width / height) at `time`.
    ///
    /// Assumes a vertical sensor fit. `None` for panoramic cameras.
    pub fn projection_matrix(&self, aspect: f32, time: f32) -> Option<Mat4> {
        let p = self.params_at(time);
        match self.projection {
            Projection::Perspective => {
                let fovy = 2.0 * (0.5 * p.sensor_height / p.lens).atan();
                Some(Mat4::perspective(fovy, aspect, p.clip_start, p.clip_end))
            }
            Projection::Orthographic => {
                let sx = p.ortho_scale * 0.5;
                let sy = sx / aspect;
                Some(Mat4::orthographic(
                    -sx,
                    sx,
                    -sy,
                    sy,
                    p.clip_start,
                    p.clip_end,
                ))
            }
            Projection::Panoramic => None,
        }
    }
}

impl Resource for Camera {
    const CLASS_NAME: &'static str = "Camera";
    const DEFAULT_DATA: &'static str = r#"{"lens": 2.0, "ortho_scale": 1.0, "clip_start": 0.1, "clip_end": 100.0, "sensor_height": 35.0, "type": 0, "shutter_speed": 0.01}"#;

    type Desc = CameraDesc;

    fn load(&mut self, _manager: &mut ResourceManager, desc: CameraDesc) -> anyhow::Result<()> {
        anyhow::ensure!(desc.lens > 0.0, "camera lens must be positive");
        anyhow::ensure!(
            desc.clip_end > desc.clip_start,
            "clip_end must lie beyond clip_start"
        );
        self.projection = Projection::try_from(desc.projection)?;
        self.params = LensParams {
            lens: desc.lens,
            ortho_scale: desc.ortho_scale,
            clip_start: desc.clip_start,
            clip_end: desc.clip_end,
            sensor_height: desc.sensor_height,
            shutter_speed: desc.shutter_speed,
        };
        self.animation = animation::parse_optional(desc.animation)?;
        Ok(())
    }

    fn unload(&mut self, _manager: &mut ResourceManager) {
        self.animation = None;
    }
}
