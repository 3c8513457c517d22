//! Raw pixel data uploaded as a device texture.

use anyhow::ensure;
use engine_resources::{Resource, ResourceManager};
use serde::Deserialize;

use crate::device::{attached_device, GpuAllocation, TextureFormat};

#[derive(Debug, Deserialize)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Image {
    width: u32,
    height: u32,
    format: TextureFormat,
    texture: Option<GpuAllocation>,
}

impl Image {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn texture(&self) -> Option<crate::device::GpuHandle> {
        self.texture.as_ref().map(GpuAllocation::handle)
    }
}

impl Resource for Image {
    const CLASS_NAME: &'static str = "Image";
    const DEFAULT_DATA: &'static str =
        r#"{"width": 1, "height": 1, "format": "rgba8", "pixels": [255, 255, 255, 255]}"#;

    type Desc = ImageDesc;

    fn load(&mut self, manager: &mut ResourceManager, desc: ImageDesc) -> anyhow::Result<()> {
        ensure!(desc.width > 0 && desc.height > 0, "image has zero extent");
        let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
        ensure!(
            desc.pixels.len() == expected,
            "expected {expected} bytes of {:?} pixels, got {}",
            desc.format,
            desc.pixels.len()
        );

        let device = attached_device(manager)?;
        let handle = device.create_texture(desc.width, desc.height, desc.format, &desc.pixels)?;
        self.texture = Some(GpuAllocation::new(device, handle));
        self.width = desc.width;
        self.height = desc.height;
        self.format = desc.format;
        Ok(())
    }

    fn unload(&mut self, _manager: &mut ResourceManager) {
        if let Some(texture) = self.texture.take() {
            texture.free();
        }
    }
}
