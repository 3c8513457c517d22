//! An image plus sampling state.

use engine_resources::{Handle, Resource, ResourceManager};
use serde::Deserialize;

use crate::device::{attached_device, Filter, GpuAllocation, GpuHandle, Wrap};

use super::Image;

#[derive(Debug, Deserialize)]
pub struct TextureDesc {
    pub image: String,
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub wrap: Wrap,
}

#[derive(Debug, Default)]
pub struct Texture {
    image: Option<Handle<Image>>,
    sampler: Option<GpuAllocation>,
    filter: Filter,
    wrap: Wrap,
}

impl Texture {
    pub fn image(&self) -> Option<&Handle<Image>> {
        self.image.as_ref()
    }

    /// Name of the image this texture samples.
    pub fn image_name(&self) -> Option<&str> {
        self.image.as_ref().map(Handle::name)
    }

    /// `(width, height)` of the current image; `(0, 0)` before load.
    pub fn size(&self) -> (u32, u32) {
        self.image
            .as_ref()
            .map(|image| image.get().size())
            .unwrap_or((0, 0))
    }

    pub fn sampler(&self) -> Option<GpuHandle> {
        self.sampler.as_ref().map(GpuAllocation::handle)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn wrap(&self) -> Wrap {
        self.wrap
    }
}

impl Resource for Texture {
    const CLASS_NAME: &'static str = "Texture";
    const DEFAULT_DATA: &'static str =
        r#"{"image": "__default", "filter": "linear", "wrap": "repeat"}"#;

    type Desc = TextureDesc;

    fn load(&mut self, manager: &mut ResourceManager, desc: TextureDesc) -> anyhow::Result<()> {
        self.image = Some(manager.request_resource::<Image>(&desc.image)?);

        let device = attached_device(manager)?;
        let sampler = device.create_sampler(desc.filter, desc.wrap)?;
        self.sampler = Some(GpuAllocation::new(device, sampler));
        self.filter = desc.filter;
        self.wrap = desc.wrap;
        Ok(())
    }

    fn unload(&mut self, manager: &mut ResourceManager) {
        if let Some(sampler) = self.sampler.take() {
            sampler.free();
        }
        if let Some(image) = self.image.take() {
            manager.release_resource(image);
        }
    }
}
