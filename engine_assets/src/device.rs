//! Device abstraction.
//!
//! Resource kinds allocate GPU objects through this trait during `load` and
//! free them during `unload`. The engine attaches a [`SharedDevice`] to the
//! resource manager as context; the manager itself never looks at it.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use anyhow::Context;
use engine_resources::ResourceManager;
use serde::{Deserialize, Serialize};

/// Opaque device object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuHandle(pub u64);

/// What a device object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuObjectKind {
    Texture,
    Sampler,
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFormat {
    #[default]
    Rgba8,
    R8,
    Rgba16f,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::R8 => 1,
            TextureFormat::Rgba16f => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wrap {
    #[default]
    Repeat,
    Clamp,
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Constant,
}

/// A minimal device API.
pub trait GpuDevice {
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) -> anyhow::Result<GpuHandle>;
    fn create_sampler(&self, filter: Filter, wrap: Wrap) -> anyhow::Result<GpuHandle>;
    fn create_buffer(&self, usage: BufferUsage, bytes: &[u8]) -> anyhow::Result<GpuHandle>;
    fn destroy(&self, handle: GpuHandle);
    /// Number of objects created and not yet destroyed.
    fn live_objects(&self) -> usize;
}

/// How kinds reach the device.
pub type SharedDevice = Rc<dyn GpuDevice>;

/// Looks up the device attached to `manager`.
pub fn attached_device(manager: &ResourceManager) -> anyhow::Result<SharedDevice> {
    manager
        .context::<SharedDevice>()
        .cloned()
        .context("no GPU device attached to the resource manager")
}

/// A device object together with the device that must free it.
pub struct GpuAllocation {
    device: SharedDevice,
    handle: GpuHandle,
}

impl GpuAllocation {
    pub fn new(device: SharedDevice, handle: GpuHandle) -> Self {
        Self { device, handle }
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn free(self) {
        self.device.destroy(self.handle);
    }
}

impl fmt::Debug for GpuAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GpuAllocation").field(&self.handle).finish()
    }
}

/// A headless device that only tracks allocations. Useful for tests and tools.
#[derive(Default)]
pub struct NullDevice {
    next_id: Cell<u64>,
    live: RefCell<HashMap<GpuHandle, GpuObjectKind>>,
    created: Cell<u64>,
    destroyed: Cell<u64>,
    /// Fails every creation once set; lets tests exercise load failures.
    fail_allocations: Cell<bool>,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<NullDevice> {
        Rc::new(Self::new())
    }

    pub fn set_fail_allocations(&self, fail: bool) {
        self.fail_allocations.set(fail);
    }

    pub fn created(&self) -> u64 {
        self.created.get()
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed.get()
    }

    pub fn live_of_kind(&self, kind: GpuObjectKind) -> usize {
        self.live.borrow().values().filter(|k| **k == kind).count()
    }

    fn allocate(&self, kind: GpuObjectKind) -> anyhow::Result<GpuHandle> {
        if self.fail_allocations.get() {
            anyhow::bail!("device refused to allocate a {kind:?}");
        }
        let handle = GpuHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        self.created.set(self.created.get() + 1);
        self.live.borrow_mut().insert(handle, kind);
        Ok(handle)
    }
}

impl GpuDevice for NullDevice {
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) -> anyhow::Result<GpuHandle> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            anyhow::bail!(
                "texture upload of {} bytes does not match {width}x{height} {format:?}",
                pixels.len()
            );
        }
        self.allocate(GpuObjectKind::Texture)
    }

    fn create_sampler(&self, _filter: Filter, _wrap: Wrap) -> anyhow::Result<GpuHandle> {
        self.allocate(GpuObjectKind::Sampler)
    }

    fn create_buffer(&self, _usage: BufferUsage, bytes: &[u8]) -> anyhow::Result<GpuHandle> {
        if bytes.is_empty() {
            anyhow::bail!("zero-sized buffer");
        }
        self.allocate(GpuObjectKind::Buffer)
    }

    fn destroy(&self, handle: GpuHandle) {
        if self.live.borrow_mut().remove(&handle).is_some() {
            self.destroyed.set(self.destroyed.get() + 1);
        } else {
            tracing::warn!(?handle, "destroy of unknown device object");
        }
    }

    fn live_objects(&self) -> usize {
        self.live.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_device_tracks_live_objects() {
        let device = NullDevice::new();
        let tex = device
            .create_texture(1, 1, TextureFormat::Rgba8, &[0, 0, 0, 255])
            .unwrap();
        let sampler = device.create_sampler(Filter::Linear, Wrap::Repeat).unwrap();
        assert_eq!(device.live_objects(), 2);
        assert_eq!(device.live_of_kind(GpuObjectKind::Sampler), 1);

        device.destroy(tex);
        device.destroy(sampler);
        assert_eq!(device.live_objects(), 0);
        assert_eq!(device.destroyed(), 2);
    }

    #[test]
    fn texture_upload_size_is_checked() {
        let device = NullDevice::new();
        assert!(device
            .create_texture(2, 2, TextureFormat::Rgba8, &[0; 4])
            .is_err());
    }

    #[test]
    fn missing_device_is_an_error() {
        let manager = ResourceManager::new();
        assert!(attached_device(&manager).is_err());
    }
}
