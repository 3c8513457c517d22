//! Indexed triangle geometry.
//!
//! - Vertices are `position/normal/uv` records.
//! - Submeshes are index ranges; an index list without submeshes forms one
//!   implicit submesh covering every index.
//! - Empty geometry allocates no device buffers.

use anyhow::ensure;
use engine_resources::{Resource, ResourceManager};
use serde::Deserialize;

use crate::{
    device::{attached_device, BufferUsage, GpuAllocation, GpuHandle},
    math::Vec3,
};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    #[serde(default)]
    pub normal: [f32; 3],
    #[serde(default)]
    pub uv: [f32; 2],
}

impl Vertex {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        for f in self.position.iter().chain(&self.normal).chain(&self.uv) {
            out.extend_from_slice(&f.to_le_bytes());
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct SubMesh {
    pub first_index: u32,
    pub index_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct MeshDesc {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub submeshes: Vec<SubMesh>,
}

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Debug, Default)]
pub struct Mesh {
    vertex_count: usize,
    index_count: usize,
    submeshes: Vec<SubMesh>,
    bounds: Bounds,
    vertex_buffer: Option<GpuAllocation>,
    index_buffer: Option<GpuAllocation>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn buffers(&self) -> Option<(GpuHandle, GpuHandle)> {
        Some((
            self.vertex_buffer.as_ref()?.handle(),
            self.index_buffer.as_ref()?.handle(),
        ))
    }

    fn free_buffers(&mut self) {
        for buffer in [self.vertex_buffer.take(), self.index_buffer.take()]
            .into_iter()
            .flatten()
        {
            buffer.free();
        }
    }
}

fn validate(desc: &MeshDesc) -> anyhow::Result<Vec<SubMesh>> {
    let vertex_count = desc.vertices.len();
    ensure!(
        desc.indices.len() % 3 == 0,
        "index count {} is not a multiple of 3",
        desc.indices.len()
    );
    if let Some(bad) = desc.indices.iter().find(|&&i| i as usize >= vertex_count) {
        anyhow::bail!("index {bad} out of range for {vertex_count} vertices");
    }

    if desc.submeshes.is_empty() && !desc.indices.is_empty() {
        return Ok(vec![SubMesh {
            first_index: 0,
            index_count: desc.indices.len() as u32,
        }]);
    }
    for (i, sub) in desc.submeshes.iter().enumerate() {
        let end = sub.first_index as usize + sub.index_count as usize;
        ensure!(
            end <= desc.indices.len(),
            "submesh {i} spans indices {}..{end} but only {} exist",
            sub.first_index,
            desc.indices.len()
        );
    }
    Ok(desc.submeshes.clone())
}

fn bounds_of(vertices: &[Vertex]) -> Bounds {
    let mut points = vertices.iter().map(|v| Vec3::from_array(v.position));
    let Some(first) = points.next() else {
        return Bounds::default();
    };
    points.fold(
        Bounds {
            min: first,
            max: first,
        },
        |b, p| Bounds {
            min: b.min.min(p),
            max: b.max.max(p),
        },
    )
}

impl Resource for Mesh {
    const CLASS_NAME: &'static str = "Mesh";
    const DEFAULT_DATA: &'static str = r#"{"vertices": [], "indices": [], "submeshes": []}"#;

    type Desc = MeshDesc;

    fn load(&mut self, manager: &mut ResourceManager, desc: MeshDesc) -> anyhow::Result<()> {
        self.submeshes = validate(&desc)?;
        self.bounds = bounds_of(&desc.vertices);
        self.vertex_count = desc.vertices.len();
        self.index_count = desc.indices.len();

        if desc.vertices.is_empty() || desc.indices.is_empty() {
            return Ok(());
        }

        let device = attached_device(manager)?;
        let mut vertex_bytes = Vec::with_capacity(desc.vertices.len() * 32);
        for v in &desc.vertices {
            v.write_bytes(&mut vertex_bytes);
        }
        let vb = device.create_buffer(BufferUsage::Vertex, &vertex_bytes)?;
        self.vertex_buffer = Some(GpuAllocation::new(device.clone(), vb));

        let index_bytes: Vec<u8> = desc.indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        let ib = device.create_buffer(BufferUsage::Index, &index_bytes)?;
        self.index_buffer = Some(GpuAllocation::new(device, ib));
        Ok(())
    }

    fn unload(&mut self, _manager: &mut ResourceManager) {
        self.free_buffers();
    }
}

/// Document of the engine's built-in fullscreen quad (two triangles in clip space).
pub const FULLSCREEN_QUAD_DATA: &str = r#"{
    "vertices": [
        {"position": [-1.0, -1.0, 0.0], "uv": [0.0, 1.0]},
        {"position": [ 1.0, -1.0, 0.0], "uv": [1.0, 1.0]},
        {"position": [ 1.0,  1.0, 0.0], "uv": [1.0, 0.0]},
        {"position": [-1.0,  1.0, 0.0], "uv": [0.0, 0.0]}
    ],
    "indices": [0, 1, 2, 0, 2, 3]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(json: &str) -> MeshDesc {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn implicit_submesh_covers_all_indices() {
        let d = desc(FULLSCREEN_QUAD_DATA);
        let subs = validate(&d).unwrap();
        assert_eq!(
            subs,
            vec![SubMesh {
                first_index: 0,
                index_count: 6
            }]
        );
        let b = bounds_of(&d.vertices);
        assert_eq!(b.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let d = desc(r#"{"vertices": [{"position": [0,0,0]}], "indices": [0, 0, 1]}"#);
        assert!(validate(&d).is_err());
    }

    #[test]
    fn submesh_past_the_end_is_rejected() {
        let d = desc(
            r#"{"vertices": [{"position": [0,0,0]}], "indices": [0, 0, 0],
                "submeshes": [{"first_index": 3, "index_count": 3}]}"#,
        );
        assert!(validate(&d).is_err());
    }
}
