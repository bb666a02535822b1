//! Immutable views of a settled pose.
//!
//! A snapshot is taken after the pose pipeline (local pose, world transforms, IK, deformation)
//! has finished for a frame. Snapshots share their buffers through `Arc`, so renderers and
//! hit-testers can hold and read them from other threads while the next frame is being posed.

use crate::geometry::{nearest_point, triangles_contain_point};
use crate::{Affine2, Bounds, DeformableMesh, Error, MeshTriangle, Skeleton, TextureRef, Vector2};
use byteorder::{ByteOrder, LittleEndian};
use std::sync::Arc;

/// Bytes per vertex written by [`MeshSnapshot::write_vertex_buffer`]: `[x, y, u, v]` as `f32`.
pub const VERTEX_STRIDE: usize = 16;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BonePose {
    pub name: String,
    pub parent: Option<usize>,
    pub length: f32,
    pub world: Affine2,
    pub world_rotation: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PoseSnapshot {
    bones: Arc<[BonePose]>,
}

impl PoseSnapshot {
    pub fn bones(&self) -> &[BonePose] {
        &self.bones
    }

    pub fn bone(&self, name: &str) -> Option<&BonePose> {
        self.bones.iter().find(|b| b.name == name)
    }

    #[cfg(feature = "json")]
    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Skeleton {
    /// Captures the cached world transforms. Call after the pose is settled.
    pub fn snapshot(&self) -> PoseSnapshot {
        let bones: Vec<BonePose> = self
            .bones()
            .iter()
            .map(|bone| BonePose {
                name: bone.name().to_string(),
                parent: bone.parent_index(),
                length: bone.length,
                world: *bone.world(),
                world_rotation: bone.world_rotation(),
            })
            .collect();
        PoseSnapshot {
            bones: bones.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct DeformedVertex {
    pub position: Vector2,
    pub uv: [f32; 2],
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct MeshSnapshot {
    version: u64,
    vertices: Arc<[DeformedVertex]>,
    triangles: Arc<[MeshTriangle]>,
    texture: Option<Arc<TextureRef>>,
}

impl MeshSnapshot {
    /// Deformation pass this snapshot was taken after.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vertices(&self) -> &[DeformedVertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[MeshTriangle] {
        &self.triangles
    }

    pub fn texture(&self) -> Option<&TextureRef> {
        self.texture.as_deref()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.iter().map(|v| v.position))
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        triangles_contain_point(
            &self.triangles,
            |i| self.vertices.get(i).map(|v| v.position),
            point,
        )
    }

    pub fn find_nearest_vertex(&self, point: Vector2, max_distance: f32) -> Option<usize> {
        nearest_point(
            self.vertices.iter().map(|v| v.position),
            point,
            max_distance,
        )
    }

    /// Appends interleaved little-endian `[x, y, u, v]` floats, [`VERTEX_STRIDE`] bytes per
    /// vertex.
    pub fn write_vertex_buffer(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + self.vertices.len() * VERTEX_STRIDE, 0);
        for (vertex, chunk) in self
            .vertices
            .iter()
            .zip(out[start..].chunks_exact_mut(VERTEX_STRIDE))
        {
            LittleEndian::write_f32(&mut chunk[0..4], vertex.position.x);
            LittleEndian::write_f32(&mut chunk[4..8], vertex.position.y);
            LittleEndian::write_f32(&mut chunk[8..12], vertex.uv[0]);
            LittleEndian::write_f32(&mut chunk[12..16], vertex.uv[1]);
        }
    }

    /// Appends triangle indices as little-endian `u32`.
    pub fn write_index_buffer(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        let mut indices = Vec::with_capacity(self.triangles.len() * 3);
        for triangle in self.triangles.iter() {
            for &index in &triangle.indices {
                let index = u32::try_from(index).map_err(|_| Error::InvalidValue {
                    message: format!("vertex index {index} does not fit a 32-bit index buffer"),
                })?;
                indices.push(index);
            }
        }
        let start = out.len();
        out.resize(start + indices.len() * 4, 0);
        LittleEndian::write_u32_into(&indices, &mut out[start..]);
        Ok(())
    }

    #[cfg(feature = "json")]
    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl DeformableMesh {
    /// Captures deformed positions and UVs. Call after [`DeformableMesh::update_deformation`].
    pub fn snapshot(&self) -> MeshSnapshot {
        let vertices: Vec<DeformedVertex> = self
            .vertices()
            .iter()
            .map(|v| DeformedVertex {
                position: v.world_position(),
                uv: v.uv(),
            })
            .collect();
        MeshSnapshot {
            version: self.version(),
            vertices: vertices.into(),
            triangles: self.triangles().into(),
            texture: self.texture.clone().map(Arc::new),
        }
    }
}
