use crate::geometry::{Triangulator, nearest_point, triangles_contain_point};
use crate::{Bounds, Error, MeshTriangle, MeshVertex, Skeleton, TextureRef, Vector2};

/// Keeps inverse-distance weights finite when a vertex sits on a bone origin.
const AUTO_SKIN_EPSILON: f32 = 0.001;

/// Total weights at or below this make a vertex pass through undeformed.
const DEFORM_WEIGHT_EPSILON: f32 = 1.0e-6;

/// A textured triangle mesh deformed by the bones of a [`Skeleton`].
///
/// The mesh does not own a skeleton. Skinning operations take the skeleton they read from, and
/// weights refer to bones by index in that skeleton.
#[derive(Clone, Debug, Default)]
pub struct DeformableMesh {
    pub name: String,
    pub texture: Option<TextureRef>,
    vertices: Vec<MeshVertex>,
    triangles: Vec<MeshTriangle>,
    bounds: Option<Bounds>,
    version: u64,
}

impl DeformableMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_texture(mut self, texture: TextureRef) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[MeshTriangle] {
        &self.triangles
    }

    pub fn vertex(&self, index: usize) -> Option<&MeshVertex> {
        self.vertices.get(index)
    }

    pub fn triangle(&self, index: usize) -> Option<&MeshTriangle> {
        self.triangles.get(index)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Local-space bounds of the rest vertices; `None` while the mesh is empty.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Bounds of the deformed vertices as of the last deformation pass.
    pub fn world_bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.iter().map(MeshVertex::world_position))
    }

    /// Number of completed deformation passes.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn add_vertex(&mut self, vertex: MeshVertex) -> usize {
        self.vertices.push(vertex);
        self.recompute_bounds();
        self.vertices.len() - 1
    }

    pub fn set_vertex_position(&mut self, index: usize, x: f32, y: f32) -> Result<(), Error> {
        let vertex = self
            .vertices
            .get_mut(index)
            .ok_or(Error::InvalidVertexIndex { index })?;
        vertex.x = x;
        vertex.y = y;
        if !vertex.has_weights() {
            vertex.set_world_position(Vector2::new(x, y));
        }
        self.recompute_bounds();
        Ok(())
    }

    pub fn set_vertex_uv(&mut self, index: usize, u: f32, v: f32) -> Result<(), Error> {
        let vertex = self
            .vertices
            .get_mut(index)
            .ok_or(Error::InvalidVertexIndex { index })?;
        vertex.u = u;
        vertex.v = v;
        Ok(())
    }

    /// Adds one influence to a vertex. Returns whether the bounded influence set accepted it.
    pub fn add_vertex_weight(&mut self, index: usize, bone: usize, weight: f32) -> Result<bool, Error> {
        let vertex = self
            .vertices
            .get_mut(index)
            .ok_or(Error::InvalidVertexIndex { index })?;
        Ok(vertex.add_weight(bone, weight))
    }

    /// Replaces the influences of a vertex with `weights` (bone index, weight), normalized.
    pub fn set_vertex_weights(&mut self, index: usize, weights: &[(usize, f32)]) -> Result<(), Error> {
        let vertex = self
            .vertices
            .get_mut(index)
            .ok_or(Error::InvalidVertexIndex { index })?;
        vertex.clear_weights();
        for &(bone, weight) in weights {
            vertex.add_weight(bone, weight);
        }
        vertex.normalize_weights();
        Ok(())
    }

    pub fn normalize_weights(&mut self) {
        for vertex in &mut self.vertices {
            vertex.normalize_weights();
        }
    }

    pub fn clear_weights(&mut self) {
        for vertex in &mut self.vertices {
            vertex.clear_weights();
        }
    }

    pub fn add_triangle(&mut self, a: usize, b: usize, c: usize) -> Result<usize, Error> {
        if let Some(&index) = [a, b, c].iter().find(|&&i| i >= self.vertices.len()) {
            return Err(Error::InvalidVertexIndex { index });
        }
        self.triangles.push(MeshTriangle::new(a, b, c));
        Ok(self.triangles.len() - 1)
    }

    /// Removes a vertex, every triangle that uses it, and renumbers the remaining triangles.
    pub fn remove_vertex(&mut self, index: usize) -> Result<MeshVertex, Error> {
        if index >= self.vertices.len() {
            return Err(Error::InvalidVertexIndex { index });
        }
        let removed = self.vertices.remove(index);
        self.triangles.retain(|t| !t.references(index));
        for triangle in &mut self.triangles {
            for i in &mut triangle.indices {
                if *i > index {
                    *i -= 1;
                }
            }
        }
        self.recompute_bounds();
        Ok(removed)
    }

    pub fn remove_triangle(&mut self, index: usize) -> Result<MeshTriangle, Error> {
        if index >= self.triangles.len() {
            return Err(Error::InvalidTriangleIndex { index });
        }
        Ok(self.triangles.remove(index))
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.bounds = None;
    }

    /// Replaces the triangles with an ear-clipping triangulation of the vertex outline, taking
    /// vertices in order as a simple polygon. Returns the new triangle count.
    pub fn triangulate(&mut self) -> usize {
        let outline: Vec<Vector2> = self.vertices.iter().map(MeshVertex::position).collect();
        self.triangles = Triangulator
            .triangulate(&outline)
            .into_iter()
            .map(|[a, b, c]| MeshTriangle::new(a, b, c))
            .collect();
        self.triangles.len()
    }

    /// Assigns inverse-distance weights from every bone whose world origin lies within
    /// `max_distance` of the vertex's rest position.
    ///
    /// Existing weights are discarded. Influences map the vertex's local position through the
    /// bone's world transform; follow with [`DeformableMesh::bind_to_pose`] to make the current
    /// pose the bind pose instead. Vertices out of reach of every bone end up unweighted, as do
    /// all vertices when `max_distance` is negative or NaN.
    pub fn auto_skin(&mut self, skeleton: &Skeleton, max_distance: f32) {
        for vertex in &mut self.vertices {
            vertex.clear_weights();
            let position = vertex.position();
            for (index, bone) in skeleton.bones().iter().enumerate() {
                let distance = bone.world_position().distance(position);
                let in_range = distance <= max_distance;
                if !in_range {
                    continue;
                }
                vertex.add_weight(index, 1.0 / (distance + AUTO_SKIN_EPSILON));
            }
            vertex.normalize_weights();
            vertex.set_world_position(position);
        }
    }

    /// Makes the skeleton's current pose the bind pose for the existing weights.
    ///
    /// Influences of missing or degenerate bones keep their previous offsets.
    pub fn bind_to_pose(&mut self, skeleton: &Skeleton) {
        for vertex in &mut self.vertices {
            let position = vertex.position();
            for weight in vertex.weights_mut() {
                let Some(local) = skeleton
                    .bone(weight.bone)
                    .and_then(|bone| bone.world_to_local(position))
                else {
                    continue;
                };
                weight.x = local.x;
                weight.y = local.y;
            }
        }
    }

    /// Follows [`Skeleton::remove_bone`]: drops influences of `bone`, shifts higher bone indices
    /// down by one and renormalizes.
    pub fn remove_bone_influence(&mut self, bone: usize) {
        for vertex in &mut self.vertices {
            vertex.remove_bone_influence(bone);
        }
    }

    /// Recomputes deformed positions from the skeleton's current world transforms.
    ///
    /// Each vertex takes the plain weighted sum of its influences. Influences naming a bone the
    /// skeleton lacks are ignored and only then are the remaining weights renormalized.
    /// Unweighted vertices keep their rest position.
    pub fn update_deformation(&mut self, skeleton: &Skeleton) {
        for vertex in &mut self.vertices {
            let mut sum = Vector2::ZERO;
            let mut total = 0.0f32;
            let mut skipped = false;
            for weight in vertex.weights() {
                let Some(bone) = skeleton.bone(weight.bone) else {
                    skipped = true;
                    continue;
                };
                sum += bone.local_to_world(Vector2::new(weight.x, weight.y)) * weight.weight;
                total += weight.weight;
            }
            let world = if total <= DEFORM_WEIGHT_EPSILON {
                vertex.position()
            } else if skipped {
                sum / total
            } else {
                sum
            };
            vertex.set_world_position(world);
        }
        self.version = self.version.wrapping_add(1);
    }

    /// Whether any triangle contains `point` in deformed space, boundary inclusive.
    pub fn contains_point(&self, point: Vector2) -> bool {
        triangles_contain_point(
            &self.triangles,
            |i| self.vertices.get(i).map(MeshVertex::world_position),
            point,
        )
    }

    /// Deformed vertex closest to `point` within `max_distance`.
    pub fn find_nearest_vertex(&self, point: Vector2, max_distance: f32) -> Option<usize> {
        nearest_point(
            self.vertices.iter().map(MeshVertex::world_position),
            point,
            max_distance,
        )
    }

    fn recompute_bounds(&mut self) {
        self.bounds = Bounds::from_points(self.vertices.iter().map(MeshVertex::position));
    }
}
