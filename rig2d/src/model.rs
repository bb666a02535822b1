use crate::Vector2;
use smallvec::SmallVec;

/// Maximum number of bones that may influence a single vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Sums below this are treated as "no weights" when normalizing.
const WEIGHT_EPSILON: f32 = 1.0e-6;

/// One bone influence on a vertex.
///
/// `x`/`y` is the vertex position in the bone's local space at bind time; deformation maps it
/// through the bone's current world transform.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneWeight {
    pub bone: usize,
    pub weight: f32,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshVertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
    weights: SmallVec<[BoneWeight; MAX_BONE_INFLUENCES]>,
    world_x: f32,
    world_y: f32,
}

impl MeshVertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            x,
            y,
            u,
            v,
            weights: SmallVec::new(),
            world_x: x,
            world_y: y,
        }
    }

    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn uv(&self) -> [f32; 2] {
        [self.u, self.v]
    }

    /// Deformed position produced by the last deformation pass.
    pub fn world_position(&self) -> Vector2 {
        Vector2::new(self.world_x, self.world_y)
    }

    pub(crate) fn set_world_position(&mut self, p: Vector2) {
        self.world_x = p.x;
        self.world_y = p.y;
    }

    pub fn weights(&self) -> &[BoneWeight] {
        &self.weights
    }

    pub fn has_weights(&self) -> bool {
        !self.weights.is_empty()
    }

    pub fn total_weight(&self) -> f32 {
        self.weights.iter().map(|w| w.weight).sum()
    }

    pub fn clear_weights(&mut self) {
        self.weights.clear();
    }

    /// Adds an influence whose bind offset is the vertex's own local position.
    ///
    /// See [`MeshVertex::add_weight_with_offset`] for the replacement policy.
    pub fn add_weight(&mut self, bone: usize, weight: f32) -> bool {
        self.add_weight_with_offset(bone, weight, self.position())
    }

    /// Adds or replaces an influence. Returns whether the influence was stored.
    ///
    /// An existing influence for the same bone is overwritten. Once [`MAX_BONE_INFLUENCES`] are
    /// present the smallest weight is evicted, but only when `weight` exceeds it. Non-finite and
    /// non-positive weights are ignored.
    pub fn add_weight_with_offset(&mut self, bone: usize, weight: f32, offset: Vector2) -> bool {
        if !weight.is_finite() || weight <= 0.0 {
            return false;
        }
        let entry = BoneWeight {
            bone,
            weight,
            x: offset.x,
            y: offset.y,
        };

        if let Some(existing) = self.weights.iter_mut().find(|w| w.bone == bone) {
            *existing = entry;
            return true;
        }

        if self.weights.len() < MAX_BONE_INFLUENCES {
            self.weights.push(entry);
            return true;
        }

        let Some((smallest, smallest_weight)) = self
            .weights
            .iter()
            .enumerate()
            .map(|(i, w)| (i, w.weight))
            .min_by(|a, b| a.1.total_cmp(&b.1))
        else {
            return false;
        };
        if weight > smallest_weight {
            self.weights[smallest] = entry;
            true
        } else {
            false
        }
    }

    /// Scales weights to sum to 1. A vertex without weight is left untouched.
    pub fn normalize_weights(&mut self) {
        let total = self.total_weight();
        if total <= WEIGHT_EPSILON {
            return;
        }
        for w in &mut self.weights {
            w.weight /= total;
        }
    }

    /// Drops influences of `bone` and shifts higher bone indices down by one.
    pub(crate) fn remove_bone_influence(&mut self, bone: usize) {
        self.weights.retain(|w| w.bone != bone);
        for w in &mut self.weights {
            if w.bone > bone {
                w.bone -= 1;
            }
        }
        self.normalize_weights();
    }

    pub(crate) fn weights_mut(&mut self) -> &mut [BoneWeight] {
        &mut self.weights
    }
}

/// Three vertex indices into the owning mesh's vertex buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshTriangle {
    pub indices: [usize; 3],
}

impl MeshTriangle {
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self { indices: [a, b, c] }
    }

    pub fn references(&self, vertex: usize) -> bool {
        self.indices.contains(&vertex)
    }
}

/// Texture metadata handed through to the renderer. The mesh never loads it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureRef {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// How [`crate::solve_path`] derives each bone's distance along the path.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum SpacingMode {
    /// Each bone advances by its own length.
    #[default]
    Length,
    /// Bones are spaced evenly over the whole path length.
    Proportional,
}
