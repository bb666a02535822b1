use crate::{Affine2, Error, Transform2D, Vector2};
use std::collections::HashMap;

/// One rigid segment of a skeleton.
///
/// A bone is created detached with [`Bone::new`] and becomes part of a hierarchy through
/// [`Skeleton::add_bone`]. Its parent is an index into the owning skeleton, which always precedes
/// the bone itself.
#[derive(Clone, Debug)]
pub struct Bone {
    name: String,
    parent: Option<usize>,

    /// Distance from the bone origin to its notional tip, along the local X axis.
    pub length: f32,

    local: Transform2D,
    setup: Transform2D,
    world: Affine2,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            length: 0.0,
            local: Transform2D::IDENTITY,
            setup: Transform2D::IDENTITY,
            world: Affine2::IDENTITY,
        }
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.set_position(x, y);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.set_rotation(degrees);
        self
    }

    pub fn with_scale(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.set_scale(scale_x, scale_y);
        self
    }

    pub fn with_length(mut self, length: f32) -> Self {
        self.length = length;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn local(&self) -> &Transform2D {
        &self.local
    }

    /// Local pose recorded when the bone was attached.
    pub fn setup_pose(&self) -> &Transform2D {
        &self.setup
    }

    pub fn x(&self) -> f32 {
        self.local.x
    }

    pub fn y(&self) -> f32 {
        self.local.y
    }

    pub fn rotation(&self) -> f32 {
        self.local.rotation()
    }

    pub fn scale_x(&self) -> f32 {
        self.local.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.local.scale_y
    }

    pub fn set_local(&mut self, local: Transform2D) {
        self.local = local;
        self.local.set_rotation(local.rotation());
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.local.x = x;
        self.local.y = y;
    }

    pub fn set_x(&mut self, x: f32) {
        self.local.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.local.y = y;
    }

    /// Sets the local rotation in degrees, wrapped into (-180, 180].
    pub fn set_rotation(&mut self, degrees: f32) {
        self.local.set_rotation(degrees);
    }

    pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        self.local.scale_x = scale_x;
        self.local.scale_y = scale_y;
    }

    pub fn set_scale_x(&mut self, scale_x: f32) {
        self.local.scale_x = scale_x;
    }

    pub fn set_scale_y(&mut self, scale_y: f32) {
        self.local.scale_y = scale_y;
    }

    /// Cached world transform, valid as of the last world transform update.
    pub fn world(&self) -> &Affine2 {
        &self.world
    }

    pub fn world_position(&self) -> Vector2 {
        self.world.translation()
    }

    pub fn world_rotation(&self) -> f32 {
        self.world.rotation()
    }

    pub fn world_scale_x(&self) -> f32 {
        self.world.scale_x()
    }

    pub fn world_scale_y(&self) -> f32 {
        self.world.scale_y()
    }

    /// World position of the bone's tip.
    pub fn tip(&self) -> Vector2 {
        self.world.transform_point(Vector2::new(self.length, 0.0))
    }

    pub fn local_to_world(&self, local: Vector2) -> Vector2 {
        self.world.transform_point(local)
    }

    /// Returns `None` when the world transform is degenerate (zero scale).
    pub fn world_to_local(&self, world: Vector2) -> Option<Vector2> {
        self.world
            .inverse()
            .map(|inverse| inverse.transform_point(world))
    }

    /// Composes the local pose onto `parent_world` and caches the result.
    pub fn update_world_transform(&mut self, parent_world: &Affine2) {
        self.world = parent_world.multiply(&self.local.to_affine());
    }
}

/// Ordered arena of bones. Parents always precede their children, so a single forward pass
/// updates world transforms top-down.
#[derive(Clone, Debug)]
pub struct Skeleton {
    bones: Vec<Bone>,
    bone_lookup: HashMap<String, usize>,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}

impl Skeleton {
    pub fn new() -> Self {
        Self {
            bones: Vec::new(),
            bone_lookup: HashMap::new(),
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Appends `bone` and returns its index.
    ///
    /// The bone's current local pose becomes its setup pose and its world transform is computed
    /// against its parent's cached world transform.
    pub fn add_bone(&mut self, mut bone: Bone) -> Result<usize, Error> {
        if self.bone_lookup.contains_key(&bone.name) {
            return Err(Error::DuplicateBone { name: bone.name });
        }
        let index = self.bones.len();
        if let Some(parent) = bone.parent {
            if parent >= index {
                return Err(Error::ParentOrder {
                    bone: bone.name,
                    parent,
                });
            }
        }

        bone.setup = bone.local;
        let parent_world = self.parent_world(bone.parent);
        bone.update_world_transform(&parent_world);

        self.bone_lookup.insert(bone.name.clone(), index);
        self.bones.push(bone);
        Ok(index)
    }

    /// Removes the bone at `index` and returns it.
    ///
    /// Children of the removed bone are reparented to its parent (or become roots) with their
    /// world transforms preserved. Every bone index after `index` shifts down by one; meshes
    /// skinned to this skeleton must follow with [`crate::DeformableMesh::remove_bone_influence`].
    pub fn remove_bone(&mut self, index: usize) -> Result<Bone, Error> {
        if index >= self.bones.len() {
            return Err(Error::InvalidBoneIndex { index });
        }
        self.update_world_transform();

        let grandparent = self.bones[index].parent;
        let grandparent_world = self.parent_world(grandparent);
        let removed_setup = self.bones[index].setup.to_affine();

        let children: Vec<usize> = self.children(index).collect();
        for &child in &children {
            let bone = &mut self.bones[child];
            bone.parent = grandparent;
            bone.setup = removed_setup.multiply(&bone.setup.to_affine()).to_transform();
            match grandparent_world.inverse() {
                Some(inverse) => bone.local = inverse.multiply(&bone.world).to_transform(),
                None => log::debug!(
                    "bone '{}' keeps its local pose: degenerate parent transform",
                    bone.name
                ),
            }
        }

        let removed = self.bones.remove(index);
        for bone in &mut self.bones {
            if let Some(parent) = bone.parent {
                if parent > index {
                    bone.parent = Some(parent - 1);
                }
            }
        }
        self.rebuild_lookup();
        self.update_world_transform();

        log::debug!(
            "removed bone '{}', reparented {} child bone(s)",
            removed.name,
            children.len()
        );
        Ok(removed)
    }

    /// Moves `index` under `parent` (or to the root level), preserving its world transform.
    ///
    /// The parent must already precede the bone; a parent inside the bone's own subtree is
    /// rejected as a cycle.
    pub fn set_parent(&mut self, index: usize, parent: Option<usize>) -> Result<(), Error> {
        if index >= self.bones.len() {
            return Err(Error::InvalidBoneIndex { index });
        }
        if let Some(parent) = parent {
            if parent >= self.bones.len() {
                return Err(Error::InvalidBoneIndex { index: parent });
            }
            if parent == index || self.is_ancestor(index, parent) {
                return Err(Error::BoneCycle {
                    bone: self.bones[index].name.clone(),
                    parent,
                });
            }
            if parent > index {
                return Err(Error::ParentOrder {
                    bone: self.bones[index].name.clone(),
                    parent,
                });
            }
        }

        self.update_world_transform();
        let Some(inverse) = self.parent_world(parent).inverse() else {
            return Err(Error::InvalidValue {
                message: format!(
                    "cannot reparent bone '{}' under a degenerate transform",
                    self.bones[index].name
                ),
            });
        };
        let setup_world = self.setup_world(Some(index));
        let setup = self
            .setup_world(parent)
            .inverse()
            .map(|inv| inv.multiply(&setup_world).to_transform());

        let bone = &mut self.bones[index];
        bone.local = inverse.multiply(&bone.world).to_transform();
        if let Some(setup) = setup {
            bone.setup = setup;
        }
        bone.parent = parent;
        self.update_subtree_world_transform(index);
        Ok(())
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bone_lookup.get(name).copied()
    }

    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bone_index(name).and_then(|i| self.bones.get(i))
    }

    pub fn find_bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        let index = self.bone_index(name)?;
        self.bones.get_mut(index)
    }

    /// Direct children of `index`, in skeleton order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, bone)| bone.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Whether `ancestor` appears on the parent chain of `bone`.
    pub fn is_ancestor(&self, ancestor: usize, bone: usize) -> bool {
        let mut current = self.bones.get(bone).and_then(|b| b.parent);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.bones.get(index).and_then(|b| b.parent);
        }
        false
    }

    /// Transform applied to root bones.
    pub fn root_transform(&self) -> Affine2 {
        Affine2 {
            a: self.scale_x,
            b: 0.0,
            c: 0.0,
            d: self.scale_y,
            x: self.x,
            y: self.y,
        }
    }

    /// Restores every bone's local pose to its setup pose. World transforms are not refreshed.
    pub fn set_to_setup_pose(&mut self) {
        for bone in &mut self.bones {
            bone.local = bone.setup;
        }
    }

    /// Recomputes every world transform, parents first.
    pub fn update_world_transform(&mut self) {
        for index in 0..self.bones.len() {
            self.update_bone_world_transform(index);
        }
    }

    /// Recomputes one bone against its parent's cached world transform.
    pub fn update_bone_world_transform(&mut self, index: usize) {
        let Some(parent) = self.bones.get(index).map(|b| b.parent) else {
            return;
        };
        let parent_world = self.parent_world(parent);
        self.bones[index].update_world_transform(&parent_world);
    }

    /// Recomputes `index` and all of its descendants.
    pub fn update_subtree_world_transform(&mut self, index: usize) {
        if index >= self.bones.len() {
            return;
        }
        let mut in_subtree = vec![false; self.bones.len()];
        in_subtree[index] = true;
        self.update_bone_world_transform(index);
        for i in index + 1..self.bones.len() {
            let Some(parent) = self.bones[i].parent else {
                continue;
            };
            if in_subtree[parent] {
                in_subtree[i] = true;
                self.update_bone_world_transform(i);
            }
        }
    }

    pub(crate) fn parent_world(&self, parent: Option<usize>) -> Affine2 {
        match parent.and_then(|p| self.bones.get(p)) {
            Some(parent) => parent.world,
            None => self.root_transform(),
        }
    }

    pub(crate) fn parent_world_rotation(&self, index: usize) -> f32 {
        let parent = self.bones.get(index).and_then(|b| b.parent);
        self.parent_world(parent).rotation()
    }

    /// World transform of `index` in the setup pose, skeleton root placement included.
    fn setup_world(&self, index: Option<usize>) -> Affine2 {
        let mut chain = Vec::new();
        let mut current = index;
        while let Some(i) = current {
            let Some(bone) = self.bones.get(i) else {
                break;
            };
            chain.push(bone.setup.to_affine());
            current = bone.parent;
        }
        chain
            .iter()
            .rev()
            .fold(self.root_transform(), |world, local| world.multiply(local))
    }

    fn rebuild_lookup(&mut self) {
        self.bone_lookup.clear();
        for (index, bone) in self.bones.iter().enumerate() {
            self.bone_lookup.insert(bone.name.clone(), index);
        }
    }
}
