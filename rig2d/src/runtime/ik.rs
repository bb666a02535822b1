//! Stateless IK solvers over bones of a [`Skeleton`].
//!
//! Every solver expects world transforms to reflect the current pose on entry and leaves the
//! affected bones (and their descendants) with refreshed world transforms on return.

use crate::{Skeleton, SpacingMode, Vector2};

/// Inter-joint distances below this skip re-normalization for that step.
const SEGMENT_EPSILON: f32 = 1.0e-4;

/// Iteration bounds for [`solve_fabrik`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct FabrikSettings {
    pub max_iterations: u32,
    /// Maximum tip-to-target distance accepted as converged.
    pub tolerance: f32,
}

impl Default for FabrikSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 0.01,
        }
    }
}

/// Poses `chain` (root to tip, parent-linked) so the tip reaches `target` using FABRIK.
///
/// Joints are the world positions of the chain bones plus an end effector `length` along the last
/// bone's world rotation. Returns
/// whether the tip ended within `tolerance` of the target. An unreachable target stretches the
/// chain straight toward it and returns `false` without iterating.
pub fn solve_fabrik(
    skeleton: &mut Skeleton,
    chain: &[usize],
    target: Vector2,
    max_iterations: u32,
    tolerance: f32,
) -> bool {
    let Some(&tip_bone) = chain.last() else {
        return false;
    };
    if !target.is_finite() || chain.iter().any(|&i| i >= skeleton.bone_count()) {
        return false;
    }

    let bones = skeleton.bones();
    let mut joints: Vec<Vector2> = chain
        .iter()
        .map(|&i| bones[i].world_position())
        .collect();
    let last = &bones[tip_bone];
    let direction = Vector2::from_angle(last.world_rotation());
    joints.push(last.world_position() + direction * last.length);

    let lengths: Vec<f32> = joints.windows(2).map(|w| w[0].distance(w[1])).collect();
    let start_angles: Vec<f32> = joints.windows(2).map(|w| w[0].angle_to(w[1])).collect();
    let start_rotations: Vec<f32> = chain.iter().map(|&i| bones[i].world_rotation()).collect();
    let total_length: f32 = lengths.iter().sum();

    let root = joints[0];
    let tip = joints.len() - 1;

    if root.distance(target) > total_length {
        let direction = (target - root).normalize();
        for (i, length) in lengths.iter().enumerate() {
            joints[i + 1] = joints[i] + direction * *length;
        }
        log::trace!(
            "fabrik: target ({}, {}) out of reach (chain length {total_length})",
            target.x,
            target.y
        );
        apply_joint_rotations(skeleton, chain, &joints, &lengths, &start_angles, &start_rotations);
        return false;
    }

    let tolerance_squared = tolerance * tolerance;
    let mut reached = joints[tip].distance_squared(target) <= tolerance_squared;
    let mut iteration = 0u32;
    while !reached && iteration < max_iterations {
        joints[tip] = target;
        for i in (0..tip).rev() {
            joints[i] = constrain_segment(joints[i + 1], joints[i], lengths[i]);
        }

        joints[0] = root;
        for i in 0..tip {
            joints[i + 1] = constrain_segment(joints[i], joints[i + 1], lengths[i]);
        }

        reached = joints[tip].distance_squared(target) <= tolerance_squared;
        iteration += 1;
    }

    if !reached {
        log::trace!("fabrik: no convergence after {max_iterations} iteration(s)");
    }
    apply_joint_rotations(skeleton, chain, &joints, &lengths, &start_angles, &start_rotations);
    reached
}

/// Moves `point` along the line from `anchor` so the two are `length` apart.
fn constrain_segment(anchor: Vector2, point: Vector2, length: f32) -> Vector2 {
    let distance = anchor.distance(point);
    if distance < SEGMENT_EPSILON {
        return point;
    }
    anchor + (point - anchor) * (length / distance)
}

/// Converts solved joint positions back into local rotations, root first.
///
/// Each bone turns by the change in direction of its segment, so a child whose origin is offset
/// from its parent's X axis keeps that offset.
fn apply_joint_rotations(
    skeleton: &mut Skeleton,
    chain: &[usize],
    joints: &[Vector2],
    lengths: &[f32],
    start_angles: &[f32],
    start_rotations: &[f32],
) {
    for (k, &bone) in chain.iter().enumerate() {
        let segment = joints[k + 1] - joints[k];
        if lengths[k] >= SEGMENT_EPSILON && segment.length() >= SEGMENT_EPSILON {
            let world_rotation = start_rotations[k] + (segment.angle() - start_angles[k]);
            let local = world_rotation - skeleton.parent_world_rotation(bone);
            if let Some(b) = skeleton.bone_mut(bone) {
                b.set_rotation(local);
            }
        }
        skeleton.update_subtree_world_transform(bone);
    }
}

/// Turns `bone` toward `target` by `mix` of the shortest angular delta.
pub fn solve_look_at(skeleton: &mut Skeleton, bone: usize, target: Vector2, mix: f32) {
    if !mix.is_finite() || mix <= 0.0 || !target.is_finite() {
        return;
    }
    let mix = mix.min(1.0);
    let Some(b) = skeleton.bone(bone) else {
        return;
    };
    let origin = b.world_position();
    if origin.distance(target) < SEGMENT_EPSILON {
        return;
    }

    let delta = crate::wrap_degrees(origin.angle_to(target) - b.world_rotation());
    let rotation = b.rotation() + delta * mix;
    if let Some(b) = skeleton.bone_mut(bone) {
        b.set_rotation(rotation);
    }
    skeleton.update_subtree_world_transform(bone);
}

/// Orients `bones` along the polyline `path` (world space).
///
/// Bones are processed in order; each takes the direction of the first path segment whose
/// cumulative length reaches the bone's distance along the path. Distances advance by bone
/// length or, with [`SpacingMode::Proportional`], by an even share of the path length. Bones
/// beyond the end of the path take the last segment's direction.
pub fn solve_path(skeleton: &mut Skeleton, bones: &[usize], path: &[Vector2], spacing: SpacingMode) {
    if path.len() < 2 || bones.is_empty() {
        return;
    }

    let mut cumulative = Vec::with_capacity(path.len());
    let mut total_length = 0.0f32;
    cumulative.push(0.0);
    for w in path.windows(2) {
        total_length += w[0].distance(w[1]);
        cumulative.push(total_length);
    }
    if total_length < SEGMENT_EPSILON {
        return;
    }
    let even_spacing = total_length / bones.len() as f32;

    let mut distance = 0.0f32;
    for &bone in bones {
        let Some(length) = skeleton.bone(bone).map(|b| b.length) else {
            continue;
        };
        if let Some(direction) = path_direction_at(path, &cumulative, distance) {
            let local = direction.angle() - skeleton.parent_world_rotation(bone);
            if let Some(b) = skeleton.bone_mut(bone) {
                b.set_rotation(local);
            }
            skeleton.update_subtree_world_transform(bone);
        }
        distance += match spacing {
            SpacingMode::Length => length,
            SpacingMode::Proportional => even_spacing,
        };
    }
}

fn path_direction_at(path: &[Vector2], cumulative: &[f32], distance: f32) -> Option<Vector2> {
    let mut last = None;
    for (i, w) in path.windows(2).enumerate() {
        let segment = w[1] - w[0];
        if segment.length() < SEGMENT_EPSILON {
            continue;
        }
        let direction = segment.normalize();
        if cumulative[i + 1] >= distance {
            return Some(direction);
        }
        last = Some(direction);
    }
    last
}
