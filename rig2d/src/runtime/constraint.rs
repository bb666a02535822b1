use crate::{Error, FabrikSettings, Skeleton, SpacingMode, Vector2, solve_fabrik, solve_look_at, solve_path};
use indexmap::{IndexMap, IndexSet};

/// Where a constraint aims.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum IkTarget {
    /// Fixed world position.
    Point(Vector2),
    /// World position of the named bone at apply time.
    Bone(String),
}

impl IkTarget {
    fn resolve(&self, skeleton: &Skeleton) -> Option<Vector2> {
        match self {
            Self::Point(p) => Some(*p),
            Self::Bone(name) => skeleton.find_bone(name).map(|b| b.world_position()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintKind {
    /// FABRIK over a root-to-tip chain.
    Chain {
        bones: Vec<String>,
        target: IkTarget,
        settings: FabrikSettings,
    },
    LookAt {
        bone: String,
        target: IkTarget,
    },
    /// Distributes bones along a world-space polyline.
    Path {
        bones: Vec<String>,
        path: Vec<Vector2>,
        spacing: SpacingMode,
    },
}

/// A named IK constraint bound to bones by name.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct IkConstraint {
    name: String,
    mix: f32,
    pub kind: ConstraintKind,
}

impl IkConstraint {
    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            mix: 1.0,
            kind,
        }
    }

    pub fn chain<I, S>(name: impl Into<String>, bones: I, target: IkTarget) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ConstraintKind::Chain {
                bones: bones.into_iter().map(Into::into).collect(),
                target,
                settings: FabrikSettings::default(),
            },
        )
    }

    pub fn look_at(name: impl Into<String>, bone: impl Into<String>, target: IkTarget) -> Self {
        Self::new(
            name,
            ConstraintKind::LookAt {
                bone: bone.into(),
                target,
            },
        )
    }

    pub fn path<I, S>(name: impl Into<String>, bones: I, path: Vec<Vector2>, spacing: SpacingMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ConstraintKind::Path {
                bones: bones.into_iter().map(Into::into).collect(),
                path,
                spacing,
            },
        )
    }

    pub fn with_mix(mut self, mix: f32) -> Self {
        self.set_mix(mix);
        self
    }

    /// Replaces the FABRIK settings of a chain constraint. Other kinds are unaffected.
    pub fn with_settings(mut self, fabrik: FabrikSettings) -> Self {
        if let ConstraintKind::Chain { settings, .. } = &mut self.kind {
            *settings = fabrik;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Clamped to [0, 1]; NaN disables the constraint.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) };
    }

    /// Checks that every bone the constraint names exists in `skeleton`.
    ///
    /// [`IkConstraint::apply`] skips a constraint with missing bones; this reports the first one.
    pub fn validate(&self, skeleton: &Skeleton) -> Result<(), Error> {
        let (bones, target): (&[String], Option<&IkTarget>) = match &self.kind {
            ConstraintKind::Chain { bones, target, .. } => (bones, Some(target)),
            ConstraintKind::LookAt { bone, target } => (std::slice::from_ref(bone), Some(target)),
            ConstraintKind::Path { bones, .. } => (bones, None),
        };
        let target_bone = match target {
            Some(IkTarget::Bone(name)) => Some(name),
            _ => None,
        };
        match bones
            .iter()
            .chain(target_bone)
            .find(|name| skeleton.bone_index(name).is_none())
        {
            Some(name) => Err(Error::UnknownBone { name: name.clone() }),
            None => Ok(()),
        }
    }

    /// Applies the constraint to its bound bones.
    ///
    /// Returns `None` when nothing was applied (zero mix, a bound bone or target bone missing),
    /// otherwise whether the target was reached. Only chain constraints can miss.
    pub fn apply(&self, skeleton: &mut Skeleton) -> Option<bool> {
        if self.mix <= 0.0 {
            return None;
        }
        match &self.kind {
            ConstraintKind::Chain {
                bones,
                target,
                settings,
            } => {
                let chain = self.resolve_bones(skeleton, bones)?;
                let target = self.resolve_target(skeleton, target)?;
                let start = local_rotations(skeleton, &chain);
                let reached = solve_fabrik(
                    skeleton,
                    &chain,
                    target,
                    settings.max_iterations,
                    settings.tolerance,
                );
                blend_rotations(skeleton, &chain, &start, self.mix);
                Some(reached)
            }
            ConstraintKind::LookAt { bone, target } => {
                let index = self.resolve_bones(skeleton, std::slice::from_ref(bone))?[0];
                let target = self.resolve_target(skeleton, target)?;
                solve_look_at(skeleton, index, target, self.mix);
                Some(true)
            }
            ConstraintKind::Path {
                bones,
                path,
                spacing,
            } => {
                let indices = self.resolve_bones(skeleton, bones)?;
                let start = local_rotations(skeleton, &indices);
                solve_path(skeleton, &indices, path, *spacing);
                blend_rotations(skeleton, &indices, &start, self.mix);
                Some(true)
            }
        }
    }

    fn resolve_bones(&self, skeleton: &Skeleton, names: &[String]) -> Option<Vec<usize>> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let Some(index) = skeleton.bone_index(name) else {
                log::debug!("constraint '{}' skipped: unknown bone '{name}'", self.name);
                return None;
            };
            out.push(index);
        }
        Some(out)
    }

    fn resolve_target(&self, skeleton: &Skeleton, target: &IkTarget) -> Option<Vector2> {
        let resolved = target.resolve(skeleton);
        if resolved.is_none() {
            log::debug!("constraint '{}' skipped: unknown target {target:?}", self.name);
        }
        resolved
    }
}

fn local_rotations(skeleton: &Skeleton, bones: &[usize]) -> Vec<f32> {
    bones
        .iter()
        .map(|&i| skeleton.bone(i).map(|b| b.rotation()).unwrap_or(0.0))
        .collect()
}

/// Pulls solved local rotations back toward `start` for a partial mix.
fn blend_rotations(skeleton: &mut Skeleton, bones: &[usize], start: &[f32], mix: f32) {
    if mix >= 1.0 {
        return;
    }
    for (&bone, &from) in bones.iter().zip(start) {
        let Some(b) = skeleton.bone_mut(bone) else {
            continue;
        };
        let solved = b.rotation();
        b.set_rotation(from + crate::wrap_degrees(solved - from) * mix);
        skeleton.update_subtree_world_transform(bone);
    }
}

/// Outcome of one constraint during [`IkManager::apply_constraints`].
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintResult {
    pub name: String,
    pub reached: bool,
}

/// Constraints that ran, in application order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyReport {
    pub results: Vec<ConstraintResult>,
}

impl ApplyReport {
    pub fn applied_count(&self) -> usize {
        self.results.len()
    }

    pub fn all_reached(&self) -> bool {
        self.results.iter().all(|r| r.reached)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.name.as_str())
    }
}

/// Named constraints plus an explicit application order.
///
/// The order is always a permutation of the registered names: names given to
/// [`IkManager::set_constraint_order`] come first, every other constraint follows in registration
/// order.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct IkManager {
    constraints: IndexMap<String, IkConstraint>,
    order: Vec<String>,
    pub enabled: bool,
}

impl Default for IkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IkManager {
    pub fn new() -> Self {
        Self {
            constraints: IndexMap::new(),
            order: Vec::new(),
            enabled: true,
        }
    }

    /// Registers `constraint`, replacing (and returning) any constraint with the same name. A
    /// replaced constraint keeps its place in the order.
    pub fn add_constraint(&mut self, constraint: IkConstraint) -> Option<IkConstraint> {
        let name = constraint.name.clone();
        let previous = self.constraints.insert(name.clone(), constraint);
        if previous.is_some() {
            log::debug!("replaced IK constraint '{name}'");
        } else {
            self.order.push(name);
        }
        previous
    }

    /// Removes and returns the named constraint.
    ///
    /// Linear in the number of constraints: the map keeps registration order (unlisted names are
    /// appended in that order by [`IkManager::set_constraint_order`]) and the application order
    /// is rewritten. Lookups and additions stay O(1) expected.
    pub fn remove_constraint(&mut self, name: &str) -> Option<IkConstraint> {
        let removed = self.constraints.shift_remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    pub fn constraint(&self, name: &str) -> Option<&IkConstraint> {
        self.constraints.get(name)
    }

    pub fn constraint_mut(&mut self, name: &str) -> Option<&mut IkConstraint> {
        self.constraints.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constraints.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraint_order(&self) -> &[String] {
        &self.order
    }

    /// Constraints in application order.
    pub fn iter(&self) -> impl Iterator<Item = &IkConstraint> {
        self.order.iter().filter_map(|name| self.constraints.get(name))
    }

    /// Puts the listed constraints first, in the given order. Unknown and repeated names are
    /// ignored; unlisted constraints are appended in registration order.
    pub fn set_constraint_order<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut order: IndexSet<String> = IndexSet::with_capacity(self.constraints.len());
        for name in names {
            let name = name.as_ref();
            if self.constraints.contains_key(name) {
                order.insert(name.to_string());
            }
        }
        for name in self.constraints.keys() {
            if !order.contains(name) {
                order.insert(name.clone());
            }
        }
        self.order = order.into_iter().collect();
    }

    /// Applies every enabled constraint in order. Later constraints observe the poses written by
    /// earlier ones.
    pub fn apply_constraints(&self, skeleton: &mut Skeleton) -> ApplyReport {
        let mut report = ApplyReport::default();
        if !self.enabled {
            return report;
        }
        for constraint in self.iter() {
            if constraint.mix <= 0.0 {
                continue;
            }
            if let Some(reached) = constraint.apply(skeleton) {
                report.results.push(ConstraintResult {
                    name: constraint.name.clone(),
                    reached,
                });
            }
        }
        report
    }
}
