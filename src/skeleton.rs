//! Bone hierarchy checks and derived transforms.
//!
//! Bones are an arena addressed by index; each record carries its parent
//! index (`-1` for the root) and the indices of its children. Declaration
//! order is arbitrary, so nothing here assumes a parent precedes its
//! children.

use crate::anim::Bone;
use crate::error::{MeshError, Result, TreeViolation};
use crate::types::{Matrix3, Vec3};
use std::collections::VecDeque;

pub const ROOT_PARENT: i32 = -1;

/// Rotation and translation of a bone, either parent-relative or in root
/// space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub rotation: Matrix3,
    pub translation: Vec3,
}

impl Transform {
    pub fn new(rotation: Matrix3, translation: Vec3) -> Self {
        Self { rotation, translation }
    }

    /// `self` applied after `local`: the root-space transform of a child
    /// whose parent resolves to `self`.
    pub fn compose(&self, local: &Transform) -> Transform {
        Transform {
            rotation: self.rotation * local.rotation,
            translation: self.rotation.transform(local.translation) + self.translation,
        }
    }

    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.rotation.transform(point) + self.translation
    }
}

fn structural(violation: TreeViolation) -> MeshError {
    MeshError::Structural(violation)
}

/// Index of the single root bone, or `None` for an empty skeleton.
pub fn find_root(bones: &[Bone]) -> Result<Option<usize>> {
    let mut root = None;
    for (index, bone) in bones.iter().enumerate() {
        if bone.parent_index != ROOT_PARENT {
            continue;
        }
        if let Some(first) = root {
            return Err(structural(TreeViolation::MultipleRoots { first, second: index }));
        }
        root = Some(index);
    }
    match root {
        None if !bones.is_empty() => Err(structural(TreeViolation::NoRoot)),
        root => Ok(root),
    }
}

/// Checks that `bones` form exactly one rooted, parent-consistent,
/// connected tree. An empty bone set is accepted.
pub fn validate_bone_tree(bones: &[Bone]) -> Result<()> {
    let Some(root) = find_root(bones)? else {
        return Ok(());
    };

    for (index, bone) in bones.iter().enumerate() {
        for &child in &bone.child_indices {
            let Some(child_bone) = bones.get(child as usize) else {
                return Err(structural(TreeViolation::DanglingChildReference { bone: index, child }));
            };
            if child_bone.parent_index != index as i32 {
                return Err(structural(TreeViolation::ParentChildMismatch {
                    parent: index,
                    child: child as usize,
                    declared_parent: child_bone.parent_index,
                }));
            }
        }
    }

    let mut visited = vec![false; bones.len()];
    let mut queue = VecDeque::from([root]);
    visited[root] = true;
    let mut reachable = 1;
    while let Some(index) = queue.pop_front() {
        for &child in &bones[index].child_indices {
            let child = child as usize;
            if visited[child] {
                return Err(structural(TreeViolation::CycleDetected { bone: child }));
            }
            visited[child] = true;
            reachable += 1;
            queue.push_back(child);
        }
    }

    if reachable == bones.len() {
        return Ok(());
    }

    for start in (0..bones.len()).filter(|&i| !visited[i]) {
        if let Some(bone) = find_parent_cycle(bones, start) {
            return Err(structural(TreeViolation::CycleDetected { bone }));
        }
    }
    Err(structural(TreeViolation::Disconnected { reachable, total: bones.len() }))
}

/// Follows parent links from `start`; returns the first revisited bone if
/// the chain loops before reaching the root or leaving the arena.
fn find_parent_cycle(bones: &[Bone], start: usize) -> Option<usize> {
    let mut seen = vec![false; bones.len()];
    let mut current = start;
    loop {
        if seen[current] {
            return Some(current);
        }
        seen[current] = true;
        let parent = bones[current].parent_index;
        if parent < 0 || parent as usize >= bones.len() {
            return None;
        }
        current = parent as usize;
    }
}

/// Root-space transform of every bone, indexed like `bones`.
///
/// Bones are resolved through a work queue: a bone whose parent has not
/// been resolved yet goes back to the end of the queue.
pub fn resolve_global_transforms(bones: &[Bone]) -> Result<Vec<Transform>> {
    validate_bone_tree(bones)?;

    let mut resolved: Vec<Option<Transform>> = vec![None; bones.len()];
    let mut queue: VecDeque<usize> = (0..bones.len()).collect();
    let mut stalled = 0;

    while let Some(index) = queue.pop_front() {
        let bone = &bones[index];
        let local = bone.local_transform();
        let global = if bone.parent_index == ROOT_PARENT {
            Some(local)
        } else {
            resolved[bone.parent_index as usize].map(|parent| parent.compose(&local))
        };

        match global {
            Some(global) => {
                resolved[index] = Some(global);
                stalled = 0;
            }
            None => {
                queue.push_back(index);
                stalled += 1;
                if stalled > queue.len() {
                    return Err(structural(TreeViolation::CycleDetected { bone: index }));
                }
            }
        }
    }

    Ok(resolved.into_iter().flatten().collect())
}
