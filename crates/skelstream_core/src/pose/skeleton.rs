//! Skeleton topology shared read-only by every consumer of a motion source.

use serde::{Deserialize, Serialize};

use super::transform::BONE_STRIDE;
use crate::error::InitError;

/// One node of the bone hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone identifier.
    pub name: String,
    /// Index of the parent bone, `None` for a root.
    #[serde(default)]
    pub parent: Option<usize>,
}

/// Ordered bone list with parent links.
///
/// Immutable after construction. Parents always precede their children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    /// Builds a skeleton, validating the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::InvalidSkeleton`] if the list is empty, a name is
    /// empty or repeated, or a parent index does not precede its child.
    pub fn new(bones: Vec<Bone>) -> Result<Self, InitError> {
        if bones.is_empty() {
            return Err(InitError::InvalidSkeleton("skeleton has no bones".into()));
        }

        let mut seen = std::collections::HashSet::with_capacity(bones.len());
        for (index, bone) in bones.iter().enumerate() {
            if bone.name.is_empty() {
                return Err(InitError::InvalidSkeleton(format!("bone {index} has an empty name")));
            }
            if !seen.insert(bone.name.as_str()) {
                return Err(InitError::InvalidSkeleton(format!(
                    "duplicate bone name {:?}",
                    bone.name
                )));
            }
            if let Some(parent) = bone.parent {
                if parent >= index {
                    return Err(InitError::InvalidSkeleton(format!(
                        "bone {index} ({}) has parent {parent}, parents must precede children",
                        bone.name
                    )));
                }
            }
        }

        Ok(Self { bones })
    }

    /// Flat skeleton of `count` root bones named `bone_{i}`.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    #[must_use]
    pub fn flat(count: usize) -> Self {
        assert!(count > 0, "skeleton needs at least one bone");
        Self {
            bones: (0..count)
                .map(|i| Bone {
                    name: format!("bone_{i}"),
                    parent: None,
                })
                .collect(),
        }
    }

    /// Number of bones.
    #[inline]
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Bytes needed for one frame of this skeleton.
    #[inline]
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.bones.len() * BONE_STRIDE
    }

    /// Bones in order.
    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Index of the bone called `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Serializable description served to clients before streaming.
    #[must_use]
    pub fn descriptor(&self) -> SkeletonDescriptor {
        SkeletonDescriptor {
            bone_names: self.bones.iter().map(|b| b.name.clone()).collect(),
            hierarchy: self
                .bones
                .iter()
                .enumerate()
                .map(|(index, b)| (index, b.parent))
                .collect(),
            frame_bytes: self.frame_bytes(),
        }
    }
}

/// Skeleton query response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonDescriptor {
    /// Bone names in frame order.
    pub bone_names: Vec<String>,
    /// `(bone_index, parent_index)` pairs in frame order.
    pub hierarchy: Vec<(usize, Option<usize>)>,
    /// Length of one raw frame in bytes.
    pub frame_bytes: usize,
}

impl SkeletonDescriptor {
    /// Number of bones described.
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bone_names.len()
    }
}
