//! Reference Animator synthesizing motion from elapsed time.
//!
//! Every bone is an identity rotation translated to
//! `(cos(t) + 0.1 × i, sin(t), 0)`. Deterministic, endless, no source data.

use std::f32::consts::TAU;
use std::sync::Arc;

use super::{frame_region, put_bone, Animator};
use crate::error::{AnimatorError, CoreResult, InitError};
use crate::pose::{BoneTransform, Skeleton};

/// Horizontal spacing between consecutive bones.
const BONE_SPACING: f32 = 0.1;

/// Procedural identity-baseline Animator.
#[derive(Clone, Debug)]
pub struct ProceduralAnimator {
    bone_count: usize,
    skeleton: Option<Arc<Skeleton>>,
    /// Clock in radians, kept in `[0, 2π)`.
    phase: f32,
}

impl ProceduralAnimator {
    /// Creates an uninitialized animator for `bone_count` bones.
    #[must_use]
    pub const fn new(bone_count: usize) -> Self {
        Self {
            bone_count,
            skeleton: None,
            phase: 0.0,
        }
    }

    /// Current clock phase in radians.
    #[must_use]
    pub const fn phase(&self) -> f32 {
        self.phase
    }

    /// Transform of bone `index` at phase `t`.
    #[inline]
    #[must_use]
    pub fn bone_at(index: usize, t: f32) -> BoneTransform {
        #[allow(clippy::cast_precision_loss)]
        let spread = index as f32 * BONE_SPACING;
        BoneTransform::from_translation(t.cos() + spread, t.sin(), 0.0)
    }
}

impl Animator for ProceduralAnimator {
    fn initialize(&mut self, source: &str) -> Result<(), InitError> {
        if self.skeleton.is_some() {
            return Err(InitError::AlreadyInitialized);
        }
        if self.bone_count == 0 {
            return Err(InitError::InvalidSkeleton(format!(
                "procedural source {source:?} configured with zero bones"
            )));
        }

        self.skeleton = Some(Arc::new(Skeleton::flat(self.bone_count)));
        tracing::debug!(source, bones = self.bone_count, "procedural animator bound");
        Ok(())
    }

    fn skeleton(&self) -> CoreResult<&Skeleton> {
        self.skeleton.as_deref().ok_or(AnimatorError::NotInitialized)
    }

    fn seek(&mut self, time: f32) {
        self.phase = time.rem_euclid(TAU);
    }

    fn write_frame_to_buffer(&mut self, buffer: &mut [u8], offset: usize, dt: f32) -> CoreResult<()> {
        let frame_bytes = self.skeleton()?.frame_bytes();
        let region = frame_region(buffer, offset, frame_bytes)?;

        self.phase = (self.phase + dt).rem_euclid(TAU);
        let t = self.phase;

        for index in 0..self.bone_count {
            put_bone(region, index, &Self::bone_at(index, t));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::BONE_STRIDE;

    fn ready(bones: usize) -> ProceduralAnimator {
        let mut animator = ProceduralAnimator::new(bones);
        animator.initialize("procedural").unwrap();
        animator
    }

    #[test]
    fn test_memory_size() {
        for bones in [1, 2, 7, 50] {
            assert_eq!(ready(bones).get_memory_size(), bones * 64);
        }
        assert_eq!(ProceduralAnimator::new(4).get_memory_size(), 0);
    }

    #[test]
    fn test_uninitialized_write_fails() {
        let mut animator = ProceduralAnimator::new(2);
        let mut buffer = [0u8; 128];
        assert_eq!(
            animator.write_frame_to_buffer(&mut buffer, 0, 0.1),
            Err(AnimatorError::NotInitialized)
        );
        assert!(animator.get_skeleton().is_err());
    }

    #[test]
    fn test_double_initialize() {
        let mut animator = ready(2);
        assert_eq!(animator.initialize("again"), Err(InitError::AlreadyInitialized));
    }

    #[test]
    fn test_zero_bones_rejected() {
        let mut animator = ProceduralAnimator::new(0);
        assert!(matches!(animator.initialize("procedural"), Err(InitError::InvalidSkeleton(_))));
    }

    #[test]
    fn test_writes_only_inside_range() {
        let mut animator = ready(3);
        let offset = 16;
        let mut buffer = vec![0xAAu8; offset + 3 * BONE_STRIDE + 16];

        animator.write_frame_to_buffer(&mut buffer, offset, 0.5).unwrap();

        assert!(buffer[..offset].iter().all(|&b| b == 0xAA));
        assert!(buffer[offset + 3 * BONE_STRIDE..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_identity_baseline() {
        let mut animator = ready(4);
        let mut buffer = vec![0u8; 4 * BONE_STRIDE];

        for _ in 0..10 {
            animator.write_frame_to_buffer(&mut buffer, 0, 0.37).unwrap();
            for bone in 0..4 {
                let t = BoneTransform::read_from(&buffer[bone * BONE_STRIDE..]);
                assert_eq!(t.diagonal(), [1.0; 4]);
                for i in [1, 2, 3, 4, 6, 7, 8, 9, 11] {
                    assert_eq!(t.m[i], 0.0, "element {i} of bone {bone}");
                }
                assert_eq!(t.m[14], 0.0);
            }
        }
    }

    #[test]
    fn test_translation_formula() {
        let mut animator = ready(2);
        let mut buffer = [0u8; 128];
        animator.write_frame_to_buffer(&mut buffer, 0, 1.0).unwrap();

        let b0 = BoneTransform::read_from(&buffer[..64]);
        let b1 = BoneTransform::read_from(&buffer[64..]);
        assert!((b0.m[12] - 1.0f32.cos()).abs() < 1e-6);
        assert!((b0.m[13] - 1.0f32.sin()).abs() < 1e-6);
        assert!((b1.m[12] - (1.0f32.cos() + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_clone_owns_clock() {
        let proto = ready(1);
        let mut a = proto.clone();
        let mut b = proto.clone();
        let mut buffer = [0u8; 64];

        a.write_frame_to_buffer(&mut buffer, 0, 1.0).unwrap();
        assert!((a.phase() - 1.0).abs() < 1e-6);
        assert_eq!(b.phase(), 0.0);

        b.write_frame_to_buffer(&mut buffer, 0, 0.25).unwrap();
        assert!((b.phase() - 0.25).abs() < 1e-6);
        assert_eq!(proto.phase(), 0.0);
    }

    #[test]
    fn test_seek_sets_phase() {
        let mut animator = ready(1);
        let mut buffer = [0u8; 64];

        animator.seek(TAU + 1.0);
        assert!((animator.phase() - 1.0).abs() < 1e-5);

        animator.write_frame_to_buffer(&mut buffer, 0, 0.0).unwrap();
        let root = BoneTransform::read_from(&buffer);
        assert!((root.m[12] - 1.0f32.cos()).abs() < 1e-5);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut animator = ready(2);
        let mut buffer = [0u8; 127];
        assert_eq!(
            animator.write_frame_to_buffer(&mut buffer, 0, 0.1),
            Err(AnimatorError::BufferTooSmall {
                required: 128,
                available: 127
            })
        );
        assert_eq!(animator.phase(), 0.0);
    }
}
