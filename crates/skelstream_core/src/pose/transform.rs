//! 4×4 bone transform with a guaranteed 64-byte layout.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Bytes occupied by one bone in a frame.
pub const BONE_STRIDE: usize = std::mem::size_of::<BoneTransform>();

/// One bone's transform: 16 `f32` in column-major order.
///
/// Layout invariant: 64 bytes, no padding, element 15 is the homogeneous 1.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneTransform {
    /// Matrix elements, column-major.
    pub m: [f32; 16],
}

const _: () = assert!(BONE_STRIDE == 64);

impl BoneTransform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Identity rotation with the given translation.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut out = Self::IDENTITY;
        out.m[12] = x;
        out.m[13] = y;
        out.m[14] = z;
        out
    }

    /// Translation column.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> [f32; 3] {
        [self.m[12], self.m[13], self.m[14]]
    }

    /// Diagonal elements `[m00, m11, m22, m33]`.
    #[inline]
    #[must_use]
    pub const fn diagonal(&self) -> [f32; 4] {
        [self.m[0], self.m[5], self.m[10], self.m[15]]
    }

    /// Raw bytes of this transform.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Reads a transform from the first 64 bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`BONE_STRIDE`].
    #[inline]
    #[must_use]
    pub fn read_from(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..BONE_STRIDE])
    }

    /// Interpolates between two transforms.
    ///
    /// Scale and translation are lerped, rotation is slerped, so the result
    /// stays a rigid transform when both inputs are.
    #[must_use]
    pub fn interpolate(&self, other: &Self, factor: f32) -> Self {
        let (s0, r0, t0) = Mat4::from(*self).to_scale_rotation_translation();
        let (s1, r1, t1) = Mat4::from(*other).to_scale_rotation_translation();

        let scale: Vec3 = s0.lerp(s1, factor);
        let rotation: Quat = r0.slerp(r1, factor);
        let translation: Vec3 = t0.lerp(t1, factor);

        Mat4::from_scale_rotation_translation(scale, rotation, translation).into()
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for BoneTransform {
    fn from(mat: Mat4) -> Self {
        Self {
            m: mat.to_cols_array(),
        }
    }
}

impl From<BoneTransform> for Mat4 {
    fn from(transform: BoneTransform) -> Self {
        Mat4::from_cols_array(&transform.m)
    }
}
