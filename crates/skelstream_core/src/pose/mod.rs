//! # Pose Data
//!
//! Fixed-layout types that make up one frame on the wire.
//!
//! ```text
//! FrameBuffer (num_bones × 64 bytes)
//! ┌──────────────┬──────────────┬─────┬──────────────┐
//! │ bone 0 (64B) │ bone 1 (64B) │ ... │ bone N-1     │
//! └──────────────┴──────────────┴─────┴──────────────┘
//!   16 × f32, column-major, translation in elements 12..14
//! ```

mod frame_buffer;
mod skeleton;
mod transform;

pub use frame_buffer::FrameBuffer;
pub use skeleton::{Bone, Skeleton, SkeletonDescriptor};
pub use transform::{BoneTransform, BONE_STRIDE};
