//! # Animator Contract
//!
//! Anything that can describe a skeleton and write one frame of bone
//! transforms into a caller-supplied buffer.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──initialize(source)──► ready ──clone()──► one copy per connection
//!                                  │
//!                                  └── write_frame_to_buffer(buf, off, dt)  (hot path)
//! ```
//!
//! An initialized Animator acts as a prototype. Cloning shares the read-only
//! skeleton and motion data and gives the clone its own clock.

mod clip;
mod procedural;

pub use clip::{ClipAnimator, MotionClip};
pub use procedural::ProceduralAnimator;

use crate::error::{AnimatorError, CoreResult, InitError};
use crate::pose::{BoneTransform, Skeleton, SkeletonDescriptor, BONE_STRIDE};

/// Pose producer contract.
///
/// Implementations differ entirely in their internal data, so the contract
/// carries no shared state.
pub trait Animator: Send + Sync + 'static {
    /// Loads or binds the motion source. Must succeed exactly once before any
    /// other operation.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] if the source is missing or malformed, or if the
    /// Animator was already initialized.
    fn initialize(&mut self, source: &str) -> Result<(), InitError>;

    /// The bound skeleton.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatorError::NotInitialized`] before `initialize`.
    fn skeleton(&self) -> CoreResult<&Skeleton>;

    /// Skeleton query response.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatorError::NotInitialized`] before `initialize`.
    fn get_skeleton(&self) -> CoreResult<SkeletonDescriptor> {
        self.skeleton().map(Skeleton::descriptor)
    }

    /// Exact byte length of one frame, `num_bones × 64`. Zero before
    /// `initialize`.
    fn get_memory_size(&self) -> usize {
        self.skeleton().map_or(0, Skeleton::frame_bytes)
    }

    /// Length of the motion in seconds, `None` for endless sources.
    fn duration(&self) -> Option<f32> {
        None
    }

    /// Moves the internal clock to `time` seconds without writing a frame.
    ///
    /// The Player calls this whenever it wraps, clamps or seeks, so its
    /// cursor and the Animator clock never diverge.
    fn seek(&mut self, time: f32);

    /// Advances the internal clock by `dt` seconds and writes one full frame
    /// at `buffer[offset..offset + get_memory_size()]`.
    ///
    /// Every bone slot is overwritten; bytes outside the range are untouched.
    /// Must not allocate.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatorError::BufferTooSmall`] if the range does not fit,
    /// or [`AnimatorError::NotInitialized`] before `initialize`.
    fn write_frame_to_buffer(&mut self, buffer: &mut [u8], offset: usize, dt: f32) -> CoreResult<()>;
}

/// Resolves the destination range for one frame.
///
/// The single bounds check per frame; per-bone writes after this only carry
/// debug assertions.
pub(crate) fn frame_region(buffer: &mut [u8], offset: usize, frame_bytes: usize) -> CoreResult<&mut [u8]> {
    let available = buffer.len();
    let end = offset
        .checked_add(frame_bytes)
        .filter(|&end| end <= available)
        .ok_or(AnimatorError::BufferTooSmall {
            required: offset.saturating_add(frame_bytes),
            available,
        })?;
    Ok(&mut buffer[offset..end])
}

/// Folds a looping clock back into `[0, duration]`.
///
/// `time == duration` stays on the last frame; a zero-length source pins
/// the clock at zero.
#[inline]
pub(crate) fn wrap_time(time: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        0.0
    } else if time > duration {
        time % duration
    } else {
        time
    }
}

/// Writes one bone slot inside a region returned by [`frame_region`].
#[inline]
pub(crate) fn put_bone(region: &mut [u8], index: usize, transform: &BoneTransform) {
    let start = index * BONE_STRIDE;
    debug_assert!(start + BONE_STRIDE <= region.len(), "bone {index} outside frame region");
    region[start..start + BONE_STRIDE].copy_from_slice(transform.as_bytes());
}
