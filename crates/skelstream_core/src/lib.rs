//! # SKELSTREAM Core
//!
//! Per-frame skeletal pose production written straight into a pre-sized
//! byte buffer:
//! - One frame = `num_bones × 64` bytes of column-major 4×4 `f32` matrices
//! - The buffer is sized once when an [`Animator`] is attached to a [`Player`]
//! - Every tick rewrites the whole frame in place, no allocation
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - `write_frame_to_buffer` and
//!    `Player::update` only touch memory that already exists
//! 2. **Shared data is immutable** - skeletons and motion clips live behind
//!    `Arc` and are never mutated after load
//! 3. **Per-consumer state is owned** - each Player owns its buffer, its
//!    clock and its Animator clone
//!
//! ## Example
//!
//! ```rust,ignore
//! use skelstream_core::{Animator, Player, ProceduralAnimator};
//!
//! let mut animator = ProceduralAnimator::new(50);
//! animator.initialize("procedural")?;
//!
//! let mut player = Player::new(animator)?;
//! player.play();
//! player.update(1.0 / 30.0)?;
//! let bytes = player.current_pose_bytes().expect("frame produced");
//! assert_eq!(bytes.len(), 50 * 64);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

// Frames go on the wire as raw native floats; the wire is little-endian.
#[cfg(target_endian = "big")]
compile_error!("skelstream_core writes native f32 bytes and only supports little-endian targets");

pub mod animator;
pub mod error;
pub mod player;
pub mod pose;

pub use animator::{Animator, ClipAnimator, MotionClip, ProceduralAnimator};
pub use error::{AnimatorError, CoreResult, InitError};
pub use player::{Player, PlayerState};
pub use pose::{Bone, BoneTransform, FrameBuffer, Skeleton, SkeletonDescriptor, BONE_STRIDE};
