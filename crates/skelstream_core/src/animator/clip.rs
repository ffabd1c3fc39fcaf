//! Recorded-clip Animator.
//!
//! A [`MotionClip`] is loaded once at startup and shared read-only. Each
//! [`ClipAnimator`] clone samples it at its own clock, interpolating between
//! the two keyframes around the sample time.
//!
//! ## Clip document
//!
//! ```json
//! {
//!   "name": "walk",
//!   "frame_time": 0.0333,
//!   "bones": [ { "name": "hips" }, { "name": "spine", "parent": 0 } ],
//!   "frames": [ [ [16 floats], [16 floats] ], ... ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::{frame_region, put_bone, wrap_time, Animator};
use crate::error::{AnimatorError, CoreResult, InitError};
use crate::pose::{Bone, BoneTransform, Skeleton};

/// On-disk clip layout.
#[derive(Deserialize)]
struct ClipDocument {
    #[serde(default)]
    name: Option<String>,
    frame_time: f32,
    bones: Vec<Bone>,
    frames: Vec<Vec<BoneTransform>>,
}

/// Immutable keyframed motion for one skeleton.
#[derive(Debug)]
pub struct MotionClip {
    name: String,
    skeleton: Skeleton,
    frame_time: f32,
    frame_count: usize,
    /// `frame_count × bone_count` transforms, frame-major.
    keyframes: Vec<BoneTransform>,
}

impl MotionClip {
    /// Builds a clip from dense keyframes.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Malformed`] if `frame_time` is not a positive
    /// finite number, there are no keyframes, the keyframe count is not a
    /// multiple of the bone count, or any element is not finite.
    pub fn new(
        name: impl Into<String>,
        skeleton: Skeleton,
        frame_time: f32,
        keyframes: Vec<BoneTransform>,
    ) -> Result<Self, InitError> {
        let name = name.into();
        let malformed = |reason: String| InitError::Malformed {
            path: name.clone(),
            reason,
        };

        if !(frame_time.is_finite() && frame_time > 0.0) {
            return Err(malformed(format!("frame_time must be positive, got {frame_time}")));
        }
        let bones = skeleton.bone_count();
        if keyframes.is_empty() || keyframes.len() % bones != 0 {
            return Err(malformed(format!(
                "{} transforms do not form whole frames of {bones} bones",
                keyframes.len()
            )));
        }
        if let Some(index) = keyframes
            .iter()
            .position(|t| t.m.iter().any(|v| !v.is_finite()))
        {
            return Err(malformed(format!(
                "non-finite value in frame {} bone {}",
                index / bones,
                index % bones
            )));
        }

        Ok(Self {
            frame_count: keyframes.len() / bones,
            name,
            skeleton,
            frame_time,
            keyframes,
        })
    }

    /// Decodes a clip document.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Malformed`] for undecodable JSON or inconsistent
    /// frame data, [`InitError::InvalidSkeleton`] for a bad hierarchy.
    pub fn from_json(source: &str, json: &str) -> Result<Self, InitError> {
        let document: ClipDocument = serde_json::from_str(json).map_err(|e| InitError::Malformed {
            path: source.to_string(),
            reason: e.to_string(),
        })?;

        let skeleton = Skeleton::new(document.bones)?;
        let bones = skeleton.bone_count();

        if let Some(index) = document.frames.iter().position(|f| f.len() != bones) {
            return Err(InitError::Malformed {
                path: source.to_string(),
                reason: format!(
                    "frame {index} has {} transforms, skeleton has {bones} bones",
                    document.frames[index].len()
                ),
            });
        }

        let keyframes = document.frames.into_iter().flatten().collect();
        let name = document.name.unwrap_or_else(|| source.to_string());
        Self::new(name, skeleton, document.frame_time, keyframes)
    }

    /// Reads and decodes a clip document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::SourceMissing`] if the file does not exist,
    /// otherwise the errors of [`MotionClip::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InitError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let json = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => InitError::SourceMissing { path: display.clone() },
            _ => InitError::Malformed {
                path: display.clone(),
                reason: e.to_string(),
            },
        })?;

        let clip = Self::from_json(&display, &json)?;
        tracing::info!(
            clip = %clip.name,
            bones = clip.skeleton.bone_count(),
            frames = clip.frame_count,
            duration_s = clip.duration(),
            "motion clip loaded"
        );
        Ok(clip)
    }

    /// Clip name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Skeleton the keyframes animate.
    #[must_use]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Number of keyframes.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Time of the last keyframe.
    #[must_use]
    pub fn duration(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let spans = (self.frame_count - 1) as f32;
        spans * self.frame_time
    }

    /// Transforms of keyframe `index`, `None` past the last keyframe.
    #[must_use]
    pub fn keyframe(&self, index: usize) -> Option<&[BoneTransform]> {
        let bones = self.skeleton.bone_count();
        let start = index.checked_mul(bones)?;
        self.keyframes.get(start..start.checked_add(bones)?)
    }

    /// Writes the pose at `time` into a frame region.
    ///
    /// Times past the duration wrap; `time == duration` is the last keyframe.
    fn sample_into(&self, time: f32, region: &mut [u8]) {
        let duration = self.duration();
        let t = wrap_time(time, duration).clamp(0.0, duration);

        let position = t / self.frame_time;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i0 = (position.floor() as usize).min(self.frame_count - 1);
        let i1 = (i0 + 1).min(self.frame_count - 1);
        #[allow(clippy::cast_precision_loss)]
        let factor = (position - i0 as f32).clamp(0.0, 1.0);

        let bones = self.skeleton.bone_count();
        let k0 = &self.keyframes[i0 * bones..(i0 + 1) * bones];
        let k1 = &self.keyframes[i1 * bones..(i1 + 1) * bones];
        for (bone, (a, b)) in k0.iter().zip(k1).enumerate() {
            if i0 == i1 || factor == 0.0 {
                put_bone(region, bone, a);
            } else {
                put_bone(region, bone, &a.interpolate(b, factor));
            }
        }
    }
}

/// Animator sampling a shared [`MotionClip`].
#[derive(Clone, Debug, Default)]
pub struct ClipAnimator {
    clip: Option<Arc<MotionClip>>,
    time: f32,
}

impl ClipAnimator {
    /// Creates an unbound animator; `initialize` loads the clip file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an animator already bound to a loaded clip.
    #[must_use]
    pub fn from_clip(clip: Arc<MotionClip>) -> Self {
        Self {
            clip: Some(clip),
            time: 0.0,
        }
    }

    /// Animator clock in seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }
}

impl Animator for ClipAnimator {
    fn initialize(&mut self, source: &str) -> Result<(), InitError> {
        if self.clip.is_some() {
            return Err(InitError::AlreadyInitialized);
        }
        self.clip = Some(Arc::new(MotionClip::load(source)?));
        self.time = 0.0;
        Ok(())
    }

    fn skeleton(&self) -> CoreResult<&Skeleton> {
        self.clip
            .as_deref()
            .map(MotionClip::skeleton)
            .ok_or(AnimatorError::NotInitialized)
    }

    fn duration(&self) -> Option<f32> {
        self.clip.as_deref().map(MotionClip::duration)
    }

    fn seek(&mut self, time: f32) {
        let duration = self.duration().unwrap_or(0.0);
        self.time = wrap_time(time.max(0.0), duration);
    }

    fn write_frame_to_buffer(&mut self, buffer: &mut [u8], offset: usize, dt: f32) -> CoreResult<()> {
        let clip = self.clip.as_deref().ok_or(AnimatorError::NotInitialized)?;
        let region = frame_region(buffer, offset, clip.skeleton.frame_bytes())?;

        self.time = wrap_time(self.time + dt, clip.duration());
        clip.sample_into(self.time, region);
        Ok(())
    }
}
