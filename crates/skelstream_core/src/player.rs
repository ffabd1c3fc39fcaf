//! # Player
//!
//! Per-consumer playback state machine.
//!
//! ```text
//!            play()                 play()
//!  ┌─────────┐ ───────► ┌─────────┐ ◄──┐
//!  │ Stopped │          │ Playing │ ───┘
//!  └─────────┘ ◄─────── └─────────┘
//!      ▲  │     stop() / end of non-looping clip
//!      └──┘ stop()
//! ```
//!
//! Each Player owns its [`FrameBuffer`], its playback cursor and its
//! Animator clone. Nothing here is shared between connections.

use crate::animator::{wrap_time, Animator};
use crate::error::{AnimatorError, CoreResult};
use crate::pose::{FrameBuffer, Skeleton};

/// Playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum PlayerState {
    /// Not advancing; `update` is a no-op.
    #[default]
    Stopped = 0,
    /// Advancing time and refreshing the frame on every `update`.
    Playing = 1,
}

/// Time cursor and flags owned by one Player.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct PlaybackState {
    /// Playback position in seconds, never negative.
    current_time: f32,
    /// Wrap at the end of a finite source instead of stopping.
    is_looping: bool,
    /// Whether the Player is in [`PlayerState::Playing`].
    is_playing: bool,
}

/// Drives one Animator into one owned frame buffer.
#[derive(Debug)]
pub struct Player<A: Animator> {
    animator: A,
    buffer: FrameBuffer,
    playback: PlaybackState,
    /// Set once the first frame has been written.
    has_frame: bool,
    frames_written: u64,
}

impl<A: Animator> Player<A> {
    /// Attaches an initialized Animator and sizes the frame buffer.
    ///
    /// The buffer is allocated here, once, from `get_memory_size()`.
    ///
    /// # Errors
    ///
    /// Returns [`AnimatorError::NotInitialized`] if the Animator has no
    /// skeleton yet.
    pub fn new(animator: A) -> CoreResult<Self> {
        animator.skeleton()?;
        let size = animator.get_memory_size();
        if size == 0 {
            return Err(AnimatorError::NotInitialized);
        }

        Ok(Self {
            animator,
            buffer: FrameBuffer::new(size),
            playback: PlaybackState::default(),
            has_frame: false,
            frames_written: 0,
        })
    }

    /// Starts or continues playback. Idempotent.
    pub fn play(&mut self) {
        self.playback.is_playing = true;
    }

    /// Stops playback. Idempotent; the last frame stays readable.
    pub fn stop(&mut self) {
        self.playback.is_playing = false;
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> PlayerState {
        if self.playback.is_playing {
            PlayerState::Playing
        } else {
            PlayerState::Stopped
        }
    }

    /// Whether the Player is playing.
    #[inline]
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playback.is_playing
    }

    /// Sets looping. Applies at the next end-of-source crossing.
    pub fn set_looping(&mut self, looping: bool) {
        self.playback.is_looping = looping;
    }

    /// Whether looping is enabled.
    #[inline]
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.playback.is_looping
    }

    /// Playback position in seconds.
    #[inline]
    #[must_use]
    pub const fn current_time(&self) -> f32 {
        self.playback.current_time
    }

    /// Frames written since attach.
    #[inline]
    #[must_use]
    pub const fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Moves the cursor and the Animator clock without writing a frame.
    ///
    /// Clamped to `[0, duration]` for finite sources. The next `update`
    /// advances from here.
    pub fn seek(&mut self, time: f32) {
        let time = time.max(0.0);
        let time = match self.animator.duration() {
            Some(duration) => time.min(duration),
            None => time,
        };
        self.playback.current_time = time;
        self.animator.seek(time);
    }

    /// Skeleton of the attached Animator.
    ///
    /// # Errors
    ///
    /// Propagates the Animator's error; an attached Animator is always
    /// initialized, so this only fails for broken implementations.
    pub fn skeleton(&self) -> CoreResult<&Skeleton> {
        self.animator.skeleton()
    }

    /// The attached Animator.
    #[must_use]
    pub fn animator(&self) -> &A {
        &self.animator
    }

    /// Advances playback by `dt` seconds and refreshes the frame.
    ///
    /// No-op while stopped. For a finite source the cursor wraps when
    /// looping; otherwise it clamps to the end, writes that final frame and
    /// stops. Hot path: no allocation.
    ///
    /// # Errors
    ///
    /// Propagates [`AnimatorError`] from the frame write. The buffer was
    /// sized from the Animator at attach time, so this indicates a broken
    /// Animator.
    pub fn update(&mut self, dt: f32) -> CoreResult<()> {
        if !self.playback.is_playing {
            return Ok(());
        }

        let dt = dt.max(0.0);
        let mut time = self.playback.current_time + dt;
        let mut reached_end = false;

        // Crossing the end re-anchors the Animator on the Player's cursor.
        let crossed_end = match self.animator.duration() {
            Some(duration) if time > duration => {
                if self.playback.is_looping {
                    time = wrap_time(time, duration);
                } else {
                    time = duration;
                    reached_end = true;
                }
                true
            }
            _ => false,
        };

        if crossed_end {
            self.animator.seek(time);
            self.animator.write_frame_to_buffer(self.buffer.as_mut_bytes(), 0, 0.0)?;
        } else {
            self.animator.write_frame_to_buffer(self.buffer.as_mut_bytes(), 0, dt)?;
        }

        self.playback.current_time = time;
        self.has_frame = true;
        self.frames_written += 1;

        if reached_end {
            self.playback.is_playing = false;
            tracing::debug!(time, "playback reached end of source");
        }
        Ok(())
    }

    /// View of the freshest frame, aliasing the frame buffer.
    ///
    /// `None` until the first frame has been written.
    #[inline]
    #[must_use]
    pub fn current_pose_bytes(&self) -> Option<&[u8]> {
        self.has_frame.then(|| self.buffer.as_bytes())
    }

    /// Same as [`Player::current_pose_bytes`].
    #[inline]
    #[must_use]
    pub fn get_current_pose_bytes(&self) -> Option<&[u8]> {
        self.current_pose_bytes()
    }

    /// The owned frame buffer.
    #[must_use]
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::{ClipAnimator, MotionClip, ProceduralAnimator};
    use crate::pose::{BoneTransform, Skeleton};
    use std::sync::Arc;

    fn procedural_player(bones: usize) -> Player<ProceduralAnimator> {
        let mut animator = ProceduralAnimator::new(bones);
        animator.initialize("procedural").unwrap();
        Player::new(animator).unwrap()
    }

    /// One bone, 11 keyframes 0.1 s apart: duration 1.0 s.
    fn clip_player() -> Player<ClipAnimator> {
        let keyframes = (0..11)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f32;
                BoneTransform::from_translation(x, 0.0, 0.0)
            })
            .collect();
        let clip = MotionClip::new("ramp", Skeleton::flat(1), 0.1, keyframes).unwrap();
        Player::new(ClipAnimator::from_clip(Arc::new(clip))).unwrap()
    }

    #[test]
    fn test_rejects_uninitialized_animator() {
        let err = Player::new(ProceduralAnimator::new(3)).unwrap_err();
        assert_eq!(err, AnimatorError::NotInitialized);
    }

    #[test]
    fn test_initial_state() {
        let player = procedural_player(2);
        assert_eq!(player.state(), PlayerState::Stopped);
        assert!(player.current_pose_bytes().is_none());
        assert_eq!(player.frame_buffer().len(), 128);
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn test_play_stop_idempotent() {
        let mut player = procedural_player(1);
        player.play();
        player.play();
        assert_eq!(player.state(), PlayerState::Playing);
        player.stop();
        player.stop();
        assert_eq!(player.state(), PlayerState::Stopped);
    }

    #[test]
    fn test_update_while_stopped_is_noop() {
        let mut player = procedural_player(2);
        player.update(0.5).unwrap();
        assert_eq!(player.current_time(), 0.0);
        assert!(player.frame_buffer().as_bytes().iter().all(|&b| b == 0));
        assert!(player.current_pose_bytes().is_none());

        player.play();
        player.update(0.5).unwrap();
        player.stop();
        let snapshot = player.frame_buffer().as_bytes().to_vec();
        player.update(0.5).unwrap();
        assert_eq!(player.frame_buffer().as_bytes(), snapshot.as_slice());
        assert!((player.current_time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_first_update_produces_frame() {
        let mut player = procedural_player(2);
        player.play();
        player.update(1.0 / 30.0).unwrap();

        let bytes = player.current_pose_bytes().unwrap();
        assert_eq!(bytes.len(), player.animator().get_memory_size());
        assert_eq!(player.frames_written(), 1);
    }

    #[test]
    fn test_view_aliases_buffer() {
        let mut player = procedural_player(1);
        player.play();
        player.update(0.1).unwrap();
        let view = player.current_pose_bytes().unwrap();
        assert_eq!(view.as_ptr(), player.frame_buffer().as_bytes().as_ptr());
    }

    #[test]
    fn test_frame_survives_stop() {
        let mut player = procedural_player(1);
        player.play();
        player.update(0.1).unwrap();
        player.stop();
        assert!(player.current_pose_bytes().is_some());
    }

    #[test]
    fn test_looping_wraps() {
        let mut player = clip_player();
        player.set_looping(true);
        player.play();

        let period = 0.3;
        for _ in 0..7 {
            player.update(period).unwrap();
        }

        // 2.1 s into a 1.0 s loop
        assert!((player.current_time() - 0.1).abs() < 1e-4);
        assert!(player.is_playing());
        let x = player.frame_buffer().bone(0, 0).unwrap().m[12];
        assert!((x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_looping_stops_at_end() {
        let mut player = clip_player();
        player.play();

        for _ in 0..3 {
            player.update(0.3).unwrap();
        }
        assert!(player.is_playing());

        player.update(0.3).unwrap();
        assert_eq!(player.state(), PlayerState::Stopped);
        assert!((player.current_time() - 1.0).abs() < 1e-6);
        let x = player.frame_buffer().bone(0, 0).unwrap().m[12];
        assert!((x - 10.0).abs() < 1e-3);

        let frames = player.frames_written();
        player.update(0.3).unwrap();
        assert_eq!(player.frames_written(), frames);
    }

    #[test]
    fn test_set_looping_applies_at_next_boundary() {
        let mut player = clip_player();
        player.play();
        player.update(0.9).unwrap();
        player.set_looping(true);
        player.update(0.3).unwrap();
        assert!(player.is_playing());
        assert!((player.current_time() - 0.2).abs() < 1e-4);
    }

    fn bone0_x<A: Animator>(player: &Player<A>) -> f32 {
        player.frame_buffer().bone(0, 0).unwrap().m[12]
    }

    #[test]
    fn test_seek_moves_sampled_frame() {
        let mut player = clip_player();
        player.seek(0.5);
        player.play();
        player.update(0.0).unwrap();
        assert!((player.current_time() - 0.5).abs() < 1e-6);
        assert!((bone0_x(&player) - 5.0).abs() < 1e-3);

        let mut updates = 0;
        while player.is_playing() {
            player.update(0.1).unwrap();
            updates += 1;
            assert!(updates < 20, "playback never reached the end");
        }

        // Last keyframe, not wherever the Animator clock drifted to.
        assert_eq!(player.current_time(), 1.0);
        assert!((bone0_x(&player) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_keeps_frame_on_cursor() {
        let mut player = clip_player();
        player.set_looping(true);
        player.seek(0.95);
        player.play();
        player.update(0.1).unwrap();

        assert!((player.current_time() - 0.05).abs() < 1e-4);
        assert!((bone0_x(&player) - 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_single_frame_clip_keeps_looping() {
        let clip = MotionClip::new(
            "still",
            Skeleton::flat(1),
            0.1,
            vec![BoneTransform::from_translation(3.0, 0.0, 0.0)],
        )
        .unwrap();
        let mut player = Player::new(ClipAnimator::from_clip(Arc::new(clip))).unwrap();
        player.set_looping(true);
        player.play();

        for _ in 0..3 {
            player.update(0.1).unwrap();
            assert_eq!(player.state(), PlayerState::Playing);
            assert_eq!(player.current_time(), 0.0);
            assert!((bone0_x(&player) - 3.0).abs() < 1e-6);
        }

        player.set_looping(false);
        player.update(0.1).unwrap();
        assert_eq!(player.state(), PlayerState::Stopped);
    }

    #[test]
    fn test_seek_clamps() {
        let mut player = clip_player();
        player.seek(5.0);
        assert_eq!(player.current_time(), 1.0);
        player.seek(-1.0);
        assert_eq!(player.current_time(), 0.0);

        let mut endless = procedural_player(1);
        endless.seek(42.0);
        assert_eq!(endless.current_time(), 42.0);
    }
}
