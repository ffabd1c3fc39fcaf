//! # Streaming Loop
//!
//! Drives one [`Player`] at a fixed cadence and hands every frame to one
//! transport.
//!
//! ## Per-Tick Order
//!
//! ```text
//! begin_tick ─► dt ─► Player::update(dt) ─► current_pose_bytes ─► send (bounded)
//!     ▲                                                              │
//!     └──────────────── wait_for_next_frame (cancellable) ◄──────────┘
//! ```
//!
//! The frame write completes before the view is handed to the transport,
//! and the transport copies before `send_frame` resolves, so a send never
//! observes a half-written frame.

use std::time::{Duration, Instant};

use skelstream_core::{Animator, Player};

use crate::cancel::CancelSignal;
use crate::error::{StreamError, TransportError};
use crate::pacing::{FramePacer, PacingConfig, PacingStats, WaitOutcome};
use crate::transport::{FrameTransport, TransportStats};
use crate::DEFAULT_SEND_TIMEOUT;

/// Per-connection loop parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Frame cadence.
    pub pacing: PacingConfig,
    /// Bound on one `send_frame`; a slower send drops the frame.
    pub send_timeout: Duration,
    /// Interval of the stats log line.
    pub stats_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            stats_interval: Duration::from_secs(1),
        }
    }
}

/// Why a loop ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamExit {
    /// The peer went away.
    Disconnected,
    /// The cancel signal fired.
    Cancelled,
}

/// Summary of a finished loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamReport {
    /// Ticks completed.
    pub ticks: u64,
    /// Frames accepted by the transport.
    pub frames_sent: u64,
    /// Frames dropped because the send timed out.
    pub frames_timed_out: u64,
    /// Exit reason.
    pub exit: StreamExit,
    /// Pacing statistics.
    pub pacing: PacingStats,
    /// Transport counters at exit.
    pub transport: TransportStats,
}

/// Counters for the periodic stats line.
struct StatsWindow {
    started: Instant,
    ticks: u64,
    sent: u64,
    timed_out: u64,
    work: Duration,
}

impl StatsWindow {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            ticks: 0,
            sent: 0,
            timed_out: 0,
            work: Duration::ZERO,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn flush_if_due(&mut self, interval: Duration, transport: &TransportStats, pacing: &PacingStats) {
        if self.started.elapsed() < interval || self.ticks == 0 {
            return;
        }
        let mean_work_ms = self.work.as_secs_f64() * 1_000.0 / self.ticks as f64;
        let mean_period_ms = pacing.avg_period_us as f64 / 1_000.0;
        tracing::debug!(
            ticks = self.ticks,
            frames_sent = self.sent,
            frames_timed_out = self.timed_out,
            frames_dropped_total = transport.frames_dropped,
            mean_period_ms,
            mean_work_ms,
            "stream stats"
        );
        *self = Self::new();
    }
}

/// One connection's Player + transport pair.
pub struct StreamingLoop<A: Animator, T: FrameTransport> {
    player: Player<A>,
    transport: T,
    cancel: CancelSignal,
    config: StreamConfig,
}

impl<A: Animator, T: FrameTransport> StreamingLoop<A, T> {
    /// Binds a Player to a transport. Looping must already be set on the
    /// Player; `run` starts playback.
    pub fn new(player: Player<A>, transport: T, cancel: CancelSignal, config: StreamConfig) -> Self {
        Self {
            player,
            transport,
            cancel,
            config,
        }
    }

    /// Runs until disconnect, cancellation or failure.
    ///
    /// On every exit path the Player is stopped and the transport closed.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Transport`] for send failures other than a
    /// disconnect and [`StreamError::Animator`] if a frame write fails.
    pub async fn run(mut self) -> Result<StreamReport, StreamError> {
        let mut pacer = FramePacer::new(self.config.pacing);
        let mut window = StatsWindow::new();
        let mut ticks = 0u64;
        let mut frames_sent = 0u64;
        let mut frames_timed_out = 0u64;

        self.player.play();

        let outcome = loop {
            if self.cancel.is_cancelled() || !self.transport.is_open() {
                break Ok(self.exit_reason());
            }

            let dt = pacer.begin_tick();
            let work_start = Instant::now();

            if let Err(e) = self.player.update(dt) {
                break Err(StreamError::from(e));
            }

            if let Some(frame) = self.player.current_pose_bytes() {
                match tokio::time::timeout(self.config.send_timeout, self.transport.send_frame(frame)).await {
                    Ok(Ok(())) => {
                        frames_sent += 1;
                        window.sent += 1;
                    }
                    Ok(Err(TransportError::Disconnected)) => break Ok(StreamExit::Disconnected),
                    Ok(Err(e)) => break Err(StreamError::from(e)),
                    Err(_) => {
                        frames_timed_out += 1;
                        window.timed_out += 1;
                        tracing::trace!(tick = ticks, "send timed out, frame dropped");
                    }
                }
            }

            ticks += 1;
            window.ticks += 1;
            window.work += work_start.elapsed();
            window.flush_if_due(self.config.stats_interval, &self.transport.stats(), &pacer.stats());

            if pacer.wait_for_next_frame(&mut self.cancel).await == WaitOutcome::Cancelled {
                break Ok(self.exit_reason());
            }
        };

        self.player.stop();
        self.transport.close().await;

        let exit = outcome?;
        Ok(StreamReport {
            ticks,
            frames_sent,
            frames_timed_out,
            exit,
            pacing: pacer.stats(),
            transport: self.transport.stats(),
        })
    }

    /// A closed transport takes precedence: peers closing also fire the
    /// cancel signal.
    fn exit_reason(&self) -> StreamExit {
        if self.transport.is_open() {
            StreamExit::Cancelled
        } else {
            StreamExit::Disconnected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use parking_lot::Mutex;
    use skelstream_core::{AnimatorError, BoneTransform, CoreResult, InitError, ProceduralAnimator, Skeleton};
    use std::sync::Arc;

    /// In-memory transport closing itself after `limit` frames.
    struct Recorder {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        limit: usize,
        closed: bool,
    }

    impl Recorder {
        fn new(limit: usize) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
            let frames = Arc::new(Mutex::new(Vec::new()));
            let recorder = Self {
                frames: Arc::clone(&frames),
                limit,
                closed: false,
            };
            (recorder, frames)
        }
    }

    impl FrameTransport for Recorder {
        async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            if self.closed {
                return Err(TransportError::Disconnected);
            }
            let mut frames = self.frames.lock();
            frames.push(frame.to_vec());
            self.closed = frames.len() >= self.limit;
            Ok(())
        }

        fn is_open(&self) -> bool {
            !self.closed
        }

        async fn close(&mut self) {
            self.closed = true;
        }

        fn stats(&self) -> TransportStats {
            TransportStats {
                frames_sent: self.frames.lock().len() as u64,
                ..TransportStats::default()
            }
        }
    }

    /// Animator whose every write fails.
    struct Broken(Skeleton);

    impl Animator for Broken {
        fn initialize(&mut self, _source: &str) -> Result<(), InitError> {
            Ok(())
        }

        fn skeleton(&self) -> CoreResult<&Skeleton> {
            Ok(&self.0)
        }

        fn seek(&mut self, _time: f32) {}

        fn write_frame_to_buffer(&mut self, _buffer: &mut [u8], _offset: usize, _dt: f32) -> CoreResult<()> {
            Err(AnimatorError::BufferTooSmall {
                required: 1,
                available: 0,
            })
        }
    }

    fn player(bones: usize) -> Player<ProceduralAnimator> {
        let mut animator = ProceduralAnimator::new(bones);
        animator.initialize("procedural").unwrap();
        Player::new(animator).unwrap()
    }

    fn fast_config() -> StreamConfig {
        StreamConfig {
            pacing: PacingConfig::from_rate(200),
            ..StreamConfig::default()
        }
    }

    #[tokio::test]
    async fn test_stops_after_transport_closes() {
        let (_handle, signal) = cancel_pair();
        let (transport, frames) = Recorder::new(3);

        let report = StreamingLoop::new(player(2), transport, signal, fast_config())
            .run()
            .await
            .unwrap();

        assert_eq!(report.exit, StreamExit::Disconnected);
        assert_eq!(report.frames_sent, 3);
        assert_eq!(report.transport.frames_sent, 3);
        assert!(frames.lock().iter().all(|f| f.len() == 128));
    }

    #[tokio::test]
    async fn test_first_frame_is_time_zero() {
        let (_handle, signal) = cancel_pair();
        let (transport, frames) = Recorder::new(1);

        StreamingLoop::new(player(2), transport, signal, fast_config())
            .run()
            .await
            .unwrap();

        let frames = frames.lock();
        let bone1 = BoneTransform::read_from(&frames[0][64..]);
        assert!((bone1.m[12] - 1.1).abs() < 1e-6);
        assert!(bone1.m[13].abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_pre_cancelled_sends_nothing() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        let (transport, frames) = Recorder::new(10);

        let report = StreamingLoop::new(player(1), transport, signal, fast_config())
            .run()
            .await
            .unwrap();

        assert_eq!(report.exit, StreamExit::Cancelled);
        assert_eq!(report.ticks, 0);
        assert!(frames.lock().is_empty());
    }

    #[tokio::test]
    async fn test_animator_failure_closes_transport() {
        let (_handle, signal) = cancel_pair();
        let (transport, frames) = Recorder::new(10);
        let player = Player::new(Broken(Skeleton::flat(1))).unwrap();

        let err = StreamingLoop::new(player, transport, signal, fast_config())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::Animator(AnimatorError::BufferTooSmall { .. })));
        assert!(frames.lock().is_empty());
    }
}
