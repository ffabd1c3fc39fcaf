//! # Pose Server
//!
//! Accepts TCP clients and runs one independent streaming loop per client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        POSE SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  accept ──► registry (≤ max_clients) ──► spawn connection   │
//! │                                              │              │
//! │        prototype.clone() ──► Player ──► StreamingLoop       │
//! │                                              │              │
//! │              TcpFrameTransport ◄─────────────┘              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Isolation
//!
//! - A connection's error or panic ends only that connection
//! - The shared skeleton and motion data are read-only after startup
//! - Shutdown cancels every loop, then waits for them to close

mod connection;

pub use connection::{ConnectionId, ConnectionInfo, ConnectionRegistry, ConnectionState};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use skelstream_core::{Animator, Player};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

use crate::cancel::{cancel_pair, CancelHandle, CancelSignal};
use crate::config::ServerConfig;
use crate::error::{ServerError, StreamError, TransportError};
use crate::protocol::Handshake;
use crate::streaming::{StreamReport, StreamingLoop};
use crate::transport::TcpFrameTransport;

/// Bound on writing the handshake to a new client.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed accept, so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Streams poses from clones of one prototype Animator.
#[derive(Debug)]
pub struct PoseServer<A: Animator + Clone> {
    config: ServerConfig,
    prototype: A,
    handshake: Handshake,
    registry: ConnectionRegistry,
    shutdown: CancelHandle,
}

impl<A: Animator + Clone> PoseServer<A> {
    /// Validates the configuration and the initialized prototype.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for bad configuration and
    /// [`ServerError::Animator`] if the prototype is not initialized.
    pub fn new(config: ServerConfig, prototype: A) -> Result<Self, ServerError> {
        config.validate()?;
        // Fails here, before any client, if the prototype cannot drive a Player.
        Player::new(prototype.clone())?;

        let handshake = Handshake::new(prototype.get_skeleton()?, config.frame_rate, config.frame_header);
        let registry = ConnectionRegistry::new(config.max_clients);
        let (shutdown, _) = cancel_pair();

        Ok(Self {
            config,
            prototype,
            handshake,
            registry,
            shutdown,
        })
    }

    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is unavailable.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.bind;
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Accepts clients until [`PoseServer::shutdown`], then waits for every
    /// connection to close.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener has no local address.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            bones = self.handshake.skeleton.bone_count(),
            frame_rate = self.config.frame_rate,
            max_clients = self.config.max_clients,
            "pose server listening"
        );

        let mut shutdown = self.shutdown.signal();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, &mut connections),
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "connection task aborted");
                    }
                }
            }
        }

        tracing::info!(active = self.registry.len(), "pose server shutting down");
        self.registry.cancel_all();
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "connection task aborted");
            }
        }
        Ok(())
    }

    /// Stops accepting and cancels every connection. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.registry.cancel_all();
    }

    /// Number of connected clients.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.registry.len()
    }

    /// Handshake sent to every client.
    #[must_use]
    pub const fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    fn admit(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr, connections: &mut JoinSet<()>) {
        let (cancel, signal) = cancel_pair();
        let Some(id) = self.registry.register(addr, cancel.clone()) else {
            tracing::warn!(%addr, capacity = self.registry.capacity(), "refusing client, server full");
            return;
        };

        tracing::info!(%id, %addr, active = self.registry.len(), "client connected");
        let server = Arc::clone(self);
        connections.spawn(async move {
            let result = server.stream_to(id, stream, cancel, signal).await;
            let info = server.registry.remove(id);
            let uptime_s = info.map_or(0.0, |i| i.connected_at.elapsed().as_secs_f32());

            match result {
                Ok(report) => tracing::info!(
                    %id,
                    %addr,
                    exit = ?report.exit,
                    frames_sent = report.frames_sent,
                    frames_dropped = report.transport.frames_dropped + report.frames_timed_out,
                    late_ticks = report.pacing.late_ticks,
                    uptime_s,
                    "client disconnected"
                ),
                Err(e) => tracing::warn!(%id, %addr, error = %e, uptime_s, "connection closed on error"),
            }
        });
    }

    async fn stream_to(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        cancel: CancelHandle,
        signal: CancelSignal,
    ) -> Result<StreamReport, StreamError> {
        let mut player = Player::new(self.prototype.clone())?;
        player.set_looping(self.config.looping);

        let transport = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            TcpFrameTransport::accept(stream, &self.handshake, cancel),
        )
        .await
        .map_err(|_| TransportError::Handshake("timed out".into()))??;

        self.registry.set_state(id, ConnectionState::Streaming);
        let stream_loop = StreamingLoop::new(player, transport, signal, self.config.stream_config());

        // Own task, so a panic inside the loop surfaces as an error here.
        tokio::spawn(stream_loop.run())
            .await
            .map_err(|e| StreamError::Unexpected(e.to_string()))?
    }
}
