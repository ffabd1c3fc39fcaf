//! # Client Connection Management
//!
//! Track connected clients and their cancel handles.
//!
//! ## Design
//!
//! - The registry is touched on connect, state change and disconnect only,
//!   never per frame
//! - Each entry holds the handle that stops that connection's loop

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::cancel::CancelHandle;

/// Unique identifier for a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// State of a client connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake being written.
    #[default]
    Handshaking = 0,
    /// Frames flowing.
    Streaming = 1,
    /// Loop finished, pending removal.
    Closed = 2,
}

#[derive(Debug)]
struct Entry {
    addr: SocketAddr,
    state: ConnectionState,
    cancel: CancelHandle,
    connected_at: Instant,
}

/// Snapshot of one registered connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Connection ID.
    pub id: ConnectionId,
    /// Client's network address.
    pub addr: SocketAddr,
    /// Connection state.
    pub state: ConnectionState,
    /// Accept time.
    pub connected_at: Instant,
}

/// Live connections, bounded by `capacity`.
#[derive(Debug)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<ConnectionId, Entry>>,
    next_id: AtomicU32,
    capacity: usize,
}

impl ConnectionRegistry {
    /// Registry admitting at most `capacity` connections.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(capacity)),
            next_id: AtomicU32::new(1),
            capacity,
        }
    }

    /// Registers a connection in [`ConnectionState::Handshaking`].
    ///
    /// Returns `None` when full.
    pub fn register(&self, addr: SocketAddr, cancel: CancelHandle) -> Option<ConnectionId> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return None;
        }
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        entries.insert(
            id,
            Entry {
                addr,
                state: ConnectionState::Handshaking,
                cancel,
                connected_at: Instant::now(),
            },
        );
        Some(id)
    }

    /// Updates the state of a live connection.
    pub fn set_state(&self, id: ConnectionId, state: ConnectionState) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            entry.state = state;
        }
    }

    /// Removes a connection, returning its snapshot.
    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.entries.lock().remove(&id).map(|entry| ConnectionInfo {
            id,
            addr: entry.addr,
            state: ConnectionState::Closed,
            connected_at: entry.connected_at,
        })
    }

    /// Snapshot of one connection.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.entries.lock().get(&id).map(|entry| ConnectionInfo {
            id,
            addr: entry.addr,
            state: entry.state,
            connected_at: entry.connected_at,
        })
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of live connections.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cancels every live connection's loop.
    pub fn cancel_all(&self) {
        for entry in self.entries.lock().values() {
            entry.cancel.cancel();
        }
    }
}
