//! Fan-out of filesystem change events to live UI connections.
//!
//! The broadcaster owns an explicit subscriber list instead of reaching into
//! a global connection enumeration. Connection liveness is modeled: a send
//! into a hung-up channel is a checked, swallowed condition that marks the
//! connection dead, never an error that propagates to the operation that
//! caused the event.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use dirwatch::ChangeEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Opaque identity of one UI connection. Allocated by the broadcaster when
/// the connection subscribes; used by the watch registry to key watches and
/// by mutation requests to exclude their originator from a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct ConnectionHandle {
    sender: UnboundedSender<ChangeEvent>,
}

impl ConnectionHandle {
    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[derive(Default)]
struct BroadcasterInner {
    next_id: u32,
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

/// Delivers [`ChangeEvent`]s to every live UI connection, with optional
/// exclusion of the connection that caused the event.
#[derive(Default)]
pub struct EventBroadcaster {
    inner: Mutex<BroadcasterInner>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's push channel and returns its identity.
    pub fn register(&self, sender: UnboundedSender<ChangeEvent>) -> ConnectionId {
        let mut inner = self.inner.lock().unwrap();
        let id = ConnectionId(inner.next_id);
        inner.next_id += 1;
        inner.connections.insert(id, ConnectionHandle { sender });
        log::debug!("Connection registered: {}", id);
        id
    }

    /// Removes a connection. Idempotent; unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.connections.remove(&id).is_some() {
            log::debug!("Connection unregistered: {}", id);
        }
    }

    /// Sends `event` to every live connection except `exclude`.
    ///
    /// Delivery to a connection whose channel has hung up is swallowed and
    /// the connection is pruned. The excluded originator already learns the
    /// outcome through its request's response.
    pub fn broadcast(&self, event: &ChangeEvent, exclude: Option<ConnectionId>) {
        let mut inner = self.inner.lock().unwrap();
        let mut dead = Vec::new();

        for (&id, handle) in &inner.connections {
            if Some(id) == exclude {
                continue;
            }
            if handle.sender.send(event.clone()).is_err() {
                dead.push(id);
            }
        }

        for id in dead {
            log::debug!("Dropping dead connection during broadcast: {}", id);
            inner.connections.remove(&id);
        }
    }

    /// Sends `event` to one connection only. Returns whether delivery was
    /// accepted; an unknown or hung-up connection is a quiet false.
    pub fn send_to(&self, id: ConnectionId, event: &ChangeEvent) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.connections.get(&id) {
            Some(handle) => handle.sender.send(event.clone()).is_ok(),
            None => false,
        }
    }

    /// Number of currently registered connections, dead ones included until
    /// the next broadcast prunes them.
    pub fn connection_count(&self) -> usize {
        self.inner.lock().unwrap().connections.len()
    }

    /// Whether a connection is registered and its channel still open.
    pub fn is_live(&self, id: ConnectionId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .connections
            .get(&id)
            .map(|handle| !handle.is_closed())
            .unwrap_or(false)
    }
}
