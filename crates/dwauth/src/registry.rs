//! The set of live connections.

use std::collections::HashMap;

use dwauth_transport::ConnectionId;

use crate::ConnectionHandle;

/// Live connections, keyed by id.
///
/// Not synchronized itself; the server keeps it behind one mutex and every
/// insert or remove goes through that lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.id(), handle);
    }

    /// Removes a connection. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionHandle> {
        self.connections.get(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Clones of every handle, ordered by id, for use outside the lock.
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<ConnectionHandle> = self.connections.values().cloned().collect();
        handles.sort_by_key(ConnectionHandle::id);
        handles
    }
}
