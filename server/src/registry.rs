//! Registry of live connections
//!
//! Tracks every connection between transport accept and teardown. Both pumps of a
//! connection race to unregister it when either fails, so registration and removal
//! are idempotent: only the first removal observes the connection.

use crate::connection::{Connection, ConnectionId};
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Live connections indexed by their id
    connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the registry
    ///
    /// Returns false if the connection was already registered, in which case the
    /// registry is left untouched.
    pub fn register(&self, connection: Arc<Connection>) -> bool {
        let mut connections = self.connections.lock();
        if connections.contains_key(&connection.id()) {
            return false;
        }

        match connection.peer() {
            Some(addr) => info!("Connection {} registered from {}", connection.id(), addr),
            None => info!("Connection {} registered", connection.id()),
        }
        connections.insert(connection.id(), connection);
        true
    }

    /// Removes a connection from the registry
    ///
    /// Returns the connection if this call removed it, None if it was already
    /// gone. Calling this any number of times leaves the same state as calling
    /// it once.
    pub fn unregister(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        let removed = self.connections.lock().remove(&id);
        if removed.is_some() {
            info!("Connection {} unregistered", id);
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(&id)
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.connections.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of live connections
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns true if no connections are live
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}
