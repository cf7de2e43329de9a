//! Client registry
//!
//! Process-wide map from username to that session's output handle. Every
//! mutation runs under one lock, so a name check and its insert are a single
//! step and two sessions can never hold the same name.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::{Mutex, mpsc};

use crate::error::RegistryError;

/// Sending half of a session's outbound line queue.
pub type OutputHandle = mpsc::UnboundedSender<String>;

/// Shared registry of named sessions. Cloning shares the same map.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<String, OutputHandle>>>,
    started_at: i64,
    max_clients: usize,
    max_username_length: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize, max_username_length: usize) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            started_at: Utc::now().timestamp_millis(),
            max_clients,
            max_username_length,
        }
    }

    /// Server start time, epoch millis.
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Atomically checks and claims `username` for `handle`.
    ///
    /// `greeting` is queued on the handle before the entry becomes visible, so
    /// it precedes every broadcast the session will receive. Returns the
    /// number of registered users including this one.
    pub async fn register(
        &self,
        username: &str,
        handle: OutputHandle,
        greeting: &str,
    ) -> Result<usize, RegistryError> {
        if username.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let len = username.chars().count();
        if len > self.max_username_length {
            return Err(RegistryError::NameTooLong {
                len,
                max: self.max_username_length,
            });
        }

        let mut clients = self.clients.lock().await;

        if clients.contains_key(username) {
            return Err(RegistryError::NameTaken(username.to_string()));
        }

        if clients.len() >= self.max_clients {
            return Err(RegistryError::Full(self.max_clients));
        }

        // A closed handle only means the peer is already gone; teardown removes it.
        let _ = handle.send(greeting.to_string());
        clients.insert(username.to_string(), handle);

        info!(
            "Registered {} ({}/{} users)",
            username,
            clients.len(),
            self.max_clients
        );
        Ok(clients.len())
    }

    /// Releases `username`. Returns whether it was registered.
    pub async fn unregister(&self, username: &str) -> bool {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(username).is_some();
        if removed {
            info!("Unregistered {} ({} users left)", username, clients.len());
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Sends `message` to every registered session, the sender included.
    ///
    /// Handles are snapshotted under the lock and written after it is
    /// released. A closed handle is skipped; the rest still receive the line.
    /// Returns how many sessions the line was queued for.
    pub async fn broadcast(&self, message: &str) -> usize {
        let targets: Vec<(String, OutputHandle)> = {
            let clients = self.clients.lock().await;
            clients
                .iter()
                .map(|(name, handle)| (name.clone(), handle.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (name, handle) in targets {
            match handle.send(message.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!("Skipping closed session {} during broadcast", name),
            }
        }

        debug!("Broadcast to {} users: {}", delivered, message);
        delivered
    }
}
