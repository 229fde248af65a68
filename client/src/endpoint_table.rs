use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::{info, warn};

use voxsync_shared::MetavoxelState;

use crate::{
    client::MetavoxelClient, edit_dispatcher::EditDelivery, error::EndpointError,
    events::EndpointEvent,
};

type SharedClient<M> = Arc<Mutex<MetavoxelClient<M>>>;

/// Owns one sync endpoint per peer. Each endpoint sits behind its own lock,
/// so network and simulation contexts can drive different peers
/// concurrently while every access to one endpoint is exclusive.
pub struct EndpointTable<K: Eq + Hash + Clone + Debug, M: MetavoxelState> {
    endpoints: HashMap<K, SharedClient<M>>,
}

impl<K: Eq + Hash + Clone + Debug, M: MetavoxelState> EndpointTable<K, M> {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    /// Register the endpoint for `peer`. A previous endpoint for the same
    /// peer is closed.
    pub fn insert(&mut self, peer: K, client: MetavoxelClient<M>) -> SharedClient<M> {
        let shared = Arc::new(Mutex::new(client));
        if let Some(previous) = self.endpoints.insert(peer.clone(), shared.clone()) {
            info!("replacing endpoint for peer {:?}", peer);
            if let Ok(mut previous) = previous.lock() {
                previous.close();
            }
        }
        shared
    }

    pub fn get(&self, peer: &K) -> Option<SharedClient<M>> {
        self.endpoints.get(peer).cloned()
    }

    pub fn contains(&self, peer: &K) -> bool {
        self.endpoints.contains_key(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &K> {
        self.endpoints.keys()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Close and forget the endpoint for `peer`
    pub fn remove(&mut self, peer: &K) -> Result<(), EndpointError> {
        let shared = self
            .endpoints
            .remove(peer)
            .ok_or_else(|| Self::unknown_peer(peer))?;
        let mut client = Self::lock(&shared)?;
        client.close();
        Ok(())
    }

    /// Tick every endpoint. Endpoints that fail are closed, removed, and
    /// reported.
    pub fn tick_all(&mut self, delta: Duration) -> Vec<(K, EndpointError)> {
        self.for_each_open(|client| client.tick(delta))
    }

    /// Hand an inbound datagram to the endpoint of its sender
    pub fn receive(&mut self, peer: &K, bytes: &[u8]) -> Result<Vec<EndpointEvent>, EndpointError> {
        let shared = self
            .endpoints
            .get(peer)
            .cloned()
            .ok_or_else(|| Self::unknown_peer(peer))?;
        let result = {
            let mut client = Self::lock(&shared)?;
            client.receive_datagram(bytes)
        };
        let closed = Self::lock(&shared).map(|client| !client.is_open()).unwrap_or(true);
        if closed {
            self.endpoints.remove(peer);
        }
        result
    }

    /// Submit an edit to every open endpoint
    pub fn apply_edit(&mut self, edit: &M::Edit, delivery: EditDelivery) -> Vec<(K, EndpointError)> {
        self.for_each_open(|client| client.submit_edit(edit.clone(), delivery).map(|_| ()))
    }

    fn for_each_open<F>(&mut self, mut operation: F) -> Vec<(K, EndpointError)>
    where
        F: FnMut(&mut MetavoxelClient<M>) -> Result<(), EndpointError>,
    {
        let mut failures = Vec::new();
        let mut closed = Vec::new();
        for (peer, shared) in &self.endpoints {
            let mut client = match Self::lock(shared) {
                Ok(client) => client,
                Err(error) => {
                    failures.push((peer.clone(), error));
                    closed.push(peer.clone());
                    continue;
                }
            };
            if !client.is_open() {
                closed.push(peer.clone());
                continue;
            }
            if let Err(error) = operation(&mut *client) {
                warn!("endpoint for peer {:?} failed: {}", peer, error);
                failures.push((peer.clone(), error));
            }
            if !client.is_open() {
                closed.push(peer.clone());
            }
        }
        for peer in closed {
            self.endpoints.remove(&peer);
        }
        failures
    }

    fn lock(shared: &SharedClient<M>) -> Result<MutexGuard<'_, MetavoxelClient<M>>, EndpointError> {
        shared.lock().map_err(|_| EndpointError::LockPoisoned)
    }

    fn unknown_peer(peer: &K) -> EndpointError {
        EndpointError::UnknownPeer {
            peer: format!("{:?}", peer),
        }
    }
}

impl<K: Eq + Hash + Clone + Debug, M: MetavoxelState> Default for EndpointTable<K, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + Debug, M: MetavoxelState> Drop for EndpointTable<K, M> {
    fn drop(&mut self) {
        for (_, shared) in self.endpoints.drain() {
            if let Ok(mut client) = shared.lock() {
                client.close();
            }
        }
    }
}
