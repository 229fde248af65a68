use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc, time::Duration};

use log::{info, warn};

use voxsync_shared::{DatagramSender, MetavoxelState, SharedObjectResolver, StateError};

use crate::{
    connection::session::MetavoxelSession,
    error::SessionError,
    events::{ServerEvent, SessionEvent},
    server::ServerConfig,
};

/// Owns the authoritative metavoxel structure and one session per
/// connected client
pub struct MetavoxelServer<K: Eq + Hash + Clone + Debug, M: MetavoxelState> {
    config: ServerConfig,
    data: M,
    sessions: HashMap<K, MetavoxelSession<M>>,
    resolver: Arc<dyn SharedObjectResolver<M::Object>>,
}

impl<K: Eq + Hash + Clone + Debug, M: MetavoxelState> MetavoxelServer<K, M> {
    /// Create a new Server
    pub fn new(
        config: ServerConfig,
        data: M,
        resolver: Arc<dyn SharedObjectResolver<M::Object>>,
    ) -> Self {
        Self {
            config,
            data,
            sessions: HashMap::new(),
            resolver,
        }
    }

    /// The authoritative structure
    pub fn data(&self) -> &M {
        &self.data
    }

    /// Change the authoritative structure directly; every client receives
    /// the change with its next delta
    pub fn data_mut(&mut self) -> &mut M {
        &mut self.data
    }

    /// Apply an edit through the same entry point clients use
    pub fn apply_edit(&mut self, edit: &M::Edit) -> Result<(), StateError> {
        self.data.apply_edit(edit, self.resolver.as_ref())
    }

    /// Start serving `peer`. An existing session for the peer is closed.
    pub fn connect(&mut self, peer: K, sender: Box<dyn DatagramSender>) {
        info!("client {:?} connected", peer);
        let session = MetavoxelSession::new(&self.config, sender);
        if let Some(mut previous) = self.sessions.insert(peer, session) {
            previous.close();
        }
    }

    /// Close and forget the session for `peer`
    pub fn disconnect(&mut self, peer: &K) -> Result<(), SessionError> {
        let mut session = self
            .sessions
            .remove(peer)
            .ok_or_else(|| Self::unknown_peer(peer))?;
        session.close();
        Ok(())
    }

    pub fn session(&self, peer: &K) -> Option<&MetavoxelSession<M>> {
        self.sessions.get(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &K> {
        self.sessions.keys()
    }

    /// Process an inbound datagram from `peer`, applying its edits to the
    /// authoritative structure
    pub fn receive(&mut self, peer: &K, bytes: &[u8]) -> Result<Vec<ServerEvent<K>>, SessionError> {
        let session = self
            .sessions
            .get_mut(peer)
            .ok_or_else(|| Self::unknown_peer(peer))?;
        let session_events = session.receive_datagram(bytes)?;

        let mut events = Vec::new();
        for event in session_events {
            match event {
                SessionEvent::LodAnnounced(lod) => events.push(ServerEvent::LodAnnounced {
                    peer: peer.clone(),
                    lod,
                }),
                SessionEvent::EditReceived(edit) => {
                    match self.data.apply_edit(&edit, self.resolver.as_ref()) {
                        Ok(()) => events.push(ServerEvent::EditApplied { peer: peer.clone() }),
                        Err(error) => {
                            warn!("edit from {:?} rejected: {}", peer, error);
                            events.push(ServerEvent::EditRejected {
                                peer: peer.clone(),
                                error,
                            });
                        }
                    }
                }
                SessionEvent::ClosedByPeer => {
                    self.sessions.remove(peer);
                    info!("client {:?} disconnected", peer);
                    events.push(ServerEvent::Disconnected { peer: peer.clone() });
                }
            }
        }
        Ok(events)
    }

    /// Advance every session, sending deltas that are due. Failed sessions
    /// are dropped and reported.
    pub fn update(&mut self, delta: Duration) -> Vec<(K, SessionError)> {
        let mut failures = Vec::new();
        for (peer, session) in self.sessions.iter_mut() {
            if let Err(error) = session.update(delta, &self.data) {
                warn!("session for {:?} failed: {}", peer, error);
                failures.push((peer.clone(), error));
            }
        }
        self.sessions.retain(|_, session| session.is_open());
        failures
    }

    fn unknown_peer(peer: &K) -> SessionError {
        SessionError::UnknownPeer {
            peer: format!("{:?}", peer),
        }
    }
}

impl<K: Eq + Hash + Clone + Debug, M: MetavoxelState> Drop for MetavoxelServer<K, M> {
    fn drop(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.close();
        }
    }
}
