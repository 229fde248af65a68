use voxsync_shared::{Lod, StateError};

/// What a session learned from one inbound datagram
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent<E> {
    /// The client announced a new level of detail
    LodAnnounced(Lod),
    /// The client submitted an edit
    EditReceived(E),
    /// The client closed the session
    ClosedByPeer,
}

/// Events produced by [`MetavoxelServer::receive`](crate::MetavoxelServer::receive)
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent<K> {
    LodAnnounced { peer: K, lod: Lod },
    /// An edit from `peer` was applied to the authoritative structure
    EditApplied { peer: K },
    /// An edit from `peer` was refused by the structure
    EditRejected { peer: K, error: StateError },
    Disconnected { peer: K },
}
