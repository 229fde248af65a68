use thiserror::Error;

use voxsync_shared::{RecordHistoryError, SequencerError, StateError, TransportError};

/// Errors that can occur while serving a metavoxel session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session was closed, locally or by the client
    #[error("Session is closed. No further datagrams can be sent or received")]
    Closed,

    /// Framing failure
    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// History invariant violated; the session has been closed
    #[error("Record history error: {0}. The session has been closed")]
    History(#[from] RecordHistoryError),

    /// The authoritative structure failed to encode a delta
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// The network boundary refused a datagram
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No session is registered for the peer
    #[error("No session registered for peer {peer}")]
    UnknownPeer { peer: String },
}
