use thiserror::Error;

use voxsync_shared::{RecordHistoryError, SequencerError, StateError, TransportError};

use crate::endpoint_state::EndpointState;

/// Errors that can occur while driving a sync endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Operation requires an open endpoint
    #[error("Endpoint is {state}. Only open endpoints can send, receive or submit edits")]
    NotOpen { state: EndpointState },

    /// Framing failure; a stalled reliable channel closes the endpoint
    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// History invariant violated; the endpoint has been closed
    #[error("Record history error: {0}. The endpoint has been closed")]
    History(#[from] RecordHistoryError),

    /// The synchronized structure rejected a delta or edit
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// The network boundary refused a datagram
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Another thread panicked while holding an endpoint
    #[error("Endpoint lock poisoned. A thread panicked while driving this endpoint")]
    LockPoisoned,

    /// No endpoint is registered for the peer
    #[error("No endpoint registered for peer {peer}")]
    UnknownPeer { peer: String },
}
