use thiserror::Error;

use crate::{messages::channels::receivers::error::ReceiverError, types::PacketNumber};

/// Errors that can occur while composing or parsing datagrams
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// Structurally invalid datagram (SECURITY: untrusted network input)
    #[error("Malformed datagram: {reason}. The datagram was discarded")]
    MalformedDatagram { reason: &'static str },

    /// Header acknowledges a packet that was never sent
    #[error("Datagram acknowledges packet {acked} but only {sent} packets have been sent. The datagram was discarded")]
    AckOutOfRange { acked: PacketNumber, sent: PacketNumber },

    /// High-priority messages plus payload do not fit in one datagram
    #[error("Datagram requires {bits_needed} bits but only {bits_available} are available. Slim down the payload or high-priority messages")]
    DatagramTooLarge { bits_needed: u32, bits_available: u32 },

    /// Pending high-priority messages leave no room for another one
    #[error("High-priority messages would require {bits_needed} bits of every datagram but only {bits_available} are available. Wait for pending messages to be acknowledged")]
    HighPriorityBacklog { bits_needed: u32, bits_available: u32 },

    /// Reliable channel cannot accept more messages until some are acknowledged
    #[error("Reliable channel stalled with {in_flight} unacknowledged messages (limit {limit}). The remote host is not acknowledging")]
    ReliableChannelStalled { in_flight: usize, limit: usize },

    /// Reliable stream reassembly failed
    #[error(transparent)]
    Receiver(#[from] ReceiverError),
}

impl SequencerError {
    /// Whether this error only concerns one inbound datagram, leaving the
    /// connection usable
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            SequencerError::MalformedDatagram { .. }
                | SequencerError::AckOutOfRange { .. }
                | SequencerError::Receiver(ReceiverError::IndexOutOfWindow { .. })
        )
    }
}
