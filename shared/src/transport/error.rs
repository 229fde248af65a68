use thiserror::Error;

/// Errors that can occur while handing a datagram to the network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The link to the remote host is gone
    #[error("Datagram link is closed. No further datagrams can be sent to this peer")]
    Disconnected,

    /// The datagram could not be queued
    #[error("Failed to send datagram of {length} bytes: {reason}")]
    SendFailed { length: usize, reason: String },
}
