pub mod error;

use crate::transport::error::TransportError;

/// Network boundary for one peer: a non-blocking handoff of a finished
/// datagram
pub trait DatagramSender: Send + Sync {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;
}
