use thiserror::Error;

use crate::types::{PacketNumber, SharedObjectId};

/// Violations of the record-history contract. These indicate a programming
/// error rather than bad network input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordHistoryError {
    /// Records must be appended with strictly increasing packet numbers
    #[error("Record for packet {attempted} appended after record for packet {newest}. Packet numbers in a history must strictly increase")]
    NonIncreasing {
        newest: PacketNumber,
        attempted: PacketNumber,
    },
}

/// Errors raised by a metavoxel state while encoding, decoding or editing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Delta bytes could not be decoded
    #[error("Failed to decode delta: {reason}. Delta data may be corrupted or encoded against a different baseline")]
    MalformedDelta { reason: &'static str },

    /// Edit could not be decoded or applied
    #[error("Failed to apply edit: {reason}")]
    InvalidEdit { reason: &'static str },

    /// Edit refers to a shared object that is not registered
    #[error("Edit refers to unknown shared object {id}. Register it with the shared object table before submitting the edit")]
    UnknownSharedObject { id: SharedObjectId },

    /// Encoding needs the delta to fit in one datagram
    #[error("Encoded delta requires {bits_needed} bits but only {bits_available} are available")]
    DeltaTooLarge { bits_needed: u32, bits_available: u32 },
}
