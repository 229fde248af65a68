use thiserror::Error;

use crate::types::MessageIndex;

/// Errors that can occur during message receiver operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// Reliable message index too far ahead of the next expected one
    #[error("Reliable message index {index} is {distance} ahead of the next expected index {expected}, beyond the window of {window}. Message data may be corrupted or malicious")]
    IndexOutOfWindow {
        index: MessageIndex,
        expected: MessageIndex,
        distance: usize,
        window: usize,
    },

    /// Buffer inconsistency detected in ordered receiver
    #[error("Buffer inconsistency detected: {reason}. This indicates an internal ordering error")]
    BufferInconsistency { reason: &'static str },
}
