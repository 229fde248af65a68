use naia_serde::MTU_SIZE_BYTES;

/// Largest datagram the sequencer will compose, in bits.
pub const MAX_DATAGRAM_BITS: u32 = (MTU_SIZE_BYTES as u32) * 8;

/// Number of earlier packets acknowledged by the bitfield in every header.
pub const ACK_FIELD_BITS: u32 = 32;

/// Deepest nesting of `Batch` messages a reader accepts.
pub const MAX_BATCH_DEPTH: u8 = 4;
