/// Datagram sequence number. Never reused within a connection; `0` is the
/// sentinel baseline and is never put on the wire as an outgoing number.
pub type PacketNumber = u32;
/// Index of a message on the reliable channel. Wraps, so compare with
/// [`sequence_less_than`](crate::sequence_less_than).
pub type MessageIndex = u16;
/// Locally assigned id of a high-priority message.
pub type HighPriorityId = u32;
/// Id of an object in the shared object table.
pub type SharedObjectId = u32;

/// The packet number that stands for "nothing received / nothing sent yet".
pub const SENTINEL_PACKET_NUMBER: PacketNumber = 0;
