use voxsync_shared::{HighPriorityId, PacketNumber};

/// Observable results of processing an inbound datagram
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointEvent {
    /// The remote host acknowledged our datagrams up through this packet
    SendAcknowledged(PacketNumber),
    /// The remote host knows we received up through this packet
    ReceiveAcknowledged(PacketNumber),
    /// An optimistic edit reached the remote host and will not be replayed
    EditAcknowledged(HighPriorityId),
    /// A delta was applied and the resulting mirror recorded as a baseline
    BaselineCommitted(PacketNumber),
    /// Edits sent by the remote host were applied to the mirror
    EditsApplied(usize),
    /// The remote host closed the session
    ClosedByPeer,
}
