use std::default::Default;

use crate::constants::MAX_DATAGRAM_BITS;

/// Contains Config properties which will be used by a Server or Client
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Upper bound on the size of a composed datagram, in bits. Clamped to
    /// the serializer's MTU.
    pub mtu_bits: u32,
    /// An unacknowledged reliable message is carried again once this many
    /// datagrams have been sent since it was last carried.
    pub reliable_resend_packets: u32,
    /// Maximum number of unacknowledged reliable messages. Queueing more than
    /// this is treated as a broken connection.
    pub max_reliable_in_flight: usize,
}

impl ConnectionConfig {
    pub fn datagram_bits(&self) -> u32 {
        self.mtu_bits.min(MAX_DATAGRAM_BITS)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            mtu_bits: MAX_DATAGRAM_BITS,
            reliable_resend_packets: 4,
            max_reliable_in_flight: 1024,
        }
    }
}
