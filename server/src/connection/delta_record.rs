use voxsync_shared::{Lod, PacketNumber, Record, SENTINEL_PACKET_NUMBER};

/// The authoritative structure as sent in `packet_number`, and the lod its
/// delta targeted
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaRecord<M> {
    pub packet_number: PacketNumber,
    pub snapshot: M,
    pub lod: Lod,
}

impl<M: Default> DeltaRecord<M> {
    pub fn sentinel() -> Self {
        Self {
            packet_number: SENTINEL_PACKET_NUMBER,
            snapshot: M::default(),
            lod: Lod::default(),
        }
    }
}

impl<M> Record for DeltaRecord<M> {
    fn packet_number(&self) -> PacketNumber {
        self.packet_number
    }
}
