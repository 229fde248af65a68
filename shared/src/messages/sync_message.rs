use naia_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedInteger};

use crate::{
    connection::error::SequencerError,
    constants::{MAX_BATCH_DEPTH, MAX_DATAGRAM_BITS},
    state::lod::Lod,
};

/// Application payload carried by a datagram or a reliable message
#[derive(Clone, Debug, PartialEq)]
pub enum SyncMessage<E: Serde> {
    /// The sender's current level of detail
    StateAnnouncement { lod: Lod },
    /// Encoded difference against the oldest unacknowledged baseline
    DeltaUpdate { bytes: Vec<u8> },
    /// A single edit to the shared structure
    EditOperation { edit: E },
    /// The sender is going away
    CloseSession,
    /// Elements that must be processed in order
    Batch(Vec<SyncMessage<E>>),
}

const TAG_STATE_ANNOUNCEMENT: u8 = 0;
const TAG_DELTA_UPDATE: u8 = 1;
const TAG_EDIT_OPERATION: u8 = 2;
const TAG_CLOSE_SESSION: u8 = 3;
const TAG_BATCH: u8 = 4;

type MessageTag = UnsignedInteger<3>;

impl<E: Serde> SyncMessage<E> {
    pub fn name(&self) -> &'static str {
        match self {
            SyncMessage::StateAnnouncement { .. } => "StateAnnouncement",
            SyncMessage::DeltaUpdate { .. } => "DeltaUpdate",
            SyncMessage::EditOperation { .. } => "EditOperation",
            SyncMessage::CloseSession => "CloseSession",
            SyncMessage::Batch(_) => "Batch",
        }
    }

    /// Serialize into a standalone byte buffer, which must fit in one
    /// datagram
    pub fn to_bytes(&self) -> Result<Vec<u8>, SequencerError> {
        let bits_needed = self.bit_length();
        if bits_needed > MAX_DATAGRAM_BITS {
            return Err(SequencerError::DatagramTooLarge {
                bits_needed,
                bits_available: MAX_DATAGRAM_BITS,
            });
        }
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        Ok(writer.to_bytes().to_vec())
    }

    /// Parse a standalone byte buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);
        Self::de(&mut reader)
    }

    fn tag(&self) -> u8 {
        match self {
            SyncMessage::StateAnnouncement { .. } => TAG_STATE_ANNOUNCEMENT,
            SyncMessage::DeltaUpdate { .. } => TAG_DELTA_UPDATE,
            SyncMessage::EditOperation { .. } => TAG_EDIT_OPERATION,
            SyncMessage::CloseSession => TAG_CLOSE_SESSION,
            SyncMessage::Batch(_) => TAG_BATCH,
        }
    }

    fn de_nested(reader: &mut BitReader, depth: u8) -> Result<Self, SerdeErr> {
        let tag = MessageTag::de(reader)?.get();
        match tag as u8 {
            TAG_STATE_ANNOUNCEMENT => Ok(SyncMessage::StateAnnouncement {
                lod: Lod::de(reader)?,
            }),
            TAG_DELTA_UPDATE => Ok(SyncMessage::DeltaUpdate {
                bytes: Vec::<u8>::de(reader)?,
            }),
            TAG_EDIT_OPERATION => Ok(SyncMessage::EditOperation { edit: E::de(reader)? }),
            TAG_CLOSE_SESSION => Ok(SyncMessage::CloseSession),
            TAG_BATCH => {
                if depth >= MAX_BATCH_DEPTH {
                    return Err(SerdeErr);
                }
                let mut elements = Vec::new();
                while bool::de(reader)? {
                    elements.push(Self::de_nested(reader, depth + 1)?);
                }
                Ok(SyncMessage::Batch(elements))
            }
            _ => Err(SerdeErr),
        }
    }
}

impl<E: Serde> Serde for SyncMessage<E> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        MessageTag::new(self.tag()).ser(writer);
        match self {
            SyncMessage::StateAnnouncement { lod } => lod.ser(writer),
            SyncMessage::DeltaUpdate { bytes } => bytes.ser(writer),
            SyncMessage::EditOperation { edit } => edit.ser(writer),
            SyncMessage::CloseSession => {}
            SyncMessage::Batch(elements) => {
                for element in elements {
                    true.ser(writer);
                    element.ser(writer);
                }
                false.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Self::de_nested(reader, 0)
    }

    fn bit_length(&self) -> u32 {
        let body = match self {
            SyncMessage::StateAnnouncement { lod } => lod.bit_length(),
            SyncMessage::DeltaUpdate { bytes } => bytes.bit_length(),
            SyncMessage::EditOperation { edit } => edit.bit_length(),
            SyncMessage::CloseSession => 0,
            SyncMessage::Batch(elements) => {
                elements
                    .iter()
                    .map(|element| 1 + element.bit_length())
                    .sum::<u32>()
                    + 1
            }
        };
        MessageTag::new(self.tag()).bit_length() + body
    }
}
