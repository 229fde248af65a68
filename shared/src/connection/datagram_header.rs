use naia_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::types::PacketNumber;

/// Leading section of every datagram: its own number plus cumulative and
/// bitfield acknowledgment of what the sender has received.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DatagramHeader {
    /// Number of this datagram
    pub packet_number: PacketNumber,
    /// Newest packet number the sender has received from us (0 if none)
    pub last_received: PacketNumber,
    /// Bit `i` set means packet `last_received - 1 - i` was also received
    pub ack_field: u32,
}

impl DatagramHeader {
    pub fn new(packet_number: PacketNumber, last_received: PacketNumber, ack_field: u32) -> Self {
        Self {
            packet_number,
            last_received,
            ack_field,
        }
    }

    /// Every packet number this header reports as received, newest first
    pub fn acked_packets(&self) -> Vec<PacketNumber> {
        let mut output = Vec::new();
        if self.last_received == 0 {
            return output;
        }
        output.push(self.last_received);
        for bit in 0..32u32 {
            if self.ack_field & (1 << bit) == 0 {
                continue;
            }
            let Some(packet_number) = self.last_received.checked_sub(bit + 1) else {
                break;
            };
            if packet_number == 0 {
                break;
            }
            output.push(packet_number);
        }
        output
    }
}

impl Serde for DatagramHeader {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.packet_number.ser(writer);
        self.last_received.ser(writer);
        self.ack_field.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            packet_number: PacketNumber::de(reader)?,
            last_received: PacketNumber::de(reader)?,
            ack_field: u32::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.packet_number.bit_length()
            + self.last_received.bit_length()
            + self.ack_field.bit_length()
    }
}
