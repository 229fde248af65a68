use log::{debug, trace};
use naia_serde::{BitReader, BitWriter, Serde, UnsignedVariableInteger};

use crate::{
    connection::{
        ack_manager::{AckManager, IncomingPacketStatus},
        connection_config::ConnectionConfig,
        datagram_header::DatagramHeader,
        error::SequencerError,
    },
    messages::channels::{
        receivers::{
            high_priority_receiver::HighPriorityReceiver,
            ordered_reliable_receiver::OrderedReliableReceiver,
        },
        senders::{
            high_priority_sender::HighPrioritySender,
            reliable_sender::ReliableSender,
        },
    },
    types::{HighPriorityId, MessageIndex, PacketNumber, SENTINEL_PACKET_NUMBER},
};

/// Bits every datagram spends outside its sections: header plus the two
/// section terminators
const DATAGRAM_FRAME_BITS: u32 = 32 * 3 + 1 + 1;

/// Widest encoding of a high-priority id
const HIGH_PRIORITY_ID_MAX_BITS: u32 = 5 * 8;

/// Wire size of a payload of `bits` once it is carried as a byte vector
fn framed_payload_bits(bits: u32) -> u32 {
    let bytes = bits.div_ceil(8);
    UnsignedVariableInteger::<5>::new(bytes).bit_length() + bytes * 8
}

/// Acknowledgment notifications produced while processing an inbound datagram
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    /// The remote host received everything we care about up through this
    /// outgoing packet. Monotonic.
    SendAcknowledged(PacketNumber),
    /// The remote host knows we received up through this incoming packet.
    /// Monotonic.
    ReceiveAcknowledged(PacketNumber),
    /// A high-priority message will no longer be resent
    HighPriorityAcknowledged(HighPriorityId),
}

/// Everything extracted from one inbound datagram
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedDatagram {
    pub packet_number: PacketNumber,
    /// Older than a datagram already processed; the payload should not be
    /// applied
    pub stale: bool,
    pub payload: Vec<u8>,
    /// Reliable messages released in order by this datagram
    pub reliable_messages: Vec<Vec<u8>>,
    /// High-priority messages seen for the first time
    pub high_priority_messages: Vec<(HighPriorityId, Vec<u8>)>,
    pub events: Vec<SequencerEvent>,
}

/// Application payload of the datagram being composed
pub struct DatagramWriter {
    writer: BitWriter,
    bits_written: u32,
    bits_available: u32,
}

impl DatagramWriter {
    fn new(bits_available: u32) -> Self {
        Self {
            writer: BitWriter::new(),
            bits_written: 0,
            bits_available,
        }
    }

    /// Append a value to the payload. The budget covers the payload's
    /// length prefix and byte padding.
    pub fn write<T: Serde>(&mut self, value: &T) -> Result<(), SequencerError> {
        let bits_written = self.bits_written + value.bit_length();
        let bits_needed = framed_payload_bits(bits_written);
        if bits_needed > self.bits_available {
            return Err(SequencerError::DatagramTooLarge {
                bits_needed,
                bits_available: self.bits_available,
            });
        }
        value.ser(&mut self.writer);
        self.bits_written = bits_written;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.bits_written == 0
    }

    fn into_bytes(self) -> Vec<u8> {
        if self.bits_written == 0 {
            return Vec::new();
        }
        self.writer.to_bytes().to_vec()
    }
}

struct ParsedDatagram {
    header: DatagramHeader,
    reliable: Vec<(MessageIndex, Vec<u8>)>,
    high_priority: Vec<(HighPriorityId, Vec<u8>)>,
    payload: Vec<u8>,
}

/// Frames outgoing datagrams and unpacks incoming ones for one connection,
/// carrying a reliable ordered channel and a redundant high-priority channel
/// alongside each application payload
pub struct DatagramSequencer {
    config: ConnectionConfig,
    ack_manager: AckManager,
    reliable_sender: ReliableSender,
    reliable_receiver: OrderedReliableReceiver,
    high_priority_sender: HighPrioritySender,
    high_priority_receiver: HighPriorityReceiver,
}

impl DatagramSequencer {
    pub fn new(config: ConnectionConfig) -> Self {
        let max_message_bits = config
            .datagram_bits()
            .saturating_sub(DATAGRAM_FRAME_BITS + Vec::<u8>::new().bit_length());
        Self {
            ack_manager: AckManager::new(),
            reliable_sender: ReliableSender::new(
                config.reliable_resend_packets,
                config.max_reliable_in_flight,
                max_message_bits,
            ),
            reliable_receiver: OrderedReliableReceiver::new(config.max_reliable_in_flight),
            high_priority_sender: HighPrioritySender::new(),
            high_priority_receiver: HighPriorityReceiver::new(),
            config,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Number of the most recently sent datagram, or the sentinel
    pub fn outgoing_packet_number(&self) -> PacketNumber {
        self.ack_manager.last_sent_packet_number()
    }

    /// Number the next finished datagram will carry
    pub fn next_packet_number(&self) -> PacketNumber {
        self.ack_manager.next_packet_number()
    }

    /// Newest datagram number received, or the sentinel
    pub fn incoming_packet_number(&self) -> PacketNumber {
        self.ack_manager.last_received_packet_number()
    }

    /// Sent datagrams still waiting for an acknowledgment
    pub fn unacknowledged_packet_count(&self) -> usize {
        self.ack_manager.unacknowledged_packet_count()
    }

    /// Begin composing the next outgoing datagram
    pub fn start_datagram(&self) -> DatagramWriter {
        let bits_available = self.config.datagram_bits().saturating_sub(
            DATAGRAM_FRAME_BITS + self.high_priority_sender.bits_needed(),
        );
        DatagramWriter::new(bits_available)
    }

    /// Serialize reliable messages that fit, every unacknowledged
    /// high-priority message, then the payload. The returned bytes are ready
    /// for the network.
    pub fn finish_datagram(&mut self, writer: DatagramWriter) -> Result<Vec<u8>, SequencerError> {
        let payload = writer.into_bytes();
        let high_priority_bits = self.high_priority_sender.bits_needed();
        let bits_needed = DATAGRAM_FRAME_BITS + high_priority_bits + payload.bit_length();
        let bits_available = self.config.datagram_bits();
        if bits_needed > bits_available {
            return Err(SequencerError::DatagramTooLarge {
                bits_needed,
                bits_available,
            });
        }

        let header = self.ack_manager.next_outgoing_header();
        self.ack_manager.expire_sent_packets(&mut [
            &mut self.reliable_sender,
            &mut self.high_priority_sender,
        ]);
        let reliable = self
            .reliable_sender
            .collect_messages(header.packet_number, bits_available - bits_needed);
        self.high_priority_sender.record_sent(header.packet_number);

        let mut writer = BitWriter::new();
        header.ser(&mut writer);
        for (message_index, bytes) in &reliable {
            true.ser(&mut writer);
            message_index.ser(&mut writer);
            bytes.ser(&mut writer);
        }
        false.ser(&mut writer);
        for (id, bytes) in self.high_priority_sender.messages() {
            true.ser(&mut writer);
            UnsignedVariableInteger::<7>::new(id).ser(&mut writer);
            bytes.ser(&mut writer);
        }
        false.ser(&mut writer);
        payload.ser(&mut writer);

        trace!(
            "sent datagram {} ({} reliable, {} high priority bits, {} payload bytes)",
            header.packet_number,
            reliable.len(),
            high_priority_bits,
            payload.len()
        );
        Ok(writer.to_bytes().to_vec())
    }

    /// Register a message to be carried by every datagram until one carrying
    /// it is acknowledged
    pub fn send_high_priority_message(&mut self, bytes: Vec<u8>) -> HighPriorityId {
        self.high_priority_sender.send_message(bytes)
    }

    /// Unacknowledged outgoing high-priority messages, oldest first
    pub fn high_priority_messages(&self) -> impl Iterator<Item = (HighPriorityId, &Vec<u8>)> {
        self.high_priority_sender.messages()
    }

    pub fn is_high_priority_pending(&self, id: HighPriorityId) -> bool {
        self.high_priority_sender.is_pending(id)
    }

    /// Check that every datagram can still carry all pending high-priority
    /// messages, one more holding `bytes`, and a payload of `payload_bits`
    pub fn check_high_priority_room(
        &self,
        bytes: &Vec<u8>,
        payload_bits: u32,
    ) -> Result<(), SequencerError> {
        let bits_needed = DATAGRAM_FRAME_BITS
            + self.high_priority_sender.bits_needed()
            + 1
            + HIGH_PRIORITY_ID_MAX_BITS
            + bytes.bit_length()
            + framed_payload_bits(payload_bits);
        let bits_available = self.config.datagram_bits();
        if bits_needed > bits_available {
            return Err(SequencerError::HighPriorityBacklog {
                bits_needed,
                bits_available,
            });
        }
        Ok(())
    }

    /// Ordered exactly-once output channel
    pub fn reliable_output_channel(&mut self) -> &mut ReliableSender {
        &mut self.reliable_sender
    }

    /// Process an inbound datagram. Returns `Ok(None)` for an exact
    /// duplicate. A malformed datagram changes no state.
    pub fn receive_datagram(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<ReceivedDatagram>, SequencerError> {
        let parsed = self.parse_datagram(bytes)?;
        let packet_number = parsed.header.packet_number;

        let status = self.ack_manager.record_incoming(packet_number);
        if status == IncomingPacketStatus::Duplicate {
            debug!("discarding duplicate datagram {}", packet_number);
            return Ok(None);
        }

        let outcome = self.ack_manager.process_incoming_header(
            &parsed.header,
            &mut [&mut self.reliable_sender, &mut self.high_priority_sender],
        );
        let mut events = Vec::new();
        if let Some(send_acknowledged) = outcome.send_acknowledged {
            events.push(SequencerEvent::SendAcknowledged(send_acknowledged));
        }
        if let Some(receive_acknowledged) = outcome.receive_acknowledged {
            events.push(SequencerEvent::ReceiveAcknowledged(receive_acknowledged));
        }
        for id in self.high_priority_sender.take_acknowledged() {
            events.push(SequencerEvent::HighPriorityAcknowledged(id));
        }

        let mut reliable_messages = Vec::new();
        for (message_index, message) in parsed.reliable {
            reliable_messages.extend(
                self.reliable_receiver
                    .receive_message(message_index, message)?,
            );
        }
        let high_priority_messages = self
            .high_priority_receiver
            .receive_messages(parsed.high_priority);

        let stale = status == IncomingPacketStatus::Stale;
        if stale {
            debug!("datagram {} arrived out of order", packet_number);
        }

        Ok(Some(ReceivedDatagram {
            packet_number,
            stale,
            payload: parsed.payload,
            reliable_messages,
            high_priority_messages,
            events,
        }))
    }

    fn parse_datagram(&self, bytes: &[u8]) -> Result<ParsedDatagram, SequencerError> {
        let malformed = |reason: &'static str| SequencerError::MalformedDatagram { reason };
        let mut reader = BitReader::new(bytes);

        let header =
            DatagramHeader::de(&mut reader).map_err(|_| malformed("truncated header"))?;
        if header.packet_number == SENTINEL_PACKET_NUMBER {
            return Err(malformed("sentinel packet number"));
        }
        let sent = self.ack_manager.last_sent_packet_number();
        if header.last_received > sent {
            return Err(SequencerError::AckOutOfRange {
                acked: header.last_received,
                sent,
            });
        }

        let mut reliable = Vec::new();
        while bool::de(&mut reader).map_err(|_| malformed("truncated reliable section"))? {
            let message_index = MessageIndex::de(&mut reader)
                .map_err(|_| malformed("truncated reliable message index"))?;
            let message = Vec::<u8>::de(&mut reader)
                .map_err(|_| malformed("truncated reliable message"))?;
            self.reliable_receiver.check_index(message_index)?;
            reliable.push((message_index, message));
        }

        let mut high_priority = Vec::new();
        while bool::de(&mut reader).map_err(|_| malformed("truncated high-priority section"))? {
            let id = UnsignedVariableInteger::<7>::de(&mut reader)
                .map_err(|_| malformed("truncated high-priority id"))?
                .get();
            let id = HighPriorityId::try_from(id)
                .map_err(|_| malformed("high-priority id out of range"))?;
            let message = Vec::<u8>::de(&mut reader)
                .map_err(|_| malformed("truncated high-priority message"))?;
            high_priority.push((id, message));
        }

        let payload = Vec::<u8>::de(&mut reader).map_err(|_| malformed("truncated payload"))?;

        Ok(ParsedDatagram {
            header,
            reliable,
            high_priority,
            payload,
        })
    }
}
