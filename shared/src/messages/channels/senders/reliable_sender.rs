use std::collections::{HashMap, VecDeque};

use log::trace;
use naia_serde::Serde;

use crate::{
    connection::{error::SequencerError, packet_notifiable::PacketNotifiable},
    types::{MessageIndex, PacketNumber},
};

/// Bits spent on a reliable entry besides its bytes: continue flag + index
pub const RELIABLE_ENTRY_OVERHEAD_BITS: u32 = 1 + 16;

struct OutgoingReliable {
    bytes: Vec<u8>,
    last_sent: Option<PacketNumber>,
}

/// Ordered reliable output channel. Messages are indexed in submission
/// order and carried again every `resend_packets` datagrams until a datagram
/// carrying them is acknowledged.
pub struct ReliableSender {
    resend_packets: u32,
    max_in_flight: usize,
    max_message_bits: u32,
    next_send_index: MessageIndex,
    // index-ordered; `None` once acknowledged
    outgoing: VecDeque<(MessageIndex, Option<OutgoingReliable>)>,
    in_flight: usize,
    sent_packets: HashMap<PacketNumber, Vec<MessageIndex>>,
}

impl ReliableSender {
    pub fn new(resend_packets: u32, max_in_flight: usize, max_message_bits: u32) -> Self {
        Self {
            resend_packets: resend_packets.max(1),
            max_in_flight,
            max_message_bits,
            next_send_index: 0,
            outgoing: VecDeque::new(),
            in_flight: 0,
            sent_packets: HashMap::new(),
        }
    }

    /// Queue bytes for ordered, exactly-once delivery
    pub fn send_message(&mut self, bytes: Vec<u8>) -> Result<MessageIndex, SequencerError> {
        if self.in_flight >= self.max_in_flight {
            return Err(SequencerError::ReliableChannelStalled {
                in_flight: self.in_flight,
                limit: self.max_in_flight,
            });
        }
        let bits_needed = RELIABLE_ENTRY_OVERHEAD_BITS + bytes.bit_length();
        if bits_needed > self.max_message_bits {
            return Err(SequencerError::DatagramTooLarge {
                bits_needed,
                bits_available: self.max_message_bits,
            });
        }

        let message_index = self.next_send_index;
        self.next_send_index = self.next_send_index.wrapping_add(1);
        self.outgoing.push_back((
            message_index,
            Some(OutgoingReliable {
                bytes,
                last_sent: None,
            }),
        ));
        self.in_flight += 1;
        Ok(message_index)
    }

    /// Number of queued messages not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn has_outgoing_messages(&self) -> bool {
        self.in_flight > 0
    }

    /// Sent packets still remembered as carrying messages
    pub fn tracked_packet_count(&self) -> usize {
        self.sent_packets.len()
    }

    /// Select the messages that are due for (re)sending and fit within
    /// `bits_free`, in index order, and remember that `packet_number` carries
    /// them
    pub fn collect_messages(
        &mut self,
        packet_number: PacketNumber,
        mut bits_free: u32,
    ) -> Vec<(MessageIndex, Vec<u8>)> {
        let mut output = Vec::new();
        for (message_index, slot) in self.outgoing.iter_mut() {
            let Some(message) = slot else {
                continue;
            };
            let due = match message.last_sent {
                None => true,
                Some(last_sent) => packet_number - last_sent >= self.resend_packets,
            };
            if !due {
                continue;
            }
            let bits_needed = RELIABLE_ENTRY_OVERHEAD_BITS + message.bytes.bit_length();
            if bits_needed > bits_free {
                break;
            }
            bits_free -= bits_needed;
            message.last_sent = Some(packet_number);
            output.push((*message_index, message.bytes.clone()));
        }

        if !output.is_empty() {
            trace!(
                "packet {} carries {} reliable messages",
                packet_number,
                output.len()
            );
            self.sent_packets.insert(
                packet_number,
                output.iter().map(|(index, _)| *index).collect(),
            );
        }
        output
    }

    fn acknowledge(&mut self, message_index: MessageIndex) {
        let Some((front_index, _)) = self.outgoing.front() else {
            return;
        };
        let offset = message_index.wrapping_sub(*front_index) as usize;
        if let Some((_, slot)) = self.outgoing.get_mut(offset) {
            if slot.take().is_some() {
                self.in_flight -= 1;
            }
        }
        while let Some((_, None)) = self.outgoing.front() {
            self.outgoing.pop_front();
        }
    }
}

impl PacketNotifiable for ReliableSender {
    fn notify_packet_delivered(&mut self, packet_number: PacketNumber) {
        let Some(message_indices) = self.sent_packets.remove(&packet_number) else {
            return;
        };
        for message_index in message_indices {
            self.acknowledge(message_index);
        }
    }

    fn notify_packet_dropped(&mut self, packet_number: PacketNumber) {
        self.sent_packets.remove(&packet_number);
    }
}
