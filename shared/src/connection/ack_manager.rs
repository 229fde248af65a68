use std::collections::BTreeMap;

use log::trace;

use crate::{
    connection::{datagram_header::DatagramHeader, packet_notifiable::PacketNotifiable},
    constants::ACK_FIELD_BITS,
    types::{PacketNumber, SENTINEL_PACKET_NUMBER},
};

/// How an inbound packet number relates to what has already been processed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IncomingPacketStatus {
    /// Newer than anything received so far
    Newest,
    /// Older than the newest received packet, but not seen before (or too old
    /// to tell)
    Stale,
    /// Already received
    Duplicate,
}

/// Acknowledgments newly learned from an inbound header
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AckOutcome {
    /// Remote host has received this packet of ours, and it is newer than any
    /// previously reported
    pub send_acknowledged: Option<PacketNumber>,
    /// Remote host now knows we received up through this packet of theirs
    pub receive_acknowledged: Option<PacketNumber>,
    /// All of our packets newly confirmed as delivered, oldest first
    pub delivered: Vec<PacketNumber>,
    /// Our packets that fell out of the acknowledgment window unconfirmed
    pub dropped: Vec<PacketNumber>,
}

struct SentPacket {
    /// Newest incoming packet number at the moment this packet was sent
    incoming_at_send: PacketNumber,
}

/// Keeps track of sent & received packets, and contains ack information that
/// is copied into the header of each outgoing datagram
pub struct AckManager {
    next_packet_number: PacketNumber,
    sent_packets: BTreeMap<PacketNumber, SentPacket>,
    last_received: PacketNumber,
    received_field: u32,
    highest_send_acked: PacketNumber,
    highest_receive_acked: PacketNumber,
}

impl AckManager {
    pub fn new() -> Self {
        Self {
            next_packet_number: SENTINEL_PACKET_NUMBER + 1,
            sent_packets: BTreeMap::new(),
            last_received: SENTINEL_PACKET_NUMBER,
            received_field: 0,
            highest_send_acked: SENTINEL_PACKET_NUMBER,
            highest_receive_acked: SENTINEL_PACKET_NUMBER,
        }
    }

    /// Number of the most recently sent packet, or the sentinel
    pub fn last_sent_packet_number(&self) -> PacketNumber {
        self.next_packet_number - 1
    }

    /// Number the next outgoing packet will carry
    pub fn next_packet_number(&self) -> PacketNumber {
        self.next_packet_number
    }

    /// Newest packet number received from the remote host, or the sentinel
    pub fn last_received_packet_number(&self) -> PacketNumber {
        self.last_received
    }

    pub fn unacknowledged_packet_count(&self) -> usize {
        self.sent_packets.len()
    }

    /// Assign the next packet number, start tracking it, and produce the
    /// header describing what we have received
    pub fn next_outgoing_header(&mut self) -> DatagramHeader {
        let packet_number = self.next_packet_number;
        self.next_packet_number += 1;
        self.sent_packets.insert(
            packet_number,
            SentPacket {
                incoming_at_send: self.last_received,
            },
        );
        DatagramHeader::new(packet_number, self.last_received, self.received_field)
    }

    pub fn classify_incoming(&self, packet_number: PacketNumber) -> IncomingPacketStatus {
        if packet_number > self.last_received {
            return IncomingPacketStatus::Newest;
        }
        if packet_number == self.last_received {
            return IncomingPacketStatus::Duplicate;
        }
        let distance = self.last_received - packet_number;
        if distance > ACK_FIELD_BITS {
            return IncomingPacketStatus::Stale;
        }
        if self.received_field & (1 << (distance - 1)) != 0 {
            IncomingPacketStatus::Duplicate
        } else {
            IncomingPacketStatus::Stale
        }
    }

    /// Record that a packet has arrived, so that it is acknowledged in
    /// subsequent outgoing headers
    pub fn record_incoming(&mut self, packet_number: PacketNumber) -> IncomingPacketStatus {
        let status = self.classify_incoming(packet_number);
        match status {
            IncomingPacketStatus::Duplicate => {}
            IncomingPacketStatus::Newest => {
                let shift = packet_number - self.last_received;
                let shifted = if shift >= ACK_FIELD_BITS {
                    0
                } else {
                    self.received_field << shift
                };
                // the previous newest packet moves into the bitfield
                let previous = if self.last_received != SENTINEL_PACKET_NUMBER
                    && shift <= ACK_FIELD_BITS
                {
                    1 << (shift - 1)
                } else {
                    0
                };
                self.received_field = shifted | previous;
                self.last_received = packet_number;
            }
            IncomingPacketStatus::Stale => {
                let distance = self.last_received - packet_number;
                if distance <= ACK_FIELD_BITS {
                    self.received_field |= 1 << (distance - 1);
                }
            }
        }
        status
    }

    /// Process the acknowledgment part of an inbound header, notifying every
    /// manager of each packet that is newly known to be delivered or lost.
    /// The header must already have been validated against
    /// [`last_sent_packet_number`](Self::last_sent_packet_number).
    pub fn process_incoming_header(
        &mut self,
        header: &DatagramHeader,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) -> AckOutcome {
        let mut outcome = AckOutcome::default();

        let mut acked = header.acked_packets();
        acked.reverse();
        let mut newest_incoming_known = SENTINEL_PACKET_NUMBER;
        for packet_number in acked {
            let Some(sent_packet) = self.sent_packets.remove(&packet_number) else {
                continue;
            };
            trace!("packet {} delivered", packet_number);
            for notifiable in packet_notifiables.iter_mut() {
                notifiable.notify_packet_delivered(packet_number);
            }
            newest_incoming_known = newest_incoming_known.max(sent_packet.incoming_at_send);
            outcome.delivered.push(packet_number);
        }

        // anything older than the window can no longer be acknowledged
        outcome.dropped = self.expire_behind(header.last_received, packet_notifiables);

        if let Some(newest_delivered) = outcome.delivered.last().copied() {
            if newest_delivered > self.highest_send_acked {
                self.highest_send_acked = newest_delivered;
                outcome.send_acknowledged = Some(newest_delivered);
            }
        }
        if newest_incoming_known > self.highest_receive_acked {
            self.highest_receive_acked = newest_incoming_known;
            outcome.receive_acknowledged = Some(newest_incoming_known);
        }

        outcome
    }
}

impl AckManager {
    /// Stop tracking sent packets further behind the newest sent packet than
    /// the ack field reaches, notifying every manager that they are dropped.
    /// Keeps the sent-packet map bounded while the remote host is silent.
    pub fn expire_sent_packets(
        &mut self,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) -> Vec<PacketNumber> {
        self.expire_behind(self.last_sent_packet_number(), packet_notifiables)
    }

    fn expire_behind(
        &mut self,
        newest: PacketNumber,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) -> Vec<PacketNumber> {
        if newest <= ACK_FIELD_BITS + 1 {
            return Vec::new();
        }
        let window_start = newest - ACK_FIELD_BITS;
        let expired: Vec<PacketNumber> = self
            .sent_packets
            .range(..window_start)
            .map(|(packet_number, _)| *packet_number)
            .collect();
        for packet_number in &expired {
            self.sent_packets.remove(packet_number);
            for notifiable in packet_notifiables.iter_mut() {
                notifiable.notify_packet_dropped(*packet_number);
            }
        }
        if !expired.is_empty() {
            trace!("{} sent packets expired unacknowledged", expired.len());
        }
        expired
    }
}

impl Default for AckManager {
    fn default() -> Self {
        Self::new()
    }
}
