use std::collections::{BTreeMap, HashMap};

use naia_serde::{Serde, UnsignedVariableInteger};

use crate::{
    connection::packet_notifiable::PacketNotifiable,
    types::{HighPriorityId, PacketNumber},
};

/// Bits spent on the wire for a high-priority entry: continue flag + id + bytes
fn high_priority_entry_bits(id: HighPriorityId, bytes: &Vec<u8>) -> u32 {
    1 + UnsignedVariableInteger::<7>::new(id).bit_length() + bytes.bit_length()
}

/// Redundant best-effort channel: every unacknowledged message is carried in
/// full by every outgoing datagram
pub struct HighPrioritySender {
    next_id: HighPriorityId,
    pending: BTreeMap<HighPriorityId, Vec<u8>>,
    sent_packets: HashMap<PacketNumber, Vec<HighPriorityId>>,
    newly_acknowledged: Vec<HighPriorityId>,
}

impl HighPrioritySender {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            sent_packets: HashMap::new(),
            newly_acknowledged: Vec::new(),
        }
    }

    pub fn send_message(&mut self, bytes: Vec<u8>) -> HighPriorityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.insert(id, bytes);
        id
    }

    /// Unacknowledged messages, oldest first
    pub fn messages(&self) -> impl Iterator<Item = (HighPriorityId, &Vec<u8>)> {
        self.pending.iter().map(|(id, bytes)| (*id, bytes))
    }

    pub fn is_pending(&self, id: HighPriorityId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn tracked_packet_count(&self) -> usize {
        self.sent_packets.len()
    }

    /// Total wire size of every unacknowledged message
    pub fn bits_needed(&self) -> u32 {
        self.messages()
            .map(|(id, bytes)| high_priority_entry_bits(id, bytes))
            .sum()
    }

    /// Remember which messages `packet_number` carries
    pub fn record_sent(&mut self, packet_number: PacketNumber) {
        if self.pending.is_empty() {
            return;
        }
        self.sent_packets
            .insert(packet_number, self.pending.keys().copied().collect());
    }

    /// Ids acknowledged since the last call, in acknowledgment order
    pub fn take_acknowledged(&mut self) -> Vec<HighPriorityId> {
        std::mem::take(&mut self.newly_acknowledged)
    }
}

impl Default for HighPrioritySender {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketNotifiable for HighPrioritySender {
    fn notify_packet_delivered(&mut self, packet_number: PacketNumber) {
        let Some(ids) = self.sent_packets.remove(&packet_number) else {
            return;
        };
        for id in ids {
            if self.pending.remove(&id).is_some() {
                self.newly_acknowledged.push(id);
            }
        }
    }

    fn notify_packet_dropped(&mut self, packet_number: PacketNumber) {
        self.sent_packets.remove(&packet_number);
    }
}
