use crate::types::PacketNumber;

/// Represents a manager that must be notified when packets have been
/// delivered or given up on
pub trait PacketNotifiable {
    /// Notifies the manager that a packet has been delivered
    fn notify_packet_delivered(&mut self, packet_number: PacketNumber);

    /// Notifies the manager that a packet can no longer be acknowledged
    fn notify_packet_dropped(&mut self, _packet_number: PacketNumber) {}
}
