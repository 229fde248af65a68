use std::sync::Arc;

use voxsync_client::{ClientConfig, MetavoxelClient};
use voxsync_shared::{
    ConnectionConfig, DatagramSequencer, PacketNumber, ReceivedDatagram, SharedObjectTable,
    SyncMessage,
};

use crate::{
    helpers::test_harness::TestClient,
    local_socket::LocalSocketPair,
    test_world::{Material, TestEdit},
};

/// A bare sequencer standing in for the remote host, so tests can craft
/// exactly the datagrams a client sees
pub struct RawPeer {
    pub sequencer: DatagramSequencer,
}

impl RawPeer {
    pub fn new() -> Self {
        Self {
            sequencer: DatagramSequencer::new(ConnectionConfig::default()),
        }
    }

    /// Process one datagram from the client. Panics on malformed input.
    pub fn receive(&mut self, bytes: &[u8]) -> Option<ReceivedDatagram> {
        self.sequencer
            .receive_datagram(bytes)
            .expect("client sent a malformed datagram")
    }

    /// Process everything the client has queued, in order
    pub fn receive_all(&mut self, link: &LocalSocketPair) -> Vec<ReceivedDatagram> {
        link.take_to_server()
            .iter()
            .filter_map(|bytes| self.receive(bytes))
            .collect()
    }

    /// Compose the next datagram, optionally carrying `message` as payload
    pub fn compose(&mut self, message: Option<&SyncMessage<TestEdit>>) -> Vec<u8> {
        let mut writer = self.sequencer.start_datagram();
        if let Some(message) = message {
            writer.write(message).expect("payload does not fit");
        }
        self.sequencer
            .finish_datagram(writer)
            .expect("datagram does not fit")
    }

    pub fn next_packet_number(&self) -> PacketNumber {
        self.sequencer.next_packet_number()
    }
}

impl Default for RawPeer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the payload of a datagram the client sent
pub fn payload_message(received: &ReceivedDatagram) -> SyncMessage<TestEdit> {
    SyncMessage::from_bytes(&received.payload).expect("undecodable payload")
}

/// A client whose datagrams land in `link.to_server`
pub fn connect_client(
    link: &LocalSocketPair,
    materials: &Arc<SharedObjectTable<Material>>,
) -> TestClient {
    MetavoxelClient::new(ClientConfig::default(), link.client_sender(), materials.clone())
}
