use voxsync_client::EndpointEvent;
use voxsync_server::ServerEvent;

use crate::{
    helpers::test_harness::{TestClient, TestServer},
    local_socket::LocalSocketPair,
};

/// Hand every queued client datagram to the server
pub fn deliver_to_server(
    link: &LocalSocketPair,
    server: &mut TestServer,
    peer: u32,
) -> Vec<ServerEvent<u32>> {
    let mut events = Vec::new();
    for datagram in link.take_to_server() {
        match server.receive(&peer, &datagram) {
            Ok(received) => events.extend(received),
            Err(error) => log::info!("server dropped datagram: {}", error),
        }
    }
    events
}

/// Hand every queued server datagram to the client
pub fn deliver_to_client(link: &LocalSocketPair, client: &mut TestClient) -> Vec<EndpointEvent> {
    let mut events = Vec::new();
    for datagram in link.take_to_client() {
        match client.receive_datagram(&datagram) {
            Ok(received) => events.extend(received),
            Err(error) => log::info!("client dropped datagram: {}", error),
        }
    }
    events
}
