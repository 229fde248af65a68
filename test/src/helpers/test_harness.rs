use std::{sync::Arc, time::Duration};

use voxsync_client::{ClientConfig, EndpointEvent, MetavoxelClient};
use voxsync_server::{MetavoxelServer, ServerConfig, ServerEvent};
use voxsync_shared::{SharedObjectId, SharedObjectTable};

use crate::{
    helpers::packet_exchange::{deliver_to_client, deliver_to_server},
    local_socket::LocalSocketPair,
    test_world::{Material, TestMirror},
};

pub type TestClient = MetavoxelClient<TestMirror>;
pub type TestServer = MetavoxelServer<u32, TestMirror>;

pub const TEST_PEER: u32 = 1;

pub const TICK: Duration = Duration::from_millis(16);

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// A client and an authoritative server joined by a local link
pub struct TestHarness {
    pub link: LocalSocketPair,
    pub client: TestClient,
    pub server: TestServer,
    pub materials: Arc<SharedObjectTable<Material>>,
    held_materials: Vec<Arc<Material>>,
}

impl TestHarness {
    pub fn new(world: TestMirror) -> Self {
        Self::with_link(world, LocalSocketPair::new(), ClientConfig::default())
    }

    pub fn with_link(world: TestMirror, link: LocalSocketPair, client_config: ClientConfig) -> Self {
        let materials = Arc::new(SharedObjectTable::new());
        let client = MetavoxelClient::new(client_config, link.client_sender(), materials.clone());
        let mut server = MetavoxelServer::new(ServerConfig::default(), world, materials.clone());
        server.connect(TEST_PEER, link.server_sender());
        Self {
            link,
            client,
            server,
            materials,
            held_materials: Vec::new(),
        }
    }

    pub fn register_material(&mut self, id: SharedObjectId, color: u32) {
        let material = Arc::new(Material { color });
        self.materials.register(id, &material);
        self.held_materials.push(material);
    }

    /// Client tick, server receive, server update, client receive
    pub fn step(&mut self) -> (Vec<ServerEvent<u32>>, Vec<EndpointEvent>) {
        if let Err(error) = self.client.tick(TICK) {
            log::info!("client tick failed: {}", error);
        }
        let server_events = deliver_to_server(&self.link, &mut self.server, TEST_PEER);
        for (peer, error) in self.server.update(TICK) {
            log::info!("session {} failed: {}", peer, error);
        }
        let client_events = deliver_to_client(&self.link, &mut self.client);
        (server_events, client_events)
    }

    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// What the client should see of the authoritative structure
    pub fn expected_mirror(&self) -> TestMirror {
        self.server.data().visible_at(&self.client.current_lod())
    }
}
