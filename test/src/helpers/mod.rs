pub mod packet_exchange;
pub mod raw_peer;
pub mod test_harness;

pub use packet_exchange::{deliver_to_client, deliver_to_server};
pub use raw_peer::{connect_client, payload_message, RawPeer};
pub use test_harness::{init_logger, TestClient, TestHarness, TestServer, TEST_PEER, TICK};
