use std::{default::Default, time::Duration};

use voxsync_shared::ConnectionConfig;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Used to configure the connections with Clients
    pub connection: ConnectionConfig,
    /// Minimum time between deltas sent to a client. Zero sends on every
    /// tick.
    pub send_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            send_interval: Duration::ZERO,
        }
    }
}
