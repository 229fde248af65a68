use std::{default::Default, time::Duration};

use voxsync_shared::ConnectionConfig;

/// Contains Config properties which will be used by a MetavoxelClient
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Used to configure the connection with the remote peer
    pub connection: ConnectionConfig,
    /// Threshold of the announced level of detail
    pub lod_threshold: f32,
    /// Minimum time between state announcements. Zero announces on every
    /// tick.
    pub send_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            lod_threshold: 0.01,
            send_interval: Duration::ZERO,
        }
    }
}
