//! # Voxsync Client
//! A per-connection endpoint that keeps a local mirror of a remote metavoxel
//! structure in sync, plus a table owning one endpoint per peer.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use voxsync_shared::{
    ConnectionConfig, DatagramSender, HighPriorityId, Lod, MetavoxelState, PacketNumber,
    ReceiveRecord, RecordHistory, SendRecord, SharedObjectResolver, SharedObjectTable,
    SyncMessage, TransportError,
};

mod client;
mod client_config;
mod edit_dispatcher;
mod endpoint_state;
mod endpoint_table;
mod error;
mod events;

pub use client::MetavoxelClient;
pub use client_config::ClientConfig;
pub use edit_dispatcher::EditDelivery;
pub use endpoint_state::EndpointState;
pub use endpoint_table::EndpointTable;
pub use error::EndpointError;
pub use events::EndpointEvent;
