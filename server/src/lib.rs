//! # Voxsync Server
//! The authoritative side of metavoxel sync: one session per connected
//! client, each streaming deltas of the shared structure.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use voxsync_shared::{
        BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger,
    };
}

mod connection;
mod error;
mod events;
mod server;

pub use connection::{delta_record::DeltaRecord, session::MetavoxelSession};
pub use error::SessionError;
pub use events::{ServerEvent, SessionEvent};
pub use server::{MetavoxelServer, ServerConfig};
