//! # Voxsync Shared
//! Transport sequencing, wire messages and state-sync primitives shared
//! between voxsync-client & voxsync-server.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use naia_serde::{
    BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger,
    MTU_SIZE_BITS, MTU_SIZE_BYTES,
};

mod connection;
mod constants;
mod messages;
mod state;
mod transport;
mod types;
mod wrapping_number;

pub use connection::{
    ack_manager::{AckManager, AckOutcome, IncomingPacketStatus},
    connection_config::ConnectionConfig,
    datagram_header::DatagramHeader,
    error::SequencerError,
    packet_notifiable::PacketNotifiable,
    sequencer::{DatagramSequencer, DatagramWriter, ReceivedDatagram, SequencerEvent},
};
pub use constants::{ACK_FIELD_BITS, MAX_BATCH_DEPTH, MAX_DATAGRAM_BITS};
pub use messages::{
    channels::{
        receivers::{
            error::ReceiverError, high_priority_receiver::HighPriorityReceiver,
            ordered_reliable_receiver::OrderedReliableReceiver,
        },
        senders::{high_priority_sender::HighPrioritySender, reliable_sender::ReliableSender},
    },
    sync_message::SyncMessage,
};
pub use state::{
    delta_codec::{decode_and_apply, select_decode_baseline, select_reference_lod},
    error::{RecordHistoryError, StateError},
    lod::Lod,
    record_history::{ReceiveRecord, Record, RecordHistory, SendRecord},
    shared_objects::{SharedObjectResolver, SharedObjectTable},
    MetavoxelState,
};
pub use transport::{error::TransportError, DatagramSender};
pub use types::{
    HighPriorityId, MessageIndex, PacketNumber, SharedObjectId, SENTINEL_PACKET_NUMBER,
};
pub use wrapping_number::{forward_distance, sequence_greater_than, sequence_less_than};
