pub mod ack_manager;
pub mod connection_config;
pub mod datagram_header;
pub mod error;
pub mod packet_notifiable;
pub mod sequencer;
