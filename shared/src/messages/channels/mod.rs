pub mod receivers;
pub mod senders;
