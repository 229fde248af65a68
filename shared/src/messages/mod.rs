pub mod channels;
pub mod sync_message;
