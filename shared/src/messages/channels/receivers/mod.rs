pub mod error;
pub mod high_priority_receiver;
pub mod ordered_reliable_receiver;
