pub mod high_priority_sender;
pub mod reliable_sender;
