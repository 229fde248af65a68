pub mod delta_record;
pub mod session;
