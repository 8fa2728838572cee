pub mod booking;
pub mod locking;
pub mod schedule;
