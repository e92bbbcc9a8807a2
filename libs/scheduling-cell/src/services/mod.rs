pub mod availability;
pub mod booking;
pub mod grid;
pub mod lifecycle;
pub mod slot_rules;
pub mod stats;
