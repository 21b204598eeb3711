pub mod timeslot;

pub use timeslot::TimeSlot;
