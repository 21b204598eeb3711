// Reservation lifecycle
pub mod availability;
pub mod reservations;
pub mod timeslots;

// Outbound mail
pub mod email_templates;
pub mod notifications;

// Venues, departments, facilities
pub mod catalog;
