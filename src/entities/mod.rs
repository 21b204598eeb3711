pub mod department;
pub mod facility;
pub mod reference_counter;
pub mod reservation_attachment;
pub mod reservation_facility_item;
pub mod reservation_participant;
pub mod reservation_request;
pub mod venue;
