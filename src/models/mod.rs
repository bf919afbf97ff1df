pub mod availability;
pub mod booking;

pub use availability::Availability;
pub use booking::{Booking, BookingRequest, BookingStatus, StatusChange, ValidBookingRequest};
