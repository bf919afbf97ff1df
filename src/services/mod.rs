pub mod booking_id;
pub mod intake;
pub mod messaging;
pub mod notifications;
pub mod replies;
pub mod uploads;
