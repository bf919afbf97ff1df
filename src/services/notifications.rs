use crate::errors::AppError;
use crate::models::Booking;
use crate::services::booking_id::short_code;
use crate::services::messaging::{DeliveryHandle, MessagingProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    BookingRequestToEmployee,
    BookingAckToCustomer,
    BookingConfirmedToCustomer,
    BookingConfirmedAckToEmployee,
    BookingNotFoundToEmployee,
    BookingAmbiguousToEmployee,
    BookingUnavailableToEmployee,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::BookingRequestToEmployee => "booking-request-to-employee",
            TemplateKind::BookingAckToCustomer => "booking-ack-to-customer",
            TemplateKind::BookingConfirmedToCustomer => "booking-confirmed-to-customer",
            TemplateKind::BookingConfirmedAckToEmployee => "booking-confirmed-ack-to-employee",
            TemplateKind::BookingNotFoundToEmployee => "booking-not-found-to-employee",
            TemplateKind::BookingAmbiguousToEmployee => "booking-ambiguous-to-employee",
            TemplateKind::BookingUnavailableToEmployee => "booking-unavailable-to-employee",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Notification<'a> {
    BookingRequest(&'a Booking),
    BookingAck(&'a Booking),
    BookingConfirmed(&'a Booking),
    BookingConfirmedAck(&'a Booking),
    BookingNotFound { code: Option<&'a str> },
    BookingAmbiguous { code: &'a str, booking_ids: Vec<&'a str> },
    BookingUnavailable { booking_id: &'a str },
}

impl Notification<'_> {
    pub fn kind(&self) -> TemplateKind {
        match self {
            Notification::BookingRequest(_) => TemplateKind::BookingRequestToEmployee,
            Notification::BookingAck(_) => TemplateKind::BookingAckToCustomer,
            Notification::BookingConfirmed(_) => TemplateKind::BookingConfirmedToCustomer,
            Notification::BookingConfirmedAck(_) => TemplateKind::BookingConfirmedAckToEmployee,
            Notification::BookingNotFound { .. } => TemplateKind::BookingNotFoundToEmployee,
            Notification::BookingAmbiguous { .. } => TemplateKind::BookingAmbiguousToEmployee,
            Notification::BookingUnavailable { .. } => TemplateKind::BookingUnavailableToEmployee,
        }
    }

    pub fn render(&self, business_name: &str) -> String {
        match self {
            Notification::BookingRequest(b) => format!(
                "🌱 NEW BOOKING REQUEST\n\n\
                 Customer: {}\n\
                 Phone: {}\n\
                 Address: {}\n\
                 Date: {} at {}\n\
                 Lot Size: {}\n\
                 Estimate: {}\n\n\
                 Instructions: {}\n\n\
                 Reply \"ACCEPT {}\" to accept this job.\n\n\
                 Booking ID: {}",
                b.customer_name,
                b.phone,
                b.address,
                b.service_date,
                b.service_time,
                b.lot_size,
                b.estimated_price,
                b.instructions.as_deref().unwrap_or("None"),
                short_code(&b.id),
                b.id,
            ),
            Notification::BookingAck(b) => format!(
                "Hi {}!\n\n\
                 Thank you for booking with {business_name}!\n\n\
                 Your lawn mowing request for {} at {} has been received.\n\n\
                 Estimated price: {}\n\n\
                 One of our team members will confirm your booking shortly. \
                 You'll receive a text when it's confirmed.\n\n\
                 Questions? Text us back anytime!",
                b.customer_name, b.service_date, b.service_time, b.estimated_price,
            ),
            Notification::BookingConfirmed(b) => format!(
                "Great news, {}!\n\n\
                 Your lawn mowing is confirmed for {} at {}.\n\n\
                 Address: {}\n\
                 Estimated price: {}\n\n\
                 We'll text you when we're on our way. See you soon! 🌱\n\n\
                 - {business_name}",
                b.customer_name, b.service_date, b.service_time, b.address, b.estimated_price,
            ),
            Notification::BookingConfirmedAck(b) => format!(
                "✅ Booking {} confirmed! {} has been notified. Details saved to your schedule.",
                b.id, b.customer_name,
            ),
            Notification::BookingNotFound { code: Some(code) } => {
                format!("❌ Booking {code} not found or already processed.")
            }
            Notification::BookingNotFound { code: None } => {
                "❌ No booking code found. Reply \"ACCEPT <code>\" using the code from the request."
                    .to_string()
            }
            Notification::BookingAmbiguous { code, booking_ids } => format!(
                "⚠️ {code} matches {} bookings: {}. Reply \"ACCEPT <booking ID>\" with the full ID.",
                booking_ids.len(),
                booking_ids.join(", "),
            ),
            Notification::BookingUnavailable { booking_id } => format!(
                "❌ Booking {booking_id} is no longer pending. Nothing was changed."
            ),
        }
    }
}

pub async fn dispatch(
    provider: &dyn MessagingProvider,
    business_name: &str,
    to: &str,
    notification: &Notification<'_>,
) -> Result<DeliveryHandle, AppError> {
    let kind = notification.kind().as_str();
    let body = notification.render(business_name);

    match provider.send_message(to, &body).await {
        Ok(handle) => {
            tracing::info!(to = %to, kind, sid = %handle, "notification sent");
            Ok(handle)
        }
        Err(e) => {
            tracing::error!(to = %to, kind, error = %e, "notification failed");
            Err(AppError::Transport(format!("{kind}: {e:#}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::Utc;

    fn booking() -> Booking {
        Booking {
            id: "BK-1717171234567".to_string(),
            status: BookingStatus::Pending,
            customer_name: "Alice".to_string(),
            phone: "+15551234567".to_string(),
            address: "1 Elm St".to_string(),
            service_date: "2024-06-01".to_string(),
            service_time: "10:00 AM".to_string(),
            lot_size: "0.25 acre".to_string(),
            estimated_price: "$45".to_string(),
            instructions: None,
            photos: vec![],
            created_at: Utc::now(),
            confirmed_at: None,
            confirmed_by: None,
        }
    }

    #[test]
    fn test_request_includes_short_code_and_id() {
        let b = booking();
        let text = Notification::BookingRequest(&b).render("Top Lawns");
        assert!(text.contains("Reply \"ACCEPT 234567\""));
        assert!(text.contains("Booking ID: BK-1717171234567"));
        assert!(text.contains("Instructions: None"));
        assert!(text.contains("Lot Size: 0.25 acre"));
    }

    #[test]
    fn test_customer_templates_use_business_name() {
        let b = booking();
        let ack = Notification::BookingAck(&b).render("Top Lawns");
        assert!(ack.starts_with("Hi Alice!"));
        assert!(ack.contains("Thank you for booking with Top Lawns!"));

        let confirmed = Notification::BookingConfirmed(&b).render("Top Lawns");
        assert!(confirmed.contains("confirmed for 2024-06-01 at 10:00 AM"));
        assert!(confirmed.ends_with("- Top Lawns"));
    }

    #[test]
    fn test_not_found_variants() {
        let with_code = Notification::BookingNotFound { code: Some("123456") }.render("x");
        assert!(with_code.contains("Booking 123456 not found"));
        let without = Notification::BookingNotFound { code: None }.render("x");
        assert!(without.contains("No booking code found"));
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let n = Notification::BookingAmbiguous {
            code: "234567",
            booking_ids: vec!["BK-1716171234567", "BK-1717171234567"],
        };
        assert_eq!(n.kind().as_str(), "booking-ambiguous-to-employee");
        let text = n.render("x");
        assert!(text.contains("matches 2 bookings: BK-1716171234567, BK-1717171234567"));
    }

    #[test]
    fn test_unavailable_does_not_assume_confirmed() {
        let n = Notification::BookingUnavailable { booking_id: "BK-1717171234567" };
        assert_eq!(n.kind().as_str(), "booking-unavailable-to-employee");
        let text = n.render("x");
        assert!(text.contains("BK-1717171234567 is no longer pending"));
        assert!(!text.contains("confirmed"));
    }
}
