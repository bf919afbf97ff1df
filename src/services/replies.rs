use std::sync::Arc;

use chrono::Utc;

use crate::db::queries;
use crate::errors::{AppError, StoreError};
use crate::models::{Booking, BookingStatus, StatusChange};
use crate::services::booking_id::code_matches;
use crate::services::notifications::{dispatch, Notification};
use crate::state::AppState;

pub const ACCEPT_KEYWORD: &str = "ACCEPT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyCommand {
    Accept { code: Option<String> },
    Other,
}

#[derive(Debug)]
pub enum Resolution<'a> {
    Unique(&'a Booking),
    NoMatch,
    Ambiguous(Vec<&'a Booking>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Ignored,
    MissingCode,
    NotFound { code: String },
    Ambiguous { code: String, booking_ids: Vec<String> },
    Confirmed { booking_id: String },
    NoLongerAvailable { booking_id: String },
}

pub fn parse_reply(body: &str) -> ReplyCommand {
    let normalized = body.trim().to_uppercase();
    let mut tokens = normalized.split_whitespace();

    if tokens.next() != Some(ACCEPT_KEYWORD) {
        return ReplyCommand::Other;
    }

    let code = tokens
        .next()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    ReplyCommand::Accept { code }
}

pub fn resolve<'a>(code: &str, pending: &'a [Booking]) -> Resolution<'a> {
    let mut matches: Vec<&Booking> = pending
        .iter()
        .filter(|b| b.status == BookingStatus::Pending && code_matches(code, &b.id))
        .collect();

    match matches.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Unique(matches.remove(0)),
        _ => Resolution::Ambiguous(matches),
    }
}

pub async fn process_reply(
    state: &Arc<AppState>,
    from: &str,
    body: &str,
) -> Result<ReplyOutcome, AppError> {
    let code = match parse_reply(body) {
        ReplyCommand::Other => {
            tracing::debug!(from = %from, "reply is not an acceptance, ignoring");
            return Ok(ReplyOutcome::Ignored);
        }
        ReplyCommand::Accept { code: None } => {
            tracing::info!(from = %from, "acceptance without a booking code");
            notify(state, from, &Notification::BookingNotFound { code: None }).await;
            return Ok(ReplyOutcome::MissingCode);
        }
        ReplyCommand::Accept { code: Some(code) } => code,
    };

    let pending = {
        let db = state.db()?;
        queries::list_bookings_by_status(&db, BookingStatus::Pending)?
    };

    match resolve(&code, &pending) {
        Resolution::NoMatch => {
            tracing::info!(from = %from, code = %code, "no pending booking matches");
            notify(state, from, &Notification::BookingNotFound { code: Some(&code) }).await;
            Ok(ReplyOutcome::NotFound { code })
        }
        Resolution::Ambiguous(candidates) => {
            let booking_ids: Vec<&str> = candidates.iter().map(|b| b.id.as_str()).collect();
            tracing::warn!(from = %from, code = %code, matches = booking_ids.len(), "ambiguous booking code");
            notify(
                state,
                from,
                &Notification::BookingAmbiguous {
                    code: &code,
                    booking_ids: booking_ids.clone(),
                },
            )
            .await;
            Ok(ReplyOutcome::Ambiguous {
                booking_ids: booking_ids.into_iter().map(str::to_string).collect(),
                code,
            })
        }
        Resolution::Unique(booking) => confirm_booking(state, &booking.id, from).await,
    }
}

pub async fn confirm_booking(
    state: &Arc<AppState>,
    booking_id: &str,
    from: &str,
) -> Result<ReplyOutcome, AppError> {
    let result = {
        let db = state.db()?;
        queries::transition_booking(
            &db,
            booking_id,
            BookingStatus::Pending,
            &StatusChange::confirm(from, Utc::now()),
        )
    };

    let booking = match result {
        Ok(booking) => booking,
        Err(e @ (StoreError::Conflict { .. } | StoreError::NotFound(_))) => {
            tracing::info!(booking_id = %booking_id, from = %from, reason = %e, "booking no longer available");
            notify(state, from, &Notification::BookingUnavailable { booking_id }).await;
            return Ok(ReplyOutcome::NoLongerAvailable {
                booking_id: booking_id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(booking_id = %booking.id, confirmed_by = %from, "booking confirmed");

    notify(state, &booking.phone, &Notification::BookingConfirmed(&booking)).await;
    notify(state, from, &Notification::BookingConfirmedAck(&booking)).await;

    Ok(ReplyOutcome::Confirmed {
        booking_id: booking.id,
    })
}

// Best-effort: the transition (if any) is already committed.
async fn notify(state: &AppState, to: &str, notification: &Notification<'_>) {
    let _ = dispatch(
        state.messaging.as_ref(),
        &state.config.business_name,
        to,
        notification,
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn pending(id: &str, minutes_ago: i64) -> Booking {
        Booking {
            id: id.to_string(),
            status: BookingStatus::Pending,
            customer_name: "Alice".to_string(),
            phone: "+15551234567".to_string(),
            address: "1 Elm St".to_string(),
            service_date: "2024-06-01".to_string(),
            service_time: "10:00 AM".to_string(),
            lot_size: String::new(),
            estimated_price: String::new(),
            instructions: None,
            photos: vec![],
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            confirmed_at: None,
            confirmed_by: None,
        }
    }

    #[test]
    fn test_parse_reply_accept_with_code() {
        assert_eq!(
            parse_reply("  accept 234567 "),
            ReplyCommand::Accept {
                code: Some("234567".to_string())
            }
        );
        assert_eq!(
            parse_reply("Accept \"bk-1717171234567\"."),
            ReplyCommand::Accept {
                code: Some("BK-1717171234567".to_string())
            }
        );
        assert_eq!(
            parse_reply("ACCEPT\t234567 thanks"),
            ReplyCommand::Accept {
                code: Some("234567".to_string())
            }
        );
    }

    #[test]
    fn test_parse_reply_without_code() {
        assert_eq!(parse_reply("ACCEPT"), ReplyCommand::Accept { code: None });
        assert_eq!(parse_reply("accept   "), ReplyCommand::Accept { code: None });
        assert_eq!(parse_reply("accept !!"), ReplyCommand::Accept { code: None });
    }

    #[test]
    fn test_parse_reply_other_shapes() {
        assert_eq!(parse_reply("hello"), ReplyCommand::Other);
        assert_eq!(parse_reply(""), ReplyCommand::Other);
        assert_eq!(parse_reply("ACCEPTED 234567"), ReplyCommand::Other);
        assert_eq!(parse_reply("I accept 234567"), ReplyCommand::Other);
    }

    #[test]
    fn test_resolve_unique() {
        let set = vec![
            pending("BK-1717171111111", 10),
            pending("BK-1717171234567", 5),
        ];
        match resolve("234567", &set) {
            Resolution::Unique(b) => assert_eq!(b.id, "BK-1717171234567"),
            other => panic!("expected unique match, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_ignores_interior_substrings() {
        // "171717" appears inside both ids; only a tail match counts
        let set = vec![
            pending("BK-1717171111111", 10),
            pending("BK-1717171234567", 5),
        ];
        assert!(matches!(resolve("171717", &set), Resolution::NoMatch));
        assert!(matches!(resolve("4567", &set), Resolution::NoMatch));
    }

    #[test]
    fn test_resolve_ambiguous_is_stable_and_disambiguable() {
        let set = vec![
            pending("BK-1716171234567", 30),
            pending("BK-1717171234567", 5),
        ];
        for _ in 0..3 {
            match resolve("234567", &set) {
                Resolution::Ambiguous(found) => {
                    let ids: Vec<&str> = found.iter().map(|b| b.id.as_str()).collect();
                    assert_eq!(ids, vec!["BK-1716171234567", "BK-1717171234567"]);
                }
                other => panic!("expected ambiguity, got {other:?}"),
            }
        }

        match resolve("7171234567", &set) {
            Resolution::Unique(b) => assert_eq!(b.id, "BK-1717171234567"),
            other => panic!("expected unique match, got {other:?}"),
        }
        match resolve("BK-1716171234567", &set) {
            Resolution::Unique(b) => assert_eq!(b.id, "BK-1716171234567"),
            other => panic!("expected unique match, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_skips_non_pending() {
        let mut confirmed = pending("BK-1717171234567", 5);
        confirmed.status = BookingStatus::Confirmed;
        let set = vec![confirmed];
        assert!(matches!(resolve("234567", &set), Resolution::NoMatch));
    }
}
