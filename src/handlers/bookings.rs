use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingRequest, BookingStatus, StatusChange};
use crate::services::intake::{self, IntakeReceipt};
use crate::services::uploads::PhotoUpload;
use crate::state::AppState;

// POST /api/bookings
//
// multipart/form-data: `bookingData` is the JSON payload, each `photos` part an image.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<IntakeReceipt>, AppError> {
    let mut request: Option<BookingRequest> = None;
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("bookingData") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Upload(e.to_string()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::Validation(format!("invalid bookingData: {e}")))?;
                request = Some(parsed);
            }
            Some("photos") => {
                if photos.len() >= state.config.max_photos {
                    return Err(AppError::Upload(format!(
                        "at most {} photos per booking",
                        state.config.max_photos
                    )));
                }
                let file_name = field.file_name().unwrap_or("photo").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Upload(e.to_string()))?;
                photos.push(PhotoUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => {
                tracing::debug!(field = ?other, "ignoring unknown multipart field");
            }
        }
    }

    let request =
        request.ok_or_else(|| AppError::Validation("missing bookingData field".to_string()))?;

    let receipt = intake::submit_booking(&state, request, photos).await?;
    Ok(Json(receipt))
}

// GET /api/bookings
#[derive(Serialize, Default)]
pub struct BookingsByStatus {
    pub pending: Vec<Booking>,
    pub confirmed: Vec<Booking>,
    pub completed: Vec<Booking>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BookingsByStatus>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let bookings = {
        let db = state.db()?;
        queries::list_all_bookings(&db)?
    };

    let mut grouped = BookingsByStatus::default();
    for booking in bookings {
        match booking.status {
            BookingStatus::Pending => grouped.pending.push(booking),
            BookingStatus::Confirmed => grouped.confirmed.push(booking),
            BookingStatus::Completed => grouped.completed.push(booking),
        }
    }

    Ok(Json(grouped))
}

// POST /api/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db()?;
        queries::transition_booking(
            &db,
            &id,
            BookingStatus::Confirmed,
            &StatusChange::complete(),
        )?
    };

    tracing::info!(booking_id = %booking.id, "booking completed");
    Ok(Json(booking))
}
