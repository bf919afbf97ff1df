use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingRequest, BookingStatus, ValidBookingRequest};
use crate::services::booking_id::{new_booking_id, short_code};
use crate::services::messaging::DeliveryHandle;
use crate::services::notifications::{dispatch, Notification};
use crate::services::uploads::{remove_photos, PhotoUpload};
use crate::state::AppState;

const MAX_ID_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeReceipt {
    pub success: bool,
    pub booking_id: String,
    pub employee_sid: DeliveryHandle,
    pub customer_sid: DeliveryHandle,
}

pub async fn submit_booking(
    state: &Arc<AppState>,
    request: BookingRequest,
    photos: Vec<PhotoUpload>,
) -> Result<IntakeReceipt, AppError> {
    let valid = request.validate().map_err(|missing| {
        AppError::Validation(format!("missing required fields: {}", missing.join(", ")))
    })?;

    if photos.len() > state.config.max_photos {
        return Err(AppError::Upload(format!(
            "at most {} photos per booking",
            state.config.max_photos
        )));
    }
    for photo in &photos {
        photo.validate(state.config.max_photo_bytes)?;
    }

    let upload_dir = Path::new(&state.config.upload_dir);
    let mut stored_photos = Vec::with_capacity(photos.len());
    for photo in &photos {
        match photo.store(upload_dir).await {
            Ok(name) => stored_photos.push(name),
            Err(e) => {
                remove_photos(upload_dir, &stored_photos).await;
                return Err(e);
            }
        }
    }

    let booking = match persist(state, valid, stored_photos.clone()) {
        Ok(booking) => booking,
        Err(e) => {
            tracing::error!(error = %e, "failed to persist booking");
            remove_photos(upload_dir, &stored_photos).await;
            return Err(e);
        }
    };

    tracing::info!(
        booking_id = %booking.id,
        short_code = short_code(&booking.id),
        photos = booking.photos.len(),
        "booking created"
    );

    let business_name = &state.config.business_name;
    let messaging = state.messaging.as_ref();

    let employee_sid = dispatch(
        messaging,
        business_name,
        &state.config.employee_phone,
        &Notification::BookingRequest(&booking),
    )
    .await
    .map_err(|e| notification_failed(&booking, e))?;

    let customer_sid = dispatch(
        messaging,
        business_name,
        &booking.phone,
        &Notification::BookingAck(&booking),
    )
    .await
    .map_err(|e| notification_failed(&booking, e))?;

    Ok(IntakeReceipt {
        success: true,
        booking_id: booking.id,
        employee_sid,
        customer_sid,
    })
}

fn persist(
    state: &AppState,
    valid: ValidBookingRequest,
    photos: Vec<String>,
) -> Result<Booking, AppError> {
    let db = state.db()?;

    let mut id = new_booking_id();
    let mut attempts = 1;
    while queries::pending_short_code_in_use(&db, short_code(&id))? {
        if attempts >= MAX_ID_ATTEMPTS {
            return Err(AppError::Internal(
                "could not allocate a free booking code".to_string(),
            ));
        }
        tracing::debug!(booking_id = %id, "short code in use, drawing another id");
        id = new_booking_id();
        attempts += 1;
    }

    let booking = Booking {
        id,
        status: BookingStatus::Pending,
        customer_name: valid.customer_name,
        phone: valid.phone,
        address: valid.address,
        service_date: valid.service_date,
        service_time: valid.service_time,
        lot_size: valid.lot_size,
        estimated_price: valid.estimated_price,
        instructions: valid.instructions,
        photos,
        created_at: Utc::now(),
        confirmed_at: None,
        confirmed_by: None,
    };

    Ok(queries::create_booking(&db, &booking)?)
}

fn notification_failed(booking: &Booking, err: AppError) -> AppError {
    AppError::NotificationFailed {
        booking_id: booking.id.clone(),
        reason: err.to_string(),
    }
}
