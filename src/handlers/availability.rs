use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::check_auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::parse_date;
use crate::models::Availability;
use crate::state::AppState;

// GET /api/availability/:date
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<Availability>, AppError> {
    parse_date(&date).map_err(|e| AppError::Validation(e.to_string()))?;

    let stored = {
        let db = state.db()?;
        queries::get_availability(&db, &date)?
    };

    Ok(Json(stored.unwrap_or_else(|| Availability::default_for(&date))))
}

// POST /api/availability
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAvailabilityRequest {
    pub date: String,
    pub time_slots: Vec<String>,
}

pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SetAvailabilityRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    parse_date(&payload.date).map_err(|e| AppError::Validation(e.to_string()))?;

    {
        let db = state.db()?;
        queries::save_availability(&db, &payload.date, &payload.time_slots)?;
    }

    tracing::info!(date = %payload.date, slots = payload.time_slots.len(), "availability updated");
    Ok(Json(serde_json::json!({ "success": true })))
}
