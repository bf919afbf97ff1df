use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::StoreError;
use crate::models::{Availability, Booking, BookingStatus, StatusChange};
use crate::services::booking_id::SHORT_CODE_LEN;

const BOOKING_COLUMNS: &str = "id, status, customer_name, phone, address, service_date, service_time, \
     lot_size, estimated_price, instructions, photos, created_at, confirmed_at, confirmed_by";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> Result<Booking, StoreError> {
    let photos = serde_json::to_string(&booking.photos)?;

    let inserted = conn.execute(
        "INSERT INTO bookings (id, status, customer_name, phone, address, service_date, service_time,
                               lot_size, estimated_price, instructions, photos, created_at, confirmed_at, confirmed_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO NOTHING",
        params![
            booking.id,
            booking.status.as_str(),
            booking.customer_name,
            booking.phone,
            booking.address,
            booking.service_date,
            booking.service_time,
            booking.lot_size,
            booking.estimated_price,
            booking.instructions,
            photos,
            format_timestamp(&booking.created_at),
            booking.confirmed_at.as_ref().map(format_timestamp),
            booking.confirmed_by,
        ],
    )?;

    if inserted == 0 {
        return Err(StoreError::AlreadyExists(booking.id.clone()));
    }

    get_booking_by_id(conn, &booking.id)?.ok_or_else(|| StoreError::NotFound(booking.id.clone()))
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> Result<Option<Booking>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    row.transpose()
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Booking, StoreError> {
    get_booking_by_id(conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
}

pub fn list_bookings_by_status(
    conn: &Connection,
    status: BookingStatus,
) -> Result<Vec<Booking>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![status.as_str()], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_all_bookings(conn: &Connection) -> Result<Vec<Booking>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

// Check and write are a single statement.
pub fn transition_booking(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    change: &StatusChange,
) -> Result<Booking, StoreError> {
    if !expected.can_transition_to(change.status) {
        return Err(StoreError::IllegalTransition {
            from: expected,
            to: change.status,
        });
    }

    let updated = conn.execute(
        "UPDATE bookings
         SET status = ?1,
             confirmed_at = COALESCE(confirmed_at, ?2),
             confirmed_by = COALESCE(confirmed_by, ?3)
         WHERE id = ?4 AND status = ?5",
        params![
            change.status.as_str(),
            change.confirmed_at.as_ref().map(format_timestamp),
            change.confirmed_by,
            id,
            expected.as_str(),
        ],
    )?;

    if updated == 0 {
        return match get_booking_by_id(conn, id)? {
            Some(current) => Err(StoreError::Conflict {
                id: id.to_string(),
                expected,
                actual: current.status,
            }),
            None => Err(StoreError::NotFound(id.to_string())),
        };
    }

    get_booking(conn, id)
}

pub fn pending_short_code_in_use(conn: &Connection, code: &str) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE status = 'pending' AND substr(id, ?1) = ?2",
        params![-(SHORT_CODE_LEN as i64), code],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> Result<Booking, StoreError> {
    let status_str: String = row.get(1)?;
    let photos_json: String = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let confirmed_at_str: Option<String> = row.get(12)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status {status_str:?}")))?;

    Ok(Booking {
        id: row.get(0)?,
        status,
        customer_name: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        service_date: row.get(5)?,
        service_time: row.get(6)?,
        lot_size: row.get(7)?,
        estimated_price: row.get(8)?,
        instructions: row.get(9)?,
        photos: serde_json::from_str(&photos_json)?,
        created_at: parse_timestamp(&created_at_str)?,
        confirmed_at: confirmed_at_str.as_deref().map(parse_timestamp).transpose()?,
        confirmed_by: row.get(13)?,
    })
}

// Millisecond precision with a fixed `Z` suffix keeps text ordering chronological.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

// ── Availability ──

pub fn get_availability(conn: &Connection, date: &str) -> Result<Option<Availability>, StoreError> {
    let row = conn
        .query_row(
            "SELECT date, time_slots, updated_at FROM availability WHERE date = ?1",
            params![date],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((date, slots_json, updated_at)) => Ok(Some(Availability {
            date,
            time_slots: serde_json::from_str(&slots_json)?,
            updated_at: Some(updated_at),
        })),
        None => Ok(None),
    }
}

pub fn save_availability(
    conn: &Connection,
    date: &str,
    time_slots: &[String],
) -> Result<Availability, StoreError> {
    let slots_json = serde_json::to_string(time_slots)?;
    let updated_at = format_timestamp(&Utc::now());

    conn.execute(
        "INSERT INTO availability (date, time_slots, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(date) DO UPDATE SET
           time_slots = excluded.time_slots,
           updated_at = excluded.updated_at",
        params![date, slots_json, updated_at],
    )?;

    Ok(Availability {
        date: date.to_string(),
        time_slots: time_slots.to_vec(),
        updated_at: Some(updated_at),
    })
}
