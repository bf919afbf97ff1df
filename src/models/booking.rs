use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub status: BookingStatus,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub service_date: String,
    pub service_time: String,
    pub lot_size: String,
    pub estimated_price: String,
    pub instructions: Option<String>,
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: BookingStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
}

impl StatusChange {
    pub fn confirm(by: &str, at: DateTime<Utc>) -> Self {
        Self {
            status: BookingStatus::Confirmed,
            confirmed_at: Some(at),
            confirmed_by: Some(by.to_string()),
        }
    }

    pub fn complete() -> Self {
        Self {
            status: BookingStatus::Completed,
            confirmed_at: None,
            confirmed_by: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub service_date: Option<String>,
    #[serde(default)]
    pub service_time: Option<String>,
    #[serde(default)]
    pub lot_size: Option<String>,
    #[serde(default)]
    pub estimated_price: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidBookingRequest {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub service_date: String,
    pub service_time: String,
    pub lot_size: String,
    pub estimated_price: String,
    pub instructions: Option<String>,
}

impl BookingRequest {
    pub fn validate(self) -> Result<ValidBookingRequest, Vec<&'static str>> {
        let customer_name = present(self.customer_name);
        let phone = present(self.phone);
        let address = present(self.address);
        let service_date = present(self.service_date);
        let service_time = present(self.service_time);

        let missing: Vec<&'static str> = [
            ("customerName", customer_name.is_none()),
            ("phone", phone.is_none()),
            ("address", address.is_none()),
            ("serviceDate", service_date.is_none()),
            ("serviceTime", service_time.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name)
        .collect();

        match (customer_name, phone, address, service_date, service_time) {
            (Some(customer_name), Some(phone), Some(address), Some(service_date), Some(service_time)) => {
                Ok(ValidBookingRequest {
                    customer_name,
                    phone,
                    address,
                    service_date,
                    service_time,
                    lot_size: present(self.lot_size).unwrap_or_default(),
                    estimated_price: present(self.estimated_price).unwrap_or_default(),
                    instructions: present(self.instructions),
                })
            }
            _ => Err(missing),
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
