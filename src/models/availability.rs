use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_SLOTS: [&str; 5] = ["8:00 AM", "10:00 AM", "12:00 PM", "2:00 PM", "4:00 PM"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub date: String,
    pub time_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Availability {
    pub fn default_for(date: &str) -> Self {
        Self {
            date: date.to_string(),
            time_slots: DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
            updated_at: None,
        }
    }
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date {s:?}, expected YYYY-MM-DD"))
}
