use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{format_rupiah, parse_rupiah};

/// Price as the field service sends it: a plain amount in rupiah on the
/// field endpoints, an already formatted string ("Rp.100.000") on schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(i64),
    Display(String),
}

impl Price {
    /// Numeric amount in rupiah, if it can be determined.
    pub fn amount(&self) -> Option<i64> {
        match self {
            Price::Amount(amount) => Some(*amount),
            Price::Display(text) => parse_rupiah(text),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(amount) => f.write_str(&format_rupiah(*amount)),
            Price::Display(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub uuid: String,
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub price_per_hour: Price,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Detail view of a single field. The service omits the uuid here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDetail {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub price_per_hour: Price,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    #[serde(alias = "Available", alias = "AVAILABLE")]
    Available,
    #[serde(alias = "Booked", alias = "BOOKED")]
    Booked,
}

impl SlotStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
        }
    }
}

/// One bookable hour on a field for a given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub uuid: String,
    pub date: String,
    pub price_per_hour: Price,
    pub status: SlotStatus,
    /// "HH:MM:SS - HH:MM:SS"
    pub time: String,
}

impl ScheduleSlot {
    pub fn is_booked(&self) -> bool {
        self.status == SlotStatus::Booked
    }

    /// Start time without seconds, e.g. "08:00".
    pub fn start_time(&self) -> &str {
        let start = self.time.split(" - ").next().unwrap_or(&self.time);
        start.get(..5).unwrap_or(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_list_item() {
        let json = r#"{
            "uuid": "6f1c2a9e-0000-4000-8000-000000000001",
            "code": "FLD-01",
            "name": "Lapangan A",
            "pricePerHour": 150000,
            "images": ["https://cdn.example.com/a.jpg"],
            "createAt": "2024-01-01T00:00:00Z",
            "updateAt": null
        }"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert_eq!(field.name, "Lapangan A");
        assert_eq!(field.price_per_hour.amount(), Some(150000));
        assert_eq!(field.price_per_hour.to_string(), "Rp.150.000");
    }

    #[test]
    fn test_parse_schedule_slot() {
        let json = r#"{
            "uuid": "s1",
            "date": "05 Mei",
            "pricePerHour": "Rp.100.000",
            "status": "booked",
            "time": "08:00:00 - 09:00:00"
        }"#;
        let slot: ScheduleSlot = serde_json::from_str(json).unwrap();
        assert!(slot.is_booked());
        assert_eq!(slot.price_per_hour.amount(), Some(100000));
        assert_eq!(slot.start_time(), "08:00");
    }

    #[test]
    fn test_slot_status_accepts_capitalised() {
        let status: SlotStatus = serde_json::from_str(r#""Available""#).unwrap();
        assert_eq!(status, SlotStatus::Available);
        assert!(serde_json::from_str::<SlotStatus>(r#""closed""#).is_err());
    }
}
