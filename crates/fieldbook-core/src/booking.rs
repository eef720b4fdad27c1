//! Slot selection for a single field and date.
//!
//! The selection is discarded whenever the date changes; build a new
//! `ScheduleSelection` from the freshly fetched slots instead.

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::models::ScheduleSlot;
use crate::utils::format_rupiah;

/// Date format used by the schedule endpoint.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    Invalid(String),

    #[error("Cannot book in the past: {0}")]
    InPast(String),
}

/// Resolve the date to show schedules for: today when none is given,
/// otherwise the given date as long as it is not before today.
pub fn resolve_date(input: Option<&str>, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let Some(input) = input else {
        return Ok(today);
    };
    let date = NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| DateError::Invalid(input.to_string()))?;
    if date < today {
        return Err(DateError::InPast(input.to_string()));
    }
    Ok(date)
}

/// Today in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone)]
pub struct ScheduleSelection {
    slots: Vec<ScheduleSlot>,
    // Selection order, used for the order request
    selected: Vec<String>,
}

impl ScheduleSelection {
    pub fn new(slots: Vec<ScheduleSlot>) -> Self {
        Self {
            slots,
            selected: Vec::new(),
        }
    }

    pub fn slots(&self) -> &[ScheduleSlot] {
        &self.slots
    }

    pub fn is_selected(&self, uuid: &str) -> bool {
        self.selected.iter().any(|id| id == uuid)
    }

    /// Flip selection of a slot. Booked or unknown slots are left alone and
    /// `false` is returned.
    pub fn toggle(&mut self, uuid: &str) -> bool {
        match self.slots.iter().find(|s| s.uuid == uuid) {
            Some(slot) if !slot.is_booked() => {
                if let Some(pos) = self.selected.iter().position(|id| id == uuid) {
                    self.selected.remove(pos);
                } else {
                    self.selected.push(uuid.to_string());
                }
                true
            }
            _ => false,
        }
    }

    /// Select a slot by its start time ("08:00") or uuid.
    pub fn select(&mut self, key: &str) -> bool {
        let uuid = self
            .slots
            .iter()
            .find(|s| s.uuid == key || s.start_time() == key)
            .map(|s| s.uuid.clone());
        match uuid {
            Some(uuid) if !self.is_selected(&uuid) => self.toggle(&uuid),
            Some(uuid) => self.slots.iter().any(|s| s.uuid == uuid),
            None => false,
        }
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.selected
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Sum of the selected slots' hourly prices.
    pub fn total_price(&self) -> i64 {
        self.selected
            .iter()
            .filter_map(|id| self.slots.iter().find(|s| &s.uuid == id))
            .map(|s| s.price_per_hour.amount().unwrap_or(0))
            .sum()
    }

    pub fn total_display(&self) -> String {
        format_rupiah(self.total_price())
    }
}
