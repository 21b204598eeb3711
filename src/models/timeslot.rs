//! Reserved intervals as they are stored on a venue record.
//!
//! A venue keeps its reservations as a JSON array of `"<start> <end>"`
//! strings. Entries written by this crate use RFC 3339 with second precision
//! and a `Z` suffix; older entries without seconds are still understood.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// A reserved `(start, end)` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ServiceError> {
        if end <= start {
            return Err(ServiceError::ValidationError(format!(
                "End {} must be after start {}",
                format_timestamp(&end),
                format_timestamp(&start)
            )));
        }
        Ok(Self { start, end })
    }

    /// Stored form, `"<start> <end>"`
    pub fn format(&self) -> String {
        format!(
            "{} {}",
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }

    /// Whether a stored entry denotes this interval
    pub fn matches_entry(&self, entry: &str) -> bool {
        entry.trim() == self.format() || entry.parse::<TimeSlot>().ok().as_ref() == Some(self)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for TimeSlot {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split_whitespace();
        let (start, end) = match (parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), None) => (start, end),
            _ => {
                return Err(ServiceError::InvalidInput(format!(
                    "Timeslot '{}' is not '<start> <end>'",
                    raw
                )))
            }
        };
        TimeSlot::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses RFC 3339, falling back to minute precision (`2024-01-01T10:00Z`).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M") {
            return Ok(Utc.from_utc_datetime(&parsed));
        }
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    Err(ServiceError::InvalidInput(format!(
        "'{}' is not an ISO-8601 timestamp",
        raw
    )))
}

/// Decodes the stored list; a missing or blank field is an empty list.
pub fn decode_entries(raw: Option<&str>) -> Result<Vec<String>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json).map_err(|e| {
            ServiceError::SerializationError(format!("Timeslot list is not a JSON array: {}", e))
        }),
    }
}

pub fn encode_entries(entries: &[String]) -> Result<String, ServiceError> {
    Ok(serde_json::to_string(entries)?)
}

/// Parses stored entries, skipping (and logging) malformed ones.
pub fn slots_from_entries(entries: &[String]) -> Vec<TimeSlot> {
    entries
        .iter()
        .filter_map(|entry| match entry.parse::<TimeSlot>() {
            Ok(slot) => Some(slot),
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping malformed timeslot entry");
                None
            }
        })
        .collect()
}
