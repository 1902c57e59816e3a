// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider-neutral calendar event passed into every adapter call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::error::CalendarError;

/// A meeting as it should appear on the host's external calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    /// Attendee email addresses
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl CalendarEvent {
    /// Attendees that are usable email addresses; anything else is dropped.
    pub fn attendee_emails(&self) -> Vec<String> {
        filter_attendee_emails(&self.attendees)
    }

    /// Field validation plus the start/end ordering check.
    pub fn check(&self) -> Result<(), CalendarError> {
        self.validate()
            .map_err(|e| CalendarError::InvalidEvent(e.to_string()))?;
        if self.end_time < self.start_time {
            return Err(CalendarError::InvalidEvent(
                "end time must not be before start time".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial event for updates: only fields that are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub attendees: Option<Vec<String>>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.location.is_none()
            && self.attendees.is_none()
    }

    /// Filtered attendee emails, if attendees are part of the patch.
    pub fn attendee_emails(&self) -> Option<Vec<String>> {
        self.attendees.as_deref().map(filter_attendee_emails)
    }
}

/// Keep only entries that look like email addresses.
///
/// Hosts sometimes list visitors by bare name; those cannot be invited.
pub fn filter_attendee_emails(attendees: &[String]) -> Vec<String> {
    attendees
        .iter()
        .map(|a| a.trim())
        .filter(|a| a.validate_email())
        .map(str::to_string)
        .collect()
}
