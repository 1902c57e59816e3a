// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for calendar sync.

pub mod event;
pub mod sync;
pub mod token;

pub use event::{filter_attendee_emails, CalendarEvent, EventPatch};
pub use sync::SyncResult;
pub use token::{CalendarToken, GoogleToken, OutlookToken, Provider};
