//! Bookings: the caller's own reservations, per-space calendars and the
//! admin approval queue.
//!
//! DESIGN
//! ======
//! The backend is inconsistent about field naming (`start_date` on the
//! per-space listing, `startDate` on `/bookings/my-bookings`, `start_time`
//! on `/bookings/all`), so [`Booking`] accepts every spelling. Timestamps are
//! kept as the strings the backend sent: filters compare the literal
//! `YYYY-MM-DD` and `HH:MM` parts, and only overlap checks parse them.
//! Timestamps without an offset are taken as UTC.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::de::lenient_opt_f64;
use super::spaces::Space;
use super::{ApiError, decode, ensure_success, require_admin};
use crate::session::{RequestOptions, SessionManager};

const BOOKINGS_PATH: &str = "/bookings";
const MY_BOOKINGS_PATH: &str = "/bookings/my-bookings";
const ALL_BOOKINGS_PATH: &str = "/bookings/all";

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Offset-less timestamps as written by the backend, e.g. `2026-03-02T14:00:00`.
const NAIVE_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]");

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Other(String),
}

impl BookingStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the booking still holds its time slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl From<String> for BookingStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(raw),
        }
    }
}

impl From<BookingStatus> for String {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    #[serde(default, alias = "spaceId")]
    pub space_id: Option<i64>,
    #[serde(default, alias = "spaceName")]
    pub space_name: Option<String>,
    #[serde(rename = "start_date", alias = "startDate", alias = "start_time", default)]
    pub start: String,
    #[serde(rename = "end_date", alias = "endDate", alias = "end_time", default)]
    pub end: String,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default, alias = "totalPrice", deserialize_with = "lenient_opt_f64")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<i64>,
}

impl Booking {
    /// `YYYY-MM-DD` part of the start timestamp.
    #[must_use]
    pub fn date(&self) -> &str {
        self.start.split('T').next().unwrap_or_default()
    }

    /// `HH:MM` part of the start timestamp, as written by the backend.
    #[must_use]
    pub fn start_clock(&self) -> Option<&str> {
        let (_, time) = self.start.split_once('T')?;
        time.get(..5)
    }

    #[must_use]
    pub fn starts_at(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.start)
    }

    #[must_use]
    pub fn ends_at(&self) -> Option<OffsetDateTime> {
        parse_timestamp(&self.end)
    }

    /// True when this booking holds any part of `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: OffsetDateTime, end: OffsetDateTime) -> bool {
        if !self.status.is_active() {
            return false;
        }
        match (self.starts_at(), self.ends_at()) {
            (Some(own_start), Some(own_end)) => start < own_end && own_start < end,
            _ => false,
        }
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    match PrimitiveDateTime::parse(raw, NAIVE_TIMESTAMP) {
        Ok(at) => Some(at.assume_utc()),
        Err(e) => {
            tracing::warn!(raw, error = %e, "unparseable booking timestamp");
            None
        }
    }
}

/// Body for `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    pub space_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
}

impl NewBooking {
    #[must_use]
    pub fn new(space_id: i64, start_date: OffsetDateTime, end_date: OffsetDateTime) -> Self {
        Self { space_id, start_date, end_date, comment: None, total_price: None }
    }

    #[must_use]
    pub fn is_valid_range(&self) -> bool {
        self.end_date > self.start_date
    }
}

/// Price of booking `space` from `start` to `end`, billed for at least one hour.
#[must_use]
pub fn quote(space: &Space, start: OffsetDateTime, end: OffsetDateTime) -> f64 {
    let hours = (end - start).as_seconds_f64() / SECONDS_PER_HOUR;
    space.price_for(hours.max(1.0))
}

/// First active booking that collides with `[start, end)`.
#[must_use]
pub fn find_conflict(existing: &[Booking], start: OffsetDateTime, end: OffsetDateTime) -> Option<&Booking> {
    existing.iter().find(|b| b.overlaps(start, end))
}

// =============================================================================
// FILTER
// =============================================================================

/// Criteria for narrowing a booking list. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Inclusive `HH:MM` lower bound on the start time.
    pub from_time: Option<String>,
    /// Inclusive `HH:MM` upper bound on the start time.
    pub to_time: Option<String>,
}

impl BookingFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn matches(&self, booking: &Booking) -> bool {
        if self.is_empty() {
            return true;
        }
        let clock = booking.start_clock().unwrap_or_default();
        self.status.as_ref().is_none_or(|s| *s == booking.status)
            && self.date.as_deref().is_none_or(|d| d == booking.date())
            && self.from_time.as_deref().is_none_or(|from| clock >= from)
            && self.to_time.as_deref().is_none_or(|to| clock <= to)
    }

    #[must_use]
    pub fn apply(&self, bookings: Vec<Booking>) -> Vec<Booking> {
        bookings.into_iter().filter(|b| self.matches(b)).collect()
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

async fn fetch_list(session: &SessionManager, options: RequestOptions, path: &str) -> Result<Vec<Booking>, ApiError> {
    let response = session.auth_fetch(path, options).await?;
    let response = ensure_success(response, "failed to load bookings")?;
    decode(&response)
}

/// Bookings made by the signed-in user.
///
/// # Errors
///
/// Session, status and decode errors.
pub async fn my_bookings(session: &SessionManager) -> Result<Vec<Booking>, ApiError> {
    fetch_list(session, RequestOptions::get(), MY_BOOKINGS_PATH).await
}

/// Every booking for one space, used to show taken slots.
///
/// # Errors
///
/// Session, status and decode errors.
pub async fn space_bookings(session: &SessionManager, space_id: i64) -> Result<Vec<Booking>, ApiError> {
    let options = RequestOptions::get().query("space_id", space_id.to_string());
    fetch_list(session, options, BOOKINGS_PATH).await
}

/// # Errors
///
/// [`ApiError::InvalidRange`] when `end_date <= start_date` (nothing is sent),
/// otherwise session, status and decode errors.
pub async fn create_booking(session: &SessionManager, booking: &NewBooking) -> Result<Booking, ApiError> {
    if !booking.is_valid_range() {
        return Err(ApiError::InvalidRange);
    }
    let options = RequestOptions::post().json(booking)?;
    let response = session.auth_fetch(BOOKINGS_PATH, options).await?;
    let response = ensure_success(response, "booking failed")?;
    let created: Booking = decode(&response)?;
    tracing::info!(booking_id = created.id, space_id = booking.space_id, "booking created");
    Ok(created)
}

/// # Errors
///
/// Session and status errors.
pub async fn cancel_booking(session: &SessionManager, id: i64) -> Result<(), ApiError> {
    let response = session
        .auth_fetch(&format!("{BOOKINGS_PATH}/{id}"), RequestOptions::delete())
        .await?;
    ensure_success(response, "failed to cancel booking")?;
    tracing::info!(booking_id = id, "booking cancelled");
    Ok(())
}

/// Every booking in the system.
///
/// # Errors
///
/// [`ApiError::Forbidden`] for non-admins (nothing is sent).
pub async fn all_bookings(session: &SessionManager) -> Result<Vec<Booking>, ApiError> {
    require_admin(session)?;
    fetch_list(session, RequestOptions::get(), ALL_BOOKINGS_PATH).await
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    status: &'a BookingStatus,
}

/// Approve, reject or otherwise move a booking to `status`.
///
/// # Errors
///
/// [`ApiError::Forbidden`] for non-admins (nothing is sent), status errors otherwise.
pub async fn set_booking_status(session: &SessionManager, id: i64, status: &BookingStatus) -> Result<(), ApiError> {
    require_admin(session)?;
    let options = RequestOptions::put().json(&StatusUpdate { status })?;
    let response = session
        .auth_fetch(&format!("{BOOKINGS_PATH}/{id}/status"), options)
        .await?;
    ensure_success(response, "failed to update status")?;
    tracing::info!(booking_id = id, %status, "booking status updated");
    Ok(())
}

#[cfg(test)]
#[path = "bookings_test.rs"]
mod tests;
