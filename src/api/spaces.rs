//! Coworking spaces: listing, detail, admin CRUD and client-side filtering.

use serde::{Deserialize, Serialize};

use super::de::{OneOrMany, lenient_f64, lenient_u32, string_list};
use super::{ApiError, decode, ensure_json, ensure_success, require_admin};
use crate::session::{RequestOptions, SessionManager};

const SPACES_PATH: &str = "/spaces/";

pub const STATUS_AVAILABLE: &str = "available";

fn space_path(id: i64) -> String {
    format!("/spaces/{id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub google_maps_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_per_hour: f64,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub capacity: u32,
    #[serde(default)]
    pub wifi_available: bool,
    #[serde(default)]
    pub projector_available: bool,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "image_url", alias = "image_urls", default, deserialize_with = "string_list")]
    pub images: Vec<String>,
}

impl Space {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }

    /// Price for `hours` of use.
    #[must_use]
    pub fn price_for(&self, hours: f64) -> f64 {
        self.price_per_hour * hours
    }
}

/// Body for creating or replacing a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_link: Option<String>,
    #[serde(default)]
    pub price_per_hour: f64,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub wifi_available: bool,
    #[serde(default)]
    pub projector_available: bool,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_status() -> String {
    STATUS_AVAILABLE.to_owned()
}

impl SpaceDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            address: address.into(),
            google_maps_link: None,
            price_per_hour: 0.0,
            capacity: 0,
            wifi_available: false,
            projector_available: false,
            status: default_status(),
            image_url: None,
        }
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// Inclusive price and capacity bounds. Unset bounds match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpaceFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_capacity: Option<u32>,
    pub max_capacity: Option<u32>,
}

impl SpaceFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn matches(&self, space: &Space) -> bool {
        self.min_price.is_none_or(|min| space.price_per_hour >= min)
            && self.max_price.is_none_or(|max| space.price_per_hour <= max)
            && self.min_capacity.is_none_or(|min| space.capacity >= min)
            && self.max_capacity.is_none_or(|max| space.capacity <= max)
    }

    #[must_use]
    pub fn apply(&self, spaces: Vec<Space>) -> Vec<Space> {
        if self.is_empty() {
            return spaces;
        }
        spaces.into_iter().filter(|s| self.matches(s)).collect()
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// All spaces. A single object in the response is treated as a one-element list.
///
/// # Errors
///
/// [`ApiError::UnexpectedContent`] when the body is not JSON, otherwise the
/// usual status and decode errors.
pub async fn list_spaces(session: &SessionManager) -> Result<Vec<Space>, ApiError> {
    let response = session.auth_fetch(SPACES_PATH, RequestOptions::get()).await?;
    ensure_json(&response)?;
    let response = ensure_success(response, "failed to load spaces")?;
    let spaces: OneOrMany<Space> = decode(&response)?;
    let spaces = spaces.into_vec();
    tracing::debug!(count = spaces.len(), "spaces loaded");
    Ok(spaces)
}

/// # Errors
///
/// `Status { status: 404, .. }` when the space does not exist.
pub async fn get_space(session: &SessionManager, id: i64) -> Result<Space, ApiError> {
    let response = session.auth_fetch(&space_path(id), RequestOptions::get()).await?;
    let response = ensure_success(response, "space not found")?;
    decode(&response)
}

/// # Errors
///
/// [`ApiError::Forbidden`] for non-admins (nothing is sent), [`ApiError::Validation`]
/// when the backend rejects fields.
pub async fn create_space(session: &SessionManager, draft: &SpaceDraft) -> Result<Space, ApiError> {
    require_admin(session)?;
    let options = RequestOptions::post().json(draft)?;
    let response = session.auth_fetch(SPACES_PATH, options).await?;
    let response = ensure_success(response, "failed to create space")?;
    let space: Space = decode(&response)?;
    tracing::info!(space_id = space.id, "space created");
    Ok(space)
}

/// # Errors
///
/// As for [`create_space`].
pub async fn update_space(session: &SessionManager, id: i64, draft: &SpaceDraft) -> Result<Space, ApiError> {
    require_admin(session)?;
    let options = RequestOptions::put().json(draft)?;
    let response = session.auth_fetch(&space_path(id), options).await?;
    let response = ensure_success(response, "failed to update space")?;
    decode(&response)
}

/// # Errors
///
/// [`ApiError::Forbidden`] for non-admins, status errors otherwise.
pub async fn delete_space(session: &SessionManager, id: i64) -> Result<(), ApiError> {
    require_admin(session)?;
    let response = session.auth_fetch(&space_path(id), RequestOptions::delete()).await?;
    ensure_success(response, "failed to delete space")?;
    tracing::info!(space_id = id, "space deleted");
    Ok(())
}

#[cfg(test)]
#[path = "spaces_test.rs"]
mod tests;
