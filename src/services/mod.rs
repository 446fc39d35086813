//! Third-party lookup services: places/geocoding and the encyclopedia.
//!
//! Both are traits so the enrichment pipeline can run against the HTTP
//! clients in this module or against fakes.

mod encyclopedia;
mod places;

pub use encyclopedia::*;
pub use places::*;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::LatLng;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(String),
}

impl ClientError {
    /// Build the error for a non-success response, consuming its body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::Server(format!("{}: {}", status, body))
    }
}

/// What to look a place up by.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    Name(String),
    Coordinate(LatLng),
}

/// The result of a successful places lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    pub external_id: String,
    pub position: LatLng,
    pub display_name: String,
    pub photo_url: Option<String>,
}

/// Places lookup errors. Only [`LookupError::RateLimited`] is worth retrying.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Rate limited by places service")]
    RateLimited,

    #[error("No results for {0}")]
    NotFound(String),

    #[error("Lookup rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl LookupError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

pub(crate) fn is_rate_limit_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
pub trait PlacesService: Send + Sync {
    async fn lookup(&self, query: &PlaceQuery) -> Result<PlaceDetails, LookupError>;
}

#[async_trait]
pub trait Encyclopedia: Send + Sync {
    /// Fetch the intro extract of the best article for `title`.
    ///
    /// `Ok(None)` means the service answered but had no usable article.
    async fn extract(&self, title: &str) -> Result<Option<String>, ClientError>;
}
