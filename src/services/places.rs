//! HTTP client for the Google Places and Geocoding web services.
//!
//! Name queries use "find place from text"; coordinate queries use reverse
//! geocoding. Both APIs report rate limiting through the `status` field of a
//! 200 response (`OVER_QUERY_LIMIT`), and sometimes through HTTP 429.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{
    is_rate_limit_status, ClientError, LookupError, PlaceDetails, PlaceQuery, PlacesService,
};
use crate::models::LatLng;

/// Default base URL of the Maps web services.
pub const DEFAULT_PLACES_URL: &str = "https://maps.googleapis.com/maps/api";

const PHOTO_MAX_WIDTH: &str = "400";

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    place_id: String,
    name: Option<String>,
    formatted_address: Option<String>,
    geometry: Geometry,
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    place_id: String,
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

/// Places lookups against the Google Maps web services.
#[derive(Debug, Clone)]
pub struct GooglePlacesClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl GooglePlacesClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: Client::new(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            req = req.query(&[("key", key)]);
        }
        req
    }

    fn photo_url(&self, reference: &str) -> Result<String, ClientError> {
        let req = self
            .request("/place/photo")
            .query(&[("maxwidth", PHOTO_MAX_WIDTH), ("photo_reference", reference)])
            .build()?;
        Ok(req.url().to_string())
    }

    /// Send a request and decode the body, mapping HTTP-level rate limiting.
    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, LookupError> {
        let response = req.send().await.map_err(ClientError::from)?;
        let status = response.status();
        if is_rate_limit_status(status) {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            return Err(ClientError::from_response(response).await.into());
        }
        Ok(response.json().await.map_err(ClientError::from)?)
    }

    async fn find_by_name(&self, name: &str) -> Result<PlaceDetails, LookupError> {
        let req = self.request("/place/findplacefromtext/json").query(&[
            ("input", name),
            ("inputtype", "textquery"),
            ("fields", "place_id,name,formatted_address,geometry,photos"),
        ]);
        let body: FindPlaceResponse = self.fetch(req).await?;
        check_status(&body.status, body.error_message.as_deref(), name)?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(name.to_string()))?;

        let photo_url = candidate
            .photos
            .first()
            .map(|p| self.photo_url(&p.photo_reference))
            .transpose()?;
        let display_name = candidate
            .name
            .or(candidate.formatted_address)
            .unwrap_or_else(|| name.to_string());

        Ok(PlaceDetails {
            external_id: candidate.place_id,
            position: candidate.geometry.location,
            display_name,
            photo_url,
        })
    }

    async fn reverse_geocode(&self, position: LatLng) -> Result<PlaceDetails, LookupError> {
        let latlng = format!("{},{}", position.lat, position.lng);
        let req = self
            .request("/geocode/json")
            .query(&[("latlng", latlng.as_str())]);
        let body: GeocodeResponse = self.fetch(req).await?;
        check_status(&body.status, body.error_message.as_deref(), &latlng)?;

        let result = body
            .results
            .into_iter()
            .next()
            .ok_or(LookupError::NotFound(latlng))?;

        Ok(PlaceDetails {
            external_id: result.place_id,
            position: result.geometry.location,
            display_name: result.formatted_address,
            photo_url: None,
        })
    }
}

/// Map a Maps API `status` to an error. `OK` passes.
fn check_status(status: &str, message: Option<&str>, query: &str) -> Result<(), LookupError> {
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" => Err(LookupError::NotFound(query.to_string())),
        "OVER_QUERY_LIMIT" => Err(LookupError::RateLimited),
        other => Err(LookupError::Rejected(match message {
            Some(message) => format!("{}: {}", other, message),
            None => other.to_string(),
        })),
    }
}

#[async_trait]
impl PlacesService for GooglePlacesClient {
    async fn lookup(&self, query: &PlaceQuery) -> Result<PlaceDetails, LookupError> {
        match query {
            PlaceQuery::Name(name) => self.find_by_name(name).await,
            PlaceQuery::Coordinate(position) => self.reverse_geocode(*position).await,
        }
    }
}
