//! Place list input.
//!
//! A list is JSON in one of two shapes, read from a file or an http(s) URL:
//!
//! ```json
//! { "coordinates": [{ "lat": 22.313, "lng": 114.0413 }] }
//! { "places": ["Victoria Peak", "Lion Rock"] }
//! ```
//!
//! Either shape may also carry `"center"` and `"zoom"` for the initial map view.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{LatLng, MapView, PlaceSeed};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceList {
    pub coordinates: Option<Vec<LatLng>>,
    pub places: Option<Vec<String>>,
    pub center: Option<LatLng>,
    pub zoom: Option<u8>,
}

impl PlaceList {
    pub fn parse(json: &str) -> Result<Self> {
        let list: Self = serde_json::from_str(json).context("Failed to parse place list")?;
        if list.coordinates.is_none() && list.places.is_none() {
            bail!("Place list has neither \"places\" nor \"coordinates\"");
        }
        Ok(list)
    }

    /// Seeds in list order; coordinates first when both shapes are present.
    pub fn seeds(&self) -> Vec<PlaceSeed> {
        let coordinates = self
            .coordinates
            .iter()
            .flatten()
            .map(|c| PlaceSeed::Coordinate(*c));
        let names = self
            .places
            .iter()
            .flatten()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| PlaceSeed::Named(name.to_string()));
        coordinates.chain(names).collect()
    }

    pub fn view(&self) -> MapView {
        let default = MapView::default();
        MapView {
            center: self.center.unwrap_or(default.center),
            zoom: self.zoom.unwrap_or(default.zoom),
        }
    }
}

/// Load a place list from a path or an http(s) URL.
pub async fn load_place_list(source: &str) -> Result<PlaceList> {
    let body = if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .with_context(|| format!("Failed to fetch place list from {}", source))?;
        if !response.status().is_success() {
            bail!("Failed to fetch place list from {}: {}", source, response.status());
        }
        response.text().await?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read place list {}", source))?
    };
    let list = PlaceList::parse(&body)?;
    tracing::info!("Loaded place list from {}", source);
    Ok(list)
}
