use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LatLng;
use crate::observable::Observable;

/// Stable identity of a place. Two places are never equal by value.
pub type PlaceId = Uuid;

/// How a place entered the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceSeed {
    /// A free-text name, resolved with a text search.
    Named(String),
    /// A bare coordinate, resolved with a reverse geocode.
    Coordinate(LatLng),
}

/// Progress of the places lookup for one place.
///
/// - `Unresolved`: No lookup issued yet
/// - `Enriching`: A lookup is in flight or waiting out a rate-limit backoff
/// - `Resolved`: External id set; a marker exists or will on next reconcile
/// - `Failed`: Lookup gave up; the marker (if any) shows the warning icon
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Unresolved,
    Enriching,
    Resolved,
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Enriching => "enriching",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

/// The visual state of a marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkerIcon {
    Default,
    /// Hovered in the list or on the map.
    Highlighted,
    /// Enrichment failed.
    Warning,
}

/// A place tracked by the map.
///
/// Fields a marker mirrors (`title`, `position`, `icon`, `info_content`) are
/// [`Observable`] so the marker follows later mutations without another
/// reconciliation. `info_content` and `icon` are derived and recomputed by the
/// setters of the fields they depend on.
#[derive(Debug)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub seed: PlaceSeed,
    external_id: String,
    description: String,
    photo_url: Option<String>,
    visible: bool,
    highlighted: bool,
    status: EnrichmentStatus,
    attempts: u32,
    /// Display name; starts as `name`, replaced by the formatted lookup name.
    pub title: Observable<String>,
    pub position: Observable<LatLng>,
    pub icon: Observable<MarkerIcon>,
    pub info_content: Observable<String>,
    pub updated_at: DateTime<Utc>,
}

impl Place {
    pub fn new(seed: PlaceSeed) -> Self {
        let (name, position) = match &seed {
            PlaceSeed::Named(name) => (name.clone(), LatLng::default()),
            PlaceSeed::Coordinate(coordinate) => (coordinate.to_string(), *coordinate),
        };
        let mut place = Self {
            id: Uuid::new_v4(),
            title: Observable::new(name.clone()),
            name,
            seed,
            external_id: String::new(),
            description: String::new(),
            photo_url: None,
            visible: true,
            highlighted: false,
            status: EnrichmentStatus::Unresolved,
            attempts: 0,
            position: Observable::new(position),
            icon: Observable::new(MarkerIcon::Default),
            info_content: Observable::default(),
            updated_at: Utc::now(),
        };
        place.recompute_info_content();
        place
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(PlaceSeed::Named(name.into()))
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Whether the places lookup finished and the external id is known.
    pub fn is_resolved(&self) -> bool {
        !self.external_id.is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.title.get()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn status(&self) -> EnrichmentStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Set the external id. Only the first non-empty id sticks; returns
    /// whether this call resolved the place.
    pub fn resolve(&mut self, external_id: impl Into<String>) -> bool {
        let external_id = external_id.into();
        if self.is_resolved() || external_id.is_empty() {
            return false;
        }
        self.external_id = external_id;
        self.set_status(EnrichmentStatus::Resolved);
        true
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        if self.title.set(name.into()) {
            self.recompute_info_content();
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.recompute_info_content();
    }

    pub fn set_photo_url(&mut self, url: Option<String>) {
        self.photo_url = url;
        self.recompute_info_content();
    }

    pub fn set_position(&mut self, position: LatLng) {
        self.position.set(position);
        self.touch();
    }

    /// Returns whether visibility changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
        self.recompute_icon();
    }

    /// Record the start of one lookup attempt.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.set_status(EnrichmentStatus::Enriching);
        self.attempts
    }

    pub fn set_status(&mut self, status: EnrichmentStatus) {
        self.status = status;
        self.recompute_icon();
        self.touch();
    }

    fn recompute_icon(&mut self) {
        let icon = if self.highlighted {
            MarkerIcon::Highlighted
        } else if self.status == EnrichmentStatus::Failed {
            MarkerIcon::Warning
        } else {
            MarkerIcon::Default
        };
        self.icon.set(icon);
    }

    fn recompute_info_content(&mut self) {
        let mut content = format!("<h3>{}</h3>", self.title.get());
        if let Some(url) = &self.photo_url {
            content.push_str(&format!("<img src=\"{}\" alt=\"{}\">", url, self.title.get()));
        }
        if !self.description.is_empty() {
            content.push_str(&format!("<p>{}</p>", self.description));
        }
        self.info_content.set(content);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn view(&self) -> PlaceView {
        PlaceView {
            id: self.id,
            name: self.name.clone(),
            display_name: self.title.get().clone(),
            external_id: self.external_id.clone(),
            position: *self.position.get(),
            coordinate: self.position.get().to_string(),
            description: self.description.clone(),
            photo_url: self.photo_url.clone(),
            visible: self.visible,
            status: self.status,
            attempts: self.attempts,
            updated_at: self.updated_at,
        }
    }
}

/// Serializable snapshot of a [`Place`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceView {
    pub id: PlaceId,
    pub name: String,
    pub display_name: String,
    pub external_id: String,
    pub position: LatLng,
    /// Human-readable form of `position`.
    pub coordinate: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub visible: bool,
    pub status: EnrichmentStatus,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}
