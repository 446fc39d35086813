//! The view-model: the place collection, its markers, the filter, and the
//! single open detail panel.
//!
//! Every mutation that can affect markers goes through here so the marker
//! set is reconciled and the filter re-applied in one place.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::filter;
use crate::map::{MapSurface, MarkerHandle};
use crate::models::{EnrichmentStatus, Place, PlaceId, PlaceSeed, PlaceView};
use crate::services::{PlaceDetails, PlaceQuery};
use crate::sync::MarkerSynchronizer;

pub type SharedViewModel = Arc<Mutex<ViewModel>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewModelError {
    #[error("Place not found: {0}")]
    PlaceNotFound(PlaceId),

    #[error("Marker not found: {0:?}")]
    MarkerNotFound(MarkerHandle),

    #[error("Place has no marker yet: {0}")]
    NoMarker(PlaceId),

    #[error("Lookup for {0} returned no external id")]
    MissingExternalId(PlaceId),
}

/// One lookup the enrichment pipeline should issue.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub query: PlaceQuery,
    /// 1-based attempt number for this place.
    pub attempt: u32,
}

pub struct ViewModel {
    places: Vec<Place>,
    sync: MarkerSynchronizer,
    map: Arc<dyn MapSurface>,
    filter: String,
    open_panel: Option<PlaceId>,
}

impl ViewModel {
    pub fn new(map: Arc<dyn MapSurface>) -> Self {
        Self {
            places: Vec::new(),
            sync: MarkerSynchronizer::new(Arc::clone(&map)),
            map,
            filter: String::new(),
            open_panel: None,
        }
    }

    pub fn shared(self) -> SharedViewModel {
        Arc::new(Mutex::new(self))
    }

    // ============================================================
    // Collection
    // ============================================================

    /// Append places for `seeds`, in order. Returns their ids.
    pub fn load(&mut self, seeds: impl IntoIterator<Item = PlaceSeed>) -> Vec<PlaceId> {
        let start = self.places.len();
        for seed in seeds {
            let mut place = Place::new(seed);
            place.set_visible(filter::matches(&self.filter, place.display_name()));
            self.places.push(place);
        }
        self.sync.reconcile(&mut self.places);
        let ids: Vec<PlaceId> = self.places[start..].iter().map(|p| p.id).collect();
        tracing::info!("Loaded {} places", ids.len());
        ids
    }

    /// Remove a place from the collection. Its marker is hidden, not destroyed.
    pub fn remove_place(&mut self, id: PlaceId) -> Result<Place, ViewModelError> {
        let index = self.index_of(id)?;
        if self.open_panel == Some(id) {
            self.close_panel();
        }
        let place = self.places.remove(index);
        self.sync.reconcile(&mut self.places);
        Ok(place)
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn ids(&self) -> Vec<PlaceId> {
        self.places.iter().map(|p| p.id).collect()
    }

    pub fn views(&self) -> Vec<PlaceView> {
        self.places.iter().map(Place::view).collect()
    }

    /// Places shown in the list: the visible ones, in insertion order.
    pub fn visible_views(&self) -> Vec<PlaceView> {
        self.places
            .iter()
            .filter(|p| p.visible())
            .map(Place::view)
            .collect()
    }

    pub fn marker_for(&self, id: PlaceId) -> Option<MarkerHandle> {
        self.sync.marker_for(id)
    }

    pub fn marker_count(&self) -> usize {
        self.sync.len()
    }

    fn index_of(&self, id: PlaceId) -> Result<usize, ViewModelError> {
        self.places
            .iter()
            .position(|p| p.id == id)
            .ok_or(ViewModelError::PlaceNotFound(id))
    }

    fn place_mut(&mut self, id: PlaceId) -> Result<&mut Place, ViewModelError> {
        self.places
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ViewModelError::PlaceNotFound(id))
    }

    // ============================================================
    // Filter
    // ============================================================

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Set the filter text and show/hide markers to match.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into();
        let changed = filter::apply(&self.filter, &mut self.places);
        for (index, visible) in &changed {
            self.sync.set_visible(self.places[*index].id, *visible);
        }
        tracing::debug!(
            "Filter {:?} changed visibility of {} places",
            self.filter,
            changed.len()
        );
    }

    fn refilter_place(&mut self, index: usize) {
        let place = &mut self.places[index];
        let visible = filter::matches(&self.filter, place.display_name());
        if place.set_visible(visible) {
            self.sync.set_visible(place.id, visible);
        }
    }

    // ============================================================
    // Enrichment
    // ============================================================

    /// Start a lookup attempt for `id`.
    ///
    /// Returns `None` once the place is resolved, so a retry that races a
    /// successful lookup never issues another request.
    pub fn begin_lookup(&mut self, id: PlaceId) -> Result<Option<LookupRequest>, ViewModelError> {
        let place = self.place_mut(id)?;
        if place.is_resolved() {
            return Ok(None);
        }
        let query = match &place.seed {
            PlaceSeed::Named(name) => PlaceQuery::Name(name.clone()),
            PlaceSeed::Coordinate(position) => PlaceQuery::Coordinate(*position),
        };
        let attempt = place.begin_attempt();
        Ok(Some(LookupRequest { query, attempt }))
    }

    /// Write lookup results into the place, external id last, then reconcile.
    ///
    /// Returns whether this call resolved the place; a second success for an
    /// already-resolved place changes nothing. Details without an external id
    /// are rejected before any field is written.
    pub fn apply_details(
        &mut self,
        id: PlaceId,
        details: PlaceDetails,
    ) -> Result<bool, ViewModelError> {
        let index = self.index_of(id)?;
        let place = &mut self.places[index];
        if place.is_resolved() {
            return Ok(false);
        }
        if details.external_id.is_empty() {
            return Err(ViewModelError::MissingExternalId(id));
        }
        place.set_position(details.position);
        place.set_display_name(details.display_name);
        place.set_photo_url(details.photo_url);
        place.resolve(details.external_id);
        let resolved = place.is_resolved();

        self.refilter_place(index);
        self.sync.reconcile(&mut self.places);
        Ok(resolved)
    }

    pub fn mark_failed(&mut self, id: PlaceId) -> Result<(), ViewModelError> {
        let place = self.place_mut(id)?;
        if !place.is_resolved() {
            place.set_status(EnrichmentStatus::Failed);
        }
        Ok(())
    }

    pub fn set_description(
        &mut self,
        id: PlaceId,
        description: impl Into<String>,
    ) -> Result<(), ViewModelError> {
        self.place_mut(id)?.set_description(description);
        Ok(())
    }

    // ============================================================
    // Panels and hover
    // ============================================================

    pub fn open_panel_place(&self) -> Option<PlaceId> {
        self.open_panel
    }

    /// Open the detail panel of `id`, closing whichever panel is open.
    pub fn open_panel(&mut self, id: PlaceId) -> Result<MarkerHandle, ViewModelError> {
        self.index_of(id)?;
        let marker = self.sync.marker_for(id).ok_or(ViewModelError::NoMarker(id))?;

        if let Some(previous) = self.open_panel.take() {
            if let Some(previous_marker) = self.sync.marker_for(previous) {
                self.map.close_panel(previous_marker);
            }
        }
        self.map.open_panel(marker);
        self.open_panel = Some(id);
        Ok(marker)
    }

    pub fn close_panel(&mut self) {
        if let Some(id) = self.open_panel.take() {
            if let Some(marker) = self.sync.marker_for(id) {
                self.map.close_panel(marker);
            }
        }
    }

    /// List click: open the panel and pan the map to the place.
    pub fn select_place(&mut self, id: PlaceId) -> Result<MarkerHandle, ViewModelError> {
        let marker = self.open_panel(id)?;
        if let Some(place) = self.place(id) {
            self.map.pan_to(*place.position.get());
        }
        Ok(marker)
    }

    pub fn click_marker(&mut self, marker: MarkerHandle) -> Result<PlaceId, ViewModelError> {
        let id = self
            .sync
            .place_for(marker)
            .ok_or(ViewModelError::MarkerNotFound(marker))?;
        self.open_panel(id)?;
        Ok(id)
    }

    /// Highlight (or restore) the marker of `id`.
    pub fn hover_place(&mut self, id: PlaceId, hovered: bool) -> Result<(), ViewModelError> {
        self.place_mut(id)?.set_highlighted(hovered);
        Ok(())
    }

    pub fn hover_marker(
        &mut self,
        marker: MarkerHandle,
        hovered: bool,
    ) -> Result<PlaceId, ViewModelError> {
        let id = self
            .sync
            .place_for(marker)
            .ok_or(ViewModelError::MarkerNotFound(marker))?;
        self.hover_place(id, hovered)?;
        Ok(id)
    }
}
