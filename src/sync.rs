//! Marker synchronization.
//!
//! Keeps at most one marker per place on the map surface. Markers are created
//! once a place has an external id, bound to the place's observable fields,
//! and from then on only shown or hidden.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::map::{MapSurface, MarkerHandle, MarkerOptions};
use crate::models::{Place, PlaceId};

/// What one [`MarkerSynchronizer::reconcile`] pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Places that got a marker in this pass.
    pub created: Vec<PlaceId>,
    /// Places still waiting for an external id.
    pub deferred: usize,
    /// Places no longer in the collection whose marker was hidden.
    pub hidden: Vec<PlaceId>,
}

pub struct MarkerSynchronizer {
    map: Arc<dyn MapSurface>,
    markers: HashMap<PlaceId, MarkerHandle>,
    places: HashMap<MarkerHandle, PlaceId>,
    orphaned: HashSet<PlaceId>,
}

impl MarkerSynchronizer {
    pub fn new(map: Arc<dyn MapSurface>) -> Self {
        Self {
            map,
            markers: HashMap::new(),
            places: HashMap::new(),
            orphaned: HashSet::new(),
        }
    }

    /// Make the marker set consistent with `places`.
    pub fn reconcile(&mut self, places: &mut [Place]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for place in places.iter_mut() {
            if self.markers.contains_key(&place.id) {
                continue;
            }
            if !place.is_resolved() {
                report.deferred += 1;
                continue;
            }
            self.materialize(place);
            report.created.push(place.id);
        }

        let present: HashSet<PlaceId> = places.iter().map(|p| p.id).collect();
        for (id, handle) in &self.markers {
            if !present.contains(id) && self.orphaned.insert(*id) {
                self.map.set_visible(*handle, false);
                report.hidden.push(*id);
            }
        }

        if !report.created.is_empty() || !report.hidden.is_empty() {
            tracing::debug!(
                "Reconciled markers: {} created, {} hidden, {} deferred",
                report.created.len(),
                report.hidden.len(),
                report.deferred
            );
        }
        report
    }

    /// Create the marker for a resolved place and bind it to the place's fields.
    fn materialize(&mut self, place: &mut Place) {
        let handle = self.map.create_marker(MarkerOptions {
            title: place.display_name().to_string(),
            position: *place.position.get(),
            icon: *place.icon.get(),
            info_content: place.info_content.get().clone(),
            visible: place.visible(),
        });

        let map = Arc::clone(&self.map);
        place.title.subscribe(move |title| map.set_title(handle, title));
        let map = Arc::clone(&self.map);
        place
            .position
            .subscribe(move |position| map.set_position(handle, *position));
        let map = Arc::clone(&self.map);
        place.icon.subscribe(move |icon| map.set_icon(handle, *icon));
        let map = Arc::clone(&self.map);
        place
            .info_content
            .subscribe(move |content| map.set_info_content(handle, content));

        self.markers.insert(place.id, handle);
        self.places.insert(handle, place.id);
        tracing::debug!("Created marker {:?} for {}", handle, place.name);
    }

    /// Show or hide the marker of `place`, if it has one.
    pub fn set_visible(&self, place: PlaceId, visible: bool) {
        if let Some(handle) = self.markers.get(&place) {
            self.map.set_visible(*handle, visible);
        }
    }

    pub fn marker_for(&self, place: PlaceId) -> Option<MarkerHandle> {
        self.markers.get(&place).copied()
    }

    pub fn place_for(&self, marker: MarkerHandle) -> Option<PlaceId> {
        self.places.get(&marker).copied()
    }

    /// Number of mapping records.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
