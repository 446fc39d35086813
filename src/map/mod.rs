//! The map rendering surface.
//!
//! The surface owns the markers; the synchronizer only holds their handles.
//! Markers are shown and hidden but never destroyed.

mod memory;

pub use memory::*;

use serde::{Deserialize, Serialize};

use crate::models::{LatLng, MapView, MarkerIcon};

/// Opaque handle to a marker owned by a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerHandle(pub u64);

/// Initial state of a new marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub title: String,
    pub position: LatLng,
    pub icon: MarkerIcon,
    pub info_content: String,
    pub visible: bool,
}

/// A map that can render markers and one detail panel per marker.
///
/// Methods take `&self`: the surface is shared between the synchronizer and
/// the observers bound to each place, so implementations use interior
/// mutability.
pub trait MapSurface: Send + Sync {
    fn init(&self, view: MapView);

    fn create_marker(&self, options: MarkerOptions) -> MarkerHandle;

    fn set_visible(&self, marker: MarkerHandle, visible: bool);

    fn set_position(&self, marker: MarkerHandle, position: LatLng);

    fn set_title(&self, marker: MarkerHandle, title: &str);

    fn set_icon(&self, marker: MarkerHandle, icon: MarkerIcon);

    fn set_info_content(&self, marker: MarkerHandle, content: &str);

    fn open_panel(&self, marker: MarkerHandle);

    fn close_panel(&self, marker: MarkerHandle);

    fn pan_to(&self, position: LatLng);
}
