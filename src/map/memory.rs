use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{MapSurface, MarkerHandle, MarkerOptions};
use crate::models::{LatLng, MapView, MarkerIcon};

/// A rendered marker as the surface currently shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerState {
    pub handle: MarkerHandle,
    pub title: String,
    pub position: LatLng,
    pub icon: MarkerIcon,
    pub info_content: String,
    pub visible: bool,
    pub panel_open: bool,
}

#[derive(Debug, Default)]
struct MapState {
    view: MapView,
    markers: Vec<MarkerState>,
    open_panels: Vec<MarkerHandle>,
}

impl MapState {
    fn marker_mut(&mut self, handle: MarkerHandle) -> Option<&mut MarkerState> {
        let marker = self.markers.get_mut(handle.0 as usize);
        if marker.is_none() {
            tracing::warn!("Unknown marker handle {:?}", handle);
        }
        marker
    }
}

/// Headless map surface that keeps marker state in memory.
///
/// Handles are indices into the marker list, so they are assigned in
/// creation order starting at zero.
#[derive(Debug, Default)]
pub struct InMemoryMap {
    state: Mutex<MapState>,
}

impl InMemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> Vec<MarkerState> {
        self.state.lock().expect("map lock poisoned").markers.clone()
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<MarkerState> {
        let state = self.state.lock().expect("map lock poisoned");
        state.markers.get(handle.0 as usize).cloned()
    }

    pub fn view(&self) -> MapView {
        self.state.lock().expect("map lock poisoned").view
    }

    /// Markers whose detail panel is open, in opening order.
    pub fn open_panels(&self) -> Vec<MarkerHandle> {
        self.state
            .lock()
            .expect("map lock poisoned")
            .open_panels
            .clone()
    }
}

impl MapSurface for InMemoryMap {
    fn init(&self, view: MapView) {
        let mut state = self.state.lock().expect("map lock poisoned");
        state.view = view;
    }

    fn create_marker(&self, options: MarkerOptions) -> MarkerHandle {
        let mut state = self.state.lock().expect("map lock poisoned");
        let handle = MarkerHandle(state.markers.len() as u64);
        state.markers.push(MarkerState {
            handle,
            title: options.title,
            position: options.position,
            icon: options.icon,
            info_content: options.info_content,
            visible: options.visible,
            panel_open: false,
        });
        handle
    }

    fn set_visible(&self, marker: MarkerHandle, visible: bool) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.visible = visible;
        }
    }

    fn set_position(&self, marker: MarkerHandle, position: LatLng) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.position = position;
        }
    }

    fn set_title(&self, marker: MarkerHandle, title: &str) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.title = title.to_string();
        }
    }

    fn set_icon(&self, marker: MarkerHandle, icon: MarkerIcon) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.icon = icon;
        }
    }

    fn set_info_content(&self, marker: MarkerHandle, content: &str) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.info_content = content.to_string();
        }
    }

    fn open_panel(&self, marker: MarkerHandle) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.panel_open = true;
            if !state.open_panels.contains(&marker) {
                state.open_panels.push(marker);
            }
        }
    }

    fn close_panel(&self, marker: MarkerHandle) {
        let mut state = self.state.lock().expect("map lock poisoned");
        if let Some(m) = state.marker_mut(marker) {
            m.panel_open = false;
            state.open_panels.retain(|h| *h != marker);
        }
    }

    fn pan_to(&self, position: LatLng) {
        let mut state = self.state.lock().expect("map lock poisoned");
        state.view.center = position;
    }
}
