use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::map::{MarkerHandle, MarkerState};
use crate::models::{MapView, PlaceId, PlaceView};
use crate::view_model::{ViewModel, ViewModelError};

// ============================================================
// Error Handling
// ============================================================

/// Map a view-model error to a status the client can act on.
fn vm_error(e: ViewModelError) -> (StatusCode, String) {
    let status = match e {
        ViewModelError::PlaceNotFound(_) | ViewModelError::MarkerNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ViewModelError::NoMarker(_) => StatusCode::CONFLICT,
        ViewModelError::MissingExternalId(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!("Rejected request: {}", e);
    (status, e.to_string())
}

fn lock(state: &AppState) -> std::sync::MutexGuard<'_, ViewModel> {
    state.vm.lock().expect("view model lock poisoned")
}

// ============================================================
// Bodies
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterBody {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoverInput {
    pub hovered: bool,
}

/// The open detail panel, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelResponse {
    pub place_id: Option<PlaceId>,
    pub marker: Option<MarkerHandle>,
}

#[derive(Debug, Deserialize)]
pub struct ListPlacesQuery {
    /// Only return places that pass the current filter.
    #[serde(default)]
    pub visible: bool,
}

fn panel(vm: &ViewModel) -> PanelResponse {
    let place_id = vm.open_panel_place();
    PanelResponse {
        place_id,
        marker: place_id.and_then(|id| vm.marker_for(id)),
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Places
// ============================================================

pub async fn list_places(
    State(state): State<AppState>,
    Query(query): Query<ListPlacesQuery>,
) -> Json<Vec<PlaceView>> {
    let vm = lock(&state);
    if query.visible {
        Json(vm.visible_views())
    } else {
        Json(vm.views())
    }
}

pub async fn get_place(
    State(state): State<AppState>,
    Path(id): Path<PlaceId>,
) -> Result<Json<PlaceView>, (StatusCode, String)> {
    lock(&state)
        .place(id)
        .map(|p| Json(p.view()))
        .ok_or((StatusCode::NOT_FOUND, "Place not found".to_string()))
}

pub async fn select_place(
    State(state): State<AppState>,
    Path(id): Path<PlaceId>,
) -> Result<Json<PanelResponse>, (StatusCode, String)> {
    let mut vm = lock(&state);
    vm.select_place(id).map_err(vm_error)?;
    Ok(Json(panel(&vm)))
}

pub async fn hover_place(
    State(state): State<AppState>,
    Path(id): Path<PlaceId>,
    Json(input): Json<HoverInput>,
) -> Result<StatusCode, (StatusCode, String)> {
    lock(&state)
        .hover_place(id, input.hovered)
        .map_err(vm_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Filter
// ============================================================

pub async fn get_filter(State(state): State<AppState>) -> Json<FilterBody> {
    Json(FilterBody {
        text: lock(&state).filter().to_string(),
    })
}

/// Set the filter and return the places that remain visible.
pub async fn set_filter(
    State(state): State<AppState>,
    Json(input): Json<FilterBody>,
) -> Json<Vec<PlaceView>> {
    let mut vm = lock(&state);
    vm.set_filter(input.text);
    Json(vm.visible_views())
}

// ============================================================
// Markers
// ============================================================

pub async fn list_markers(State(state): State<AppState>) -> Json<Vec<MarkerState>> {
    Json(state.map.markers())
}

pub async fn click_marker(
    State(state): State<AppState>,
    Path(handle): Path<u64>,
) -> Result<Json<PanelResponse>, (StatusCode, String)> {
    let mut vm = lock(&state);
    vm.click_marker(MarkerHandle(handle)).map_err(vm_error)?;
    Ok(Json(panel(&vm)))
}

pub async fn hover_marker(
    State(state): State<AppState>,
    Path(handle): Path<u64>,
    Json(input): Json<HoverInput>,
) -> Result<StatusCode, (StatusCode, String)> {
    lock(&state)
        .hover_marker(MarkerHandle(handle), input.hovered)
        .map_err(vm_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Panel and map
// ============================================================

pub async fn get_panel(State(state): State<AppState>) -> Json<PanelResponse> {
    Json(panel(&lock(&state)))
}

pub async fn close_panel(State(state): State<AppState>) -> StatusCode {
    lock(&state).close_panel();
    StatusCode::NO_CONTENT
}

pub async fn get_map(State(state): State<AppState>) -> Json<MapView> {
    Json(state.map.view())
}
