mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::map::InMemoryMap;
use crate::view_model::SharedViewModel;

pub use handlers::{FilterBody, HoverInput, PanelResponse};

/// State shared by all handlers: the view-model and the map it renders onto.
#[derive(Clone)]
pub struct AppState {
    pub vm: SharedViewModel,
    pub map: Arc<InMemoryMap>,
}

pub fn create_router(vm: SharedViewModel, map: Arc<InMemoryMap>) -> Router {
    let api = Router::new()
        // Places
        .route("/places", get(handlers::list_places))
        .route("/places/{id}", get(handlers::get_place))
        .route("/places/{id}/select", post(handlers::select_place))
        .route("/places/{id}/hover", put(handlers::hover_place))
        // Filter
        .route("/filter", get(handlers::get_filter))
        .route("/filter", put(handlers::set_filter))
        // Markers
        .route("/markers", get(handlers::list_markers))
        .route("/markers/{handle}/click", post(handlers::click_marker))
        .route("/markers/{handle}/hover", put(handlers::hover_marker))
        // Panel and map
        .route("/panel", get(handlers::get_panel).delete(handlers::close_panel))
        .route("/map", get(handlers::get_map))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { vm, map })
}
