//! Handles shared by the synchronizer and the enrichment pipeline.

use std::sync::Arc;

use crate::config::Config;
use crate::enrich::EnrichmentPolicy;
use crate::map::MapSurface;
use crate::services::{Encyclopedia, GooglePlacesClient, PlacesService, WikipediaClient};
use crate::view_model::{SharedViewModel, ViewModel};

/// Built once at startup and cloned into each enrichment task.
#[derive(Clone)]
pub struct AppContext {
    pub map: Arc<dyn MapSurface>,
    pub places: Arc<dyn PlacesService>,
    pub encyclopedia: Arc<dyn Encyclopedia>,
    pub policy: EnrichmentPolicy,
}

impl AppContext {
    pub fn new(
        map: Arc<dyn MapSurface>,
        places: Arc<dyn PlacesService>,
        encyclopedia: Arc<dyn Encyclopedia>,
        policy: EnrichmentPolicy,
    ) -> Self {
        Self {
            map,
            places,
            encyclopedia,
            policy,
        }
    }

    /// Wire the HTTP service clients described by `config` to `map`.
    pub fn from_config(config: &Config, map: Arc<dyn MapSurface>) -> Self {
        let places = GooglePlacesClient::new(&config.places_url, config.places_api_key.clone());
        let encyclopedia = WikipediaClient::new(&config.encyclopedia_url);
        Self::new(
            map,
            Arc::new(places),
            Arc::new(encyclopedia),
            config.policy(),
        )
    }

    /// A fresh view-model rendering onto this context's map.
    pub fn view_model(&self) -> SharedViewModel {
        ViewModel::new(Arc::clone(&self.map)).shared()
    }
}
