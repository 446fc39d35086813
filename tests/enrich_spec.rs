//! Enrichment pipeline tests.
//!
//! The places and encyclopedia services are scripted fakes; time is paused so
//! retry delays and stagger offsets are exact.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use neighbourhood_map::context::AppContext;
use neighbourhood_map::enrich::{
    describe_place, enrich_place, no_article_message, spawn_enrichment, EnrichmentPolicy,
    Outcome, ARTICLE_FAILED_MESSAGE,
};
use neighbourhood_map::map::InMemoryMap;
use neighbourhood_map::models::*;
use neighbourhood_map::services::*;
use neighbourhood_map::view_model::SharedViewModel;
use tokio::time::Instant;

// ============================================================
// Fakes
// ============================================================

/// One places request as the fake saw it.
struct Call {
    key: String,
    at: Instant,
    /// Marker titles on the map when the request was issued.
    titles_before: Vec<String>,
}

struct ScriptedPlaces {
    map: Arc<InMemoryMap>,
    script: Mutex<HashMap<String, VecDeque<Result<PlaceDetails, LookupError>>>>,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
}

impl ScriptedPlaces {
    fn new(map: Arc<InMemoryMap>) -> Self {
        Self {
            map,
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    fn script(&self, key: &str, responses: Vec<Result<PlaceDetails, LookupError>>) {
        self.script
            .lock()
            .unwrap()
            .insert(key.to_string(), responses.into());
    }

    fn calls_for(&self, key: &str) -> Vec<(Instant, Vec<String>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.key == key)
            .map(|c| (c.at, c.titles_before.clone()))
            .collect()
    }
}

fn found(key: &str) -> Result<PlaceDetails, LookupError> {
    found_as(key, key)
}

fn found_as(key: &str, display_name: &str) -> Result<PlaceDetails, LookupError> {
    Ok(PlaceDetails {
        external_id: format!("id-{}", key),
        position: LatLng::new(22.3, 114.1),
        display_name: display_name.to_string(),
        photo_url: Some(format!("http://photos/{}", key)),
    })
}

#[async_trait]
impl PlacesService for ScriptedPlaces {
    async fn lookup(&self, query: &PlaceQuery) -> Result<PlaceDetails, LookupError> {
        let key = match query {
            PlaceQuery::Name(name) => name.clone(),
            PlaceQuery::Coordinate(position) => position.to_string(),
        };
        self.calls.lock().unwrap().push(Call {
            key: key.clone(),
            at: Instant::now(),
            titles_before: self.map.markers().into_iter().map(|m| m.title).collect(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| found(&key))
    }
}

#[derive(Default)]
struct FakeWiki {
    articles: HashMap<String, Option<String>>,
    broken: bool,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Encyclopedia for FakeWiki {
    async fn extract(&self, title: &str) -> Result<Option<String>, ClientError> {
        self.calls.lock().unwrap().push(title.to_string());
        if self.broken {
            return Err(ClientError::Server("503 Service Unavailable: ".to_string()));
        }
        Ok(self.articles.get(title).cloned().flatten())
    }
}

// ============================================================
// Harness
// ============================================================

struct Harness {
    map: Arc<InMemoryMap>,
    places: Arc<ScriptedPlaces>,
    wiki: Arc<FakeWiki>,
    ctx: AppContext,
    vm: SharedViewModel,
}

fn harness_with(places: ScriptedPlaces, wiki: FakeWiki, policy: EnrichmentPolicy) -> Harness {
    let map = places.map.clone();
    let places = Arc::new(places);
    let wiki = Arc::new(wiki);
    let ctx = AppContext::new(map.clone(), places.clone(), wiki.clone(), policy);
    let vm = ctx.view_model();
    Harness {
        map,
        places,
        wiki,
        ctx,
        vm,
    }
}

fn harness() -> Harness {
    let map = Arc::new(InMemoryMap::new());
    harness_with(
        ScriptedPlaces::new(map),
        FakeWiki::default(),
        EnrichmentPolicy::default(),
    )
}

fn load(h: &Harness, names: &[&str]) -> Vec<PlaceId> {
    h.vm.lock()
        .unwrap()
        .load(names.iter().map(|n| PlaceSeed::Named(n.to_string())))
}

async fn settle(h: &Harness) {
    for handle in spawn_enrichment(&h.ctx, &h.vm) {
        handle.await.expect("enrichment task panicked");
    }
}

fn marker_titles(h: &Harness) -> Vec<String> {
    h.map.markers().into_iter().map(|m| m.title).collect()
}

// ============================================================
// Places lookup
// ============================================================

mod places_lookup {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rate_limit_then_success_creates_one_marker_after_second_response() {
        let h = harness();
        h.places.script(
            "Place A",
            vec![Err(LookupError::RateLimited), found("Place A")],
        );
        let ids = load(&h, &["Place A", "Place B"]);

        settle(&h).await;

        let calls = h.places.calls_for("Place A");
        assert_eq!(calls.len(), 2);
        assert!(calls[1].0 - calls[0].0 >= Duration::from_millis(2000));
        assert!(!calls[1].1.contains(&"Place A".to_string()));

        let titles = marker_titles(&h);
        assert_eq!(titles.iter().filter(|t| *t == "Place A").count(), 1);
        assert_eq!(titles.len(), 2);

        let vm = h.vm.lock().unwrap();
        let place = vm.place(ids[0]).unwrap();
        assert_eq!(place.external_id(), "id-Place A");
        assert_eq!(place.status(), EnrichmentStatus::Resolved);
        assert_eq!(place.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hard_failure_marks_place_failed_without_retry() {
        let h = harness();
        h.places.script(
            "Atlantis",
            vec![Err(LookupError::NotFound("Atlantis".to_string()))],
        );
        let ids = load(&h, &["Atlantis"]);

        let outcome = enrich_place(&h.ctx, &h.vm, ids[0]).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(h.places.calls_for("Atlantis").len(), 1);
        assert!(h.map.markers().is_empty());
        let vm = h.vm.lock().unwrap();
        let place = vm.place(ids[0]).unwrap();
        assert_eq!(place.status(), EnrichmentStatus::Failed);
        assert_eq!(*place.icon.get(), MarkerIcon::Warning);
        assert!(!place.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_stop_at_the_cap() {
        let map = Arc::new(InMemoryMap::new());
        let places = ScriptedPlaces::new(map);
        places.script(
            "Busy",
            (0..5).map(|_| Err(LookupError::RateLimited)).collect(),
        );
        let policy = EnrichmentPolicy {
            max_attempts: Some(3),
            ..EnrichmentPolicy::default()
        };
        let h = harness_with(places, FakeWiki::default(), policy);
        let ids = load(&h, &["Busy"]);

        let outcome = enrich_place(&h.ctx, &h.vm, ids[0]).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(h.places.calls_for("Busy").len(), 3);
        assert!(h.map.markers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_policy_keeps_retrying_until_success() {
        let map = Arc::new(InMemoryMap::new());
        let places = ScriptedPlaces::new(map);
        let mut responses: Vec<_> = (0..12).map(|_| Err(LookupError::RateLimited)).collect();
        responses.push(found("Busy"));
        places.script("Busy", responses);
        let policy = EnrichmentPolicy {
            max_attempts: None,
            ..EnrichmentPolicy::default()
        };
        let h = harness_with(places, FakeWiki::default(), policy);
        let ids = load(&h, &["Busy"]);

        let outcome = enrich_place(&h.ctx, &h.vm, ids[0]).await;

        assert_eq!(outcome, Outcome::Resolved);
        assert_eq!(h.places.calls_for("Busy").len(), 13);
        assert_eq!(marker_titles(&h), vec!["Busy".to_string()]);
        let vm = h.vm.lock().unwrap();
        let place = vm.place(ids[0]).unwrap();
        assert_eq!(place.status(), EnrichmentStatus::Resolved);
        assert_eq!(place.attempts(), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn removal_during_last_rate_limited_attempt_is_detached() {
        let map = Arc::new(InMemoryMap::new());
        let mut places = ScriptedPlaces::new(map);
        places.latency = Duration::from_millis(50);
        places.script("Busy", vec![Err(LookupError::RateLimited)]);
        let policy = EnrichmentPolicy {
            max_attempts: Some(1),
            ..EnrichmentPolicy::default()
        };
        let h = harness_with(places, FakeWiki::default(), policy);
        let ids = load(&h, &["Busy"]);

        let task = {
            let (ctx, vm, id) = (h.ctx.clone(), h.vm.clone(), ids[0]);
            tokio::spawn(async move { enrich_place(&ctx, &vm, id).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.vm.lock().unwrap().remove_place(ids[0]).unwrap();

        assert_eq!(task.await.unwrap(), Outcome::Detached);
        assert_eq!(h.places.calls_for("Busy").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_without_external_id_fails_the_place() {
        let h = harness();
        h.places.script(
            "Place A",
            vec![Ok(PlaceDetails {
                external_id: String::new(),
                position: LatLng::new(22.3, 114.1),
                display_name: "Renamed".to_string(),
                photo_url: None,
            })],
        );
        let ids = load(&h, &["Place A"]);

        let outcome = enrich_place(&h.ctx, &h.vm, ids[0]).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(h.places.calls_for("Place A").len(), 1);
        assert!(h.map.markers().is_empty());
        let vm = h.vm.lock().unwrap();
        let place = vm.place(ids[0]).unwrap();
        assert_eq!(place.status(), EnrichmentStatus::Failed);
        assert_eq!(place.display_name(), "Place A");
        assert!(!place.is_resolved());
        assert_eq!(vm.marker_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_retries_yield_a_single_marker() {
        let h = harness();
        h.places.script(
            "Place A",
            vec![
                Err(LookupError::RateLimited),
                Err(LookupError::RateLimited),
                found("Place A"),
                found("Place A"),
            ],
        );
        let ids = load(&h, &["Place A"]);

        let (first, second) = tokio::join!(
            enrich_place(&h.ctx, &h.vm, ids[0]),
            enrich_place(&h.ctx, &h.vm, ids[0])
        );

        let outcomes = [first, second];
        assert_eq!(
            outcomes.iter().filter(|o| **o == Outcome::Resolved).count(),
            1
        );
        assert!(outcomes.contains(&Outcome::AlreadyResolved));
        assert_eq!(h.map.markers().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resolved_place_is_not_looked_up_again() {
        let h = harness();
        let ids = load(&h, &["Place A"]);

        assert_eq!(enrich_place(&h.ctx, &h.vm, ids[0]).await, Outcome::Resolved);
        assert_eq!(
            enrich_place(&h.ctx, &h.vm, ids[0]).await,
            Outcome::AlreadyResolved
        );
        assert_eq!(h.places.calls_for("Place A").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_start_staggered_by_position() {
        let h = harness();
        load(&h, &["First", "Second", "Third"]);
        let start = Instant::now();

        settle(&h).await;

        for (i, key) in ["First", "Second", "Third"].iter().enumerate() {
            let calls = h.places.calls_for(key);
            assert_eq!(calls.len(), 1);
            assert!(calls[0].0 - start >= Duration::from_millis(100 * i as u64));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn result_for_removed_place_is_dropped() {
        let map = Arc::new(InMemoryMap::new());
        let mut places = ScriptedPlaces::new(map);
        places.latency = Duration::from_millis(50);
        let h = harness_with(places, FakeWiki::default(), EnrichmentPolicy::default());
        let ids = load(&h, &["Place A"]);

        let task = {
            let (ctx, vm, id) = (h.ctx.clone(), h.vm.clone(), ids[0]);
            tokio::spawn(async move { enrich_place(&ctx, &vm, id).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.vm.lock().unwrap().remove_place(ids[0]).unwrap();

        assert_eq!(task.await.unwrap(), Outcome::Detached);
        assert!(h.map.markers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resolved_places_have_markers_and_only_they_do() {
        let h = harness();
        h.places.script(
            "Nowhere",
            vec![Err(LookupError::Rejected("INVALID_REQUEST".to_string()))],
        );
        h.places.script(
            "Later",
            vec![Err(LookupError::RateLimited), found("Later")],
        );
        load(&h, &["Victoria Peak", "Nowhere", "Later", "Lion Rock"]);

        settle(&h).await;

        let vm = h.vm.lock().unwrap();
        for place in vm.places() {
            assert_eq!(place.is_resolved(), vm.marker_for(place.id).is_some());
        }
        assert_eq!(vm.marker_count(), 3);
        assert_eq!(h.map.markers().len(), 3);
    }
}

// ============================================================
// Encyclopedia lookup
// ============================================================

mod descriptions {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn missing_article_uses_not_found_message() {
        let h = harness();
        let ids = load(&h, &["Place A", "Place B"]);

        describe_place(&h.ctx, &h.vm, ids[1]).await;

        let vm = h.vm.lock().unwrap();
        let description = vm.place(ids[1]).unwrap().description().to_string();
        assert_eq!(description, no_article_message("Place B"));
        assert!(description.contains("Place B"));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_uses_generic_message() {
        let map = Arc::new(InMemoryMap::new());
        let wiki = FakeWiki {
            broken: true,
            ..FakeWiki::default()
        };
        let h = harness_with(ScriptedPlaces::new(map), wiki, EnrichmentPolicy::default());
        let ids = load(&h, &["Place A"]);

        describe_place(&h.ctx, &h.vm, ids[0]).await;

        let vm = h.vm.lock().unwrap();
        assert_eq!(vm.place(ids[0]).unwrap().description(), ARTICLE_FAILED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn description_reaches_the_marker_panel() {
        let map = Arc::new(InMemoryMap::new());
        let wiki = FakeWiki {
            articles: HashMap::from([(
                "Victoria Peak".to_string(),
                Some("A hill on Hong Kong Island.".to_string()),
            )]),
            ..FakeWiki::default()
        };
        let h = harness_with(ScriptedPlaces::new(map), wiki, EnrichmentPolicy::default());
        load(&h, &["Victoria Peak"]);

        settle(&h).await;

        let markers = h.map.markers();
        assert_eq!(markers.len(), 1);
        assert!(markers[0]
            .info_content
            .contains("<p>A hill on Hong Kong Island.</p>"));
        assert!(markers[0]
            .info_content
            .contains("http://photos/Victoria Peak"));
    }

    #[tokio::test(start_paused = true)]
    async fn coordinate_places_are_described_by_resolved_name() {
        let map = Arc::new(InMemoryMap::new());
        let places = ScriptedPlaces::new(map);
        let coordinate = LatLng::new(22.313, 114.0413);
        places.script(
            &coordinate.to_string(),
            vec![found_as("disney", "Hong Kong Disneyland")],
        );
        let wiki = FakeWiki {
            articles: HashMap::from([(
                "Hong Kong Disneyland".to_string(),
                Some("A theme park.".to_string()),
            )]),
            ..FakeWiki::default()
        };
        let h = harness_with(places, wiki, EnrichmentPolicy::default());
        let ids = h
            .vm
            .lock()
            .unwrap()
            .load([PlaceSeed::Coordinate(coordinate)]);

        settle(&h).await;

        assert_eq!(
            *h.wiki.calls.lock().unwrap(),
            vec!["Hong Kong Disneyland".to_string()]
        );
        let vm = h.vm.lock().unwrap();
        let place = vm.place(ids[0]).unwrap();
        assert_eq!(place.display_name(), "Hong Kong Disneyland");
        assert_eq!(place.description(), "A theme park.");
    }
}
