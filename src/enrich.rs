//! Enrichment pipeline.
//!
//! Each place gets a places lookup (staggered by list position, retried after
//! a fixed delay while rate limited) and an independent encyclopedia lookup
//! for its description. Results are written through the view-model, which
//! creates the marker once the external id is set.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::context::AppContext;
use crate::models::{PlaceId, PlaceSeed};
use crate::services::LookupError;
use crate::view_model::{SharedViewModel, ViewModel, ViewModelError};

/// Description used when the encyclopedia call itself fails.
pub const ARTICLE_FAILED_MESSAGE: &str = "Failed to load Wikipedia article.";

/// Description used when the encyclopedia has no usable article.
pub fn no_article_message(name: &str) -> String {
    format!("No Wikipedia article found for \"{}\".", name)
}

/// Timing of places lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentPolicy {
    /// Wait before re-sending a rate-limited lookup.
    pub retry_delay: Duration,
    /// Give up after this many rate-limited attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Start delay per list position.
    pub stagger: Duration,
}

impl Default for EnrichmentPolicy {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(2000),
            max_attempts: Some(10),
            stagger: Duration::from_millis(100),
        }
    }
}

/// How a places lookup for one place ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved,
    /// Someone else resolved the place first; nothing was written.
    AlreadyResolved,
    Failed,
    /// The place left the collection while the lookup was in flight.
    Detached,
}

/// Mark `id` failed; a place that already left the collection is `Detached`.
fn fail(vm: &mut ViewModel, id: PlaceId) -> Outcome {
    match vm.mark_failed(id) {
        Ok(()) => Outcome::Failed,
        Err(_) => Outcome::Detached,
    }
}

/// Run the places lookup for `id` until it resolves or fails.
pub async fn enrich_place(ctx: &AppContext, vm: &SharedViewModel, id: PlaceId) -> Outcome {
    loop {
        let request = {
            let mut vm = vm.lock().expect("view model lock poisoned");
            match vm.begin_lookup(id) {
                Ok(Some(request)) => request,
                Ok(None) => return Outcome::AlreadyResolved,
                Err(e) => {
                    tracing::debug!("Dropping lookup: {}", e);
                    return Outcome::Detached;
                }
            }
        };

        let result = ctx.places.lookup(&request.query).await;

        let settled = {
            let mut vm = vm.lock().expect("view model lock poisoned");
            match result {
                Ok(details) => Some(match vm.apply_details(id, details) {
                    Ok(true) => Outcome::Resolved,
                    Ok(false) => Outcome::AlreadyResolved,
                    Err(ViewModelError::MissingExternalId(_)) => {
                        tracing::error!("Lookup for {:?} returned no place id", request.query);
                        fail(&mut vm, id)
                    }
                    Err(e) => {
                        tracing::debug!("Dropping lookup result: {}", e);
                        Outcome::Detached
                    }
                }),
                Err(LookupError::RateLimited)
                    if ctx
                        .policy
                        .max_attempts
                        .is_some_and(|max| request.attempt >= max) =>
                {
                    tracing::warn!(
                        "Giving up on {:?} after {} rate-limited attempts",
                        request.query,
                        request.attempt
                    );
                    Some(fail(&mut vm, id))
                }
                Err(LookupError::RateLimited) => {
                    tracing::warn!(
                        "Rate limited looking up {:?} (attempt {}), retrying in {:?}",
                        request.query,
                        request.attempt,
                        ctx.policy.retry_delay
                    );
                    None
                }
                Err(e) => {
                    tracing::error!("Lookup for {:?} failed: {}", request.query, e);
                    Some(fail(&mut vm, id))
                }
            }
        };
        if let Some(outcome) = settled {
            return outcome;
        }

        tokio::time::sleep(ctx.policy.retry_delay).await;
    }
}

/// Fill in the description of `id` from the encyclopedia.
///
/// Named places are searched by their list name, coordinate places by their
/// display name.
pub async fn describe_place(ctx: &AppContext, vm: &SharedViewModel, id: PlaceId) {
    let title = {
        let vm = vm.lock().expect("view model lock poisoned");
        match vm.place(id) {
            Some(place) => match &place.seed {
                PlaceSeed::Named(name) => name.clone(),
                PlaceSeed::Coordinate(_) => place.display_name().to_string(),
            },
            None => return,
        }
    };

    let description = match ctx.encyclopedia.extract(&title).await {
        Ok(Some(extract)) => extract,
        Ok(None) => no_article_message(&title),
        Err(e) => {
            tracing::warn!("Encyclopedia lookup for {} failed: {}", title, e);
            ARTICLE_FAILED_MESSAGE.to_string()
        }
    };

    let mut vm = vm.lock().expect("view model lock poisoned");
    if let Err(e) = vm.set_description(id, description) {
        tracing::debug!("Dropping description: {}", e);
    }
}

/// Spawn enrichment for every unresolved place in the collection.
///
/// The places lookup of the place at position `i` starts after
/// `stagger * i`. Returned handles complete when each place settles.
pub fn spawn_enrichment(ctx: &AppContext, vm: &SharedViewModel) -> Vec<JoinHandle<()>> {
    let pending: Vec<(PlaceId, bool)> = {
        let vm = vm.lock().expect("view model lock poisoned");
        vm.places()
            .iter()
            .filter(|p| !p.is_resolved())
            .map(|p| (p.id, matches!(p.seed, PlaceSeed::Named(_))))
            .collect()
    };
    tracing::info!("Enriching {} places", pending.len());

    let mut handles = Vec::with_capacity(pending.len() * 2);
    for (index, (id, named)) in pending.into_iter().enumerate() {
        let delay = ctx.policy.stagger * index as u32;

        if named {
            let (ctx, vm) = (ctx.clone(), vm.clone());
            handles.push(tokio::spawn(async move {
                describe_place(&ctx, &vm, id).await;
            }));
        }

        let (ctx, vm) = (ctx.clone(), vm.clone());
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let outcome = enrich_place(&ctx, &vm, id).await;
            tracing::debug!("Places lookup for {} ended: {:?}", id, outcome);
            if !named && outcome == Outcome::Resolved {
                describe_place(&ctx, &vm, id).await;
            }
        }));
    }
    handles
}
