//! Domain models for the neighbourhood map.
//!
//! # Core Concepts
//!
//! - [`Place`]: A named place or bare coordinate the map tracks. Places are
//!   created when the place list loads, enriched in place by the lookup
//!   services, and hidden (never deleted) by the filter.
//! - [`LatLng`]: A WGS84 coordinate. Zero until a place is resolved, unless
//!   the list supplied it.
//! - [`MarkerIcon`]: The visual state of a place's marker, derived from the
//!   enrichment status and hover highlighting.
//! - [`PlaceView`]: A serializable snapshot of a place for the list view and
//!   the HTTP API.

mod coordinate;
mod place;

pub use coordinate::*;
pub use place::*;
