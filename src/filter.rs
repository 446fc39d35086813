//! Free-text place filter.

use crate::models::Place;

/// Case-insensitive substring match of `filter` in `display_name`.
/// An empty filter matches everything.
pub fn matches(filter: &str, display_name: &str) -> bool {
    filter.is_empty() || display_name.to_uppercase().contains(&filter.to_uppercase())
}

/// Recompute `visible` for each place. Returns the places whose visibility
/// changed, as (index, now visible).
pub fn apply(filter: &str, places: &mut [Place]) -> Vec<(usize, bool)> {
    places
        .iter_mut()
        .enumerate()
        .filter_map(|(i, place)| {
            let visible = matches(filter, place.display_name());
            place.set_visible(visible).then_some((i, visible))
        })
        .collect()
}
