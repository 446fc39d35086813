//! Text rendering of the place list.

use crate::models::{EnrichmentStatus, PlaceView};

const UNRESOLVED: char = '◇';
const ENRICHING: char = '○';
const RESOLVED: char = '●';
const FAILED: char = '✗';

/// Get the status symbol for an enrichment status.
fn status_symbol(status: EnrichmentStatus) -> char {
    match status {
        EnrichmentStatus::Unresolved => UNRESOLVED,
        EnrichmentStatus::Enriching => ENRICHING,
        EnrichmentStatus::Resolved => RESOLVED,
        EnrichmentStatus::Failed => FAILED,
    }
}

/// Render the visible places as a list with status symbols.
///
/// Example output:
/// ```text
/// Places (filter: "peak")
/// ├── ● Victoria Peak  22.2759° N, 114.1455° E
/// │     Victoria Peak is a hill on the western half of Hong Kong Island.
/// └── ✗ Peak Tram
/// ```
pub fn render_list(places: &[PlaceView], filter: &str) -> String {
    let mut output = String::from("Places");
    if !filter.is_empty() {
        output.push_str(&format!(" (filter: \"{}\")", filter));
    }
    output.push('\n');

    let visible: Vec<&PlaceView> = places.iter().filter(|p| p.visible).collect();
    for (i, place) in visible.iter().enumerate() {
        let is_last = i == visible.len() - 1;
        render_place(&mut output, place, is_last);
    }
    output
}

fn render_place(output: &mut String, place: &PlaceView, is_last: bool) {
    let branch = if is_last { "└── " } else { "├── " };
    output.push_str(branch);
    output.push(status_symbol(place.status));
    output.push(' ');
    output.push_str(&place.display_name);
    if place.status == EnrichmentStatus::Resolved {
        output.push_str("  ");
        output.push_str(&place.coordinate);
    }
    output.push('\n');

    if !place.description.is_empty() {
        let continuation = if is_last { "    " } else { "│   " };
        output.push_str(continuation);
        output.push_str("  ");
        output.push_str(first_line(&place.description));
        output.push('\n');
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
