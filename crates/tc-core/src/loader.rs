//! CSV route catalog loader.
//!
//! # CSV format
//!
//! One row per route.  `edges` is a whitespace-separated edge list;
//! `display_name` may be omitted or left empty.
//!
//! ```csv
//! route_id,edges,display_name
//! r_main,e0 e1 e2,Main street
//! r_side,e3 e4,
//! ```
//!
//! Rows with a blank `route_id` or no edges are skipped, matching how the
//! engine's own route files tolerate incomplete vehicle entries.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{CoreError, CoreResult, EdgeId, RouteCatalog, RouteInfo};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RouteRecord {
    route_id:     String,
    edges:        String,
    #[serde(default)]
    display_name: String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`RouteCatalog`] from a CSV file.
pub fn load_routes_csv(path: &Path) -> CoreResult<RouteCatalog> {
    let file = std::fs::File::open(path)?;
    load_routes_reader(file)
}

/// Like [`load_routes_csv`] but accepts any `Read` source.
///
/// Useful for testing (pass a `std::io::Cursor`) or embedding a catalog in a
/// binary.
pub fn load_routes_reader<R: Read>(reader: R) -> CoreResult<RouteCatalog> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut routes = Vec::new();
    for result in csv_reader.deserialize::<RouteRecord>() {
        let row = result.map_err(|e| CoreError::Parse(e.to_string()))?;
        if row.route_id.is_empty() {
            continue;
        }
        let edges = split_edges(&row.edges);
        if edges.is_empty() {
            continue;
        }
        routes.push(RouteInfo::new(row.route_id, edges).with_display_name(row.display_name));
    }

    RouteCatalog::new(routes)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// `"a b  c"` → `[a, b, c]`
fn split_edges(s: &str) -> Vec<EdgeId> {
    s.split_whitespace().map(EdgeId::from).collect()
}
