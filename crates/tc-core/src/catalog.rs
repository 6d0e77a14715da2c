//! The route catalog: every route the controller may spawn vehicles on.
//!
//! A catalog is built once at startup (in code or from CSV via
//! [`load_routes_reader`][crate::load_routes_reader]) and then shared
//! read-only behind an `Arc`.  Nothing mutates it after construction, so
//! there is no lazy initialisation and no locking.

use crate::{CoreError, CoreResult, EdgeId, RouteId, SimRng};

/// One spawnable route.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteInfo {
    /// ID registered with the engine via `add_route`.
    pub id: RouteId,
    /// Edges in travel order.
    pub edges: Vec<EdgeId>,
    /// Human-readable label ("Route 1", "Route 2", … by default).
    pub display_name: String,
}

impl RouteInfo {
    pub fn new(id: impl Into<RouteId>, edges: Vec<EdgeId>) -> Self {
        Self { id: id.into(), edges, display_name: String::new() }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// Immutable, ordered list of [`RouteInfo`]s.
#[derive(Clone, Debug, Default)]
pub struct RouteCatalog {
    routes: Vec<RouteInfo>,
}

impl RouteCatalog {
    /// A catalog with no routes.  Load generators treat every tick as a
    /// no-op against it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog, rejecting duplicate IDs.
    ///
    /// Routes with a blank display name are labelled `"Route N"` where `N` is
    /// the 1-based position in the catalog.
    pub fn new(routes: Vec<RouteInfo>) -> CoreResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(routes.len());
        let mut out = Vec::with_capacity(routes.len());
        for (i, mut route) in routes.into_iter().enumerate() {
            if !seen.insert(route.id.clone()) {
                return Err(CoreError::DuplicateRoute(route.id));
            }
            if route.display_name.trim().is_empty() {
                route.display_name = format!("Route {}", i + 1);
            }
            out.push(route);
        }
        Ok(Self { routes: out })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    pub fn get(&self, index: usize) -> Option<&RouteInfo> {
        self.routes.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&RouteInfo> {
        self.routes.iter().find(|r| r.id.as_str() == id)
    }

    /// A uniformly random route, or `None` if the catalog is empty.
    pub fn choose(&self, rng: &mut SimRng) -> Option<&RouteInfo> {
        rng.choose(&self.routes)
    }
}
