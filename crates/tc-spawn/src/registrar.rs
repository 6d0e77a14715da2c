//! One-time registration of catalog routes with the engine.
//!
//! Routes must exist in the engine before the first vehicle is added on
//! them.  The registrar registers the whole catalog on the first call of an
//! engine session and is a no-op afterwards.  Closing the engine forgets its
//! routes, so the controller calls [`RouteRegistrar::reset`] on shutdown.

use tracing::{debug, info, warn};

use tc_core::RouteCatalog;
use tc_engine::{EngineError, SimEngine};

use crate::SpawnResult;

#[derive(Debug, Default)]
pub struct RouteRegistrar {
    registered: bool,
}

impl RouteRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Register every catalog route unless that already happened.
    ///
    /// A route the engine already knows counts as registered.  A route the
    /// engine rejects for any other reason is logged and skipped; vehicles
    /// queued on it will be rejected at `add_vehicle`.  If the engine is
    /// unreachable nothing is marked and the next call starts over.
    pub fn ensure<E: SimEngine>(&mut self, engine: &mut E, catalog: &RouteCatalog) -> SpawnResult<()> {
        if self.registered {
            return Ok(());
        }
        let mut added = 0usize;
        for route in catalog.routes() {
            match engine.add_route(&route.id, &route.edges) {
                Ok(()) => added += 1,
                Err(EngineError::DuplicateRoute(id)) => {
                    debug!(route = %id, "route already registered");
                }
                Err(e) if e.is_transient() => return Err(e.into()),
                Err(e) => warn!(route = %route.id, error = %e, "engine rejected route"),
            }
        }
        self.registered = true;
        info!(added, catalog = catalog.len(), "registered routes");
        Ok(())
    }

    /// Forget that routes were registered (new engine session).
    pub fn reset(&mut self) {
        self.registered = false;
    }
}
