//! The demo road network: one signalised crossing.
//!
//! ```text
//!              N
//!              │ n_in
//!   W ──w_in── C ──c_e── E
//!              │ c_s
//!              S
//! ```
//!
//! Light `C` serves `w_in` and `n_in` alternately, 30 s each.

use tc_core::EdgeId;
use tc_engine::{LightDef, MemoryNetwork, MemoryNetworkBuilder};

/// Urban speed limit, m/s (50 km/h).
const SPEED_LIMIT: f64 = 13.9;

pub fn build_network() -> MemoryNetwork {
    let mut b = MemoryNetworkBuilder::new();

    let west   = b.add_node(0.0, 0.0);
    let centre = b.add_node(400.0, 0.0);
    let east   = b.add_node(800.0, 0.0);
    let north  = b.add_node(400.0, 300.0);
    let south  = b.add_node(400.0, -300.0);

    b.add_edge("w_in", west, centre, SPEED_LIMIT);
    b.add_edge("c_e", centre, east, SPEED_LIMIT);
    b.add_edge("n_in", north, centre, SPEED_LIMIT);
    b.add_edge("c_s", centre, south, SPEED_LIMIT);

    // Link 0 = w_in, link 1 = n_in.
    b.add_light(
        LightDef::new("C", vec![EdgeId::from("w_in"), EdgeId::from("n_in")])
            .with_phase("Gr", 30.0)
            .with_phase("rG", 30.0),
    );
    b.build()
}
