//! Unit tests for tc-engine.

use tc_core::{EdgeId, LightId, RouteId, VehicleId, VehicleTypeId};

use crate::{
    EngineError, LightDef, Lookup, MemoryEngine, MemoryNetwork, MemoryNetworkBuilder, SimEngine,
    VehicleSpawn,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Straight corridor: `in` (0,0)→(100,0), `out` (100,0)→(200,0), 10 m/s.
/// With the default 0.1 s step a vehicle covers exactly 1 m per step.
fn corridor(light: Option<LightDef>) -> MemoryNetwork {
    let mut b = MemoryNetworkBuilder::new();
    let w = b.add_node(0.0, 0.0);
    let c = b.add_node(100.0, 0.0);
    let e = b.add_node(200.0, 0.0);
    b.add_edge("in", w, c, 10.0);
    b.add_edge("out", c, e, 10.0);
    if let Some(l) = light {
        b.add_light(l);
    }
    b.build()
}

fn started(net: MemoryNetwork) -> MemoryEngine {
    let mut eng = MemoryEngine::new(net);
    eng.start().unwrap();
    eng.add_route(&RouteId::from("r"), &[EdgeId::from("in"), EdgeId::from("out")]).unwrap();
    eng
}

fn spawn(id: &str, depart: f64) -> VehicleSpawn {
    VehicleSpawn::departing_at(
        VehicleId::from(id),
        RouteId::from("r"),
        VehicleTypeId::from("car"),
        depart,
    )
}

fn state(eng: &mut MemoryEngine, id: &str) -> crate::VehicleState {
    eng.vehicle_state(&VehicleId::from(id)).unwrap().found().unwrap()
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod types {
    use super::*;
    use crate::engine::format_depart;
    use crate::{PlacementHints, Position};

    #[test]
    fn depart_has_two_decimals() {
        assert_eq!(format_depart(0.0), "0.00");
        assert_eq!(format_depart(12.3), "12.30");
        assert_eq!(format_depart(7.456), "7.46");
    }

    #[test]
    fn default_hints() {
        let h = PlacementHints::default();
        assert_eq!(
            (h.depart_lane.as_str(), h.depart_pos.as_str(), h.depart_speed.as_str(), h.arrival_lane.as_str()),
            ("best", "random", "max", "current"),
        );
    }

    #[test]
    fn lookup_helpers() {
        assert_eq!(Lookup::Found(3).found(), Some(3));
        assert!(!Lookup::<u8>::NotFound.is_found());
    }

    #[test]
    fn position_lerp_and_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.lerp(b, 0.5), Position::new(1.5, 2.0));
    }

    #[test]
    fn only_not_connected_is_transient() {
        assert!(EngineError::NotConnected.is_transient());
        assert!(!EngineError::AlreadyStarted.is_transient());
        assert!(!EngineError::UnknownRoute(RouteId::from("x")).is_transient());
    }
}

// ── Network ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod network {
    use super::*;

    #[test]
    fn edge_lengths_from_geometry() {
        let net = corridor(None);
        assert_eq!(net.edge_count(), 2);
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge(&EdgeId::from("out")).unwrap().length_m, 100.0);
    }

    #[test]
    fn explicit_length_overrides_geometry() {
        let mut b = MemoryNetworkBuilder::new();
        let a = b.add_node(0.0, 0.0);
        let z = b.add_node(10.0, 0.0);
        b.add_edge_with_length("curvy", a, z, 42.0, 5.0);
        assert_eq!(b.build().edge(&EdgeId::from("curvy")).unwrap().length_m, 42.0);
    }

    #[test]
    fn light_links_indexed_by_controlled_order() {
        let light = LightDef::new("J1", vec![EdgeId::from("out"), EdgeId::from("in")]).with_phase("Gr", 5.0);
        let net = corridor(Some(light));
        assert_eq!(net.signals[&EdgeId::from("in")], (LightId::from("J1"), 1));
        assert_eq!(net.signals[&EdgeId::from("out")], (LightId::from("J1"), 0));
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;

    #[test]
    fn calls_before_start_are_not_connected() {
        let mut eng = MemoryEngine::new(corridor(None));
        assert!(!eng.is_connected());
        assert!(matches!(eng.step(), Err(EngineError::NotConnected)));
        assert!(matches!(eng.time(), Err(EngineError::NotConnected)));
        assert!(matches!(eng.departed_ids(), Err(EngineError::NotConnected)));
    }

    #[test]
    fn double_start_rejected() {
        let mut eng = MemoryEngine::new(corridor(None));
        eng.start().unwrap();
        assert!(matches!(eng.start(), Err(EngineError::AlreadyStarted)));
    }

    #[test]
    fn injected_start_failure_is_one_shot() {
        let mut eng = MemoryEngine::new(corridor(None));
        eng.fail_next_start("no binary");
        assert!(matches!(eng.start(), Err(EngineError::Start(msg)) if msg == "no binary"));
        assert!(!eng.is_connected());
        eng.start().unwrap();
    }

    #[test]
    fn step_advances_clock() {
        let mut eng = started(corridor(None));
        for _ in 0..5 {
            eng.step().unwrap();
        }
        assert!((eng.time().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn close_is_idempotent_and_resets_session() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        eng.step().unwrap();
        eng.close().unwrap();
        eng.close().unwrap();
        eng.start().unwrap();
        assert_eq!(eng.running_count(), 0);
        assert_eq!(eng.time().unwrap(), 0.0);
        assert!(!eng.has_route(&RouteId::from("r")));
    }

    #[test]
    fn disconnect_keeps_state_until_restart() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        eng.step().unwrap();
        eng.disconnect();
        assert!(matches!(eng.vehicle_state(&VehicleId::from("v")), Err(EngineError::NotConnected)));
        assert_eq!(eng.running_count(), 1);
    }
}

// ── Routes and vehicles ───────────────────────────────────────────────────────

#[cfg(test)]
mod vehicles {
    use super::*;

    #[test]
    fn duplicate_route_rejected() {
        let mut eng = started(corridor(None));
        let err = eng.add_route(&RouteId::from("r"), &[EdgeId::from("in")]).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateRoute(_)));
    }

    #[test]
    fn route_with_unknown_edge_rejected() {
        let mut eng = started(corridor(None));
        let err = eng.add_route(&RouteId::from("bad"), &[EdgeId::from("in"), EdgeId::from("nope")]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownEdge(_, e) if e.as_str() == "nope"));
    }

    #[test]
    fn vehicle_on_unknown_route_rejected() {
        let mut eng = started(corridor(None));
        let mut s = spawn("v", 0.0);
        s.route = RouteId::from("ghost");
        assert!(matches!(eng.add_vehicle(&s), Err(EngineError::UnknownRoute(_))));
        assert_eq!(eng.add_vehicle_calls(), 1);
    }

    #[test]
    fn duplicate_vehicle_rejected() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        assert!(matches!(eng.add_vehicle(&spawn("v", 0.0)), Err(EngineError::DuplicateVehicle(_))));
    }

    #[test]
    fn malformed_depart_rejected() {
        let mut eng = started(corridor(None));
        let mut s = spawn("v", 0.0);
        s.depart = "soon".into();
        assert!(matches!(eng.add_vehicle(&s), Err(EngineError::InvalidDepart(_))));
    }

    #[test]
    fn vehicle_departs_and_moves() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        assert_eq!(eng.pending_count(), 1);
        assert_eq!(eng.vehicle_state(&VehicleId::from("v")).unwrap(), Lookup::NotFound);

        eng.step().unwrap();
        assert_eq!(eng.departed_ids().unwrap(), vec![VehicleId::from("v")]);
        let s = state(&mut eng, "v");
        assert_eq!(s.edge.as_str(), "in");
        assert!((s.speed - 10.0).abs() < 1e-9);
        assert!((s.position.x - 1.0).abs() < 1e-9);
        assert_eq!(s.route.unwrap().as_str(), "r");
        assert_eq!(s.vehicle_type.unwrap().as_str(), "car");

        eng.step().unwrap();
        assert!(eng.departed_ids().unwrap().is_empty());
    }

    #[test]
    fn future_depart_waits() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 1.0)).unwrap();
        for _ in 0..5 {
            eng.step().unwrap();
        }
        assert_eq!(eng.running_count(), 0);
        for _ in 0..10 {
            eng.step().unwrap();
        }
        assert_eq!(eng.running_count(), 1);
    }

    #[test]
    fn vehicle_arrives_exactly_once() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        let mut arrivals = 0;
        let mut saw_out = false;
        for _ in 0..300 {
            eng.step().unwrap();
            arrivals += eng.arrived_ids().unwrap().len();
            if let Lookup::Found(s) = eng.vehicle_state(&VehicleId::from("v")).unwrap() {
                saw_out |= s.edge.as_str() == "out";
            }
        }
        assert_eq!(arrivals, 1);
        assert!(saw_out);
        assert_eq!(eng.running_count(), 0);
        assert_eq!(eng.vehicle_state(&VehicleId::from("v")).unwrap(), Lookup::NotFound);
    }

    #[test]
    fn forgotten_vehicle_is_not_found_without_arrival() {
        let mut eng = started(corridor(None));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        eng.step().unwrap();
        assert!(eng.forget_vehicle(&VehicleId::from("v")));
        eng.step().unwrap();
        assert!(eng.arrived_ids().unwrap().is_empty());
        assert_eq!(eng.vehicle_state(&VehicleId::from("v")).unwrap(), Lookup::NotFound);
    }

    #[test]
    fn edge_length_lookup() {
        let mut eng = started(corridor(None));
        assert_eq!(eng.edge_length(&EdgeId::from("in")).unwrap(), Lookup::Found(100.0));
        assert_eq!(eng.edge_length(&EdgeId::from("zz")).unwrap(), Lookup::NotFound);
    }

    #[test]
    fn teleport_reports_optional() {
        let mut eng = started(corridor(None));
        assert!(eng.teleport_start_ids().unwrap().is_empty());

        let mut bare = MemoryEngine::new(corridor(None)).with_teleport_reports(false);
        bare.start().unwrap();
        assert!(matches!(bare.teleport_start_ids(), Err(EngineError::Unsupported(_))));
        assert!(matches!(bare.teleport_end_ids(), Err(EngineError::Unsupported(_))));
    }
}

// ── Traffic lights ────────────────────────────────────────────────────────────

#[cfg(test)]
mod lights {
    use super::*;

    fn j1() -> LightId {
        LightId::from("J1")
    }

    /// J1 holds `in` red for a long time, then green.
    fn long_red() -> LightDef {
        LightDef::new("J1", vec![EdgeId::from("in")])
            .with_phase("r", 1_000.0)
            .with_phase("G", 1_000.0)
    }

    #[test]
    fn phases_cycle_by_duration() {
        let light = LightDef::new("J1", vec![EdgeId::from("in")]).with_phase("r", 1.0).with_phase("G", 1.0);
        let mut eng = started(corridor(Some(light)));
        assert_eq!(eng.light_phase(&j1()).unwrap(), 0);
        for _ in 0..10 {
            eng.step().unwrap();
        }
        assert_eq!(eng.light_phase(&j1()).unwrap(), 1);
        assert_eq!(eng.light_state(&j1()).unwrap(), "G");
        for _ in 0..10 {
            eng.step().unwrap();
        }
        assert_eq!(eng.light_phase(&j1()).unwrap(), 0);
    }

    #[test]
    fn red_holds_vehicle_at_stop_line() {
        let mut eng = started(corridor(Some(long_red())));
        eng.add_vehicle(&spawn("v", 0.0)).unwrap();
        for _ in 0..150 {
            eng.step().unwrap();
        }
        let s = state(&mut eng, "v");
        assert_eq!(s.edge.as_str(), "in");
        assert_eq!(s.speed, 0.0);
        assert!((s.position.x - 100.0).abs() < 1e-9);

        eng.set_light_phase(&j1(), 1).unwrap();
        eng.step().unwrap();
        let s = state(&mut eng, "v");
        assert_eq!(s.edge.as_str(), "out");
        assert!(s.speed > 0.0);
    }

    #[test]
    fn set_phase_out_of_range() {
        let mut eng = started(corridor(Some(long_red())));
        assert!(matches!(eng.set_light_phase(&j1(), 2), Err(EngineError::InvalidPhase { .. })));
        assert!(matches!(
            eng.set_light_phase(&LightId::from("nope"), 0),
            Err(EngineError::UnknownLight(_))
        ));
    }

    #[test]
    fn state_override_until_phase_change() {
        let mut eng = started(corridor(Some(long_red())));
        assert!(matches!(eng.set_light_state(&j1(), "GG"), Err(EngineError::InvalidPhase { .. })));
        eng.set_light_state(&j1(), "g").unwrap();
        assert_eq!(eng.light_state(&j1()).unwrap(), "g");
        eng.set_light_phase(&j1(), 0).unwrap();
        assert_eq!(eng.light_state(&j1()).unwrap(), "r");
    }

    #[test]
    fn program_switch_resets_phase() {
        let mut eng = started(corridor(Some(long_red().with_program("day"))));
        assert_eq!(eng.light_program(&j1()).unwrap(), "day");
        eng.set_light_phase(&j1(), 1).unwrap();
        eng.set_light_program(&j1(), "night").unwrap();
        assert_eq!(eng.light_program(&j1()).unwrap(), "night");
        assert_eq!(eng.light_phase(&j1()).unwrap(), 0);
    }

    #[test]
    fn light_ids_listed() {
        let mut eng = started(corridor(Some(long_red())));
        assert_eq!(eng.light_ids().unwrap(), vec![j1()]);
    }

    #[test]
    fn invalid_durations_stored_as_zero() {
        let light = LightDef::new("J1", vec![EdgeId::from("in")])
            .with_phase("r", f64::NAN)
            .with_phase("G", f64::INFINITY)
            .with_phase("y", -3.0);
        let durations: Vec<f64> = light.phases.iter().map(|(_, d)| *d).collect();
        assert_eq!(durations, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn nan_phase_does_not_stall_step() {
        let mut light = LightDef::new("J1", vec![EdgeId::from("in")]).with_phase("G", 1.0);
        // Written directly so the builder's clamping is bypassed.
        light.phases.push(("r".to_owned(), f64::NAN));
        let mut eng = started(corridor(Some(light)));
        for _ in 0..30 {
            eng.step().unwrap();
        }
        assert!(eng.light_phase(&j1()).unwrap() < 2);
    }

    #[test]
    fn tiny_phases_advance_at_most_one_cycle_per_step() {
        let light = LightDef::new("J1", vec![EdgeId::from("in")])
            .with_phase("r", 1e-9)
            .with_phase("G", 1e-9)
            .with_phase("y", 1e-9);
        let mut eng = started(corridor(Some(light)));
        eng.step().unwrap();
        assert_eq!(eng.light_phase(&j1()).unwrap(), 0);
        eng.step().unwrap();
        assert_eq!(eng.light_phase(&j1()).unwrap(), 0);
    }
}
