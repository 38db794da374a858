//! Unit tests for tsc-session.

use std::thread;
use std::time::Duration;

use tsc_core::{IntersectionId, LaneId, PhaseIndex, RouteId, Tick, VehicleId};

use crate::{DemandPlan, Departure, MemoryEngine, MemoryNetwork, SessionConfig, SimulationEngine};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn tl() -> IntersectionId {
    IntersectionId::from("TL")
}

fn started(network: MemoryNetwork, demand: DemandPlan) -> MemoryEngine {
    let mut engine = MemoryEngine::new(network);
    engine.start(&SessionConfig::new("test", demand)).unwrap();
    engine
}

fn one_departure(route: &str, vehicle: &str, tick: u64) -> DemandPlan {
    DemandPlan::from_departures(vec![Departure {
        tick:    Tick(tick),
        vehicle: VehicleId::from(vehicle),
        route:   RouteId::from(route),
        vtype:   "standard_car".into(),
    }])
}

// ── DemandPlan ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod demand {
    use proptest::prelude::*;

    use super::*;

    fn routes(names: &[&str]) -> Vec<RouteId> {
        names.iter().map(|n| RouteId::from(*n)).collect()
    }

    #[test]
    fn same_seed_same_plan() {
        let s = routes(&["a", "b"]);
        let t = routes(&["c"]);
        let a = DemandPlan::generate(&s, &t, 200, 1000, 7);
        let b = DemandPlan::generate(&s, &t, 200, 1000, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
    }

    #[test]
    fn ramp_spans_the_run() {
        let plan = DemandPlan::generate(&routes(&["a"]), &[], 500, 3600, 1);
        let first = plan.departures().first().unwrap().tick;
        let last = plan.departures().last().unwrap().tick;
        assert_eq!(first, Tick(0));
        assert_eq!(last, Tick(3599));
    }

    #[test]
    fn roughly_three_quarters_straight() {
        let plan = DemandPlan::generate(&routes(&["s"]), &routes(&["t"]), 4000, 3600, 3);
        let straight = plan.departures().iter().filter(|d| d.route.as_str() == "s").count();
        let share = straight as f64 / plan.len() as f64;
        assert!((0.70..0.80).contains(&share), "straight share {share}");
    }

    #[test]
    fn internal_routes_never_used() {
        let plan = DemandPlan::generate(&routes(&["!hidden", "ok"]), &routes(&["!x"]), 300, 100, 9);
        assert!(plan.departures().iter().all(|d| d.route.as_str() == "ok"));
    }

    #[test]
    fn no_routes_no_demand() {
        assert!(DemandPlan::generate(&[], &[], 100, 100, 1).is_empty());
    }

    proptest! {
        #[test]
        fn departures_sorted_and_in_range(seed in any::<u64>(), n in 1u32..300, steps in 1u64..5000) {
            let plan = DemandPlan::generate(&routes(&["a"]), &routes(&["b"]), n, steps, seed);
            prop_assert_eq!(plan.len(), n as usize);
            let ticks: Vec<u64> = plan.departures().iter().map(|d| d.tick.0).collect();
            prop_assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(ticks.iter().all(|&t| t < steps));
        }
    }
}

// ── MemoryNetwork ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod network {
    use super::*;

    #[test]
    fn four_way_layout() {
        let net = MemoryNetwork::four_way();
        assert_eq!(net.intersection_ids().count(), 1);
        assert_eq!(net.straight_routes().len(), 4);
        assert_eq!(net.turning_routes().len(), 4);
        let route = net.route(&RouteId::from("TL_W_straight")).unwrap();
        assert_eq!(route, [LaneId::from("TL_W_in_0"), LaneId::from("TL_E_out")]);
        let route = net.route(&RouteId::from("TL_W_left")).unwrap();
        assert_eq!(route, [LaneId::from("TL_W_in_1"), LaneId::from("TL_N_out")]);
    }

    #[test]
    fn grid_routes_cross_the_grid() {
        let net = MemoryNetwork::grid(2, 3);
        assert_eq!(net.intersection_ids().count(), 6);
        // Boundary arms: 2 rows × 2 sides + 3 cols × 2 sides.
        assert_eq!(net.straight_routes().len(), 10);
        let route = net.route(&RouteId::from("J0_0_W_straight")).unwrap();
        assert_eq!(
            route,
            [
                LaneId::from("J0_0_W_in_0"),
                LaneId::from("J0_1_W_in_0"),
                LaneId::from("J0_2_W_in_0"),
                LaneId::from("J0_2_E_out"),
            ]
        );
    }
}

// ── MemoryEngine ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod memory_engine {
    use super::*;
    use crate::SessionError;

    #[test]
    fn exposes_eight_phase_program() {
        let e = started(MemoryNetwork::four_way(), DemandPlan::default());
        let program = e.signal_program(&tl()).unwrap().unwrap();
        assert_eq!(program.phase_count(), 8);
        assert_eq!(e.controlled_links(&tl()).unwrap().len(), 8);
        assert_eq!(e.controlled_lanes(&tl()).unwrap().len(), 8);
        let g = e.lane_geometry(&LaneId::from("TL_N_in_1")).unwrap();
        assert!(g.is_outermost());
    }

    #[test]
    fn higher_lane_index_sits_left_of_travel() {
        let e = started(MemoryNetwork::four_way(), DemandPlan::default());
        for arm in ["N", "E", "S", "W"] {
            let inner = e.lane_geometry(&LaneId::new(format!("TL_{arm}_in_0"))).unwrap();
            let outer = e.lane_geometry(&LaneId::new(format!("TL_{arm}_in_1"))).unwrap();
            let (far, stop) = (&inner.shape[0], &inner.shape[1]);
            let (dx, dy) = (stop.x - far.x, stop.y - far.y);
            let (ox, oy) = (outer.shape[1].x - stop.x, outer.shape[1].y - stop.y);
            assert!(dx * oy - dy * ox > 0.0, "{arm}: lane 1 is not left of lane 0");
        }
    }

    #[test]
    fn red_light_builds_waiting_time() {
        // Phase 0 serves north-south; a westbound-entering car waits.
        let mut e = started(MemoryNetwork::four_way(), one_departure("TL_W_straight", "car", 0));
        for _ in 0..40 {
            e.advance().unwrap();
        }
        let car = VehicleId::from("car");
        let lane = LaneId::from("TL_W_in_0");
        assert_eq!(e.lane_vehicles(&lane).unwrap(), [car.clone()]);
        assert_eq!(e.vehicle_lane_position(&car).unwrap(), 200.0);
        assert_eq!(e.lane_halted(&lane).unwrap(), 1);
        assert!(e.vehicle_waiting_time(&car).unwrap() > 0.0);
    }

    #[test]
    fn green_light_lets_vehicle_arrive() {
        let mut e = started(MemoryNetwork::four_way(), one_departure("TL_W_straight", "car", 0));
        e.set_phase(&tl(), PhaseIndex(4)).unwrap();
        let mut arrived = 0;
        for _ in 0..60 {
            e.advance().unwrap();
            arrived += e.arrived_count().unwrap();
        }
        assert_eq!(arrived, 1);
        assert_eq!(e.vehicle_count(), 0);
    }

    #[test]
    fn queued_vehicles_keep_their_gap() {
        let plan = DemandPlan::from_departures(
            (0..5)
                .map(|i| Departure {
                    tick:    Tick(i),
                    vehicle: VehicleId::new(format!("v{i}")),
                    route:   RouteId::from("TL_S_straight"),
                    vtype:   "standard_car".into(),
                })
                .collect(),
        );
        let mut e = started(MemoryNetwork::four_way(), plan);
        e.set_phase(&tl(), PhaseIndex(4)).unwrap(); // south arm is red
        for _ in 0..80 {
            e.advance().unwrap();
        }
        let lane = LaneId::from("TL_S_in_0");
        let ids = e.lane_vehicles(&lane).unwrap();
        assert_eq!(ids.len(), 5);
        let pos: Vec<f64> = ids.iter().map(|v| e.vehicle_lane_position(v).unwrap()).collect();
        assert!(pos.windows(2).all(|w| w[0] - w[1] >= 7.5 - 1e-9));
        assert_eq!(e.lane_halted(&lane).unwrap(), 5);
    }

    #[test]
    fn added_vehicle_departs_next_step() {
        let mut e = started(MemoryNetwork::four_way(), DemandPlan::default());
        let amb = VehicleId::from("emergency-120");
        e.add_vehicle(&amb, &RouteId::from("TL_N_straight"), "emergency").unwrap();
        e.advance().unwrap();
        assert_eq!(e.vehicle_type(&amb).unwrap(), "emergency");
        assert_eq!(e.lane_vehicles(&LaneId::from("TL_N_in_0")).unwrap(), [amb.clone()]);
        assert!(matches!(
            e.add_vehicle(&amb, &RouteId::from("TL_N_straight"), "emergency"),
            Err(SessionError::Rejected(_))
        ));
    }

    #[test]
    fn unknown_objects_are_reported() {
        let mut e = started(MemoryNetwork::four_way(), DemandPlan::default());
        assert!(matches!(
            e.add_vehicle(&VehicleId::from("x"), &RouteId::from("nowhere"), "car"),
            Err(SessionError::UnknownObject { kind: "route", .. })
        ));
        assert!(e.lane_length(&LaneId::from("nope")).is_err());
        assert!(e.set_phase(&tl(), PhaseIndex(8)).is_err());
    }

    #[test]
    fn injected_failure_kills_engine() {
        let mut e = MemoryEngine::new(MemoryNetwork::four_way()).fail_at(Tick(3));
        e.start(&SessionConfig::new("f", DemandPlan::default())).unwrap();
        for _ in 0..3 {
            e.advance().unwrap();
        }
        let err = e.advance().unwrap_err();
        assert!(err.is_connection_failure());
        assert!(!e.is_alive());
        assert!(e.intersection_ids().is_err());
    }
}

// ── SimulationSession ─────────────────────────────────────────────────────────

#[cfg(test)]
mod session {
    use super::*;
    use crate::{OrDegrade, SessionError, SessionStatus, SimulationSession};

    fn session() -> SimulationSession<MemoryEngine> {
        SimulationSession::new("adaptive", MemoryEngine::new(MemoryNetwork::four_way()))
    }

    #[test]
    fn step_before_start_fails() {
        let mut s = session();
        assert!(matches!(s.step(), Err(SessionError::NotAlive(_))));
        assert_eq!(s.steps(), 0);
    }

    #[test]
    fn step_counts() {
        let mut s = session();
        s.start(&SessionConfig::new("adaptive", DemandPlan::default())).unwrap();
        for _ in 0..10 {
            s.step().unwrap();
        }
        assert_eq!(s.steps(), 10);
        assert_eq!(s.engine().time(), Tick(10));
    }

    #[test]
    fn close_is_idempotent() {
        let mut s = session();
        s.close();
        s.close();
        assert_eq!(s.status(), SessionStatus::Closed);

        let mut s = session();
        s.start(&SessionConfig::new("adaptive", DemandPlan::default())).unwrap();
        s.close();
        s.close();
        assert!(matches!(s.step(), Err(SessionError::Closed(_))));
        assert!(s.query(|e| e.arrived_count()).is_err());
    }

    #[test]
    fn double_start_rejected() {
        let mut s = session();
        let cfg = SessionConfig::new("adaptive", DemandPlan::default());
        s.start(&cfg).unwrap();
        assert!(matches!(s.start(&cfg), Err(SessionError::Rejected(_))));
    }

    #[test]
    fn failed_query_degrades() {
        let mut s = session();
        s.start(&SessionConfig::new("adaptive", DemandPlan::default())).unwrap();
        let wait = s
            .query(|e| e.vehicle_waiting_time(&VehicleId::from("ghost")))
            .or_degrade("waiting time", 0.0);
        assert_eq!(wait, 0.0);
    }

    #[test]
    fn mutate_reaches_engine() {
        let mut s = session();
        s.start(&SessionConfig::new("adaptive", DemandPlan::default())).unwrap();
        s.set_phase(&tl(), PhaseIndex(6)).unwrap();
        assert_eq!(s.query(|e| e.current_phase(&tl())).unwrap(), PhaseIndex(6));
    }

    #[test]
    fn slow_call_times_out() {
        let mut s = session();
        let mut cfg = SessionConfig::new("adaptive", DemandPlan::default());
        cfg.io_timeout = Duration::from_millis(50);
        s.start(&cfg).unwrap();
        assert_eq!(s.io_timeout(), Duration::from_millis(50));

        let err = s
            .mutate(|e| {
                thread::sleep(Duration::from_millis(120));
                e.set_phase(&tl(), PhaseIndex(2))
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(d) if d == Duration::from_millis(50)));
        assert!(err.is_connection_failure());

        let err = s
            .query(|e| {
                thread::sleep(Duration::from_millis(120));
                e.arrived_count()
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
        assert_eq!(s.query(|e| e.arrived_count()).unwrap(), 0);
    }

    #[test]
    fn timed_out_query_degrades() {
        let mut s = session();
        let mut cfg = SessionConfig::new("adaptive", DemandPlan::default());
        cfg.io_timeout = Duration::from_millis(20);
        s.start(&cfg).unwrap();
        let lanes = s
            .query(|e| {
                thread::sleep(Duration::from_millis(60));
                e.controlled_lanes(&tl())
            })
            .or_degrade("controlled lanes", Vec::new());
        assert!(lanes.is_empty());
    }

    #[test]
    fn step_is_not_held_to_the_call_budget() {
        let mut s = session();
        let mut cfg = SessionConfig::new("adaptive", DemandPlan::default());
        cfg.io_timeout = Duration::ZERO;
        s.start(&cfg).unwrap();
        s.step().unwrap();
        assert_eq!(s.steps(), 1);
    }
}
