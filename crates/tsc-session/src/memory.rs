//! In-process engine over a synthetic signalised grid.
//!
//! This is a test and demo double, not a traffic model.  Vehicles move a
//! fixed distance per tick, queue behind their leader, stop at a stop line
//! whose signal is not green, and accumulate one second of waiting time for
//! every tick they stand still.  At most one vehicle per lane crosses a stop
//! line per tick.
//!
//! # Layout
//!
//! Intersections sit on a square grid `SPACING_M` apart.  Every intersection
//! has four arms with two incoming lanes each (`_in_0` through, `_in_1`
//! left); arms on the edge of the grid also get one exit lane.  Signal
//! indices follow the arm order west, north, east, south with the through
//! lane before the left lane, and every intersection runs the same
//! eight-phase program:
//!
//! | Phase | State      | Serves        |
//! |-------|------------|---------------|
//! | 0 / 1 | `rrGrrrGr` | NS through    |
//! | 2 / 3 | `rrrGrrrG` | NS left       |
//! | 4 / 5 | `GrrrGrrr` | EW through    |
//! | 6 / 7 | `rGrrrGrr` | EW left       |
//!
//! Odd phases are the yellow variants of the preceding green.  The phase
//! only ever changes through [`SimulationEngine::set_phase`].

use std::collections::{BTreeMap, VecDeque};

use log::{debug, warn};
use tsc_core::{
    Approach, IntersectionId, LaneGeometry, LaneId, LaneLink, PhaseDef, PhaseIndex, Point,
    RouteId, SignalProgram, Tick, VehicleId,
};

use crate::{DemandPlan, Departure, SessionConfig, SessionError, SessionResult, SimulationEngine};

// ── Constants ─────────────────────────────────────────────────────────────────

const SPACING_M: f64 = 300.0;
const BOUNDARY_LEN_M: f64 = 200.0;
/// Distance from the intersection centre to every stop line.
const STOP_OFFSET_M: f64 = 10.0;
const LANE_WIDTH_M: f64 = 3.2;
const SPEED_M_PER_TICK: f64 = 10.0;
/// Front-to-front spacing of queued vehicles.
const MIN_GAP_M: f64 = 7.5;
const HALT_EPS_M: f64 = 0.1;

const PROGRAM: [(&str, f64); 8] = [
    ("rrGrrrGr", 30.0),
    ("rryrrryr", 4.0),
    ("rrrGrrrG", 30.0),
    ("rrryrrry", 4.0),
    ("GrrrGrrr", 30.0),
    ("yrrryrrr", 4.0),
    ("rGrrrGrr", 30.0),
    ("ryrrryrr", 4.0),
];

// ── Network ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct MemoryLane {
    geometry: LaneGeometry,
    /// `(intersection index, signal index)` for controlled incoming lanes.
    control:  Option<(usize, usize)>,
}

#[derive(Clone, Debug)]
struct MemoryIntersection {
    id:      IntersectionId,
    program: SignalProgram,
    links:   Vec<Vec<LaneLink>>,
    lanes:   Vec<LaneId>,
}

/// Static description of a synthetic network: lanes, signals, and routes.
#[derive(Clone, Debug)]
pub struct MemoryNetwork {
    intersections: Vec<MemoryIntersection>,
    lanes:         BTreeMap<LaneId, MemoryLane>,
    routes:        BTreeMap<RouteId, Vec<LaneId>>,
    straight:      Vec<RouteId>,
    turning:       Vec<RouteId>,
}

fn arm_letter(arm: Approach) -> char {
    match arm {
        Approach::West  => 'W',
        Approach::North => 'N',
        Approach::East  => 'E',
        Approach::South => 'S',
    }
}

/// Unit vector from the intersection centre out along `arm`.
fn arm_vector(arm: Approach) -> (f64, f64) {
    match arm {
        Approach::West  => (-1.0, 0.0),
        Approach::North => (0.0, 1.0),
        Approach::East  => (1.0, 0.0),
        Approach::South => (0.0, -1.0),
    }
}

fn opposite(arm: Approach) -> Approach {
    match arm {
        Approach::West  => Approach::East,
        Approach::North => Approach::South,
        Approach::East  => Approach::West,
        Approach::South => Approach::North,
    }
}

/// Arm a vehicle leaves through after turning left from `arm`.
fn left_exit(arm: Approach) -> Approach {
    match arm {
        Approach::West  => Approach::North,
        Approach::North => Approach::East,
        Approach::East  => Approach::South,
        Approach::South => Approach::West,
    }
}

fn in_lane(id: &IntersectionId, arm: Approach, k: u8) -> LaneId {
    LaneId::new(format!("{id}_{}_in_{k}", arm_letter(arm)))
}

fn out_lane(id: &IntersectionId, arm: Approach) -> LaneId {
    LaneId::new(format!("{id}_{}_out", arm_letter(arm)))
}

/// Grid bookkeeping used only while building.
struct GridShape {
    rows: usize,
    cols: usize,
    ids:  Vec<IntersectionId>,
}

impl GridShape {
    fn neighbour(&self, r: usize, c: usize, arm: Approach) -> Option<(usize, usize)> {
        match arm {
            Approach::West if c > 0 => Some((r, c - 1)),
            Approach::East if c + 1 < self.cols => Some((r, c + 1)),
            Approach::North if r > 0 => Some((r - 1, c)),
            Approach::South if r + 1 < self.rows => Some((r + 1, c)),
            _ => None,
        }
    }

    fn id(&self, r: usize, c: usize) -> &IntersectionId {
        &self.ids[r * self.cols + c]
    }

    /// The lane a vehicle enters when leaving `(r, c)` through `arm`.
    fn exit_lane(&self, r: usize, c: usize, arm: Approach) -> LaneId {
        match self.neighbour(r, c, arm) {
            Some((nr, nc)) => in_lane(self.id(nr, nc), opposite(arm), 0),
            None => out_lane(self.id(r, c), arm),
        }
    }

    /// Lanes from `(r, c)` outward through `arm`, straight to the edge.
    fn straight_on(&self, mut r: usize, mut c: usize, arm: Approach, lanes: &mut Vec<LaneId>) {
        loop {
            lanes.push(self.exit_lane(r, c, arm));
            match self.neighbour(r, c, arm) {
                Some((nr, nc)) => (r, c) = (nr, nc),
                None => return,
            }
        }
    }
}

impl MemoryNetwork {
    /// One intersection `TL` with four two-lane approaches.
    pub fn four_way() -> Self {
        Self::build(1, 1, |_, _| IntersectionId::from("TL"))
    }

    /// `rows × cols` intersections named `J<row>_<col>`.
    pub fn grid(rows: usize, cols: usize) -> Self {
        Self::build(rows.max(1), cols.max(1), |r, c| IntersectionId::new(format!("J{r}_{c}")))
    }

    fn build(rows: usize, cols: usize, name: impl Fn(usize, usize) -> IntersectionId) -> Self {
        let shape = GridShape {
            rows,
            cols,
            ids: (0..rows).flat_map(|r| (0..cols).map(move |c| (r, c))).map(|(r, c)| name(r, c)).collect(),
        };
        let program = SignalProgram::new("0", PROGRAM.iter().map(|&(s, d)| PhaseDef::new(s, d)).collect());

        let mut net = MemoryNetwork {
            intersections: Vec::with_capacity(rows * cols),
            lanes:         BTreeMap::new(),
            routes:        BTreeMap::new(),
            straight:      Vec::new(),
            turning:       Vec::new(),
        };

        for r in 0..rows {
            for c in 0..cols {
                let ix = r * cols + c;
                let id = shape.id(r, c).clone();
                let centre = Point::new(c as f64 * SPACING_M, -(r as f64) * SPACING_M);
                let mut links = Vec::with_capacity(8);
                let mut lanes = Vec::with_capacity(8);

                for arm in Approach::ALL {
                    let bounded = shape.neighbour(r, c, arm).is_some();
                    let length = if bounded { SPACING_M - 2.0 * STOP_OFFSET_M } else { BOUNDARY_LEN_M };
                    let (ux, uy) = arm_vector(arm);
                    for k in 0..2u8 {
                        let lane = in_lane(&id, arm, k);
                        // Lateral offset to the left of travel, growing with the lane index.
                        let lat = (k as f64 + 0.5) * LANE_WIDTH_M;
                        let (px, py) = (uy * lat, -ux * lat);
                        let far = STOP_OFFSET_M + length;
                        let geometry = LaneGeometry {
                            lane:            lane.clone(),
                            shape:           vec![
                                Point::new(centre.x + ux * far + px, centre.y + uy * far + py),
                                Point::new(centre.x + ux * STOP_OFFSET_M + px, centre.y + uy * STOP_OFFSET_M + py),
                            ],
                            length,
                            index:           k,
                            edge_lane_count: 2,
                        };
                        let signal = links.len();
                        net.lanes.insert(lane.clone(), MemoryLane { geometry, control: Some((ix, signal)) });

                        let exit = if k == 0 { opposite(arm) } else { left_exit(arm) };
                        links.push(vec![LaneLink::new(lane.clone(), shape.exit_lane(r, c, exit))]);
                        lanes.push(lane);
                    }

                    if !bounded {
                        let lane = out_lane(&id, arm);
                        let geometry = LaneGeometry {
                            lane:            lane.clone(),
                            shape:           vec![
                                Point::new(centre.x + ux * STOP_OFFSET_M, centre.y + uy * STOP_OFFSET_M),
                                Point::new(
                                    centre.x + ux * (STOP_OFFSET_M + BOUNDARY_LEN_M),
                                    centre.y + uy * (STOP_OFFSET_M + BOUNDARY_LEN_M),
                                ),
                            ],
                            length:          BOUNDARY_LEN_M,
                            index:           0,
                            edge_lane_count: 1,
                        };
                        net.lanes.insert(lane, MemoryLane { geometry, control: None });

                        // Boundary entry: one straight and one left-turning route.
                        let straight = RouteId::new(format!("{id}_{}_straight", arm_letter(arm)));
                        let mut path = vec![in_lane(&id, arm, 0)];
                        shape.straight_on(r, c, opposite(arm), &mut path);
                        net.routes.insert(straight.clone(), path);
                        net.straight.push(straight);

                        let left = RouteId::new(format!("{id}_{}_left", arm_letter(arm)));
                        let mut path = vec![in_lane(&id, arm, 1)];
                        shape.straight_on(r, c, left_exit(arm), &mut path);
                        net.routes.insert(left.clone(), path);
                        net.turning.push(left);
                    }
                }

                net.intersections.push(MemoryIntersection { id, program: program.clone(), links, lanes });
            }
        }
        net
    }

    pub fn intersection_ids(&self) -> impl Iterator<Item = &IntersectionId> {
        self.intersections.iter().map(|i| &i.id)
    }

    pub fn straight_routes(&self) -> &[RouteId] {
        &self.straight
    }

    pub fn turning_routes(&self) -> &[RouteId] {
        &self.turning
    }

    pub fn route(&self, id: &RouteId) -> Option<&[LaneId]> {
        self.routes.get(id).map(Vec::as_slice)
    }

    /// Seeded demand over this network's routes.
    pub fn demand(&self, vehicle_count: u32, max_steps: u64, seed: u64) -> DemandPlan {
        DemandPlan::generate(&self.straight, &self.turning, vehicle_count, max_steps, seed)
    }

    fn position(&self, id: &IntersectionId) -> SessionResult<usize> {
        self.intersections
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| SessionError::unknown("intersection", id))
    }

    fn lane(&self, id: &LaneId) -> SessionResult<&MemoryLane> {
        self.lanes.get(id).ok_or_else(|| SessionError::unknown("lane", id))
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct MemoryVehicle {
    route:   RouteId,
    /// Index of the current lane within the route.
    leg:     usize,
    pos:     f64,
    waiting: f64,
    vtype:   String,
    halted:  bool,
}

/// [`SimulationEngine`] over a [`MemoryNetwork`], entirely in process.
pub struct MemoryEngine {
    network:      MemoryNetwork,
    alive:        bool,
    time:         u64,
    fail_at:      Option<u64>,
    phases:       Vec<PhaseIndex>,
    pending:      VecDeque<Departure>,
    vehicles:     BTreeMap<VehicleId, MemoryVehicle>,
    /// Vehicles per lane, closest to the stop line first.
    occupancy:    BTreeMap<LaneId, Vec<VehicleId>>,
    arrived_last: u32,
}

impl MemoryEngine {
    pub fn new(network: MemoryNetwork) -> Self {
        let phases = vec![PhaseIndex(0); network.intersections.len()];
        Self {
            network,
            alive: false,
            time: 0,
            fail_at: None,
            phases,
            pending: VecDeque::new(),
            vehicles: BTreeMap::new(),
            occupancy: BTreeMap::new(),
            arrived_last: 0,
        }
    }

    /// Make the engine die when asked to advance past `tick`.
    pub fn fail_at(mut self, tick: Tick) -> Self {
        self.fail_at = Some(tick.0);
        self
    }

    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    /// Engine time: number of completed steps.
    pub fn time(&self) -> Tick {
        Tick(self.time)
    }

    /// Vehicles currently driving.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    fn check_alive(&self) -> SessionResult<()> {
        if self.alive { Ok(()) } else { Err(SessionError::NotAlive("memory".into())) }
    }

    fn vehicle(&self, id: &VehicleId) -> SessionResult<&MemoryVehicle> {
        self.check_alive()?;
        self.vehicles.get(id).ok_or_else(|| SessionError::unknown("vehicle", id))
    }

    fn is_green(&self, control: Option<(usize, usize)>) -> bool {
        let Some((ix, signal)) = control else {
            return true;
        };
        let phase = self.phases[ix];
        self.network.intersections[ix]
            .program
            .phases
            .get(phase.index())
            .is_some_and(|p| p.green_at(signal))
    }

    /// Insert due departures whose first lane has room.
    fn depart(&mut self) {
        let mut blocked = Vec::new();
        while self.pending.front().is_some_and(|d| d.tick.0 <= self.time) {
            let Some(d) = self.pending.pop_front() else { break };
            let Some(first) = self.network.routes.get(&d.route).and_then(|r| r.first()) else {
                debug!("memory engine: dropping {} on unknown route {}", d.vehicle, d.route);
                continue;
            };
            let queue = self.occupancy.entry(first.clone()).or_default();
            let room = queue
                .last()
                .and_then(|v| self.vehicles.get(v))
                .is_none_or(|back| back.pos >= MIN_GAP_M);
            if !room {
                blocked.push(d);
                continue;
            }
            queue.push(d.vehicle.clone());
            self.vehicles.insert(d.vehicle, MemoryVehicle {
                route:   d.route,
                leg:     0,
                pos:     0.0,
                waiting: 0.0,
                vtype:   d.vtype,
                halted:  false,
            });
        }
        for d in blocked.into_iter().rev() {
            self.pending.push_front(d);
        }
    }

    fn move_vehicles(&mut self) {
        let lane_ids: Vec<LaneId> = self.occupancy.keys().cloned().collect();
        let mut transfers: Vec<(VehicleId, LaneId, LaneId, f64)> = Vec::new();
        let mut gone: Vec<VehicleId> = Vec::new();

        for lane_id in lane_ids {
            let Some(lane) = self.network.lanes.get(&lane_id) else { continue };
            let length = lane.geometry.length;
            let green = self.is_green(lane.control);
            let Some(queue) = self.occupancy.get_mut(&lane_id) else { continue };

            let mut limit = f64::INFINITY;
            let mut crossed = false;
            let mut kept = Vec::with_capacity(queue.len());
            for vid in queue.drain(..) {
                let Some(v) = self.vehicles.get_mut(&vid) else { continue };
                let old = v.pos;
                let mut new = (old + SPEED_M_PER_TICK).min(limit);
                if new >= length {
                    let next = self.network.routes.get(&v.route).and_then(|r| r.get(v.leg + 1));
                    match next {
                        _ if crossed => new = length,
                        None => {
                            gone.push(vid);
                            crossed = true;
                            limit = length - MIN_GAP_M;
                            continue;
                        }
                        Some(next) if green => {
                            transfers.push((vid, lane_id.clone(), next.clone(), new - length));
                            crossed = true;
                            limit = length - MIN_GAP_M;
                            continue;
                        }
                        Some(_) => new = length,
                    }
                }
                let new = new.max(old);
                v.halted = new - old < HALT_EPS_M;
                if v.halted {
                    v.waiting += 1.0;
                }
                v.pos = new;
                limit = new - MIN_GAP_M;
                kept.push(vid);
            }
            *queue = kept;
        }

        for (vid, from, to, overflow) in transfers {
            let back = self
                .occupancy
                .get(&to)
                .and_then(|q| q.last())
                .and_then(|b| self.vehicles.get(b))
                .map_or(f64::INFINITY, |b| b.pos);
            let Some(v) = self.vehicles.get_mut(&vid) else { continue };
            let entry = overflow.min(back - MIN_GAP_M);
            if entry < 0.0 {
                // Downstream lane is full: hold at the stop line.
                v.pos = self.network.lanes.get(&from).map_or(v.pos, |l| l.geometry.length);
                v.halted = true;
                v.waiting += 1.0;
                self.occupancy.entry(from).or_default().insert(0, vid);
                continue;
            }
            v.leg += 1;
            v.pos = entry;
            v.halted = false;
            self.occupancy.entry(to).or_default().push(vid);
        }

        self.arrived_last = gone.len() as u32;
        for vid in gone {
            self.vehicles.remove(&vid);
        }
    }
}

impl SimulationEngine for MemoryEngine {
    fn start(&mut self, config: &SessionConfig) -> SessionResult<()> {
        if self.alive {
            return Err(SessionError::Rejected("memory engine already started".into()));
        }
        if let Some(path) = &config.network_path {
            debug!("memory engine `{}`: ignoring network path {}", config.label, path.display());
        }
        let (known, unknown): (Vec<_>, Vec<_>) = config
            .demand
            .departures()
            .iter()
            .cloned()
            .partition(|d| self.network.routes.contains_key(&d.route));
        if !unknown.is_empty() {
            warn!("memory engine `{}`: {} departures use unknown routes; dropped", config.label, unknown.len());
        }
        self.pending = known.into();
        self.vehicles.clear();
        self.occupancy = self.network.lanes.keys().map(|l| (l.clone(), Vec::new())).collect();
        self.phases.iter_mut().for_each(|p| *p = PhaseIndex(0));
        self.time = 0;
        self.arrived_last = 0;
        self.alive = true;
        Ok(())
    }

    fn close(&mut self) -> SessionResult<()> {
        self.alive = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn advance(&mut self) -> SessionResult<()> {
        self.check_alive()?;
        if self.fail_at == Some(self.time) {
            self.alive = false;
            return Err(SessionError::Engine(format!("injected failure at tick {}", self.time)));
        }
        self.depart();
        self.move_vehicles();
        self.time += 1;
        Ok(())
    }

    fn intersection_ids(&self) -> SessionResult<Vec<IntersectionId>> {
        self.check_alive()?;
        Ok(self.network.intersection_ids().cloned().collect())
    }

    fn controlled_lanes(&self, intersection: &IntersectionId) -> SessionResult<Vec<LaneId>> {
        self.check_alive()?;
        let ix = self.network.position(intersection)?;
        Ok(self.network.intersections[ix].lanes.clone())
    }

    fn lane_vehicles(&self, lane: &LaneId) -> SessionResult<Vec<VehicleId>> {
        self.check_alive()?;
        self.network.lane(lane)?;
        Ok(self.occupancy.get(lane).cloned().unwrap_or_default())
    }

    fn vehicle_waiting_time(&self, vehicle: &VehicleId) -> SessionResult<f64> {
        Ok(self.vehicle(vehicle)?.waiting)
    }

    fn vehicle_type(&self, vehicle: &VehicleId) -> SessionResult<String> {
        Ok(self.vehicle(vehicle)?.vtype.clone())
    }

    fn vehicle_lane_position(&self, vehicle: &VehicleId) -> SessionResult<f64> {
        Ok(self.vehicle(vehicle)?.pos)
    }

    fn lane_length(&self, lane: &LaneId) -> SessionResult<f64> {
        self.check_alive()?;
        Ok(self.network.lane(lane)?.geometry.length)
    }

    fn lane_halted(&self, lane: &LaneId) -> SessionResult<u32> {
        self.check_alive()?;
        self.network.lane(lane)?;
        let halted = self
            .occupancy
            .get(lane)
            .into_iter()
            .flatten()
            .filter(|v| self.vehicles.get(*v).is_some_and(|v| v.halted))
            .count();
        Ok(halted as u32)
    }

    fn lane_geometry(&self, lane: &LaneId) -> SessionResult<LaneGeometry> {
        self.check_alive()?;
        Ok(self.network.lane(lane)?.geometry.clone())
    }

    fn signal_program(&self, intersection: &IntersectionId) -> SessionResult<Option<SignalProgram>> {
        self.check_alive()?;
        let ix = self.network.position(intersection)?;
        Ok(Some(self.network.intersections[ix].program.clone()))
    }

    fn controlled_links(&self, intersection: &IntersectionId) -> SessionResult<Vec<Vec<LaneLink>>> {
        self.check_alive()?;
        let ix = self.network.position(intersection)?;
        Ok(self.network.intersections[ix].links.clone())
    }

    fn current_phase(&self, intersection: &IntersectionId) -> SessionResult<PhaseIndex> {
        self.check_alive()?;
        Ok(self.phases[self.network.position(intersection)?])
    }

    fn arrived_count(&self) -> SessionResult<u32> {
        self.check_alive()?;
        Ok(self.arrived_last)
    }

    fn route_ids(&self) -> SessionResult<Vec<RouteId>> {
        self.check_alive()?;
        Ok(self.network.routes.keys().cloned().collect())
    }

    fn set_phase(&mut self, intersection: &IntersectionId, phase: PhaseIndex) -> SessionResult<()> {
        self.check_alive()?;
        let ix = self.network.position(intersection)?;
        let count = self.network.intersections[ix].program.phase_count();
        if phase.index() >= count {
            return Err(SessionError::Rejected(format!(
                "{intersection}: phase {phase} out of range (program has {count})"
            )));
        }
        self.phases[ix] = phase;
        Ok(())
    }

    fn add_vehicle(&mut self, vehicle: &VehicleId, route: &RouteId, vtype: &str) -> SessionResult<()> {
        self.check_alive()?;
        if !self.network.routes.contains_key(route) {
            return Err(SessionError::unknown("route", route));
        }
        if self.vehicles.contains_key(vehicle) || self.pending.iter().any(|d| &d.vehicle == vehicle) {
            return Err(SessionError::Rejected(format!("vehicle {vehicle} already exists")));
        }
        self.pending.push_front(Departure {
            tick:    Tick(self.time),
            vehicle: vehicle.clone(),
            route:   route.clone(),
            vtype:   vtype.to_owned(),
        });
        Ok(())
    }
}
