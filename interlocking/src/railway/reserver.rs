//! The block reserver.
//!
//! A convoy asks how far it may proceed; the reserver walks its route from
//! the front, claims segments and crossings as it goes, and stops where the
//! working method in force says it must. On failure it gives back what lies
//! beyond the last point the convoy can safely stand. Signals passed by a
//! successful walk get their aspects recomputed from the depth reserved.

use smallvec::SmallVec;
use log::{debug, trace};

use crate::config::Config;
use crate::input::layout::{Coord, SignalId};
use crate::railway::choose;
use crate::railway::convoy::{Convoy, ConvoyHandle};
use crate::railway::distant::SignalRole;
use crate::railway::infrastructure::Infrastructure;
use crate::railway::route::{Route, STEPS_PER_TILE};
use crate::railway::segment::ReservationKind;
use crate::railway::signal::Aspect;
use crate::railway::working_method::{self, ReservationExtent, SignalContext, WorkingMethod};

#[derive(Debug, Copy, Clone)]
pub struct ReserveRequest {
    pub start_index: usize,
    pub sighting_tiles: u32,
    /// False to release instead.
    pub reserve: bool,
    pub brake_steps: u32,
}

impl ReserveRequest {
    pub fn new(start_index: usize, config: &Config) -> ReserveRequest {
        ReserveRequest {
            start_index,
            sighting_tiles: config.sighting_distance_tiles,
            reserve: true,
            brake_steps: 0,
        }
    }

    pub fn release(start_index: usize) -> ReserveRequest {
        ReserveRequest { start_index, sighting_tiles: 0, reserve: false, brake_steps: 0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReserveOutcome {
    pub success: bool,
    /// Last route index the convoy may move its front to.
    pub next_signal_index: usize,
    /// Clear blocks beyond the first signal ahead.
    pub blocks_ahead: i32,
    /// Working method the convoy changes to when its front leaves the
    /// signal on the given tile.
    pub transition: Option<(Coord, WorkingMethod)>,
    /// The route crosses a tile that has lost its way.
    pub recalculate: bool,
    pub blocked_by: Option<ConvoyHandle>,
    pub choose_taken: Option<SignalId>,
}

impl ReserveOutcome {
    fn at(index: usize, success: bool) -> ReserveOutcome {
        ReserveOutcome {
            success,
            next_signal_index: index,
            blocks_ahead: 0,
            transition: None,
            recalculate: false,
            blocked_by: None,
            choose_taken: None,
        }
    }
}

/// Why a walk ended.
#[derive(Debug, Copy, Clone, PartialEq)]
enum WalkEnd {
    RouteEnd,
    /// Extent reached before tile `i`.
    Limit(usize),
    /// Stopped at the signal on tile `i`, which has been reserved.
    Signal(usize, SignalId),
    Blocked(usize, Option<ConvoyHandle>),
    Missing(usize),
    ChooseLimit(usize),
}

struct ScanState {
    start: usize,
    method: WorkingMethod,
    governing: Option<(usize, SignalId)>,
    extent: ReservationExtent,
    blocks: u32,
    /// Steps from the start of the walk to the start of the current tile.
    steps: u32,
    stop_signals: SmallVec<[(usize, SignalId); 8]>,
    distants: SmallVec<[(usize, SignalId); 4]>,
    choose: Option<(usize, SignalId)>,
    distant_ahead: bool,
    transition: Option<(Coord, WorkingMethod)>,
    /// Route indices of segments first claimed by this walk.
    acquired: SmallVec<[usize; 16]>,
    crossings: SmallVec<[usize; 4]>,
}

impl ScanState {
    fn new(start: usize, method: WorkingMethod) -> ScanState {
        ScanState {
            start,
            method,
            governing: None,
            extent: method.rules().reservation_extent(None),
            blocks: 0,
            steps: 0,
            stop_signals: SmallVec::new(),
            distants: SmallVec::new(),
            choose: None,
            distant_ahead: false,
            transition: None,
            acquired: SmallVec::new(),
            crossings: SmallVec::new(),
        }
    }

    fn governing_method(&self, inf: &Infrastructure) -> WorkingMethod {
        match self.governing {
            Some((_, s)) => inf.layout.signals[s].working_method,
            None => self.method,
        }
    }

    fn refresh_extent(&mut self, inf: &Infrastructure) {
        if let Some((_, s)) = self.governing {
            let ctx = SignalContext {
                desc: &inf.layout.signals[s],
                protects_junction: inf.signals[s].protects_junction,
                distant_ahead: self.distant_ahead,
            };
            self.extent = ctx.desc.working_method.rules().reservation_extent(Some(ctx));
        }
    }

    fn last_stop_before(&self, i: usize) -> Option<usize> {
        self.stop_signals.iter().rev().map(|&(s, _)| s).find(|&s| s > self.start && s < i)
    }
}

/// Reserves (or releases) the convoy's route from `req.start_index`.
pub fn reserve_or_release(inf: &mut Infrastructure, convoy: &mut Convoy, handle: ConvoyHandle,
                          req: &ReserveRequest, config: &Config) -> ReserveOutcome {
    if !req.reserve {
        return release(inf, convoy, handle, req.start_index);
    }
    if req.start_index >= convoy.route.count() {
        let mut out = ReserveOutcome::at(req.start_index, false);
        out.recalculate = true;
        return out;
    }

    let mut st = ScanState::new(req.start_index, convoy.signaling.working_method());
    let end = walk(inf, convoy, handle, req, config, &mut st);
    trace!("{}: walk from {} ended {:?}", convoy.name, req.start_index, end);

    match end {
        WalkEnd::Missing(i) => {
            debug!("{}: no way at {:?}, route must be recalculated", convoy.name, convoy.route.at(i));
            let start = st.start;
            rollback(inf, convoy, handle, &mut st, start);
            convoy.signaling.set_next_stop_index(start);
            let mut out = ReserveOutcome::at(start, false);
            out.recalculate = true;
            out
        }
        WalkEnd::Blocked(i, by) => {
            let mut safe = safe_point(inf, &st, i);
            if let Some((c, sig)) = st.choose {
                if !convoy.signaling.is_choosing() && c < i {
                    rollback(inf, convoy, handle, &mut st, c);
                    if let Some(mut out) = choose::choose_route(inf, convoy, handle, req, config, c, sig) {
                        set_aspects(inf, &st, c, None, true, config);
                        if st.transition.is_some() {
                            out.transition = st.transition;
                        }
                        return out;
                    }
                    safe = safe.min(c);
                }
            }
            fail(inf, convoy, handle, &mut st, safe, by, config)
        }
        WalkEnd::ChooseLimit(i) => {
            let safe = safe_point(inf, &st, i);
            fail(inf, convoy, handle, &mut st, safe, None, config)
        }
        WalkEnd::RouteEnd => {
            let last = convoy.route.last_index();
            succeed(inf, convoy, handle, &st, end, last, None, config)
        }
        WalkEnd::Limit(i) => succeed(inf, convoy, handle, &st, end, i - 1, None, config),
        WalkEnd::Signal(i, s) => succeed(inf, convoy, handle, &st, end, i, Some(s), config),
    }
}

fn succeed(inf: &mut Infrastructure, convoy: &mut Convoy, handle: ConvoyHandle, st: &ScanState,
           end: WalkEnd, authority: usize, terminal: Option<SignalId>, config: &Config) -> ReserveOutcome {
    let complete = match end {
        WalkEnd::Limit(_) => false,
        _ => true,
    };
    let mut reserved_to = authority;
    if end != WalkEnd::RouteEnd && !convoy.signaling.is_choosing() && allows_directional(inf, st, end) {
        reserved_to = directional_run(inf, convoy, handle, authority + 1).unwrap_or(authority);
    }
    let blocks = set_aspects(inf, st, authority, terminal, complete, config);
    if reserved_to > authority {
        trace!("{}: held directionally up to {}", convoy.name, reserved_to);
    }
    convoy.signaling.set_next_stop_index(authority);
    let mut out = ReserveOutcome::at(authority, true);
    out.blocks_ahead = blocks;
    out.transition = st.transition;
    out
}

fn walk(inf: &mut Infrastructure, convoy: &Convoy, handle: ConvoyHandle, req: &ReserveRequest,
        config: &Config, st: &mut ScanState) -> WalkEnd {
    let route_len = convoy.route.count();
    let mut i = req.start_index;
    loop {
        if i >= route_len {
            return WalkEnd::RouteEnd;
        }
        let pos = convoy.route.at(i);
        let dir = convoy.route.direction_at(i);
        if inf.layout.track_tile(pos).is_none() {
            return WalkEnd::Missing(i);
        }

        if i > st.start {
            if convoy.signaling.is_choosing() {
                if let Some(max) = config.choose_steps() {
                    if i - st.start > 2 * max {
                        return WalkEnd::ChooseLimit(i);
                    }
                }
            }
            st.steps += convoy.route.tile_steps(i - 1);
            if !convoy.signaling.is_choosing() && limit_reached(inf, convoy, req, st, i, pos) {
                return WalkEnd::Limit(i);
            }
        }

        if !inf.is_free_for(pos, handle) {
            let by = inf.segment(pos).and_then(|s| s.holders.iter().cloned().find(|h| *h != handle));
            return WalkEnd::Blocked(i, by);
        }
        let had_crossing = inf.crossing_held_by(pos, handle);
        if !inf.request_crossing(pos, handle) {
            return WalkEnd::Blocked(i, None);
        }
        if !had_crossing && inf.crossing_at(pos).is_some() {
            st.crossings.push(i);
        }

        let mut terminal = None;
        if let Some(sig) = inf.signal_at(pos, dir) {
            match inf.roles[sig] {
                SignalRole::Distant(home) => {
                    st.distants.push((i, sig));
                    if st.governing.is_some() && home.is_some() && !st.distant_ahead {
                        st.distant_ahead = true;
                        st.refresh_extent(inf);
                    }
                }
                SignalRole::Stop => {
                    if stop_signal(inf, convoy, req, config, st, i, sig) {
                        terminal = Some(sig);
                    }
                }
            }
        }

        let held = inf.segment(pos).map(|s| s.holds(handle)).unwrap_or(false);
        if !inf.reserve(pos, handle, dir, ReservationKind::Block) {
            return WalkEnd::Blocked(i, None);
        }
        if !held {
            st.acquired.push(i);
        }

        if let Some(sig) = terminal {
            return WalkEnd::Signal(i, sig);
        }
        i += 1;
    }
}

fn limit_reached(inf: &Infrastructure, convoy: &Convoy, req: &ReserveRequest, st: &ScanState,
                 i: usize, pos: Coord) -> bool {
    let beyond = match st.extent {
        ReservationExtent::Sighting => (i - st.start) as u32 > req.sighting_tiles,
        ReservationExtent::BrakingDistance =>
            st.steps > req.brake_steps.max(req.sighting_tiles.saturating_mul(STEPS_PER_TILE)),
        ReservationExtent::Blocks(_) | ReservationExtent::WholeSection => false,
    };
    if beyond {
        return true;
    }
    // moving block authority ends where the beacon can no longer be received
    if st.governing_method(inf) == WorkingMethod::MovingBlock {
        let anchor = match st.governing {
            Some((_, s)) => Some(s),
            None => convoy.signaling.last_signal_pos().and_then(|p| {
                inf.layout.tile(p).and_then(|t| t.signals.iter().cloned()
                    .find(|s| inf.layout.signals[*s].working_method == WorkingMethod::MovingBlock))
            }),
        };
        if let Some(s) = anchor {
            let desc = &inf.layout.signals[s];
            if desc.range > 0 && desc.pos.tile_distance(pos) > desc.range {
                return true;
            }
        }
    }
    false
}

/// Handles a stop signal met at route index `i`. Returns true when the walk
/// must end at it.
fn stop_signal(inf: &Infrastructure, convoy: &Convoy, req: &ReserveRequest, config: &Config,
               st: &mut ScanState, i: usize, sig: SignalId) -> bool {
    let desc = &inf.layout.signals[sig];
    let rules = desc.working_method.rules();
    let ti_danger = desc.working_method.is_time_interval()
        && working_method::time_interval_strength(inf.signals[sig].last_train(), inf.time,
               config.time_interval_caution_ticks, config.time_interval_clear_ticks) == 0;

    if st.governing.is_none() {
        // called on: the driver passes this one at sight
        if i == st.start && st.method == WorkingMethod::DriveBySight && inf.aspect(sig) == Aspect::CallOn {
            return false;
        }
        st.governing = Some((i, sig));
        st.stop_signals.push((i, sig));
        st.refresh_extent(inf);
        let next = working_method::transition(st.method, desc, convoy.signaling.last_signal_pos(),
                                              desc.pos, config.one_train_staff_radius);
        if next != st.method {
            st.transition = Some((convoy.route.at(i), next));
        }
        st.choose = if desc.choose { Some((i, sig)) } else { None };
        return (rules.requires_stop() && i != st.start) || ti_danger;
    }

    st.blocks += 1;
    st.stop_signals.push((i, sig));
    st.choose = if desc.choose { Some((i, sig)) } else { None };
    if rules.requires_stop() || ti_danger {
        return true;
    }
    if convoy.signaling.is_choosing() {
        return false;
    }
    if desc.working_method != st.governing_method(inf) {
        return true;
    }
    match st.extent {
        ReservationExtent::Blocks(n) => st.blocks >= n || st.steps >= req.brake_steps,
        ReservationExtent::WholeSection => true,
        ReservationExtent::Sighting | ReservationExtent::BrakingDistance => false,
    }
}

fn safe_point(inf: &Infrastructure, st: &ScanState, i: usize) -> usize {
    let method = st.governing_method(inf);
    if method.rules().requires_stop() {
        return st.start;
    }
    if let Some(s) = st.last_stop_before(i) {
        return s;
    }
    match st.extent {
        ReservationExtent::Sighting | ReservationExtent::BrakingDistance if i > st.start => i - 1,
        _ => st.start,
    }
}

/// Gives back segments and crossings first claimed by this walk beyond `keep`.
fn rollback(inf: &mut Infrastructure, convoy: &Convoy, handle: ConvoyHandle, st: &mut ScanState, keep: usize) {
    for &i in st.acquired.iter().filter(|&&i| i > keep) {
        inf.unreserve(convoy.route.at(i), handle);
    }
    for &i in st.crossings.iter().filter(|&&i| i > keep) {
        inf.release_crossing(convoy.route.at(i), handle);
    }
    st.acquired.retain(|i| *i <= keep);
    st.crossings.retain(|i| *i <= keep);
}

fn fail(inf: &mut Infrastructure, convoy: &mut Convoy, handle: ConvoyHandle, st: &mut ScanState,
        safe: usize, by: Option<ConvoyHandle>, config: &Config) -> ReserveOutcome {
    rollback(inf, convoy, handle, st, safe);
    let terminal = st.stop_signals.iter().find(|&&(s, _)| s == safe).map(|&(_, sig)| sig);
    let blocks = set_aspects(inf, st, safe, terminal, terminal.is_some(), config);
    convoy.signaling.set_next_stop_index(safe);
    let mut out = ReserveOutcome::at(safe, false);
    out.blocks_ahead = blocks;
    out.blocked_by = by;
    out.transition = st.transition;
    out
}

fn allows_directional(inf: &Infrastructure, st: &ScanState, end: WalkEnd) -> bool {
    let sig = match end {
        WalkEnd::Signal(_, s) => Some(s),
        _ => st.governing.map(|(_, s)| s),
    };
    match sig {
        Some(s) => {
            let desc = &inf.layout.signals[s];
            desc.working_method.rules().allows_directional(desc)
        }
        None => false,
    }
}

/// Claims the section beyond the authority directionally, so that no train
/// can enter it head-on. The run ends at a one-way sign, at a signal that is
/// not bidirectional, or at the end of the route. If an opposing train holds
/// part of it, everything the run claimed is given back.
fn directional_run(inf: &mut Infrastructure, convoy: &Convoy, handle: ConvoyHandle, from: usize) -> Option<usize> {
    let mut run: SmallVec<[usize; 16]> = SmallVec::new();
    let mut last = None;
    for j in from..convoy.route.count() {
        let pos = convoy.route.at(j);
        let dir = convoy.route.direction_at(j);
        match inf.layout.way(pos) {
            Some(w) if w.oneway.is_none() => {}
            _ => break,
        }
        if let Some(s) = inf.signal_at(pos, dir) {
            if inf.roles[s] == SignalRole::Stop && !inf.layout.signals[s].bidirectional {
                break;
            }
        }
        let held = inf.segment(pos).map(|s| s.holds(handle)).unwrap_or(false);
        if !inf.reserve(pos, handle, dir, ReservationKind::Directional) {
            debug!("{}: directional run curtailed at {:?}", convoy.name, pos);
            for k in run {
                inf.unreserve(convoy.route.at(k), handle);
            }
            return None;
        }
        if !held {
            run.push(j);
        }
        last = Some(j);
    }
    last
}

/// Sets the aspects of the signals the walk passed, up to `authority`.
/// Returns the number of clear blocks beyond the first of them.
fn set_aspects(inf: &mut Infrastructure, st: &ScanState, authority: usize, terminal: Option<SignalId>,
               complete: bool, config: &Config) -> i32 {
    let cleared: SmallVec<[(usize, SignalId); 8]> =
        st.stop_signals.iter().cloned().filter(|&(s, _)| s < authority).collect();
    let m = cleared.len();
    let mut first_depth = 0;
    for (j, &(_, sig)) in cleared.iter().enumerate() {
        let depth = ((m - 1 - j) as u32 + if complete { 1 } else { 0 }).max(1);
        if j == 0 {
            first_depth = depth as i32;
        }
        let desc = &inf.layout.signals[sig];
        let strength = if desc.working_method.is_time_interval() {
            let t = working_method::time_interval_strength(inf.signals[sig].last_train(), inf.time,
                        config.time_interval_caution_ticks, config.time_interval_clear_ticks);
            t.min(if desc.longblock { 4 } else { 1 })
        } else {
            desc.working_method.rules().clears_aspect(desc.aspects, depth)
        };
        let aspect = Aspect::from_strength(strength, desc.choose);
        inf.set_aspect(sig, aspect);
    }
    if let Some(sig) = terminal {
        inf.set_aspect(sig, Aspect::Danger);
    }
    for &(i, sig) in &st.distants {
        if i > authority {
            continue;
        }
        let aspect = match inf.roles[sig] {
            SignalRole::Distant(Some(home)) if inf.aspect(home).strength() > 0 => Aspect::Clear,
            _ => Aspect::Caution,
        };
        inf.set_aspect(sig, aspect);
    }
    first_depth
}

fn release(inf: &mut Infrastructure, convoy: &mut Convoy, handle: ConvoyHandle, start: usize) -> ReserveOutcome {
    for i in start..convoy.route.count() {
        let pos = convoy.route.at(i);
        if inf.segment(pos).map(|s| s.holds(handle)).unwrap_or(false) {
            inf.unreserve(pos, handle);
        }
        inf.release_crossing(pos, handle);
    }
    convoy.signaling.set_next_stop_index(start);
    convoy.signaling.queue_transition(None);
    ReserveOutcome::at(start, true)
}

/// Index of the first stop signal after `start` on the route, without
/// reserving anything.
pub fn find_next_signal(inf: &Infrastructure, route: &Route, start: usize) -> Option<usize> {
    (start + 1..route.count()).find(|&i| {
        match inf.signal_at(route.at(i), route.direction_at(i)) {
            Some(s) => inf.roles[s] == SignalRole::Stop,
            None => false,
        }
    })
}
