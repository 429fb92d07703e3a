use generational_arena::{Arena, Index};
use std::collections::VecDeque;

use crate::eventsim::Tick;
use crate::input::layout::{Coord, HaltId};
use crate::output::history::ConvoyLogEvent;
use crate::railway::ribi::Ribi;
use crate::railway::route::Route;
use crate::railway::working_method::WorkingMethod;

/// Handle into the convoy registry. A handle to a removed convoy is never
/// resolved to a newer convoy in the same slot.
pub type ConvoyHandle = Index;
pub type ConvoyRegistry = Arena<Convoy>;
pub type ConvoyLogger = Box<dyn Fn(Tick, ConvoyLogEvent)>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConvoyParams {
    pub tile_length: u32,
    pub highest_axle_load: u32,
    /// Steps per tick.
    pub min_top_speed: u32,
    pub accel: u32,
    pub brake: u32,
}

impl Default for ConvoyParams {
    fn default() -> ConvoyParams {
        ConvoyParams { tile_length: 1, highest_axle_load: 10, min_top_speed: 8, accel: 1, brake: 1 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub entries: Vec<HaltId>,
    pub current: usize,
    pub repeat: bool,
}

impl Schedule {
    pub fn new(entries: Vec<HaltId>, repeat: bool) -> Schedule {
        Schedule { entries, current: 0, repeat }
    }

    pub fn current_entry(&self) -> Option<HaltId> {
        self.entries.get(self.current).cloned()
    }

    /// Moves to the next entry. Returns false when the schedule is done.
    pub fn advance(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if self.current + 1 < self.entries.len() {
            self.current += 1;
            true
        } else if self.repeat {
            self.current = 0;
            true
        } else {
            self.current = self.entries.len();
            false
        }
    }

    /// Runs the schedule backwards, heading for the entry before the
    /// current one.
    pub fn reverse_direction(&mut self) {
        let n = self.entries.len();
        if n == 0 {
            return;
        }
        self.entries.reverse();
        self.current = n - 1 - self.current.min(n - 1);
        self.current = (self.current + 1) % n;
    }
}

/// The part of a convoy's state that the reserver reads and updates.
#[derive(Debug, Clone, Default)]
pub struct SignalingContext {
    working_method: WorkingMethod,
    last_signal_pos: Option<Coord>,
    next_stop_index: usize,
    pending_transition: Option<(Coord, WorkingMethod)>,
    is_choosing: bool,
}

impl SignalingContext {
    pub fn working_method(&self) -> WorkingMethod { self.working_method }
    pub fn set_working_method(&mut self, m: WorkingMethod) { self.working_method = m; }
    pub fn last_signal_pos(&self) -> Option<Coord> { self.last_signal_pos }
    pub fn set_last_signal_pos(&mut self, pos: Option<Coord>) { self.last_signal_pos = pos; }
    pub fn next_stop_index(&self) -> usize { self.next_stop_index }
    pub fn set_next_stop_index(&mut self, i: usize) { self.next_stop_index = i; }
    /// Method change waiting for the front to leave the signal on that tile.
    pub fn pending_transition(&self) -> Option<(Coord, WorkingMethod)> { self.pending_transition }
    pub fn queue_transition(&mut self, t: Option<(Coord, WorkingMethod)>) { self.pending_transition = t; }
    pub fn is_choosing(&self) -> bool { self.is_choosing }
    pub fn set_choosing(&mut self, c: bool) { self.is_choosing = c; }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConvoyState {
    Driving,
    /// Standing at a halt until the given tick.
    Loading(Tick),
    Finished,
}

pub struct Convoy {
    pub name: String,
    pub params: ConvoyParams,
    pub schedule: Schedule,
    pub route: Route,
    /// Index in `route` of the front tile.
    pub route_index: usize,
    /// Position of the front along the route, in steps.
    pub position: u32,
    pub heading: Ribi,
    /// Occupied tiles, rear first.
    pub occupied: VecDeque<Coord>,
    pub speed: u32,
    pub signaling: SignalingContext,
    pub last_stop_pos: Option<Coord>,
    pub blocked_by: Option<ConvoyHandle>,
    pub needs_route: bool,
    pub state: ConvoyState,
    pub logger: ConvoyLogger,
}

impl Convoy {
    pub fn new(name: String, params: ConvoyParams, schedule: Schedule, pos: Coord,
               heading: Ribi, logger: ConvoyLogger) -> Convoy {
        let mut occupied = VecDeque::new();
        occupied.push_back(pos);
        Convoy {
            name,
            params,
            schedule,
            route: Route::default(),
            route_index: 0,
            position: 0,
            heading,
            occupied,
            speed: 0,
            signaling: Default::default(),
            last_stop_pos: Some(pos),
            blocked_by: None,
            needs_route: true,
            state: ConvoyState::Driving,
            logger,
        }
    }

    pub fn front(&self) -> Coord {
        match self.occupied.back() {
            Some(p) => *p,
            None => self.route.at(self.route_index),
        }
    }

    pub fn log(&self, now: Tick, ev: ConvoyLogEvent) {
        (self.logger)(now, ev);
    }

    /// Direction of travel at the front tile.
    pub fn direction(&self) -> Ribi {
        if self.route.count() > 1 {
            self.route.direction_at(self.route_index)
        } else {
            self.heading
        }
    }

    pub fn at_route_end(&self) -> bool {
        self.route_index + 1 >= self.route.count()
            && self.position >= self.route.steps_at(self.route.last_index())
    }
}

#[test]
fn test_schedule_reverse() {
    let mut s = Schedule::new(vec![10, 11, 12], false);
    assert!(s.advance());
    assert!(s.advance());
    assert_eq!(s.current_entry(), Some(12));
    // heading for 12, having left 11
    s.reverse_direction();
    assert_eq!(s.current_entry(), Some(11));
    assert!(s.advance());
    assert_eq!(s.current_entry(), Some(10));
    assert!(!s.advance());
    assert_eq!(s.current_entry(), None);

    let mut r = Schedule::new(vec![1, 2], true);
    assert!(r.advance());
    assert!(r.advance());
    assert_eq!(r.current_entry(), Some(1));
}
