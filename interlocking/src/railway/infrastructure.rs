use log::{debug, trace};

use crate::eventsim::Tick;
use crate::input::layout::{Coord, CrossingId, Layout, SignalId};
use crate::output::history::InfrastructureLogEvent;
use crate::railway::convoy::ConvoyHandle;
use crate::railway::crossing::Crossing;
use crate::railway::distant::{self, SignalRole};
use crate::railway::ribi::Ribi;
use crate::railway::segment::{ReservationKind, TrackSegment};
use crate::railway::signal::{Aspect, Signal};

pub type InfLogger = Box<dyn Fn(Tick, InfrastructureLogEvent)>;

/// Layout plus everything about it that changes while trains run:
/// segment reservations, signal aspects and crossings.
pub struct Infrastructure {
    pub layout: Layout,
    pub segments: Vec<TrackSegment>,
    pub signals: Vec<Signal>,
    pub roles: Vec<SignalRole>,
    pub crossings: Vec<Crossing>,
    pub time: Tick,
    pub logger: InfLogger,
}

use std::fmt;
impl fmt::Debug for Infrastructure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Infrastructure {{ tiles: {}, signals: {:?}, time: {} }}",
               self.segments.len(), self.signals, self.time)
    }
}

pub fn convoy_id(c: ConvoyHandle) -> usize {
    c.into_raw_parts().0
}

impl Infrastructure {
    pub fn new(layout: Layout, logger: InfLogger) -> Infrastructure {
        let segments = layout.tiles.iter().map(|t| {
            let junction = t.way.as_ref().map(|w| w.ribi.is_junction()).unwrap_or(false);
            TrackSegment::new(junction, t.crossing.is_some())
        }).collect();
        let signals = layout.signals.iter().enumerate()
            .map(|(i, d)| Signal::new(i, d.working_method, distant::protects_junction(&layout, i)))
            .collect();
        let crossings = layout.crossings.iter().map(|_| Crossing::new()).collect();
        let roles = distant::signal_roles(&layout);
        let mut inf = Infrastructure { layout, segments, signals, roles, crossings, time: 0, logger };
        for s in 0..inf.signals.len() {
            if let SignalRole::Distant(_) = inf.roles[s] {
                inf.signals[s].set_state(Aspect::Caution);
            }
        }
        inf
    }

    fn log(&self, ev: InfrastructureLogEvent) {
        (self.logger)(self.time, ev);
    }

    pub fn segment(&self, pos: Coord) -> Option<&TrackSegment> {
        self.layout.track_tile(pos).map(|t| &self.segments[t])
    }

    pub fn can_reserve(&self, pos: Coord, convoy: ConvoyHandle, dir: Ribi) -> bool {
        self.segment(pos).map(|s| s.can_reserve(convoy, dir)).unwrap_or(false)
    }

    /// Reserves the way at `pos`. Bidirectional signals on the tile that
    /// face against a changed reservation direction drop to danger.
    pub fn reserve(&mut self, pos: Coord, convoy: ConvoyHandle, dir: Ribi, kind: ReservationKind) -> bool {
        let tile = match self.layout.track_tile(pos) {
            Some(t) => t,
            None => return false,
        };
        let seg = &mut self.segments[tile];
        let was = (seg.holds(convoy), seg.direction, seg.kind);
        if !seg.reserve(convoy, dir, kind) {
            return false;
        }
        let now = (true, seg.direction, seg.kind);
        if was != now {
            self.log(InfrastructureLogEvent::Reserved {
                tile: pos, convoy: convoy_id(convoy), kind: now.2, direction: dir });
        }
        if was.1 != now.1 {
            let against: Vec<SignalId> = self.layout.tiles[tile].signals.iter().cloned()
                .filter(|s| self.layout.signals[*s].bidirectional && self.layout.signals[*s].facing != dir)
                .collect();
            for s in against {
                self.set_aspect(s, Aspect::Danger);
            }
        }
        true
    }

    pub fn unreserve(&mut self, pos: Coord, convoy: ConvoyHandle) -> bool {
        let tile = match self.layout.track_tile(pos) {
            Some(t) => t,
            None => return false,
        };
        if !self.segments[tile].unreserve(convoy) {
            return false;
        }
        self.log(InfrastructureLogEvent::Released { tile: pos, convoy: convoy_id(convoy) });
        if !self.segments[tile].is_reserved() {
            self.reset_signals_on(tile);
        }
        true
    }

    fn reset_signals_on(&mut self, tile: usize) {
        let signals: Vec<SignalId> = self.layout.tiles[tile].signals.iter().cloned().collect();
        for s in signals {
            let rest = match self.roles[s] {
                SignalRole::Distant(_) => Aspect::Caution,
                SignalRole::Stop => Aspect::Danger,
            };
            self.set_aspect(s, rest);
        }
    }

    pub fn signal_at(&self, pos: Coord, dir: Ribi) -> Option<SignalId> {
        self.layout.signal_facing(pos, dir)
    }

    pub fn aspect(&self, signal: SignalId) -> Aspect {
        self.signals[signal].get_state()
    }

    pub fn set_aspect(&mut self, signal: SignalId, aspect: Aspect) {
        if self.signals[signal].get_state() != aspect {
            trace!("signal {} -> {:?}", self.layout.signals[signal].name, aspect);
            self.signals[signal].set_state(aspect);
            self.log(InfrastructureLogEvent::Aspect { signal, aspect });
        }
    }

    pub fn crossing_at(&self, pos: Coord) -> Option<CrossingId> {
        self.layout.tile(pos).and_then(|t| t.crossing)
    }

    pub fn crossing_held_by(&self, pos: Coord, convoy: ConvoyHandle) -> bool {
        self.crossing_at(pos).map(|c| self.crossings[c].holds(convoy)).unwrap_or(false)
    }

    /// Only `convoy` holds the segment at `pos`, or nobody does.
    pub fn is_free_for(&self, pos: Coord, convoy: ConvoyHandle) -> bool {
        self.segment(pos).map(|s| s.holders.iter().all(|h| *h == convoy)).unwrap_or(false)
    }

    /// Requests the crossing at `pos` for a convoy. Tiles without a crossing
    /// always succeed.
    pub fn request_crossing(&mut self, pos: Coord, convoy: ConvoyHandle) -> bool {
        match self.crossing_at(pos) {
            Some(c) => {
                let was_closed = self.crossings[c].is_closed_to_road();
                if !self.crossings[c].request_crossing(convoy) {
                    return false;
                }
                if !was_closed {
                    self.log(InfrastructureLogEvent::Crossing { crossing: c, closed_to_road: true });
                }
                true
            }
            None => true,
        }
    }

    pub fn release_crossing(&mut self, pos: Coord, convoy: ConvoyHandle) {
        if let Some(c) = self.crossing_at(pos) {
            if self.crossings[c].release_crossing(convoy) && !self.crossings[c].is_closed_to_road() {
                self.log(InfrastructureLogEvent::Crossing { crossing: c, closed_to_road: false });
            }
        }
    }

    pub fn request_road(&mut self, crossing: CrossingId) -> bool {
        self.crossings[crossing].request_road()
    }

    pub fn release_road(&mut self, crossing: CrossingId) {
        self.crossings[crossing].release_road();
    }

    /// Deletes the way at `pos` along with its signals and reservations.
    pub fn remove_way(&mut self, pos: Coord) -> bool {
        let tile = match self.layout.track_tile(pos) {
            Some(t) => t,
            None => return false,
        };
        let signals: Vec<SignalId> = self.layout.tiles[tile].signals.iter().cloned().collect();
        for s in signals {
            self.set_aspect(s, Aspect::Danger);
        }
        if !self.layout.remove_way(pos) {
            return false;
        }
        self.segments[tile] = TrackSegment::new(false, false);
        self.refresh_signals();
        for (i, t) in self.layout.tiles.iter().enumerate() {
            self.segments[i].is_junction = t.way.as_ref().map(|w| w.ribi.is_junction()).unwrap_or(false);
        }
        debug!("way removed at {:?}", pos);
        self.log(InfrastructureLogEvent::WayRemoved(pos));
        true
    }

    fn refresh_signals(&mut self) {
        self.roles = distant::signal_roles(&self.layout);
        for s in 0..self.signals.len() {
            self.signals[s].protects_junction = distant::protects_junction(&self.layout, s);
        }
    }

    pub fn mark_stale(&mut self, pos: Coord, convoy: ConvoyHandle) {
        if let Some(tile) = self.layout.track_tile(pos) {
            self.segments[tile].mark_stale(convoy);
        }
    }

    /// Releases every segment `convoy` marked stale. Holds of other convoys
    /// on the same segments stay.
    pub fn sweep_stale(&mut self, convoy: ConvoyHandle) -> usize {
        let stale: Vec<Coord> = self.layout.tiles.iter().enumerate()
            .filter(|&(i, _)| self.segments[i].is_stale_for(convoy))
            .map(|(_, t)| t.pos)
            .collect();
        for pos in &stale {
            self.unreserve(*pos, convoy);
            self.release_crossing(*pos, convoy);
        }
        if !stale.is_empty() {
            debug!("swept {} stale reservations", stale.len());
        }
        stale.len()
    }

    pub fn held_by(&self, convoy: ConvoyHandle) -> Vec<Coord> {
        self.layout.tiles.iter().enumerate()
            .filter(|&(i, _)| self.segments[i].holds(convoy))
            .map(|(_, t)| t.pos)
            .collect()
    }

    /// Drops reservations and crossing requests of convoys that no longer exist.
    pub fn revalidate<F: Fn(ConvoyHandle) -> bool>(&mut self, live: F) -> usize {
        let mut dropped = 0;
        for tile in 0..self.segments.len() {
            if self.segments[tile].retain_holders(&live) {
                dropped += 1;
                if !self.segments[tile].is_reserved() {
                    self.reset_signals_on(tile);
                }
            }
        }
        for c in &mut self.crossings {
            c.retain_rail(&live);
        }
        dropped
    }
}
