use log::{debug, info, warn};
use std::collections::VecDeque;

use crate::config::Config;
use crate::input::layout::{Coord, Layout};
use crate::output::history::ConvoyLogEvent;
use crate::railway::convoy::{Convoy, ConvoyHandle, ConvoyLogger, ConvoyParams, ConvoyRegistry, ConvoyState, Schedule};
use crate::railway::infrastructure::Infrastructure;
use crate::railway::pathfind::calc_route;
use crate::railway::reserver::{reserve_or_release, ReserveOutcome, ReserveRequest};
use crate::railway::ribi::Ribi;
use crate::railway::route::Route;
use crate::railway::segment::ReservationKind;
use crate::railway::signal::Aspect;
use crate::railway::working_method::WorkingMethod;

#[derive(Debug, Fail)]
pub enum WorldError {
    #[fail(display = "no track at {:?}", _0)]
    NoTrack(Coord),
    #[fail(display = "tile {:?} is already held by another convoy", _0)]
    Occupied(Coord),
}

/// Everything the convoy processes share.
pub struct World {
    pub infrastructure: Infrastructure,
    pub convoys: ConvoyRegistry,
    pub config: Config,
}

impl World {
    pub fn new(infrastructure: Infrastructure, config: Config) -> World {
        World { infrastructure, convoys: ConvoyRegistry::new(), config }
    }

    /// Places a convoy on a single tile and holds that tile for it.
    pub fn add_convoy(&mut self, name: &str, params: ConvoyParams, schedule: Schedule, pos: Coord,
                      heading: Ribi, logger: ConvoyLogger) -> Result<ConvoyHandle, WorldError> {
        if self.infrastructure.layout.track_tile(pos).is_none() {
            return Err(WorldError::NoTrack(pos));
        }
        if self.infrastructure.segment(pos).map(|s| s.is_reserved()).unwrap_or(false) {
            return Err(WorldError::Occupied(pos));
        }
        let convoy = Convoy::new(name.to_string(), params, schedule, pos, heading, logger);
        let handle = self.convoys.insert(convoy);
        self.infrastructure.reserve(pos, handle, heading, ReservationKind::Priority);
        info!("convoy {} placed at {:?}", name, pos);
        Ok(handle)
    }

    /// Removes a convoy, giving back everything it holds.
    pub fn remove_convoy(&mut self, handle: ConvoyHandle) -> Option<Convoy> {
        let convoy = self.convoys.remove(handle)?;
        let convoys = &self.convoys;
        let dropped = self.infrastructure.revalidate(|h| convoys.contains(h));
        debug!("convoy {} removed, {} reservations dropped", convoy.name, dropped);
        Some(convoy)
    }

    /// Reserves ahead of the convoy's front.
    pub fn reserve(&mut self, handle: ConvoyHandle, brake_steps: u32) -> Option<ReserveOutcome> {
        let World { infrastructure, convoys, config } = self;
        let convoy = convoys.get_mut(handle)?;
        let mut req = ReserveRequest::new(convoy.route_index, config);
        req.brake_steps = brake_steps;
        let out = reserve_or_release(infrastructure, convoy, handle, &req, config);
        convoy.log(infrastructure.time, ConvoyLogEvent::Authority {
            index: out.next_signal_index,
            success: out.success,
            blocks_ahead: out.blocks_ahead,
        });
        if out.recalculate {
            convoy.needs_route = true;
        }
        convoy.signaling.queue_transition(out.transition);
        convoy.blocked_by = if out.success { None } else { out.blocked_by };
        Some(out)
    }

    /// Gives back everything reserved ahead of the convoy's front tile.
    pub fn release_ahead(&mut self, handle: ConvoyHandle) {
        let World { infrastructure, convoys, config } = self;
        if let Some(convoy) = convoys.get_mut(handle) {
            let req = ReserveRequest::release(convoy.route_index + 1);
            reserve_or_release(infrastructure, convoy, handle, &req, config);
            convoy.signaling.set_next_stop_index(convoy.route_index);
        }
    }

    /// Replaces the convoy's route with a fresh one to its next scheduled
    /// halt. What the old route held ahead is released first. Returns false
    /// when no route exists in either direction.
    pub fn recalculate_route(&mut self, handle: ConvoyHandle) -> bool {
        let World { infrastructure: inf, convoys, config } = self;
        let convoy = match convoys.get_mut(handle) {
            Some(c) => c,
            None => return false,
        };

        let occupied: Vec<Coord> = convoy.occupied.iter().cloned().collect();
        for i in convoy.route_index + 1..convoy.route.count() {
            let pos = convoy.route.at(i);
            if !occupied.contains(&pos) {
                inf.mark_stale(pos, handle);
            }
        }
        inf.sweep_stale(handle);

        let halt = match convoy.schedule.current_entry() {
            Some(h) => h,
            None => return false,
        };
        let front = convoy.front();
        let heading = convoy.direction();
        let params = convoy.params;

        let mut tiles = calc_route(&inf.layout, front, heading, halt, &params, config.route_steps());
        if tiles.is_none() {
            let rear = convoy.occupied.front().cloned().unwrap_or(front);
            let back = reversed_heading(&convoy.occupied, heading);
            tiles = calc_route(&inf.layout, rear, back, halt, &params, config.route_steps());
            if tiles.is_some() {
                debug!("{}: reversing to reach {}", convoy.name, inf.layout.halts[halt].name);
                turn(convoy, back, &inf.layout);
            }
        }

        convoy.needs_route = false;
        match tiles {
            Some(tiles) => {
                convoy.log(inf.time, ConvoyLogEvent::Route { tiles: tiles.len() });
                convoy.route = Route::new(&inf.layout, tiles);
                convoy.route_index = 0;
                convoy.position = 0;
                convoy.signaling.set_next_stop_index(0);
                convoy.signaling.queue_transition(None);
                true
            }
            None => {
                warn!("{}: no route to {}", convoy.name, inf.layout.halts[halt].name);
                convoy.log(inf.time, ConvoyLogEvent::RouteNotFound);
                convoy.route = Route::new(&inf.layout, vec![front]);
                convoy.route_index = 0;
                convoy.position = 0;
                false
            }
        }
    }

    /// Deletes the way at `pos`. Convoys whose route ahead crosses it will
    /// look for a new one.
    pub fn remove_way(&mut self, pos: Coord) -> bool {
        if !self.infrastructure.remove_way(pos) {
            return false;
        }
        for (_, convoy) in self.convoys.iter_mut() {
            let ahead = convoy.route.tiles().iter().skip(convoy.route_index + 1).any(|t| *t == pos);
            if ahead {
                convoy.needs_route = true;
            }
        }
        true
    }

    /// Holds the tiles under the convoy with priority.
    pub fn reserve_own_tiles(&mut self, handle: ConvoyHandle) {
        let World { infrastructure: inf, convoys, .. } = self;
        if let Some(convoy) = convoys.get(handle) {
            let dir = convoy.direction();
            for pos in &convoy.occupied {
                if !inf.reserve(*pos, handle, dir, ReservationKind::Priority) {
                    warn!("{}: could not hold own tile {:?}", convoy.name, pos);
                }
            }
        }
    }

    /// Drops the convoy's authority ahead and puts it on drive-by-sight.
    /// A signal at its front is called on so it may pass at sight.
    pub fn force_drive_by_sight(&mut self, handle: ConvoyHandle) {
        self.release_ahead(handle);
        self.reserve_own_tiles(handle);
        let World { infrastructure: inf, convoys, .. } = self;
        if let Some(convoy) = convoys.get_mut(handle) {
            convoy.signaling.set_working_method(WorkingMethod::DriveBySight);
            if convoy.route.count() > 1 {
                let i = convoy.route_index;
                if let Some(s) = inf.signal_at(convoy.route.at(i), convoy.route.direction_at(i)) {
                    inf.set_aspect(s, Aspect::CallOn);
                }
            }
            info!("{}: drive by sight", convoy.name);
            convoy.log(inf.time, ConvoyLogEvent::DriveBySight);
        }
    }

    /// Turns the convoy around and sends it back along its schedule.
    pub fn reverse_convoy(&mut self, handle: ConvoyHandle) {
        self.release_ahead(handle);
        let World { infrastructure: inf, convoys, .. } = self;
        if let Some(convoy) = convoys.get_mut(handle) {
            let back = reversed_heading(&convoy.occupied, convoy.direction());
            turn(convoy, back, &inf.layout);
            convoy.schedule.reverse_direction();
            convoy.signaling.set_working_method(WorkingMethod::DriveBySight);
            convoy.blocked_by = None;
            convoy.needs_route = true;
            if convoy.state == ConvoyState::Finished {
                convoy.state = ConvoyState::Driving;
            }
            convoy.log(inf.time, ConvoyLogEvent::Reversed);
        }
    }
}

fn reversed_heading(occupied: &VecDeque<Coord>, heading: Ribi) -> Ribi {
    let mut it = occupied.iter().rev();
    match (it.next(), it.next()) {
        (Some(front), Some(behind)) if front != behind => Ribi::between(*front, *behind),
        _ => heading.backward(),
    }
}

/// Swaps front and rear.
fn turn(convoy: &mut Convoy, heading: Ribi, layout: &Layout) {
    let reversed: VecDeque<Coord> = convoy.occupied.iter().rev().cloned().collect();
    convoy.occupied = reversed;
    convoy.heading = heading;
    let front = convoy.front();
    convoy.route = Route::new(layout, vec![front]);
    convoy.route_index = 0;
    convoy.position = 0;
    convoy.speed = 0;
}
