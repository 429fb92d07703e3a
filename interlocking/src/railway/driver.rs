use log::{debug, info};

use crate::eventsim::{Process, ProcessState, Simulation, Tick};
use crate::input::layout::{Coord, CrossingId};
use crate::output::history::ConvoyLogEvent;
use crate::railway::convoy::{ConvoyHandle, ConvoyState};
use crate::railway::deadlock;
use crate::railway::distant::SignalRole;
use crate::railway::dynamics::{braking_steps, dynamic_plan_step, DriverAction};
use crate::railway::reserver::find_next_signal;
use crate::railway::route::STEPS_PER_TILE;
use crate::railway::signal::Aspect;
use crate::railway::working_method::WorkingMethod;
use crate::railway::world::World;

/// Drives one convoy: keeps a route, asks for authority ahead, moves within
/// it and frees what the rear leaves behind. Polled every tick while moving.
pub struct Driver {
    convoy: ConvoyHandle,
}

impl Driver {
    pub fn new(convoy: ConvoyHandle) -> Driver {
        Driver { convoy }
    }

    fn tick(&mut self, world: &mut World, now: Tick) -> ProcessState {
        let h = self.convoy;
        let state = match world.convoys.get(h) {
            Some(c) => c.state,
            None => return ProcessState::Finished,
        };
        match state {
            ConvoyState::Finished => {
                world.remove_convoy(h);
                return ProcessState::Finished;
            }
            ConvoyState::Loading(until) if now < until => return ProcessState::Wait(until - now),
            ConvoyState::Loading(_) => return self.depart(world, now),
            ConvoyState::Driving => {}
        }

        if world.convoys[h].schedule.current_entry().is_none() {
            return self.finish(world, now);
        }
        if world.convoys[h].needs_route && !world.recalculate_route(h) {
            return ProcessState::Wait(world.config.retry_ticks);
        }
        if world.convoys[h].at_route_end() {
            return self.arrive(world, now);
        }

        let (ahead, want, brake_steps, more) = {
            let c = &world.convoys[h];
            let limit = c.route.steps_at(c.signaling.next_stop_index());
            let v = c.speed + c.params.accel.max(1);
            let want = v + braking_steps(v, c.params.brake) + 2 * STEPS_PER_TILE;
            let brake_steps = braking_steps(c.params.min_top_speed, c.params.brake) + STEPS_PER_TILE;
            let more = c.signaling.next_stop_index() < c.route.last_index();
            (limit.saturating_sub(c.position), want, brake_steps, more)
        };
        if ahead < want && more {
            if let Some(out) = world.reserve(h, brake_steps) {
                if out.recalculate {
                    return ProcessState::Wait(1);
                }
                if !out.success && out.blocked_by.is_some() {
                    deadlock::resolve(world, h);
                    if world.convoys[h].needs_route {
                        return ProcessState::Wait(1);
                    }
                }
            }
        }

        self.drive(world, now)
    }

    fn drive(&mut self, world: &mut World, now: Tick) -> ProcessState {
        let h = self.convoy;
        let vmax = speed_limit(world, h);
        let new_index = {
            let c = &mut world.convoys[h];
            let limit = c.route.steps_at(c.signaling.next_stop_index());
            let plan = dynamic_plan_step(&c.params, c.speed, vmax, limit.saturating_sub(c.position));
            if plan.action == DriverAction::Coast && plan.step.v == 0 {
                c.speed = 0;
                return ProcessState::Wait(world.config.retry_ticks);
            }
            c.speed = plan.step.v;
            c.position += plan.step.dx;
            c.route.index_at_steps(c.position).min(c.route.last_index())
        };
        while world.convoys[h].route_index < new_index {
            let j = world.convoys[h].route_index + 1;
            self.enter_tile(world, j, now);
        }
        ProcessState::Wait(1)
    }

    /// Moves the front onto route tile `j`.
    fn enter_tile(&mut self, world: &mut World, j: usize, now: Tick) {
        let h = self.convoy;
        let World { infrastructure: inf, convoys, .. } = world;
        let c = &mut convoys[h];
        let left = c.route.at(j - 1);
        if let Some(s) = inf.signal_at(left, c.route.direction_at(j - 1)) {
            if inf.roles[s] == SignalRole::Stop {
                let departing = c.last_stop_pos == Some(left);
                inf.set_aspect(s, Aspect::Danger);
                inf.signals[s].train_passed(now, departing);
            }
        }
        // the method queued by the reserver takes over once the block is entered
        if let Some((at, next)) = c.signaling.pending_transition() {
            if at == left {
                info!("{}: {:?} -> {:?} at {:?}", c.name, c.signaling.working_method(), next, at);
                c.signaling.set_working_method(next);
                c.signaling.set_last_signal_pos(Some(at));
                c.signaling.queue_transition(None);
                c.log(now, ConvoyLogEvent::Transition(next));
            }
        }

        let pos = c.route.at(j);
        c.route_index = j;
        c.heading = c.route.direction_at(j);
        c.occupied.push_back(pos);
        c.log(now, ConvoyLogEvent::Tile(pos));
        while c.occupied.len() > c.params.tile_length.max(1) as usize {
            if let Some(rear) = c.occupied.pop_front() {
                if !c.occupied.contains(&rear) {
                    inf.unreserve(rear, h);
                    inf.release_crossing(rear, h);
                }
            }
        }
    }

    fn arrive(&mut self, world: &mut World, now: Tick) -> ProcessState {
        let h = self.convoy;
        let dwell = world.config.dwell_ticks;
        let retry = world.config.retry_ticks;
        let World { infrastructure: inf, convoys, .. } = world;
        let c = &mut convoys[h];
        let front = c.front();
        c.speed = 0;
        match c.schedule.current_entry() {
            Some(halt) if inf.layout.halt_at(front) == Some(halt) => {
                debug!("{}: arrived at {}", c.name, inf.layout.halts[halt].name);
                c.log(now, ConvoyLogEvent::Arrived(halt));
                c.last_stop_pos = Some(front);
                c.state = ConvoyState::Loading(now + dwell);
                ProcessState::Wait(dwell)
            }
            _ => {
                c.needs_route = true;
                ProcessState::Wait(retry)
            }
        }
    }

    fn depart(&mut self, world: &mut World, now: Tick) -> ProcessState {
        let h = self.convoy;
        let c = &mut world.convoys[h];
        if let Some(halt) = c.schedule.current_entry() {
            c.log(now, ConvoyLogEvent::Departed(halt));
        }
        c.state = ConvoyState::Driving;
        if !c.schedule.advance() {
            return self.finish(world, now);
        }
        c.needs_route = true;
        ProcessState::Wait(1)
    }

    fn finish(&mut self, world: &mut World, now: Tick) -> ProcessState {
        let h = self.convoy;
        if let Some(c) = world.convoys.get_mut(h) {
            info!("{}: schedule done", c.name);
            c.state = ConvoyState::Finished;
            c.log(now, ConvoyLogEvent::Finished);
        }
        world.remove_convoy(h);
        ProcessState::Finished
    }
}

impl Process<World> for Driver {
    fn resume(&mut self, sim: &mut Simulation<World>) -> ProcessState {
        let now = sim.time();
        sim.world.infrastructure.time = now;
        self.tick(&mut sim.world, now)
    }
}

/// Top speed for the next tick. Under time interval working the convoy runs
/// at caution speed while the next stop signal does not show clear.
fn speed_limit(world: &World, h: ConvoyHandle) -> u32 {
    let c = &world.convoys[h];
    let top = c.params.min_top_speed.max(1);
    let caution = (top / 2).max(1);
    let inf = &world.infrastructure;
    match c.signaling.working_method() {
        WorkingMethod::DriveBySight => caution,
        m if m.is_time_interval() => match find_next_signal(inf, &c.route, c.route_index) {
            Some(i) => {
                let s = inf.signal_at(c.route.at(i), c.route.direction_at(i));
                match s.map(|s| inf.aspect(s)) {
                    Some(a) if a.strength() >= 2 => top,
                    _ => caution,
                }
            }
            None => top,
        },
        _ => top,
    }
}

/// Road users wanting to cross the line at a level crossing. Waits until the
/// crossing is open to road traffic, then holds it for `hold` ticks.
pub struct RoadTraffic {
    crossing: CrossingId,
    pos: Coord,
    hold: Tick,
    crossing_since: Option<Tick>,
}

impl RoadTraffic {
    pub fn new(crossing: CrossingId, pos: Coord, hold: Tick) -> RoadTraffic {
        RoadTraffic { crossing, pos, hold, crossing_since: None }
    }
}

impl Process<World> for RoadTraffic {
    fn resume(&mut self, sim: &mut Simulation<World>) -> ProcessState {
        let now = sim.time();
        let inf = &mut sim.world.infrastructure;
        inf.time = now;
        match self.crossing_since {
            None => {
                if inf.request_road(self.crossing) {
                    debug!("road traffic on crossing at {:?}", self.pos);
                    self.crossing_since = Some(now);
                    ProcessState::Wait(self.hold)
                } else {
                    ProcessState::Wait(1)
                }
            }
            Some(t) if now < t + self.hold => ProcessState::Wait(t + self.hold - now),
            Some(_) => {
                inf.release_road(self.crossing);
                ProcessState::Finished
            }
        }
    }
}
