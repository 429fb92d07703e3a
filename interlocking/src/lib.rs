#[macro_use] extern crate failure_derive;

pub mod config;
pub mod input;
pub mod output;
pub mod eventsim;
pub mod railway;

#[cfg(test)]
mod tests;

use log::info;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::config::Config;
use crate::input::dispatch::{self, Dispatch, DispatchAction};
use crate::input::layout::{Coord, Layout};
use crate::eventsim::Tick;
use crate::output::history::{ConvoyLogEvent, History, InfrastructureLogEvent};
use crate::output::snapshot::{self, ReservationRecord};
use crate::railway::convoy::Schedule;
use crate::railway::driver::{Driver, RoadTraffic};
use crate::railway::infrastructure::Infrastructure;
use crate::railway::world::World;
use crate::railway::Sim;

#[derive(Debug, Fail)]
pub enum PlanError {
    #[fail(display = "convoy {} stops at unknown halt {}", _0, _1)]
    UnknownHalt(String, String),
    #[fail(display = "no level crossing at {:?}", _0)]
    NoCrossing(Coord),
}

/// Runs a dispatch plan on a layout until `config.max_ticks` and returns
/// what happened.
pub fn evaluate_plan(layout: Layout, dispatch: &Dispatch, config: Config) -> AppResult<History> {
    Ok(evaluate_plan_with_snapshot(layout, dispatch, config)?.0)
}

/// As `evaluate_plan`, also returning the reservations held when the run ends.
pub fn evaluate_plan_with_snapshot(layout: Layout, dispatch: &Dispatch, config: Config)
                                   -> AppResult<(History, Vec<ReservationRecord>)> {
    let inf_log = Rc::new(RefCell::new(Vec::new()));
    let mut convoy_logs = Vec::new();

    let world_log = inf_log.clone();
    let infrastructure = Infrastructure::new(layout, Box::new(move |t: Tick, e: InfrastructureLogEvent| world_log.borrow_mut().push((t, e))));
    let max_ticks = config.max_ticks;
    let mut sim = Sim::new(World::new(infrastructure, config));

    for action in &dispatch.actions {
        match *action {
            DispatchAction::Wait(t) => sim.advance_by(t),
            DispatchAction::Remove(pos) => {
                sim.world.infrastructure.time = sim.time();
                if !sim.world.remove_way(pos) {
                    info!("nothing to remove at {:?}", pos);
                }
            }
            DispatchAction::Road(pos, hold) => {
                let crossing = sim.world.infrastructure.crossing_at(pos).ok_or(PlanError::NoCrossing(pos))?;
                sim.start_process(Box::new(RoadTraffic::new(crossing, pos, hold)));
            }
            DispatchAction::Convoy(ref spec) => {
                let layout = &sim.world.infrastructure.layout;
                let stops = spec.stops.iter()
                    .map(|s| layout.names.halts.get(s).cloned()
                        .ok_or_else(|| PlanError::UnknownHalt(spec.name.clone(), s.clone())))
                    .collect::<Result<Vec<_>, _>>()?;

                let log = Rc::new(RefCell::new(Vec::new()));
                convoy_logs.push((spec.name.clone(), log.clone()));
                let logger = Box::new(move |t: Tick, e: ConvoyLogEvent| log.borrow_mut().push((t, e)));

                sim.world.infrastructure.time = sim.time();
                let handle = sim.world.add_convoy(&spec.name, spec.params, Schedule::new(stops, spec.repeat),
                                                  spec.pos, spec.heading, logger)?;
                sim.world.convoys[handle].signaling.set_working_method(spec.working_method);
                sim.start_process(Box::new(Driver::new(handle)));
            }
        }
    }

    if sim.time() < max_ticks {
        sim.advance_to(max_ticks);
    }

    let records = snapshot::save(&sim.world.infrastructure);
    drop(sim);
    let history = History {
        inf: inf_log.replace(Vec::new()),
        convoys: convoy_logs.into_iter().map(|(n, v)| (n, v.replace(Vec::new()))).collect(),
    };
    Ok((history, records))
}

pub type AppResult<T> = Result<T, failure::Error>;

pub fn read_file(f: &Path) -> AppResult<String> {
    use std::fs::File;
    use std::io::prelude::*;
    use std::io::BufReader;

    let file = File::open(f)?;
    let mut file = BufReader::new(&file);
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

pub fn get_layout(s: &Path) -> AppResult<Layout> {
    let contents = read_file(s)?;
    get_layout_string(&contents)
}

pub fn get_layout_string(s: &str) -> AppResult<Layout> {
    Ok(input::layout_parser::parse_layout(s)?)
}

pub fn get_dispatch(s: &Path) -> AppResult<Dispatch> {
    let contents = read_file(s)?;
    let d = dispatch::parse_dispatch(&contents)?;
    Ok(d)
}
