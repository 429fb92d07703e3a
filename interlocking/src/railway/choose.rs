//! Choose signals: when the line beyond one is occupied, look for another
//! free way to the convoy's destination and take it.

use log::debug;

use crate::config::Config;
use crate::input::layout::{Coord, SignalId};
use crate::output::history::ConvoyLogEvent;
use crate::railway::convoy::{Convoy, ConvoyHandle};
use crate::railway::infrastructure::Infrastructure;
use crate::railway::pathfind::{find_route, platform_end};
use crate::railway::reserver::{reserve_or_release, ReserveOutcome, ReserveRequest};
use crate::railway::signal::Aspect;

/// Searches a free path from the choose signal at route index `c` and, if
/// one exists, splices it into the route and reserves along it. The route
/// is left as it was when nothing can be reserved.
///
/// The search ends at the first end-of-choose sign on the current route,
/// after which the original route is kept, or otherwise at a free platform
/// end of the next scheduled halt. A second choose signal before either
/// makes the choice ambiguous and nothing is searched.
pub fn choose_route(inf: &mut Infrastructure, convoy: &mut Convoy, handle: ConvoyHandle,
                    req: &ReserveRequest, config: &Config, c: usize, sig: SignalId) -> Option<ReserveOutcome> {
    let halt = convoy.schedule.current_entry()?;

    let mut break_index = None;
    for j in c + 1..convoy.route.count() {
        let pos = convoy.route.at(j);
        if let Some(s) = inf.signal_at(pos, convoy.route.direction_at(j)) {
            if inf.layout.signals[s].choose {
                debug!("{}: second choose signal at {:?}, not choosing", convoy.name, pos);
                return None;
            }
        }
        if inf.layout.way(pos).map(|w| w.end_of_choose).unwrap_or(false) {
            break_index = Some(j);
            break;
        }
    }

    let from = convoy.route.at(c);
    let heading = convoy.route.direction_at(c);
    let axle = convoy.params.highest_axle_load;
    let path = {
        let shared: &Infrastructure = inf;
        let passable = |p: Coord, _| shared.is_free_for(p, handle);
        match break_index {
            Some(e) => {
                let target = convoy.route.at(e);
                find_route(&shared.layout, from, heading, axle, |p, _| p == target, passable, config.choose_steps())
            }
            None => {
                let goal = platform_end(&shared.layout, halt, convoy.params.tile_length);
                find_route(&shared.layout, from, heading, axle, goal, passable, config.choose_steps())
            }
        }
    }?;

    for j in c + 1..convoy.route.count() {
        let pos = convoy.route.at(j);
        if inf.segment(pos).map(|s| s.holds(handle)).unwrap_or(false) {
            inf.unreserve(pos, handle);
        }
        inf.release_crossing(pos, handle);
    }
    let old_tail = convoy.route.replace_suffix(&inf.layout, c, path);
    if let Some(e) = break_index {
        let rejoin: Vec<Coord> = old_tail.iter().cloned().skip(e - c).collect();
        convoy.route.append(&inf.layout, rejoin);
    }

    convoy.signaling.set_choosing(true);
    let inner = ReserveRequest { start_index: c, ..*req };
    let out = reserve_or_release(inf, convoy, handle, &inner, config);
    convoy.signaling.set_choosing(false);

    if !out.success {
        for j in c + 1..convoy.route.count() {
            let pos = convoy.route.at(j);
            inf.unreserve(pos, handle);
            inf.release_crossing(pos, handle);
        }
        let mut original = vec![from];
        original.extend(old_tail);
        convoy.route.replace_suffix(&inf.layout, c, original);
        debug!("{}: diverging path from {:?} could not be reserved", convoy.name, from);
        return None;
    }

    let aspect = inf.aspect(sig);
    if aspect.is_no_choose() {
        inf.set_aspect(sig, Aspect::from_strength(aspect.strength(), false));
    }
    debug!("{}: chose a new route at {:?}", convoy.name, from);
    convoy.log(inf.time, ConvoyLogEvent::ChoseRoute { signal: sig });
    Some(ReserveOutcome { choose_taken: Some(sig), ..out })
}
