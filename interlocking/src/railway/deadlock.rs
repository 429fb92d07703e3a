//! Head-on deadlock between two convoys waiting on each other.

use log::info;

use crate::railway::convoy::{Convoy, ConvoyHandle};
use crate::railway::infrastructure::convoy_id;
use crate::railway::world::World;

/// Both convoys wait for each other and each has the other's front on its
/// route ahead.
pub fn is_deadlocked(world: &World, a: ConvoyHandle, b: ConvoyHandle) -> bool {
    match (world.convoys.get(a), world.convoys.get(b)) {
        (Some(ca), Some(cb)) => {
            ca.blocked_by == Some(b) && cb.blocked_by == Some(a) && heads_for(ca, cb) && heads_for(cb, ca)
        }
        _ => false,
    }
}

fn heads_for(c: &Convoy, other: &Convoy) -> bool {
    let ahead = &c.route.tiles()[c.route_index.min(c.route.count())..];
    other.occupied.iter().any(|p| ahead.contains(p))
}

fn distance_to_last_stop(c: &Convoy) -> u32 {
    match c.last_stop_pos {
        Some(p) => c.front().tile_distance(p),
        None => u32::max_value(),
    }
}

/// Picks which of two deadlocked convoys turns back: the one closer to the
/// halt it last stopped at, then the lower registry slot.
pub fn pick_reverser(world: &World, a: ConvoyHandle, b: ConvoyHandle) -> Option<ConvoyHandle> {
    let key = |h: ConvoyHandle| world.convoys.get(h).map(|c| (distance_to_last_stop(c), convoy_id(h)));
    let (ka, kb) = (key(a)?, key(b)?);
    Some(if ka <= kb { a } else { b })
}

/// Resolves a deadlock involving `handle`, if there is one, by reversing
/// one of the two convoys. Returns the convoy that was reversed.
pub fn resolve(world: &mut World, handle: ConvoyHandle) -> Option<ConvoyHandle> {
    let other = world.convoys.get(handle)?.blocked_by?;
    if !is_deadlocked(world, handle, other) {
        return None;
    }
    let loser = pick_reverser(world, handle, other)?;
    let winner = if loser == handle { other } else { handle };
    info!("deadlock: {} reverses for {}", world.convoys[loser].name, world.convoys[winner].name);
    world.reverse_convoy(loser);
    if let Some(c) = world.convoys.get_mut(winner) {
        c.blocked_by = None;
    }
    Some(loser)
}
