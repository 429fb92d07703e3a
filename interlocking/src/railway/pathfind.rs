//! Route search over the tile grid.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use log::trace;

use crate::input::layout::{Coord, HaltId, Layout};
use crate::railway::convoy::ConvoyParams;
use crate::railway::ribi::Ribi;

const TILE_COST: f64 = 1.0;
const DIAGONAL_COST: f64 = 0.7;

type Node = (Coord, Ribi);

#[derive(PartialEq, Eq)]
struct QueueEntry {
    cost: OrderedFloat<f64>,
    seq: usize,
    node: Node,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &QueueEntry) -> Ordering {
        // flipped to pop the cheapest entry first
        other.cost.cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &QueueEntry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest route from `start`, travelling in direction `heading`, to a tile
/// accepted by `goal`. Trains do not reverse on the way, and one-way signs
/// and axle load limits are honoured. The search gives up after expanding
/// `max_steps` tiles.
pub fn find_route<G, P>(layout: &Layout, start: Coord, heading: Ribi, axle_load: u32, goal: G,
                        mut passable: P, max_steps: Option<usize>) -> Option<Vec<Coord>>
    where G: Fn(Coord, Ribi) -> bool,
          P: FnMut(Coord, Ribi) -> bool
{
    layout.track_tile(start)?;
    let mut queue = BinaryHeap::new();
    let mut came_from: HashMap<Node, Node> = HashMap::new();
    let mut best: HashMap<Node, OrderedFloat<f64>> = HashMap::new();
    let mut visited: HashSet<Node> = HashSet::new();
    let mut seq = 0;
    let mut expanded = 0;

    queue.push(QueueEntry { cost: OrderedFloat(0.0), seq, node: (start, heading) });
    while let Some(QueueEntry { cost, node, .. }) = queue.pop() {
        if !visited.insert(node) {
            continue;
        }
        let (pos, dir) = node;
        if goal(pos, dir) {
            let mut tiles = vec![pos];
            let mut n = node;
            while let Some(prev) = came_from.get(&n) {
                tiles.push(prev.0);
                n = *prev;
            }
            tiles.reverse();
            return Some(tiles);
        }

        expanded += 1;
        if let Some(max) = max_steps {
            if expanded > max {
                trace!("route search from {:?} gave up after {} tiles", start, max);
                return None;
            }
        }

        for (next, step) in layout.exits(pos, dir.backward()) {
            if visited.contains(&(next, step)) {
                continue;
            }
            let way = match layout.way(next) {
                Some(w) => w,
                None => continue,
            };
            if let Some(oneway) = way.oneway {
                if oneway != step {
                    continue;
                }
            }
            if !way.carries(axle_load) || !passable(next, step) {
                continue;
            }
            let step_cost = if way.diagonal { DIAGONAL_COST } else { TILE_COST };
            let next_cost = OrderedFloat(cost.into_inner() + step_cost);
            if best.get(&(next, step)).map(|b| next_cost >= *b).unwrap_or(false) {
                continue;
            }
            best.insert((next, step), next_cost);
            came_from.insert((next, step), node);
            seq += 1;
            queue.push(QueueEntry { cost: next_cost, seq, node: (next, step) });
        }
    }
    None
}

/// Goal test for stopping at the far end of a halt's platform with room
/// for `tile_length` tiles.
pub fn platform_end(layout: &Layout, halt: HaltId, tile_length: u32) -> impl Fn(Coord, Ribi) -> bool + '_ {
    move |pos, dir| {
        if layout.halt_at(pos) != Some(halt) {
            return false;
        }
        let next = pos.neighbour(dir);
        if layout.track_tile(next).is_some() && layout.halt_at(next) == Some(halt) {
            return false;
        }
        let mut back = pos;
        for _ in 1..tile_length.max(1) {
            back = back.neighbour(dir.backward());
            if layout.halt_at(back) != Some(halt) {
                return false;
            }
        }
        true
    }
}

/// Route for a convoy heading for `halt`, ignoring reservations.
pub fn calc_route(layout: &Layout, start: Coord, heading: Ribi, halt: HaltId, params: &ConvoyParams,
                  max_steps: Option<usize>) -> Option<Vec<Coord>> {
    find_route(layout, start, heading, params.highest_axle_load,
               platform_end(layout, halt, params.tile_length), |_, _| true, max_steps)
}
