use crate::input::layout::{Coord, Layout};
use crate::railway::ribi::Ribi;

pub const STEPS_PER_TILE: u32 = 16;
pub const DIAGONAL_STEPS_PER_TILE: u32 = 11;

/// The tiles a convoy intends to drive over, starting at its front tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    tiles: Vec<Coord>,
    diagonal: Vec<bool>,
    /// Steps from the start of the route to the start of each tile.
    steps: Vec<u32>,
}

impl Route {
    pub fn new(layout: &Layout, tiles: Vec<Coord>) -> Route {
        let mut r = Route { tiles: Vec::new(), diagonal: Vec::new(), steps: Vec::new() };
        r.extend(layout, tiles);
        r
    }

    fn extend(&mut self, layout: &Layout, tiles: Vec<Coord>) {
        for pos in tiles {
            let start = match (self.steps.last(), self.diagonal.last()) {
                (Some(s), Some(d)) => s + if *d { DIAGONAL_STEPS_PER_TILE } else { STEPS_PER_TILE },
                _ => 0,
            };
            self.steps.push(start);
            self.diagonal.push(layout.way(pos).map(|w| w.diagonal).unwrap_or(false));
            self.tiles.push(pos);
        }
    }

    pub fn count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn at(&self, index: usize) -> Coord {
        self.tiles[index]
    }

    pub fn get(&self, index: usize) -> Option<Coord> {
        self.tiles.get(index).cloned()
    }

    pub fn tiles(&self) -> &[Coord] {
        &self.tiles
    }

    pub fn last_index(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    pub fn position(&self, pos: Coord) -> Option<usize> {
        self.tiles.iter().position(|t| *t == pos)
    }

    /// Direction of travel when entering tile `index`. The first tile takes
    /// the direction towards the second.
    pub fn direction_at(&self, index: usize) -> Ribi {
        if self.tiles.len() < 2 || index >= self.tiles.len() {
            return Ribi::NONE;
        }
        if index == 0 {
            Ribi::between(self.tiles[0], self.tiles[1])
        } else {
            Ribi::between(self.tiles[index - 1], self.tiles[index])
        }
    }

    pub fn steps_at(&self, index: usize) -> u32 {
        match self.steps.get(index) {
            Some(s) => *s,
            None => self.total_steps(),
        }
    }

    pub fn tile_steps(&self, index: usize) -> u32 {
        match self.diagonal.get(index) {
            Some(true) => DIAGONAL_STEPS_PER_TILE,
            _ => STEPS_PER_TILE,
        }
    }

    pub fn total_steps(&self) -> u32 {
        match self.steps.last() {
            Some(s) => s + self.tile_steps(self.tiles.len() - 1),
            None => 0,
        }
    }

    /// Index of the tile containing the point `steps` from the start.
    pub fn index_at_steps(&self, steps: u32) -> usize {
        match self.steps.binary_search(&steps) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Keeps tiles up to and including `keep`, appends `suffix` (whose first
    /// tile must be the tile at `keep`) and returns the tiles removed.
    pub fn replace_suffix(&mut self, layout: &Layout, keep: usize, suffix: Vec<Coord>) -> Vec<Coord> {
        let old = self.truncate(keep + 1);
        let skip = if suffix.first() == self.tiles.last() { 1 } else { 0 };
        self.extend(layout, suffix.into_iter().skip(skip).collect());
        old
    }

    pub fn append(&mut self, layout: &Layout, tiles: Vec<Coord>) {
        self.extend(layout, tiles);
    }

    /// Shortens the route to `len` tiles, returning the removed tail.
    pub fn truncate(&mut self, len: usize) -> Vec<Coord> {
        if len >= self.tiles.len() {
            return Vec::new();
        }
        self.diagonal.truncate(len);
        self.steps.truncate(len);
        self.tiles.split_off(len)
    }
}

#[test]
fn test_route_steps_and_splice() {
    let mut l = Layout::new();
    l.add_track(Coord::new(0, 0), Coord::new(4, 0)).unwrap();
    l.add_track(Coord::new(2, 0), Coord::new(2, 2)).unwrap();
    l.set_diagonal(Coord::new(1, 0)).unwrap();

    let tiles: Vec<Coord> = (0..5).map(|x| Coord::new(x, 0)).collect();
    let mut r = Route::new(&l, tiles);
    assert_eq!(r.count(), 5);
    assert_eq!(r.steps_at(1), 16);
    assert_eq!(r.steps_at(2), 27);
    assert_eq!(r.total_steps(), 16 + 11 + 16 * 3);
    assert_eq!(r.index_at_steps(26), 1);
    assert_eq!(r.index_at_steps(27), 2);
    assert_eq!(r.direction_at(0), Ribi::EAST);
    assert_eq!(r.direction_at(3), Ribi::EAST);

    let old = r.replace_suffix(&l, 2, vec![Coord::new(2, 0), Coord::new(2, 1), Coord::new(2, 2)]);
    assert_eq!(old, vec![Coord::new(3, 0), Coord::new(4, 0)]);
    assert_eq!(r.tiles(), &[Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0),
                           Coord::new(2, 1), Coord::new(2, 2)][..]);
    assert_eq!(r.direction_at(3), Ribi::SOUTH);
    assert_eq!(r.steps_at(4), 16 + 11 + 32);

    r.truncate(3);
    r.append(&l, old);
    assert_eq!(r.at(4), Coord::new(4, 0));
}
