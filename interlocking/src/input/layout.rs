use smallvec::SmallVec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::railway::ribi::Ribi;
use crate::railway::working_method::WorkingMethod;

pub type TileId = usize;
pub type SignalId = usize;
pub type HaltId = usize;
pub type CrossingId = usize;
pub type SignalboxId = usize;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Coord {
        Coord { x, y }
    }

    pub fn neighbour(self, dir: Ribi) -> Coord {
        let (dx, dy) = dir.offset();
        Coord { x: self.x + dx, y: self.y + dy }
    }

    /// Number of tile steps between two coordinates on the grid.
    pub fn tile_distance(self, other: Coord) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone)]
pub struct Way {
    pub ribi: Ribi,
    pub diagonal: bool,
    /// Direction of travel permitted by a one-way sign on this tile.
    pub oneway: Option<Ribi>,
    pub end_of_choose: bool,
    /// Heaviest axle load the track carries, if restricted.
    pub max_axle_load: Option<u32>,
}

impl Way {
    pub fn carries(&self, axle_load: u32) -> bool {
        self.max_axle_load.map(|m| axle_load <= m).unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub pos: Coord,
    pub way: Option<Way>,
    pub signals: SmallVec<[SignalId; 2]>,
    pub halt: Option<HaltId>,
    pub crossing: Option<CrossingId>,
}

#[derive(Debug, Clone)]
pub struct SignalDesc {
    pub name: String,
    pub pos: Coord,
    /// Travel direction the signal applies to.
    pub facing: Ribi,
    pub working_method: WorkingMethod,
    pub aspects: u8,
    pub distant: bool,
    pub combined: bool,
    pub choose: bool,
    pub bidirectional: bool,
    pub longblock: bool,
    pub max_speed: u32,
    pub signalbox: Option<SignalboxId>,
    /// Moving block: how far from the signal the beacon is received.
    pub range: u32,
}

impl SignalDesc {
    pub fn new(name: &str, pos: Coord, facing: Ribi, working_method: WorkingMethod) -> SignalDesc {
        SignalDesc {
            name: name.to_string(),
            pos,
            facing,
            working_method,
            aspects: 2,
            distant: false,
            combined: false,
            choose: false,
            bidirectional: false,
            longblock: false,
            max_speed: 160,
            signalbox: None,
            range: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HaltDesc {
    pub name: String,
    pub tiles: Vec<Coord>,
}

#[derive(Debug, Clone)]
pub struct CrossingDesc {
    pub pos: Coord,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutNames {
    pub signals: HashMap<String, SignalId>,
    pub halts: HashMap<String, HaltId>,
}

#[derive(Debug, Fail)]
pub enum LayoutError {
    #[fail(display = "track from {:?} to {:?} is not straight", _0, _1)]
    NotStraight(Coord, Coord),
    #[fail(display = "no track at {:?}", _0)]
    NoTrack(Coord),
    #[fail(display = "duplicate name: {}", _0)]
    DuplicateName(String),
    #[fail(display = "two signals facing {:?} at {:?}", _1, _0)]
    DuplicateSignal(Coord, Ribi),
    #[fail(display = "invalid aspect count {} for signal {}", _1, _0)]
    AspectCount(String, u8),
}

/// Static track layout: the tile grid, its ways and the objects on them.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub tiles: Vec<Tile>,
    pub index: HashMap<Coord, TileId>,
    pub signals: Vec<SignalDesc>,
    pub halts: Vec<HaltDesc>,
    pub crossings: Vec<CrossingDesc>,
    pub names: LayoutNames,
}

impl Layout {
    pub fn new() -> Layout {
        Default::default()
    }

    pub fn tile_id(&self, pos: Coord) -> Option<TileId> {
        self.index.get(&pos).cloned()
    }

    pub fn tile(&self, pos: Coord) -> Option<&Tile> {
        self.tile_id(pos).map(|t| &self.tiles[t])
    }

    pub fn way(&self, pos: Coord) -> Option<&Way> {
        self.tile(pos).and_then(|t| t.way.as_ref())
    }

    /// Tile id of a tile which still carries track.
    pub fn track_tile(&self, pos: Coord) -> Option<TileId> {
        self.tile_id(pos).filter(|t| self.tiles[*t].way.is_some())
    }

    pub fn halt_at(&self, pos: Coord) -> Option<HaltId> {
        self.tile(pos).and_then(|t| t.halt)
    }

    fn tile_mut(&mut self, pos: Coord) -> &mut Tile {
        let tiles = &mut self.tiles;
        let id = *self.index.entry(pos).or_insert_with(|| {
            tiles.push(Tile {
                pos,
                way: None,
                signals: SmallVec::new(),
                halt: None,
                crossing: None,
            });
            tiles.len() - 1
        });
        &mut self.tiles[id]
    }

    fn way_mut(&mut self, pos: Coord) -> &mut Way {
        self.tile_mut(pos).way.get_or_insert_with(|| Way {
            ribi: Ribi::NONE,
            diagonal: false,
            oneway: None,
            end_of_choose: false,
            max_axle_load: None,
        })
    }

    /// Lays straight track from `a` to `b`, connecting every tile in between.
    pub fn add_track(&mut self, a: Coord, b: Coord) -> Result<(), LayoutError> {
        if a.x != b.x && a.y != b.y {
            return Err(LayoutError::NotStraight(a, b));
        }
        self.way_mut(a);
        let dir = Ribi::between(a, b);
        let mut pos = a;
        while pos != b {
            let next = pos.neighbour(dir);
            self.way_mut(pos).ribi = self.way_mut(pos).ribi | dir;
            self.way_mut(next).ribi = self.way_mut(next).ribi | dir.backward();
            pos = next;
        }
        Ok(())
    }

    /// Restricts the axle load on the straight track from `a` to `b`. Tiles
    /// already restricted keep the lower limit.
    pub fn restrict_axle_load(&mut self, a: Coord, b: Coord, load: u32) -> Result<(), LayoutError> {
        if a.x != b.x && a.y != b.y {
            return Err(LayoutError::NotStraight(a, b));
        }
        let dir = Ribi::between(a, b);
        let mut pos = a;
        loop {
            let way = self.existing_way_mut(pos)?;
            way.max_axle_load = Some(way.max_axle_load.map(|m| m.min(load)).unwrap_or(load));
            if pos == b {
                return Ok(());
            }
            pos = pos.neighbour(dir);
        }
    }

    pub fn set_diagonal(&mut self, pos: Coord) -> Result<(), LayoutError> {
        self.existing_way_mut(pos)?.diagonal = true;
        Ok(())
    }

    pub fn set_oneway(&mut self, pos: Coord, dir: Ribi) -> Result<(), LayoutError> {
        self.existing_way_mut(pos)?.oneway = Some(dir);
        Ok(())
    }

    pub fn set_end_of_choose(&mut self, pos: Coord) -> Result<(), LayoutError> {
        self.existing_way_mut(pos)?.end_of_choose = true;
        Ok(())
    }

    fn existing_way_mut(&mut self, pos: Coord) -> Result<&mut Way, LayoutError> {
        match self.index.get(&pos) {
            Some(&id) => self.tiles[id].way.as_mut().ok_or(LayoutError::NoTrack(pos)),
            None => Err(LayoutError::NoTrack(pos)),
        }
    }

    pub fn add_halt(&mut self, name: &str, tiles: &[Coord]) -> Result<HaltId, LayoutError> {
        if self.names.halts.contains_key(name) {
            return Err(LayoutError::DuplicateName(name.to_string()));
        }
        let id = self.halts.len();
        for pos in tiles {
            self.existing_way_mut(*pos)?;
            self.tile_mut(*pos).halt = Some(id);
        }
        self.halts.push(HaltDesc { name: name.to_string(), tiles: tiles.to_vec() });
        self.names.halts.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_signal(&mut self, desc: SignalDesc) -> Result<SignalId, LayoutError> {
        if self.names.signals.contains_key(&desc.name) {
            return Err(LayoutError::DuplicateName(desc.name));
        }
        if desc.aspects < 2 || desc.aspects > 5 {
            return Err(LayoutError::AspectCount(desc.name, desc.aspects));
        }
        self.existing_way_mut(desc.pos)?;
        if self.signal_facing(desc.pos, desc.facing).is_some() {
            return Err(LayoutError::DuplicateSignal(desc.pos, desc.facing));
        }
        let id = self.signals.len();
        self.tile_mut(desc.pos).signals.push(id);
        self.names.signals.insert(desc.name.clone(), id);
        self.signals.push(desc);
        Ok(id)
    }

    pub fn add_crossing(&mut self, pos: Coord) -> Result<CrossingId, LayoutError> {
        self.existing_way_mut(pos)?;
        let id = self.crossings.len();
        self.tile_mut(pos).crossing = Some(id);
        self.crossings.push(CrossingDesc { pos });
        Ok(id)
    }

    /// Deletes the way on a tile. Objects on the tile go with it.
    pub fn remove_way(&mut self, pos: Coord) -> bool {
        match self.index.get(&pos) {
            Some(&id) if self.tiles[id].way.is_some() => {
                let tile = &mut self.tiles[id];
                tile.way = None;
                tile.signals.clear();
                tile.crossing = None;
                true
            }
            _ => false,
        }
    }

    /// The signal on `pos` that applies to travel in direction `dir`.
    pub fn signal_facing(&self, pos: Coord, dir: Ribi) -> Option<SignalId> {
        self.tile(pos)?.signals.iter().cloned()
            .find(|s| self.signals[*s].facing == dir)
    }

    /// Tiles reachable in one step from `pos` when leaving in any direction
    /// except `not_towards`, with the direction of the step.
    pub fn exits(&self, pos: Coord, not_towards: Ribi) -> SmallVec<[(Coord, Ribi); 4]> {
        let mut out = SmallVec::new();
        let way = match self.way(pos) {
            Some(w) => w,
            None => return out,
        };
        for dir in way.ribi.iter() {
            if dir == not_towards {
                continue;
            }
            let next = pos.neighbour(dir);
            if let Some(next_way) = self.way(next) {
                if next_way.ribi.contains(dir.backward()) {
                    out.push((next, dir));
                }
            }
        }
        out
    }
}

#[test]
fn test_add_track() {
    let mut l = Layout::new();
    l.add_track(Coord::new(0, 0), Coord::new(3, 0)).unwrap();
    l.add_track(Coord::new(2, 0), Coord::new(2, 2)).unwrap();
    assert_eq!(l.way(Coord::new(0, 0)).unwrap().ribi, Ribi::EAST);
    assert_eq!(l.way(Coord::new(1, 0)).unwrap().ribi, Ribi::EAST | Ribi::WEST);
    assert!(l.way(Coord::new(2, 0)).unwrap().ribi.is_junction());
    assert_eq!(l.way(Coord::new(2, 2)).unwrap().ribi, Ribi::NORTH);
    assert!(l.add_track(Coord::new(0, 0), Coord::new(1, 1)).is_err());

    let exits = l.exits(Coord::new(2, 0), Ribi::WEST);
    assert_eq!(exits.len(), 2);
    assert!(l.remove_way(Coord::new(3, 0)));
    assert_eq!(l.exits(Coord::new(2, 0), Ribi::WEST).len(), 1);
    assert!(l.track_tile(Coord::new(3, 0)).is_none());
}

#[test]
fn test_signals_one_per_direction() {
    let mut l = Layout::new();
    l.add_track(Coord::new(0, 0), Coord::new(3, 0)).unwrap();
    let e = l.add_signal(SignalDesc::new("e", Coord::new(1, 0), Ribi::EAST, WorkingMethod::AbsoluteBlock)).unwrap();
    let w = l.add_signal(SignalDesc::new("w", Coord::new(1, 0), Ribi::WEST, WorkingMethod::AbsoluteBlock)).unwrap();
    assert!(l.add_signal(SignalDesc::new("e2", Coord::new(1, 0), Ribi::EAST, WorkingMethod::AbsoluteBlock)).is_err());
    assert_eq!(l.signal_facing(Coord::new(1, 0), Ribi::EAST), Some(e));
    assert_eq!(l.signal_facing(Coord::new(1, 0), Ribi::WEST), Some(w));
    assert_eq!(l.signal_facing(Coord::new(2, 0), Ribi::WEST), None);
}
