//! Compass direction masks.
//!
//! A `Ribi` is a set of the four cardinal directions. A way's mask lists the
//! directions in which it connects to its neighbours; a reservation's mask is
//! the direction of travel it was made for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};
use crate::input::layout::Coord;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Ribi(u8);

impl Ribi {
    pub const NONE: Ribi = Ribi(0);
    pub const NORTH: Ribi = Ribi(1);
    pub const EAST: Ribi = Ribi(2);
    pub const SOUTH: Ribi = Ribi(4);
    pub const WEST: Ribi = Ribi(8);
    pub const ALL: Ribi = Ribi(15);

    pub const CARDINALS: [Ribi; 4] = [Ribi::NORTH, Ribi::EAST, Ribi::SOUTH, Ribi::WEST];

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Ribi) -> bool {
        !other.is_none() && self.0 & other.0 == other.0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Three or four connections: a switch or a diamond.
    pub fn is_junction(self) -> bool {
        self.count() >= 3
    }

    pub fn is_bend(self) -> bool {
        self == (Ribi::NORTH | Ribi::EAST) || self == (Ribi::EAST | Ribi::SOUTH)
            || self == (Ribi::SOUTH | Ribi::WEST) || self == (Ribi::WEST | Ribi::NORTH)
    }

    /// The opposite direction(s).
    pub fn backward(self) -> Ribi {
        Ribi(((self.0 << 2) | (self.0 >> 2)) & 15)
    }

    /// Direction of the step from `from` towards `to`. Only the dominant axis
    /// is considered, so non-adjacent coordinates give a single direction too.
    pub fn between(from: Coord, to: Coord) -> Ribi {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0 && dy == 0 {
            Ribi::NONE
        } else if dx.abs() >= dy.abs() {
            if dx > 0 { Ribi::EAST } else { Ribi::WEST }
        } else {
            // y grows southwards
            if dy > 0 { Ribi::SOUTH } else { Ribi::NORTH }
        }
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Ribi::NORTH => (0, -1),
            Ribi::EAST => (1, 0),
            Ribi::SOUTH => (0, 1),
            Ribi::WEST => (-1, 0),
            _ => (0, 0),
        }
    }

    pub fn parse(s: &str) -> Option<Ribi> {
        match s.to_lowercase().as_str() {
            "n" | "north" => Some(Ribi::NORTH),
            "e" | "east" => Some(Ribi::EAST),
            "s" | "south" => Some(Ribi::SOUTH),
            "w" | "west" => Some(Ribi::WEST),
            _ => None,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Ribi> {
        Ribi::CARDINALS.iter().cloned().filter(move |d| self.contains(*d))
    }
}

impl BitOr for Ribi {
    type Output = Ribi;
    fn bitor(self, rhs: Ribi) -> Ribi { Ribi(self.0 | rhs.0) }
}

impl BitAnd for Ribi {
    type Output = Ribi;
    fn bitand(self, rhs: Ribi) -> Ribi { Ribi(self.0 & rhs.0) }
}

impl fmt::Debug for Ribi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_none() { return write!(f, "-"); }
        for (d, c) in Ribi::CARDINALS.iter().zip("NESW".chars()) {
            if self.contains(*d) { write!(f, "{}", c)?; }
        }
        Ok(())
    }
}

#[test]
fn test_backward() {
    assert_eq!(Ribi::NORTH.backward(), Ribi::SOUTH);
    assert_eq!(Ribi::EAST.backward(), Ribi::WEST);
    assert_eq!((Ribi::NORTH | Ribi::EAST).backward(), Ribi::SOUTH | Ribi::WEST);
    assert_eq!(Ribi::ALL.backward(), Ribi::ALL);
}

#[test]
fn test_between_and_shape() {
    let a = Coord::new(2, 2);
    assert_eq!(Ribi::between(a, Coord::new(3, 2)), Ribi::EAST);
    assert_eq!(Ribi::between(a, Coord::new(2, 1)), Ribi::NORTH);
    assert_eq!(Ribi::between(a, a), Ribi::NONE);
    assert!((Ribi::EAST | Ribi::WEST | Ribi::SOUTH).is_junction());
    assert!((Ribi::SOUTH | Ribi::WEST).is_bend());
    assert!(!(Ribi::EAST | Ribi::WEST).is_bend());
    assert_eq!(format!("{:?}", Ribi::NORTH | Ribi::WEST), "NW");
}
