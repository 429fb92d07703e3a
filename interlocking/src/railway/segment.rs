use smallvec::SmallVec;
use serde::{Deserialize, Serialize};

use crate::railway::convoy::ConvoyHandle;
use crate::railway::ribi::Ribi;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationKind {
    None,
    Block,
    /// Shared with other convoys travelling in exactly the same direction.
    Directional,
    /// Tiles physically occupied by the holder.
    Priority,
}

impl Default for ReservationKind {
    fn default() -> ReservationKind { ReservationKind::None }
}

impl ReservationKind {
    fn rank(self) -> u8 {
        match self {
            ReservationKind::None => 0,
            ReservationKind::Directional => 1,
            ReservationKind::Block => 2,
            ReservationKind::Priority => 3,
        }
    }
}

/// Reservation state of the way on one tile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackSegment {
    pub kind: ReservationKind,
    pub holders: SmallVec<[ConvoyHandle; 2]>,
    pub direction: Ribi,
    pub is_junction: bool,
    pub is_crossing: bool,
    /// Holders that marked their hold for the next sweep.
    pub stale: SmallVec<[ConvoyHandle; 2]>,
}

impl TrackSegment {
    pub fn new(is_junction: bool, is_crossing: bool) -> TrackSegment {
        TrackSegment { is_junction, is_crossing, ..Default::default() }
    }

    pub fn is_reserved(&self) -> bool {
        !self.holders.is_empty()
    }

    pub fn holds(&self, convoy: ConvoyHandle) -> bool {
        self.holders.contains(&convoy)
    }

    /// The first holder, which for any kind but directional is the only one.
    pub fn reserved_by(&self) -> Option<ConvoyHandle> {
        self.holders.first().cloned()
    }

    pub fn can_reserve(&self, convoy: ConvoyHandle, direction: Ribi) -> bool {
        self.holders.is_empty()
            || self.holds(convoy)
            || (self.kind == ReservationKind::Directional && self.direction == direction)
    }

    /// Claims the segment. A convoy that already holds it keeps the stronger
    /// kind; joining a same-direction directional hold always joins as
    /// directional, so a block reservation never has a second holder.
    pub fn reserve(&mut self, convoy: ConvoyHandle, direction: Ribi, kind: ReservationKind) -> bool {
        if self.holders.is_empty() {
            self.holders.push(convoy);
            self.kind = kind;
            self.direction = direction;
            self.stale.clear();
            return true;
        }

        if self.holds(convoy) {
            if self.holders.len() == 1 {
                if kind.rank() > self.kind.rank() {
                    self.kind = kind;
                }
                self.direction = direction;
            } else if self.direction != direction {
                return false;
            }
            self.stale.retain(|h| *h != convoy);
            return true;
        }

        if self.kind == ReservationKind::Directional && self.direction == direction {
            self.holders.push(convoy);
            return true;
        }

        false
    }

    pub fn unreserve(&mut self, convoy: ConvoyHandle) -> bool {
        let before = self.holders.len();
        self.holders.retain(|h| *h != convoy);
        if self.holders.len() == before {
            return false;
        }
        self.stale.retain(|h| *h != convoy);
        if self.holders.is_empty() {
            self.kind = ReservationKind::None;
            self.direction = Ribi::NONE;
        }
        true
    }

    /// Drops holders for which `live` is false. Returns whether any were dropped.
    pub fn retain_holders<F: Fn(ConvoyHandle) -> bool>(&mut self, live: F) -> bool {
        let dead: SmallVec<[ConvoyHandle; 2]> =
            self.holders.iter().cloned().filter(|h| !live(*h)).collect();
        for h in &dead {
            self.unreserve(*h);
        }
        !dead.is_empty()
    }

    /// Marks `convoy`'s hold for the next sweep. Other holders are unaffected.
    pub fn mark_stale(&mut self, convoy: ConvoyHandle) {
        if self.holds(convoy) && !self.is_stale_for(convoy) {
            self.stale.push(convoy);
        }
    }

    pub fn is_stale_for(&self, convoy: ConvoyHandle) -> bool {
        self.stale.contains(&convoy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use generational_arena::Index;

    fn convoys() -> (ConvoyHandle, ConvoyHandle, ConvoyHandle) {
        (Index::from_raw_parts(0, 0), Index::from_raw_parts(1, 0), Index::from_raw_parts(2, 0))
    }

    #[test]
    fn block_is_exclusive_until_released() {
        let (a, b, _) = convoys();
        let mut s = TrackSegment::new(false, false);
        assert!(s.can_reserve(b, Ribi::EAST));
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Block));
        assert!(!s.can_reserve(b, Ribi::EAST));
        assert!(!s.reserve(b, Ribi::EAST, ReservationKind::Block));
        assert!(!s.reserve(b, Ribi::EAST, ReservationKind::Directional));
        assert!(s.unreserve(a));
        assert!(s.can_reserve(b, Ribi::EAST));
    }

    #[test]
    fn release_is_idempotent() {
        let (a, _, _) = convoys();
        let fresh = TrackSegment::new(true, false);
        let mut s = fresh.clone();
        assert!(s.reserve(a, Ribi::SOUTH, ReservationKind::Block));
        assert!(s.unreserve(a));
        assert_eq!(s, fresh);
        assert!(!s.unreserve(a));
        assert_eq!(s, fresh);
    }

    #[test]
    fn directional_shared_only_in_same_direction() {
        let (a, b, c) = convoys();
        let mut s = TrackSegment::new(false, false);
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Directional));
        assert!(s.can_reserve(b, Ribi::EAST));
        assert!(!s.can_reserve(c, Ribi::WEST));
        assert!(!s.can_reserve(c, Ribi::NORTH));
        assert!(s.reserve(b, Ribi::EAST, ReservationKind::Block));
        assert_eq!(s.kind, ReservationKind::Directional);
        assert_eq!(s.holders.len(), 2);

        assert!(s.unreserve(a));
        assert!(s.is_reserved());
        assert_eq!(s.reserved_by(), Some(b));
        assert!(s.unreserve(b));
        assert_eq!(s.kind, ReservationKind::None);
    }

    #[test]
    fn own_reservation_keeps_stronger_kind() {
        let (a, _, _) = convoys();
        let mut s = TrackSegment::new(false, false);
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Priority));
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Block));
        assert_eq!(s.kind, ReservationKind::Priority);
        s.mark_stale(a);
        assert!(s.is_stale_for(a));
        assert!(s.retain_holders(|h| h != a));
        assert!(!s.is_reserved());
        assert!(s.stale.is_empty());
    }

    #[test]
    fn stale_mark_belongs_to_one_holder() {
        let (a, b, c) = convoys();
        let mut s = TrackSegment::new(false, false);
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Directional));
        assert!(s.reserve(b, Ribi::EAST, ReservationKind::Directional));
        s.mark_stale(a);
        s.mark_stale(c);
        assert!(s.is_stale_for(a));
        assert!(!s.is_stale_for(b));
        assert!(!s.is_stale_for(c));

        // reserving again takes the mark back
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Directional));
        assert!(!s.is_stale_for(a));
        s.mark_stale(a);
        assert!(s.unreserve(a));
        assert!(s.stale.is_empty());
        assert_eq!(s.holders.as_slice(), &[b]);
    }

    #[test]
    fn co_holder_cannot_turn_shared_hold_around() {
        let (a, b, _) = convoys();
        let mut s = TrackSegment::new(false, false);
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Directional));
        assert!(s.reserve(b, Ribi::EAST, ReservationKind::Directional));
        assert!(!s.reserve(a, Ribi::WEST, ReservationKind::Directional));
        assert_eq!(s.direction, Ribi::EAST);
        assert!(s.holds(a));
        assert!(s.reserve(a, Ribi::EAST, ReservationKind::Block));
        assert_eq!(s.kind, ReservationKind::Directional);
    }
}
