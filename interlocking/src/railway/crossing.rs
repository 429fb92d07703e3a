use smallvec::SmallVec;

use crate::railway::convoy::ConvoyHandle;

/// A level crossing shared between rail and road traffic. Rail convoys
/// request it as they reserve over it and hold it until their rear has left;
/// road traffic is only counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crossing {
    rail: SmallVec<[ConvoyHandle; 2]>,
    road: u32,
}

impl Crossing {
    pub fn new() -> Crossing {
        Default::default()
    }

    pub fn is_closed_to_road(&self) -> bool {
        !self.rail.is_empty()
    }

    pub fn holds(&self, convoy: ConvoyHandle) -> bool {
        self.rail.contains(&convoy)
    }

    pub fn road_traffic(&self) -> u32 {
        self.road
    }

    pub fn request_crossing(&mut self, convoy: ConvoyHandle) -> bool {
        if self.road > 0 {
            return false;
        }
        if !self.rail.contains(&convoy) {
            self.rail.push(convoy);
        }
        true
    }

    pub fn release_crossing(&mut self, convoy: ConvoyHandle) -> bool {
        let before = self.rail.len();
        self.rail.retain(|c| *c != convoy);
        before != self.rail.len()
    }

    pub fn request_road(&mut self) -> bool {
        if self.is_closed_to_road() {
            return false;
        }
        self.road += 1;
        true
    }

    pub fn release_road(&mut self) {
        self.road = self.road.saturating_sub(1);
    }

    pub fn retain_rail<F: Fn(ConvoyHandle) -> bool>(&mut self, live: F) {
        self.rail.retain(|c| live(*c));
    }
}

#[test]
fn test_rail_and_road_exclude_each_other() {
    use generational_arena::Index;
    let a = Index::from_raw_parts(0, 0);
    let b = Index::from_raw_parts(1, 0);
    let mut c = Crossing::new();

    assert!(c.request_road());
    assert!(!c.request_crossing(a));
    c.release_road();
    assert!(c.request_crossing(a));
    assert!(c.request_crossing(a));
    assert!(c.request_crossing(b));
    assert!(!c.request_road());
    assert!(c.release_crossing(a));
    assert!(!c.release_crossing(a));
    assert!(c.is_closed_to_road());
    assert!(c.release_crossing(b));
    assert!(c.request_road());
    assert_eq!(c.road_traffic(), 1);
}
