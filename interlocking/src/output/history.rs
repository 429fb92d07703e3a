use serde::Serialize;

use crate::eventsim::Tick;
use crate::input::layout::{Coord, CrossingId, HaltId, SignalId};
use crate::railway::ribi::Ribi;
use crate::railway::segment::ReservationKind;
use crate::railway::signal::Aspect;
use crate::railway::working_method::WorkingMethod;
use failure;

#[derive(Debug, Default, Serialize)]
pub struct History {
    pub inf: Vec<(Tick, InfrastructureLogEvent)>,
    pub convoys: Vec<(String, Vec<(Tick, ConvoyLogEvent)>)>,
}

/// Convoys are named by their registry slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InfrastructureLogEvent {
    Reserved { tile: Coord, convoy: usize, kind: ReservationKind, direction: Ribi },
    Released { tile: Coord, convoy: usize },
    Aspect { signal: SignalId, aspect: Aspect },
    Crossing { crossing: CrossingId, closed_to_road: bool },
    WayRemoved(Coord),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConvoyLogEvent {
    Route { tiles: usize },
    RouteNotFound,
    Tile(Coord),
    Authority { index: usize, success: bool, blocks_ahead: i32 },
    Transition(WorkingMethod),
    ChoseRoute { signal: SignalId },
    Arrived(HaltId),
    Departed(HaltId),
    Reversed,
    DriveBySight,
    Finished,
}

/// Print one tile visit per line on the following format:
/// `convoyname tick x,y`.
pub fn visits(h: &History) -> Result<String, failure::Error> {
    use std::fmt::Write;
    let mut s = String::new();
    for &(ref name, ref events) in &h.convoys {
        for &(t, ref ev) in events {
            if let ConvoyLogEvent::Tile(pos) = *ev {
                write!(s, "{} {} {:?}\n", name, t, pos)?;
            }
        }
    }
    Ok(s)
}

#[test]
fn test_visits() {
    let h = History {
        inf: vec![],
        convoys: vec![
            ("a".to_string(), vec![(0, ConvoyLogEvent::Route { tiles: 3 }),
                                   (4, ConvoyLogEvent::Tile(Coord::new(1, 0))),
                                   (9, ConvoyLogEvent::Tile(Coord::new(2, 0)))]),
            ("b".to_string(), vec![(3, ConvoyLogEvent::Reversed)]),
        ],
    };
    assert_eq!(visits(&h).unwrap(), "a 4 1,0\na 9 2,0\n");
}
