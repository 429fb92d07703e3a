use crate::eventsim::Tick;
use crate::input::layout::Coord;
use crate::input::layout_parser::{direction, number, regex, working_method, ParseError};
use crate::railway::convoy::ConvoyParams;
use crate::railway::ribi::Ribi;
use crate::railway::working_method::WorkingMethod;

#[derive(Debug)]
pub struct Dispatch {
    pub actions: Vec<DispatchAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvoySpec {
    pub name: String,
    pub pos: Coord,
    pub heading: Ribi,
    pub params: ConvoyParams,
    pub working_method: WorkingMethod,
    pub stops: Vec<String>,
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchAction {
    Wait(Tick),
    /// Delete the way on a tile.
    Remove(Coord),
    /// Road traffic holding a level crossing.
    Road(Coord, Tick),
    Convoy(ConvoySpec),
}

/// Parses dispatch plan format
///
/// * wait 10
/// * remove 4,0
/// * road 3,0 hold=20
/// * convoy c1 at 0,0 e length=2 speed=8 brake=1 accel=1 axle=20 method=ab to A B repeat
///
pub fn parse_dispatch(input: &str) -> Result<Dispatch, ParseError> {
    let mut actions = Vec::new();
    let skip_re = regex(r"^\s*(#.*)?$")?;
    let wait_re = regex(r"^\s*wait\s+(\d+)\s*$")?;
    let remove_re = regex(r"^\s*remove\s+(-?\d+),(-?\d+)\s*$")?;
    let road_re = regex(r"^\s*road\s+(-?\d+),(-?\d+)\s+hold\s*=\s*(\d+)\s*$")?;
    let convoy_re = regex(r"(?x) ^ \s* convoy \s+ (?P<name>[\w\.]+) \s+
            at \s+ (?P<x>-?\d+),(?P<y>-?\d+) \s+ (?P<dir>\w+)
            (?P<opts>(?:\s+\w+=\w+)*) \s+
            to (?P<stops>(?:\s+[\w\.]+)+?)
            (?P<repeat>\s+repeat)? \s* $")?;
    for (n, line) in input.lines().enumerate() {
        let n = n + 1;
        if skip_re.is_match(line) {
            continue;
        }
        if let Some(groups) = wait_re.captures(line) {
            actions.push(DispatchAction::Wait(number(n, &groups[1])?));
            continue;
        }
        if let Some(groups) = remove_re.captures(line) {
            let pos = Coord::new(number(n, &groups[1])?, number(n, &groups[2])?);
            actions.push(DispatchAction::Remove(pos));
            continue;
        }
        if let Some(groups) = road_re.captures(line) {
            let pos = Coord::new(number(n, &groups[1])?, number(n, &groups[2])?);
            actions.push(DispatchAction::Road(pos, number(n, &groups[3])?));
            continue;
        }
        if let Some(groups) = convoy_re.captures(line) {
            let mut params = ConvoyParams::default();
            let mut method = WorkingMethod::DriveBySight;
            for opt in groups["opts"].split_whitespace() {
                let mut kv = opt.splitn(2, '=');
                match (kv.next(), kv.next()) {
                    (Some("length"), Some(v)) => params.tile_length = number(n, v)?,
                    (Some("speed"), Some(v)) => params.min_top_speed = number(n, v)?,
                    (Some("brake"), Some(v)) => params.brake = number(n, v)?,
                    (Some("accel"), Some(v)) => params.accel = number(n, v)?,
                    (Some("axle"), Some(v)) => params.highest_axle_load = number(n, v)?,
                    (Some("method"), Some(v)) => method = working_method(n, v)?,
                    _ => return Err(ParseError::Unrecognized(n, opt.to_string())),
                }
            }
            actions.push(DispatchAction::Convoy(ConvoySpec {
                name: groups["name"].to_string(),
                pos: Coord::new(number(n, &groups["x"])?, number(n, &groups["y"])?),
                heading: direction(n, &groups["dir"])?,
                params,
                working_method: method,
                stops: groups["stops"].split_whitespace().map(|s| s.to_string()).collect(),
                repeat: groups.name("repeat").is_some(),
            }));
            continue;
        }
        return Err(ParseError::Unrecognized(n, line.trim().to_string()));
    }
    Ok(Dispatch { actions })
}

#[test]
fn test_parse_dispatch() {
    let d = parse_dispatch("
        convoy c1 at 0,0 e length=2 speed=6 brake=2 method=tcb to A B repeat
        wait 30
        # comment
        road 3,0 hold=5
        remove 4,-1
        convoy c2 at 9,0 w to A
    ").unwrap();
    assert_eq!(d.actions.len(), 5);
    match d.actions[0] {
        DispatchAction::Convoy(ref c) => {
            assert_eq!(c.name, "c1");
            assert_eq!(c.heading, Ribi::EAST);
            assert_eq!((c.params.tile_length, c.params.min_top_speed, c.params.brake), (2, 6, 2));
            assert_eq!(c.working_method, WorkingMethod::TrackCircuitBlock);
            assert_eq!(c.stops, vec!["A".to_string(), "B".to_string()]);
            assert!(c.repeat);
        }
        ref x => panic!("unexpected {:?}", x),
    }
    assert_eq!(d.actions[1], DispatchAction::Wait(30));
    assert_eq!(d.actions[2], DispatchAction::Road(Coord::new(3, 0), 5));
    assert_eq!(d.actions[3], DispatchAction::Remove(Coord::new(4, -1)));
    match d.actions[4] {
        DispatchAction::Convoy(ref c) => assert!(!c.repeat && c.stops == vec!["A".to_string()]),
        ref x => panic!("unexpected {:?}", x),
    }
    assert!(parse_dispatch("convoy c1 at 0,0 e colour=red to A").is_err());
}
