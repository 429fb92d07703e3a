use regex::Regex;

use crate::input::layout::{Coord, Layout, LayoutError, SignalDesc};
use crate::railway::ribi::Ribi;
use crate::railway::working_method::WorkingMethod;

#[derive(Debug, Fail)]
pub enum ParseError {
    #[fail(display = "error in regular expression: {}", _0)]
    RegexError(String),
    #[fail(display = "line {}: error converting number", _0)]
    NumberError(usize),
    #[fail(display = "line {}: unknown direction \"{}\"", _0, _1)]
    Direction(usize, String),
    #[fail(display = "line {}: unknown working method \"{}\"", _0, _1)]
    WorkingMethod(usize, String),
    #[fail(display = "line {}: unrecognized: {}", _0, _1)]
    Unrecognized(usize, String),
    #[fail(display = "line {}: {}", _0, _1)]
    Layout(usize, #[cause] LayoutError),
}

pub fn regex(s: &str) -> Result<Regex, ParseError> {
    Regex::new(s).map_err(|e| ParseError::RegexError(format!("{:?}", e)))
}

pub fn number<T: std::str::FromStr>(line: usize, s: &str) -> Result<T, ParseError> {
    s.parse::<T>().map_err(|_e| ParseError::NumberError(line))
}

pub fn direction(line: usize, s: &str) -> Result<Ribi, ParseError> {
    Ribi::parse(s).ok_or_else(|| ParseError::Direction(line, s.to_string()))
}

pub fn working_method(line: usize, s: &str) -> Result<WorkingMethod, ParseError> {
    WorkingMethod::parse(s).ok_or_else(|| ParseError::WorkingMethod(line, s.to_string()))
}

fn coords(coord_re: &Regex, line: usize, s: &str) -> Result<Vec<Coord>, ParseError> {
    coord_re.captures_iter(s)
        .map(|c| Ok(Coord::new(number(line, &c[1])?, number(line, &c[2])?)))
        .collect()
}

/// Parses the layout format, one statement per line:
///
/// * track 0,0 8,0 8,3 axle=12
/// * diagonal 4,0
/// * halt Central 6,0 7,0
/// * signal s1 2,0 e tcb aspects=3 box=1 speed=80 range=4 distant combined choose bidirectional longblock
/// * oneway 5,0 e
/// * crossing 3,0
/// * endchoose 7,0
///
/// Everything after `#` is a comment.
pub fn parse_layout(input: &str) -> Result<Layout, ParseError> {
    let skip_re = regex(r"^\s*(#.*)?$")?;
    let coord_re = regex(r"(-?\d+),(-?\d+)")?;
    let track_re = regex(r"^\s*track((?:\s+-?\d+,-?\d+)+)(?:\s+axle=(\d+))?\s*$")?;
    let diagonal_re = regex(r"^\s*diagonal((?:\s+-?\d+,-?\d+)+)\s*$")?;
    let halt_re = regex(r"^\s*halt\s+([\w\.]+)((?:\s+-?\d+,-?\d+)+)\s*$")?;
    let signal_re = regex(r"(?x) ^ \s* signal \s+ (?P<name>[\w\.]+) \s+
            (?P<x>-?\d+),(?P<y>-?\d+) \s+
            (?P<dir>\w+) \s+
            (?P<method>\w+)
            (?P<opts>(?:\s+[\w=]+)*) \s* $")?;
    let oneway_re = regex(r"^\s*oneway\s+(-?\d+),(-?\d+)\s+(\w+)\s*$")?;
    let crossing_re = regex(r"^\s*crossing\s+(-?\d+),(-?\d+)\s*$")?;
    let endchoose_re = regex(r"^\s*endchoose\s+(-?\d+),(-?\d+)\s*$")?;

    let mut layout = Layout::new();
    for (n, line) in input.lines().enumerate() {
        let n = n + 1;
        let line = match line.find('#') {
            Some(i) => &line[..i],
            None => line,
        };
        let err = |e| ParseError::Layout(n, e);
        if skip_re.is_match(line) {
            continue;
        }
        if let Some(groups) = track_re.captures(line) {
            let points = coords(&coord_re, n, &groups[1])?;
            if points.len() < 2 {
                return Err(ParseError::Unrecognized(n, line.to_string()));
            }
            let axle: Option<u32> = match groups.get(2) {
                Some(m) => Some(number(n, m.as_str())?),
                None => None,
            };
            for w in points.windows(2) {
                layout.add_track(w[0], w[1]).map_err(err)?;
                if let Some(load) = axle {
                    layout.restrict_axle_load(w[0], w[1], load).map_err(err)?;
                }
            }
            continue;
        }
        if let Some(groups) = diagonal_re.captures(line) {
            for pos in coords(&coord_re, n, &groups[1])? {
                layout.set_diagonal(pos).map_err(err)?;
            }
            continue;
        }
        if let Some(groups) = halt_re.captures(line) {
            let tiles = coords(&coord_re, n, &groups[2])?;
            layout.add_halt(&groups[1], &tiles).map_err(err)?;
            continue;
        }
        if let Some(groups) = signal_re.captures(line) {
            let pos = Coord::new(number(n, &groups["x"])?, number(n, &groups["y"])?);
            let mut desc = SignalDesc::new(&groups["name"], pos, direction(n, &groups["dir"])?,
                                           working_method(n, &groups["method"])?);
            for opt in groups["opts"].split_whitespace() {
                let mut kv = opt.splitn(2, '=');
                match (kv.next(), kv.next()) {
                    (Some("aspects"), Some(v)) => desc.aspects = number(n, v)?,
                    (Some("box"), Some(v)) => desc.signalbox = Some(number(n, v)?),
                    (Some("speed"), Some(v)) => desc.max_speed = number(n, v)?,
                    (Some("range"), Some(v)) => desc.range = number(n, v)?,
                    (Some("distant"), None) => desc.distant = true,
                    (Some("combined"), None) => desc.combined = true,
                    (Some("choose"), None) => desc.choose = true,
                    (Some("bidirectional"), None) => desc.bidirectional = true,
                    (Some("longblock"), None) => desc.longblock = true,
                    _ => return Err(ParseError::Unrecognized(n, opt.to_string())),
                }
            }
            layout.add_signal(desc).map_err(err)?;
            continue;
        }
        if let Some(groups) = oneway_re.captures(line) {
            let pos = Coord::new(number(n, &groups[1])?, number(n, &groups[2])?);
            layout.set_oneway(pos, direction(n, &groups[3])?).map_err(err)?;
            continue;
        }
        if let Some(groups) = crossing_re.captures(line) {
            let pos = Coord::new(number(n, &groups[1])?, number(n, &groups[2])?);
            layout.add_crossing(pos).map_err(err)?;
            continue;
        }
        if let Some(groups) = endchoose_re.captures(line) {
            let pos = Coord::new(number(n, &groups[1])?, number(n, &groups[2])?);
            layout.set_end_of_choose(pos).map_err(err)?;
            continue;
        }
        return Err(ParseError::Unrecognized(n, line.trim().to_string()));
    }
    Ok(layout)
}
