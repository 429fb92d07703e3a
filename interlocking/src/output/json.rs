use failure::Error;
use serde::Serialize;
use std::io;

use super::history::{ConvoyLogEvent, History, InfrastructureLogEvent};
use crate::eventsim::Tick;
use crate::input::layout::{Coord, Layout};
use crate::railway::ribi::Ribi;
use crate::railway::working_method::WorkingMethod;

#[derive(Serialize)]
struct JsonTile {
    pos: Coord,
    ribi: Ribi,
    diagonal: bool,
    halt: Option<String>,
}

#[derive(Serialize)]
struct JsonSignal<'a> {
    name: &'a str,
    pos: Coord,
    facing: Ribi,
    working_method: WorkingMethod,
    aspects: u8,
}

#[derive(Serialize)]
struct JsonInfrastructure<'a> {
    tiles: Vec<JsonTile>,
    signals: Vec<JsonSignal<'a>>,
}

#[derive(Serialize)]
struct JsonEvent<'a, E> {
    time: Tick,
    event: &'a E,
}

#[derive(Serialize)]
struct JsonConvoy<'a> {
    name: &'a str,
    events: Vec<JsonEvent<'a, ConvoyLogEvent>>,
}

#[derive(Serialize)]
struct JsonHistory<'a> {
    infrastructure: JsonInfrastructure<'a>,
    events: Vec<JsonEvent<'a, InfrastructureLogEvent>>,
    convoys: Vec<JsonConvoy<'a>>,
}

fn json_value<'a>(layout: &'a Layout, history: &'a History) -> JsonHistory<'a> {
    let tiles = layout.tiles.iter()
        .filter_map(|t| t.way.as_ref().map(|w| JsonTile {
            pos: t.pos,
            ribi: w.ribi,
            diagonal: w.diagonal,
            halt: t.halt.map(|h| layout.halts[h].name.clone()),
        }))
        .collect();
    let signals = layout.signals.iter()
        .map(|s| JsonSignal {
            name: &s.name,
            pos: s.pos,
            facing: s.facing,
            working_method: s.working_method,
            aspects: s.aspects,
        })
        .collect();
    JsonHistory {
        infrastructure: JsonInfrastructure { tiles, signals },
        events: history.inf.iter().map(|(time, event)| JsonEvent { time: *time, event }).collect(),
        convoys: history.convoys.iter()
            .map(|(name, events)| JsonConvoy {
                name,
                events: events.iter().map(|(time, event)| JsonEvent { time: *time, event }).collect(),
            })
            .collect(),
    }
}

pub fn javascript_history<W: io::Write>(layout: &Layout, history: &History, f: &mut W) -> Result<(), Error> {
    write!(f, "var data = ")?;
    json_history(layout, history, f)?;
    write!(f, ";")?;
    Ok(())
}

pub fn json_history<W: io::Write>(layout: &Layout, history: &History, f: &mut W) -> Result<(), Error> {
    serde_json::to_writer(f, &json_value(layout, history))?;
    Ok(())
}
