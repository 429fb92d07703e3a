use crate::*;

use generational_arena::Index;
use maplit::*;
use std::collections::HashMap;

use crate::config::Config;
use crate::eventsim::Tick;
use crate::input::dispatch::parse_dispatch;
use crate::input::layout::Coord;
use crate::output::history::{ConvoyLogEvent, InfrastructureLogEvent};
use crate::output::snapshot;
use crate::railway::convoy::{ConvoyHandle, ConvoyParams, Schedule};
use crate::railway::deadlock;
use crate::railway::distant::SignalRole;
use crate::railway::infrastructure::Infrastructure;
use crate::railway::reserver::find_next_signal;
use crate::railway::ribi::Ribi;
use crate::railway::route::Route;
use crate::railway::segment::ReservationKind;
use crate::railway::signal::Aspect;
use crate::railway::working_method::WorkingMethod;
use crate::railway::world::World;

const FAR: u32 = 10_000;

fn world(layout: &str) -> World {
    let layout = get_layout_string(layout).unwrap();
    World::new(Infrastructure::new(layout, Box::new(|_: Tick, _: InfrastructureLogEvent| {})), Config::default())
}

fn line(from: i32, to: i32) -> Vec<Coord> {
    if from <= to {
        (from..=to).map(|x| Coord::new(x, 0)).collect()
    } else {
        (to..=from).rev().map(|x| Coord::new(x, 0)).collect()
    }
}

fn c(x: i32, y: i32) -> Coord {
    Coord::new(x, y)
}

fn add(w: &mut World, name: &str, pos: Coord, heading: Ribi, schedule: Schedule) -> ConvoyHandle {
    w.add_convoy(name, ConvoyParams::default(), schedule, pos, heading,
                 Box::new(|_: Tick, _: ConvoyLogEvent| {})).unwrap()
}

/// A convoy at the start of `tiles` with that as its route.
fn place(w: &mut World, name: &str, tiles: Vec<Coord>, method: WorkingMethod) -> ConvoyHandle {
    let h = add(w, name, tiles[0], Ribi::between(tiles[0], tiles[1]), Schedule::default());
    let route = Route::new(&w.infrastructure.layout, tiles);
    let convoy = &mut w.convoys[h];
    convoy.route = route;
    convoy.needs_route = false;
    convoy.signaling.set_working_method(method);
    h
}

/// A standing convoy that only holds its own tile.
fn blocker(w: &mut World, pos: Coord) -> ConvoyHandle {
    add(w, "blocker", pos, Ribi::EAST, Schedule::default())
}

fn aspect(w: &World, name: &str) -> Aspect {
    w.infrastructure.aspect(w.infrastructure.layout.names.signals[name])
}

fn check_aspects(w: &World, expected: HashMap<&str, Aspect>) {
    for (name, a) in expected {
        assert_eq!(aspect(w, name), a, "signal {}", name);
    }
}

fn holders(w: &World, pos: Coord) -> Vec<ConvoyHandle> {
    w.infrastructure.segment(pos).unwrap().holders.iter().cloned().collect()
}

#[test]
fn test_three_aspect_caution_before_red() {
    let mut w = world("
        track 0,0 12,0
        signal s1 2,0 e tcb aspects=3
        signal s2 5,0 e tcb aspects=3
        signal s3 8,0 e tcb aspects=3
    ");
    let a = place(&mut w, "a", line(0, 12), WorkingMethod::TrackCircuitBlock);
    let b = blocker(&mut w, c(10, 0));

    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 8);
    assert_eq!(out.blocks_ahead, 2);
    check_aspects(&w, hashmap!{
        "s1" => Aspect::Clear,
        "s2" => Aspect::Caution,
        "s3" => Aspect::Danger,
    });
    assert_eq!(w.infrastructure.held_by(a), line(0, 8));
    assert_eq!(w.infrastructure.held_by(b), vec![c(10, 0)]);
}

#[test]
fn test_token_section_is_exclusive() {
    let mut w = world("
        track 0,0 10,0
        signal t1 3,0 e token
        signal t2 7,0 e token
    ");
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::DriveBySight);

    // the token signal holds the train until it stands there
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 3);
    assert_eq!(aspect(&w, "t1"), Aspect::Danger);

    w.convoys[a].route_index = 3;
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 7);
    assert_eq!(out.transition, Some((c(3, 0), WorkingMethod::TokenBlock)));
    assert_eq!(w.convoys[a].signaling.pending_transition(), out.transition);
    check_aspects(&w, hashmap!{ "t1" => Aspect::Clear, "t2" => Aspect::Danger });

    // an opposing convoy gets no further than the section
    let b = place(&mut w, "b", line(10, 0), WorkingMethod::DriveBySight);
    let out = w.reserve(b, FAR).unwrap();
    assert!(!out.success);
    assert_eq!(out.next_signal_index, 2);
    assert_eq!(out.blocked_by, Some(a));
    assert_eq!(w.convoys[b].blocked_by, Some(a));
    assert_eq!(holders(&w, c(7, 0)), vec![a]);
}

#[test]
fn test_failure_rolls_back_to_last_signal() {
    let mut w = world("
        track 0,0 12,0
        signal a1 2,0 e ab
        signal a2 6,0 e ab
    ");
    let a = place(&mut w, "a", line(0, 12), WorkingMethod::DriveBySight);
    let b = blocker(&mut w, c(5, 0));

    let out = w.reserve(a, FAR).unwrap();
    assert!(!out.success);
    assert_eq!(out.next_signal_index, 2);
    assert_eq!(out.blocked_by, Some(b));
    assert_eq!(out.transition, Some((c(2, 0), WorkingMethod::AbsoluteBlock)));
    assert_eq!(w.infrastructure.held_by(a), line(0, 2));
    assert!(!w.infrastructure.segment(c(3, 0)).unwrap().is_reserved());
    assert_eq!(aspect(&w, "a1"), Aspect::Danger);
    assert_eq!(w.convoys[a].signaling.next_stop_index(), 2);
}

#[test]
fn test_missing_way_gives_everything_back() {
    let mut w = world("track 0,0 8,0");
    let a = place(&mut w, "a", line(0, 8), WorkingMethod::DriveBySight);
    assert!(w.remove_way(c(3, 0)));
    assert!(w.convoys[a].needs_route);

    let out = w.reserve(a, FAR).unwrap();
    assert!(out.recalculate);
    assert!(!out.success);
    assert_eq!(out.next_signal_index, 0);
    assert_eq!(w.infrastructure.held_by(a), vec![c(0, 0)]);
}

#[test]
fn test_recalculated_route_takes_the_loop() {
    let mut w = world("
        track 0,0 6,0
        track 2,0 2,1 5,1
        halt H 4,0 5,0 4,1 5,1
    ");
    let halt = w.infrastructure.layout.names.halts["H"];
    let a = add(&mut w, "a", c(0, 0), Ribi::EAST, Schedule::new(vec![halt], false));
    assert!(w.recalculate_route(a));
    assert_eq!(w.convoys[a].route.tiles(), &line(0, 5)[..]);

    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 4);
    assert_eq!(w.infrastructure.held_by(a), line(0, 4));

    assert!(w.remove_way(c(3, 0)));
    assert!(w.convoys[a].needs_route);
    assert!(w.recalculate_route(a));
    assert!(!w.convoys[a].needs_route);
    assert_eq!(w.convoys[a].route.tiles(), &[c(0, 0), c(1, 0), c(2, 0), c(2, 1), c(3, 1), c(4, 1), c(5, 1)][..]);
    // stale reservations on the old route are gone
    assert_eq!(w.infrastructure.held_by(a), vec![c(0, 0)]);
}

const DIRECTIONAL: &str = "
    track 0,0 12,0
    signal b1 2,0 e tcb bidirectional
    signal b2 5,0 e tcb bidirectional
";

#[test]
fn test_directional_section_beyond_authority() {
    let mut w = world(DIRECTIONAL);
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::TrackCircuitBlock);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 5);
    assert_eq!(w.infrastructure.held_by(a).last(), Some(&c(10, 0)));
    let seg = w.infrastructure.segment(c(7, 0)).unwrap();
    assert_eq!(seg.kind, ReservationKind::Directional);
    assert_eq!(seg.direction, Ribi::EAST);

    // same direction may share, the opposite direction may not
    let (other, third) = (Index::from_raw_parts(7, 0), Index::from_raw_parts(8, 0));
    assert!(w.infrastructure.reserve(c(7, 0), other, Ribi::EAST, ReservationKind::Directional));
    assert_eq!(holders(&w, c(7, 0)), vec![a, other]);
    assert!(!w.infrastructure.reserve(c(8, 0), third, Ribi::WEST, ReservationKind::Directional));
    assert!(!w.infrastructure.reserve(c(6, 0), third, Ribi::WEST, ReservationKind::Block));

    // releasing leaves the co-holder in place
    w.release_ahead(a);
    assert_eq!(holders(&w, c(7, 0)), vec![other]);
    assert_eq!(w.infrastructure.segment(c(7, 0)).unwrap().kind, ReservationKind::Directional);
    assert!(!w.infrastructure.segment(c(6, 0)).unwrap().is_reserved());
    assert_eq!(w.infrastructure.held_by(a), vec![c(0, 0)]);
    check_aspects(&w, hashmap!{ "b1" => Aspect::Danger, "b2" => Aspect::Danger });

    w.release_ahead(a);
    assert_eq!(holders(&w, c(7, 0)), vec![other]);
}

#[test]
fn test_opposing_directional_curtails_the_run() {
    let mut w = world(DIRECTIONAL);
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::TrackCircuitBlock);
    let opposing = Index::from_raw_parts(7, 0);
    assert!(w.infrastructure.reserve(c(9, 0), opposing, Ribi::WEST, ReservationKind::Directional));

    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 5);
    assert_eq!(w.infrastructure.held_by(a), line(0, 5));
    for x in 6..9 {
        assert!(!w.infrastructure.segment(c(x, 0)).unwrap().is_reserved());
    }
    assert_eq!(holders(&w, c(9, 0)), vec![opposing]);
    assert_eq!(aspect(&w, "b2"), Aspect::Danger);
}

#[test]
fn test_directional_run_stops_at_one_way() {
    let mut w = world(&format!("{}\n    oneway 8,0 e", DIRECTIONAL));
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::TrackCircuitBlock);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(w.infrastructure.held_by(a).last(), Some(&c(7, 0)));
    assert!(!w.infrastructure.segment(c(8, 0)).unwrap().is_reserved());
}

#[test]
fn test_moving_block_limits() {
    // out of beacon range
    let mut w = world("
        track 0,0 30,0
        signal m1 1,0 e mb range=5
    ");
    let a = place(&mut w, "a", line(0, 30), WorkingMethod::DriveBySight);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 6);
    assert_eq!(aspect(&w, "m1"), Aspect::Clear);

    // braking distance, never shorter than sighting distance
    let layout = "
        track 0,0 30,0
        signal m1 1,0 e mb
    ";
    let mut w = world(layout);
    let a = place(&mut w, "a", line(0, 30), WorkingMethod::DriveBySight);
    assert_eq!(w.reserve(a, 40).unwrap().next_signal_index, 4);

    let mut w = world(layout);
    let a = place(&mut w, "a", line(0, 30), WorkingMethod::DriveBySight);
    assert_eq!(w.reserve(a, 100).unwrap().next_signal_index, 6);

    // a huge sighting distance reaches the end of the route
    let mut w = world(layout);
    w.config.sighting_distance_tiles = u32::MAX;
    let a = place(&mut w, "a", line(0, 30), WorkingMethod::DriveBySight);
    let out = w.reserve(a, 40).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 30);
}

#[test]
fn test_drive_by_sight_limit() {
    let mut w = world("track 0,0 10,0");
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::DriveBySight);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 4);

    let mut w = world("track 0,0 10,0");
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::DriveBySight);
    let b = blocker(&mut w, c(3, 0));
    let out = w.reserve(a, FAR).unwrap();
    assert!(!out.success);
    assert_eq!(out.next_signal_index, 2);
    assert_eq!(out.blocked_by, Some(b));
    assert_eq!(w.infrastructure.held_by(a), line(0, 2));
}

#[test]
fn test_next_signal_skips_distants() {
    let w = world("
        track 0,0 10,0
        signal d 2,0 e ab distant
        signal s 6,0 e ab
    ");
    let inf = &w.infrastructure;
    let (d, s) = (inf.layout.names.signals["d"], inf.layout.names.signals["s"]);
    assert_eq!(inf.roles[d], SignalRole::Distant(Some(s)));
    assert_eq!(inf.aspect(d), Aspect::Caution);
    let route = Route::new(&inf.layout, line(0, 10));
    assert_eq!(find_next_signal(inf, &route, 0), Some(6));
    assert_eq!(find_next_signal(inf, &route, 6), None);
}

#[test]
fn test_distant_extends_absolute_block() {
    let mut w = world("
        track 0,0 12,0
        signal a1 2,0 e ab
        signal d 4,0 e ab distant
        signal a2 6,0 e ab
        signal a3 9,0 e ab
    ");
    let a = place(&mut w, "a", line(0, 12), WorkingMethod::DriveBySight);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 9);
    check_aspects(&w, hashmap!{
        "a1" => Aspect::Clear,
        "d" => Aspect::Clear,
        "a2" => Aspect::Clear,
        "a3" => Aspect::Danger,
    });

    let mut w = world("
        track 0,0 12,0
        signal a1 2,0 e ab
        signal a2 6,0 e ab
        signal a3 9,0 e ab
    ");
    let a = place(&mut w, "a", line(0, 12), WorkingMethod::DriveBySight);
    assert_eq!(w.reserve(a, FAR).unwrap().next_signal_index, 6);
}

#[test]
fn test_time_interval_signal() {
    let mut w = world("
        track 0,0 10,0
        signal t 2,0 e ti
    ");
    let t = w.infrastructure.layout.names.signals["t"];
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::DriveBySight);
    w.infrastructure.signals[t].train_last_passed = Some(100);

    w.infrastructure.time = 110;
    let out = w.reserve(a, FAR).unwrap();
    assert_eq!(out.next_signal_index, 2);
    assert_eq!(aspect(&w, "t"), Aspect::Danger);

    w.infrastructure.time = 170;
    let out = w.reserve(a, FAR).unwrap();
    assert_eq!(out.next_signal_index, 4);
    assert_eq!(aspect(&w, "t"), Aspect::Caution);

    // without longblock, caution is the most it shows
    w.infrastructure.time = 400;
    w.reserve(a, FAR).unwrap();
    assert_eq!(aspect(&w, "t"), Aspect::Caution);
}

#[test]
fn test_forced_drive_by_sight_passes_called_on_signal() {
    let mut w = world("
        track 0,0 8,0
        signal t 0,0 e ti
    ");
    let t = w.infrastructure.layout.names.signals["t"];
    let a = place(&mut w, "a", line(0, 8), WorkingMethod::TimeInterval);
    w.infrastructure.signals[t].train_last_passed = Some(0);
    w.infrastructure.time = 5;
    assert_eq!(w.reserve(a, FAR).unwrap().next_signal_index, 0);

    w.force_drive_by_sight(a);
    assert_eq!(w.convoys[a].signaling.working_method(), WorkingMethod::DriveBySight);
    assert_eq!(aspect(&w, "t"), Aspect::CallOn);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 4);
    assert_eq!(aspect(&w, "t"), Aspect::CallOn);
}

#[test]
fn test_crossing_follows_reservation() {
    let mut w = world("
        track 0,0 8,0
        signal a1 2,0 e ab
        crossing 3,0
    ");
    let a = place(&mut w, "a", line(0, 8), WorkingMethod::DriveBySight);
    let b = blocker(&mut w, c(5, 0));

    // the failed walk gives the crossing back
    assert!(!w.reserve(a, FAR).unwrap().success);
    assert!(!w.infrastructure.crossings[0].is_closed_to_road());
    assert!(w.infrastructure.request_road(0));

    let out = w.reserve(a, FAR).unwrap();
    assert!(!out.success);
    assert_eq!(out.next_signal_index, 2);
    assert_eq!(out.blocked_by, None);

    w.infrastructure.release_road(0);
    w.remove_convoy(b);
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 8);
    assert!(w.infrastructure.crossings[0].is_closed_to_road());
    assert!(!w.infrastructure.request_road(0));
}

const CHOOSE: &str = "
    track 0,0 6,0
    track 2,0 2,1 5,1
    halt H 4,0 5,0 4,1 5,1
    signal c 1,0 e ab choose
";

fn choosing_convoy(w: &mut World) -> ConvoyHandle {
    let halt = w.infrastructure.layout.names.halts["H"];
    let a = add(w, "a", c(0, 0), Ribi::EAST, Schedule::new(vec![halt], false));
    assert!(w.recalculate_route(a));
    assert_eq!(w.convoys[a].route.tiles(), &line(0, 5)[..]);
    a
}

#[test]
fn test_choose_signal_picks_free_platform() {
    let mut w = world(CHOOSE);
    let a = choosing_convoy(&mut w);
    let b = blocker(&mut w, c(4, 0));

    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.choose_taken, Some(w.infrastructure.layout.names.signals["c"]));
    assert_eq!(out.next_signal_index, 6);
    assert_eq!(w.convoys[a].route.tiles(),
               &[c(0, 0), c(1, 0), c(2, 0), c(2, 1), c(3, 1), c(4, 1), c(5, 1)][..]);
    assert_eq!(aspect(&w, "c"), Aspect::Clear);
    assert!(w.infrastructure.held_by(a).contains(&c(5, 1)));
    assert!(!w.infrastructure.held_by(a).contains(&c(3, 0)));
    assert_eq!(w.infrastructure.held_by(b), vec![c(4, 0)]);
}

#[test]
fn test_choose_signal_without_alternative() {
    let mut w = world(CHOOSE);
    let a = choosing_convoy(&mut w);
    blocker(&mut w, c(4, 0));
    blocker(&mut w, c(3, 1));

    let out = w.reserve(a, FAR).unwrap();
    assert!(!out.success);
    assert_eq!(out.choose_taken, None);
    assert_eq!(out.next_signal_index, 1);
    assert_eq!(w.convoys[a].route.tiles(), &line(0, 5)[..]);
    assert_eq!(aspect(&w, "c"), Aspect::Danger);
    assert_eq!(w.infrastructure.held_by(a), line(0, 1));
}

#[test]
fn test_choose_signal_respects_axle_load() {
    let mut w = world("
        track 0,0 6,0
        track 2,0 2,1
        track 2,1 5,1 axle=8
        halt H 4,0 5,0 4,1 5,1
        signal c 1,0 e ab choose
    ");
    let a = choosing_convoy(&mut w);
    blocker(&mut w, c(4, 0));

    // too heavy for the loop
    let out = w.reserve(a, FAR).unwrap();
    assert!(!out.success);
    assert_eq!(out.choose_taken, None);
    assert_eq!(w.convoys[a].route.tiles(), &line(0, 5)[..]);

    w.convoys[a].params.highest_axle_load = 8;
    let out = w.reserve(a, FAR).unwrap();
    assert!(out.success);
    assert_eq!(w.convoys[a].route.tiles().last(), Some(&c(5, 1)));
}

#[test]
fn test_snapshot_drops_dead_convoys() {
    let mut w = world(DIRECTIONAL);
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::TrackCircuitBlock);
    let b = add(&mut w, "b", c(12, 0), Ribi::WEST, Schedule::default());
    assert!(w.reserve(a, FAR).unwrap().success);
    assert!(w.infrastructure.reserve(c(7, 0), b, Ribi::EAST, ReservationKind::Directional));

    let records = snapshot::save(&w.infrastructure);
    assert_eq!(records.len(), 13);
    let records = snapshot::from_json(&snapshot::to_json(&records).unwrap()).unwrap();

    w.convoys.remove(b);
    let mut inf = Infrastructure::new(w.infrastructure.layout.clone(),
                                      Box::new(|_: Tick, _: InfrastructureLogEvent| {}));
    assert_eq!(snapshot::load(&mut inf, &w.convoys, &records).unwrap(), 11);
    let seg = inf.segment(c(7, 0)).unwrap();
    assert_eq!(seg.holders.to_vec(), vec![a]);
    assert_eq!((seg.kind, seg.direction), (ReservationKind::Directional, Ribi::EAST));
    assert_eq!(inf.segment(c(0, 0)).unwrap().kind, ReservationKind::Priority);
    assert!(!inf.segment(c(12, 0)).unwrap().is_reserved());
}

#[test]
fn test_head_on_deadlock_reverses_one() {
    let mut w = world("
        track 0,0 9,0
        halt W 0,0
        halt E 9,0
        signal wa 5,0 w ab
        signal wb 3,0 w ab
    ");
    let (west, east) = (w.infrastructure.layout.names.halts["W"], w.infrastructure.layout.names.halts["E"]);
    let x = add(&mut w, "x", c(2, 0), Ribi::EAST, Schedule { entries: vec![west, east], current: 1, repeat: false });
    let y = add(&mut w, "y", c(6, 0), Ribi::WEST, Schedule { entries: vec![east, west], current: 1, repeat: false });
    w.convoys[x].last_stop_pos = Some(c(0, 0));
    w.convoys[y].last_stop_pos = Some(c(9, 0));
    assert!(w.recalculate_route(x));
    assert!(w.recalculate_route(y));

    let out = w.reserve(x, FAR).unwrap();
    assert_eq!((out.success, out.next_signal_index, out.blocked_by), (false, 3, Some(y)));
    let out = w.reserve(y, FAR).unwrap();
    assert_eq!((out.success, out.next_signal_index, out.blocked_by), (false, 0, Some(x)));
    assert!(deadlock::is_deadlocked(&w, x, y));

    // x is two tiles from where it last stopped, y three
    assert_eq!(deadlock::resolve(&mut w, y), Some(x));
    assert!(w.convoys[x].needs_route);
    assert_eq!(w.convoys[x].blocked_by, None);
    assert_eq!(w.convoys[y].blocked_by, None);
    assert_eq!(w.convoys[x].schedule.current_entry(), Some(west));
    assert_eq!(w.convoys[x].signaling.working_method(), WorkingMethod::DriveBySight);
    assert_eq!(w.infrastructure.held_by(x), vec![c(2, 0)]);
    assert!(!deadlock::is_deadlocked(&w, x, y));

    let out = w.reserve(y, FAR).unwrap();
    assert!(out.success);
    assert_eq!(out.next_signal_index, 3);
    check_aspects(&w, hashmap!{ "wa" => Aspect::Clear, "wb" => Aspect::Danger });

    // equal distances go to the lower slot
    w.convoys[y].last_stop_pos = Some(c(8, 0));
    assert_eq!(deadlock::pick_reverser(&w, y, x), Some(x));
    w.convoys[y].last_stop_pos = Some(c(6, 0));
    assert_eq!(deadlock::pick_reverser(&w, x, y), Some(y));
}

#[test]
fn test_evaluate_single_convoy() {
    let layout = get_layout_string("
        track 0,0 10,0
        halt A 0,0
        halt B 10,0
        signal s1 3,0 e tcb aspects=3
        signal s2 7,0 e tcb aspects=3
    ").unwrap();
    let b = layout.names.halts["B"];
    let s1 = layout.names.signals["s1"];
    let dispatch = parse_dispatch("convoy c1 at 0,0 e to B").unwrap();
    let config = Config { max_ticks: 1000, ..Config::default() };

    let (history, records) = evaluate_plan_with_snapshot(layout, &dispatch, config).unwrap();
    assert!(records.is_empty());
    assert_eq!(history.convoys.len(), 1);
    let (ref name, ref events) = history.convoys[0];
    assert_eq!(name, "c1");

    let tiles: Vec<Coord> = events.iter()
        .filter_map(|(_, e)| match e { ConvoyLogEvent::Tile(p) => Some(*p), _ => None })
        .collect();
    assert_eq!(tiles, line(1, 10));
    let has = |ev: ConvoyLogEvent| events.iter().any(|(_, e)| *e == ev);
    assert!(has(ConvoyLogEvent::Transition(WorkingMethod::TrackCircuitBlock)));
    assert!(has(ConvoyLogEvent::Arrived(b)));
    assert!(has(ConvoyLogEvent::Departed(b)));
    assert_eq!(events.last().map(|(_, e)| e), Some(&ConvoyLogEvent::Finished));

    assert!(history.inf.iter().any(|(_, e)| *e == InfrastructureLogEvent::Aspect { signal: s1, aspect: Aspect::Caution }));
}

#[test]
fn test_queued_transition_waits_for_its_signal() {
    let mut w = world("
        track 0,0 10,0
        signal t 2,0 e ti
        signal s 5,0 e tcb
    ");
    let t = w.infrastructure.layout.names.signals["t"];
    let a = place(&mut w, "a", line(0, 10), WorkingMethod::DriveBySight);
    assert_eq!(w.convoys[a].signaling.pending_transition(), None);

    // at the called-on signal the method in force stays
    w.convoys[a].route_index = 2;
    w.infrastructure.set_aspect(t, Aspect::CallOn);
    let out = w.reserve(a, FAR).unwrap();
    assert_eq!(out.transition, Some((c(5, 0), WorkingMethod::TrackCircuitBlock)));
    assert_eq!(w.convoys[a].signaling.pending_transition(), out.transition);

    // giving the authority back drops it
    w.release_ahead(a);
    assert_eq!(w.convoys[a].signaling.pending_transition(), None);
}
