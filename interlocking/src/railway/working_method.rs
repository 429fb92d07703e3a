//! Signalling disciplines and the rules each imposes on reservation.
//!
//! Every `WorkingMethod` has a rules object answering three questions for
//! the reserver: how far ahead may be claimed, how many clear blocks a signal
//! needs for each aspect, and whether the section may be held directionally.

use serde::{Deserialize, Serialize};

use crate::eventsim::Tick;
use crate::input::layout::{Coord, SignalDesc};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkingMethod {
    DriveBySight,
    AbsoluteBlock,
    TokenBlock,
    OneTrainStaff,
    TrackCircuitBlock,
    CabSignalling,
    TimeInterval,
    TimeIntervalWithTelegraph,
    MovingBlock,
}

impl Default for WorkingMethod {
    fn default() -> WorkingMethod { WorkingMethod::DriveBySight }
}

impl WorkingMethod {
    pub fn parse(s: &str) -> Option<WorkingMethod> {
        use self::WorkingMethod::*;
        Some(match s {
            "drive_by_sight" | "dbs" => DriveBySight,
            "absolute_block" | "ab" => AbsoluteBlock,
            "token_block" | "token" => TokenBlock,
            "one_train_staff" | "ots" => OneTrainStaff,
            "track_circuit_block" | "tcb" => TrackCircuitBlock,
            "cab_signalling" | "cab" => CabSignalling,
            "time_interval" | "ti" => TimeInterval,
            "time_interval_with_telegraph" | "tiwt" => TimeIntervalWithTelegraph,
            "moving_block" | "mb" => MovingBlock,
            _ => return None,
        })
    }

    pub fn is_time_interval(self) -> bool {
        self == WorkingMethod::TimeInterval || self == WorkingMethod::TimeIntervalWithTelegraph
    }

    pub fn rules(self) -> &'static dyn WorkingMethodRules {
        use self::WorkingMethod::*;
        match self {
            DriveBySight => &DriveBySightRules,
            AbsoluteBlock => &AbsoluteBlockRules,
            TokenBlock | OneTrainStaff => &TokenRules,
            TrackCircuitBlock | CabSignalling => &TrackCircuitRules,
            TimeInterval => &TimeIntervalRules,
            TimeIntervalWithTelegraph => &TelegraphRules,
            MovingBlock => &MovingBlockRules,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReservationExtent {
    /// No further than the driver can see.
    Sighting,
    /// This many blocks past the protecting signal.
    Blocks(u32),
    /// Up to the next signal or the end of the route.
    WholeSection,
    /// As far as the train needs to brake.
    BrakingDistance,
}

/// What the reserver learns about the signal whose rules it applies.
#[derive(Debug, Copy, Clone)]
pub struct SignalContext<'a> {
    pub desc: &'a SignalDesc,
    pub protects_junction: bool,
    /// A distant signal paired with the next home signal was passed.
    pub distant_ahead: bool,
}

pub trait WorkingMethodRules {
    fn reservation_extent(&self, signal: Option<SignalContext>) -> ReservationExtent;

    /// Aspect strength of a signal with `aspects` aspects and `depth` clear
    /// blocks beyond it.
    fn clears_aspect(&self, aspects: u8, depth: u32) -> u8 {
        aspect_from_depth(aspects, depth)
    }

    fn allows_directional(&self, signal: &SignalDesc) -> bool {
        signal.bidirectional || signal.longblock
    }

    /// The train must stand at the signal before it can clear.
    fn requires_stop(&self) -> bool { false }
}

pub fn aspect_from_depth(aspects: u8, depth: u32) -> u8 {
    if depth == 0 {
        return 0;
    }
    if aspects <= 2 {
        return 4;
    }
    let further = depth - 1;
    if further >= (aspects - 2) as u32 {
        4
    } else {
        1 + further as u8
    }
}

struct DriveBySightRules;
impl WorkingMethodRules for DriveBySightRules {
    fn reservation_extent(&self, _: Option<SignalContext>) -> ReservationExtent {
        ReservationExtent::Sighting
    }
    fn allows_directional(&self, _: &SignalDesc) -> bool { false }
}

struct AbsoluteBlockRules;
impl WorkingMethodRules for AbsoluteBlockRules {
    fn reservation_extent(&self, signal: Option<SignalContext>) -> ReservationExtent {
        match signal {
            Some(ref s) if s.distant_ahead => ReservationExtent::Blocks(2),
            _ => ReservationExtent::Blocks(1),
        }
    }
}

struct TokenRules;
impl WorkingMethodRules for TokenRules {
    fn reservation_extent(&self, _: Option<SignalContext>) -> ReservationExtent {
        ReservationExtent::WholeSection
    }
    fn allows_directional(&self, _: &SignalDesc) -> bool { false }
    fn requires_stop(&self) -> bool { true }
}

struct TrackCircuitRules;
impl WorkingMethodRules for TrackCircuitRules {
    fn reservation_extent(&self, signal: Option<SignalContext>) -> ReservationExtent {
        let aspects = signal.map(|s| s.desc.aspects).unwrap_or(2);
        ReservationExtent::Blocks((aspects.max(2) - 1) as u32)
    }
}

struct TimeIntervalRules;
impl WorkingMethodRules for TimeIntervalRules {
    fn reservation_extent(&self, signal: Option<SignalContext>) -> ReservationExtent {
        match signal {
            Some(ref s) if s.protects_junction => ReservationExtent::Blocks(1),
            _ => ReservationExtent::Sighting,
        }
    }
    fn allows_directional(&self, _: &SignalDesc) -> bool { false }
}

struct TelegraphRules;
impl WorkingMethodRules for TelegraphRules {
    fn reservation_extent(&self, _: Option<SignalContext>) -> ReservationExtent {
        ReservationExtent::Sighting
    }
    fn allows_directional(&self, _: &SignalDesc) -> bool { true }
}

struct MovingBlockRules;
impl WorkingMethodRules for MovingBlockRules {
    fn reservation_extent(&self, _: Option<SignalContext>) -> ReservationExtent {
        ReservationExtent::BrakingDistance
    }
}

/// Aspect strength of a time-interval signal from the time since the last
/// train: danger, then caution, then clear.
pub fn time_interval_strength(last_train: Option<Tick>, now: Tick, caution_ticks: Tick, clear_ticks: Tick) -> u8 {
    match last_train {
        None => 4,
        Some(t) => {
            let elapsed = now.saturating_sub(t);
            if elapsed < caution_ticks {
                0
            } else if elapsed < clear_ticks {
                1
            } else {
                4
            }
        }
    }
}

/// Working method after the front of a train passes `signal` at `pos`.
///
/// Distant signals never change it. Under one-train-staff the only way out
/// is passing an instrument within `radius` tiles of the one that
/// issued the staff; other instruments on the section are ignored.
pub fn transition(current: WorkingMethod, signal: &SignalDesc, last_signal_pos: Option<Coord>,
                  pos: Coord, radius: u32) -> WorkingMethod {
    if signal.distant {
        return current;
    }
    if current == WorkingMethod::OneTrainStaff && signal.working_method == WorkingMethod::OneTrainStaff {
        return match last_signal_pos {
            Some(anchor) if anchor.tile_distance(pos) < radius => WorkingMethod::DriveBySight,
            _ => current,
        };
    }
    signal.working_method
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::railway::ribi::Ribi;

    #[test]
    fn aspect_grades_are_monotone() {
        for aspects in 2..6u8 {
            let mut last = 0;
            for depth in 0..8 {
                let s = aspect_from_depth(aspects, depth);
                assert!(s >= last, "{} aspects, depth {}", aspects, depth);
                last = s;
            }
            assert_eq!(aspect_from_depth(aspects, 0), 0);
            // clear after aspects - 1 blocks, never before
            assert_eq!(aspect_from_depth(aspects, aspects as u32 - 1), 4);
            if aspects > 2 {
                assert!(aspect_from_depth(aspects, aspects as u32 - 2) < 4);
            }
        }
        assert_eq!(aspect_from_depth(4, 1), 1);
        assert_eq!(aspect_from_depth(4, 2), 2);
        assert_eq!(aspect_from_depth(4, 3), 4);
        assert_eq!(aspect_from_depth(5, 3), 3);
    }

    #[test]
    fn extents() {
        let mut desc = SignalDesc::new("s", Coord::new(0, 0), Ribi::EAST, WorkingMethod::TrackCircuitBlock);
        desc.aspects = 4;
        let ctx = SignalContext { desc: &desc, protects_junction: false, distant_ahead: false };
        assert_eq!(WorkingMethod::TrackCircuitBlock.rules().reservation_extent(Some(ctx)),
                   ReservationExtent::Blocks(3));
        assert_eq!(WorkingMethod::AbsoluteBlock.rules().reservation_extent(Some(ctx)),
                   ReservationExtent::Blocks(1));
        let with_distant = SignalContext { distant_ahead: true, ..ctx };
        assert_eq!(WorkingMethod::AbsoluteBlock.rules().reservation_extent(Some(with_distant)),
                   ReservationExtent::Blocks(2));
        assert_eq!(WorkingMethod::TimeInterval.rules().reservation_extent(Some(ctx)),
                   ReservationExtent::Sighting);
        let junction = SignalContext { protects_junction: true, ..ctx };
        assert_eq!(WorkingMethod::TimeInterval.rules().reservation_extent(Some(junction)),
                   ReservationExtent::Blocks(1));
        assert!(WorkingMethod::TokenBlock.rules().requires_stop());
        assert!(!WorkingMethod::TimeInterval.rules().allows_directional(&desc));
        assert!(WorkingMethod::TimeIntervalWithTelegraph.rules().allows_directional(&desc));
        desc.bidirectional = true;
        assert!(WorkingMethod::CabSignalling.rules().allows_directional(&desc));
    }

    #[test]
    fn time_interval_thresholds() {
        assert_eq!(time_interval_strength(None, 5, 60, 120), 4);
        assert_eq!(time_interval_strength(Some(0), 59, 60, 120), 0);
        assert_eq!(time_interval_strength(Some(0), 60, 60, 120), 1);
        assert_eq!(time_interval_strength(Some(0), 120, 60, 120), 4);
    }

    #[test]
    fn one_train_staff_needs_same_instrument() {
        let staff = SignalDesc::new("ots", Coord::new(0, 0), Ribi::EAST, WorkingMethod::OneTrainStaff);
        let ab = SignalDesc::new("ab", Coord::new(9, 0), Ribi::EAST, WorkingMethod::AbsoluteBlock);
        let mut distant = ab.clone();
        distant.distant = true;

        let m = transition(WorkingMethod::DriveBySight, &staff, None, Coord::new(0, 0), 3);
        assert_eq!(m, WorkingMethod::OneTrainStaff);

        let anchor = Some(Coord::new(0, 0));
        // a different instrument far down the line
        assert_eq!(transition(m, &staff, anchor, Coord::new(20, 0), 3), WorkingMethod::OneTrainStaff);
        // back at the issuing instrument
        assert_eq!(transition(m, &staff, anchor, Coord::new(1, 1), 3), WorkingMethod::DriveBySight);
        assert_eq!(transition(m, &staff, anchor, Coord::new(3, 0), 3), WorkingMethod::OneTrainStaff);

        assert_eq!(transition(m, &distant, anchor, Coord::new(9, 0), 3), WorkingMethod::OneTrainStaff);
        assert_eq!(transition(m, &ab, anchor, Coord::new(9, 0), 3), WorkingMethod::AbsoluteBlock);
    }
}
