//! Pairing of distant signals with the home signals they announce.

use crate::input::layout::{Coord, Layout, SignalId};
use crate::railway::ribi::Ribi;

/// How far a distant signal may stand from its home signal.
pub const MAX_DISTANT_TILES: u32 = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalRole {
    /// Can hold a train.
    Stop,
    /// Repeats the aspect of a home signal further ahead, if one was found.
    Distant(Option<SignalId>),
}

/// The first stop signal ahead of `signal` in its direction. The search
/// follows plain track and bends only, since the pairing must not depend on
/// how a junction is set.
pub fn home_signal(layout: &Layout, signal: SignalId) -> Option<SignalId> {
    let desc = &layout.signals[signal];
    let mut pos = desc.pos;
    let mut dir = desc.facing;
    for _ in 0..MAX_DISTANT_TILES {
        let (next, step) = single_exit(layout, pos, dir)?;
        if let Some(s) = layout.signal_facing(next, step) {
            let d = &layout.signals[s];
            if !d.distant || d.combined {
                return Some(s);
            }
        }
        pos = next;
        dir = step;
    }
    None
}

fn single_exit(layout: &Layout, pos: Coord, dir: Ribi) -> Option<(Coord, Ribi)> {
    let exits = layout.exits(pos, dir.backward());
    if exits.len() == 1 {
        Some(exits[0])
    } else {
        None
    }
}

fn compatible(layout: &Layout, a: SignalId, b: SignalId) -> bool {
    layout.signals[a].signalbox == layout.signals[b].signalbox
}

pub fn signal_role(layout: &Layout, signal: SignalId) -> SignalRole {
    let desc = &layout.signals[signal];
    if !desc.distant && !desc.combined {
        return SignalRole::Stop;
    }
    match home_signal(layout, signal) {
        Some(home) if compatible(layout, signal, home) => SignalRole::Distant(Some(home)),
        Some(_) => SignalRole::Stop,
        None if desc.combined => SignalRole::Stop,
        None => SignalRole::Distant(None),
    }
}

pub fn signal_roles(layout: &Layout) -> Vec<SignalRole> {
    (0..layout.signals.len()).map(|s| signal_role(layout, s)).collect()
}

/// Whether a junction lies between the signal and the next signal ahead.
pub fn protects_junction(layout: &Layout, signal: SignalId) -> bool {
    let desc = &layout.signals[signal];
    let mut pos = desc.pos;
    let mut dir = desc.facing;
    for _ in 0..MAX_DISTANT_TILES {
        let exits = layout.exits(pos, dir.backward());
        if exits.len() != 1 {
            return exits.len() > 1;
        }
        let (next, step) = exits[0];
        if layout.way(next).map(|w| w.ribi.is_junction()).unwrap_or(false) {
            return true;
        }
        if layout.signal_facing(next, step).is_some() {
            return false;
        }
        pos = next;
        dir = step;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::layout::SignalDesc;
    use crate::railway::working_method::WorkingMethod;

    fn line() -> Layout {
        let mut l = Layout::new();
        l.add_track(Coord::new(0, 0), Coord::new(8, 0)).unwrap();
        l.add_track(Coord::new(6, 0), Coord::new(6, 2)).unwrap();
        l
    }

    fn signal(l: &mut Layout, name: &str, x: i32, distant: bool, signalbox: Option<usize>) -> SignalId {
        let mut d = SignalDesc::new(name, Coord::new(x, 0), Ribi::EAST, WorkingMethod::AbsoluteBlock);
        d.distant = distant;
        d.signalbox = signalbox;
        l.add_signal(d).unwrap()
    }

    #[test]
    fn distant_pairs_with_compatible_home() {
        let mut l = line();
        let d = signal(&mut l, "d", 1, true, Some(1));
        let h = signal(&mut l, "h", 4, false, Some(1));
        assert_eq!(home_signal(&l, d), Some(h));
        assert_eq!(signal_role(&l, d), SignalRole::Distant(Some(h)));
        assert_eq!(signal_role(&l, h), SignalRole::Stop);
    }

    #[test]
    fn incompatible_home_degrades_to_stop() {
        let mut l = line();
        let d = signal(&mut l, "d", 1, true, Some(1));
        signal(&mut l, "h", 4, false, Some(2));
        assert_eq!(signal_role(&l, d), SignalRole::Stop);
    }

    #[test]
    fn no_pairing_across_junction() {
        let mut l = line();
        let d = signal(&mut l, "d", 5, true, None);
        signal(&mut l, "h", 7, false, None);
        assert_eq!(home_signal(&l, d), None);
        assert_eq!(signal_role(&l, d), SignalRole::Distant(None));
        assert!(protects_junction(&l, d));
        let h = l.names.signals["h"];
        assert!(!protects_junction(&l, h));
    }
}
