use serde::{Deserialize, Serialize};

use crate::eventsim::Tick;
use crate::input::layout::SignalId;
use crate::railway::working_method::WorkingMethod;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aspect {
    Danger,
    /// Permission to pass at danger and proceed at sight.
    CallOn,
    Caution,
    PreliminaryCaution,
    AdvanceCaution,
    Clear,
    CautionNoChoose,
    PreliminaryCautionNoChoose,
    AdvanceCautionNoChoose,
    ClearNoChoose,
}

impl Default for Aspect {
    fn default() -> Aspect { Aspect::Danger }
}

impl Aspect {
    /// Number of blocks the aspect announces as clear: 0 for danger,
    /// 1 for caution up to 4 for clear.
    pub fn strength(self) -> u8 {
        use self::Aspect::*;
        match self {
            Danger | CallOn => 0,
            Caution | CautionNoChoose => 1,
            PreliminaryCaution | PreliminaryCautionNoChoose => 2,
            AdvanceCaution | AdvanceCautionNoChoose => 3,
            Clear | ClearNoChoose => 4,
        }
    }

    pub fn from_strength(strength: u8, no_choose: bool) -> Aspect {
        use self::Aspect::*;
        match (strength, no_choose) {
            (0, _) => Danger,
            (1, false) => Caution,
            (1, true) => CautionNoChoose,
            (2, false) => PreliminaryCaution,
            (2, true) => PreliminaryCautionNoChoose,
            (3, false) => AdvanceCaution,
            (3, true) => AdvanceCautionNoChoose,
            (_, false) => Clear,
            (_, true) => ClearNoChoose,
        }
    }

    pub fn is_no_choose(self) -> bool {
        use self::Aspect::*;
        match self {
            CautionNoChoose | PreliminaryCautionNoChoose | AdvanceCautionNoChoose | ClearNoChoose => true,
            _ => false,
        }
    }
}

/// Dynamic state of one signal.
#[derive(Debug, Clone)]
pub struct Signal {
    pub id: SignalId,
    pub working_method: WorkingMethod,
    state: Aspect,
    pub train_last_passed: Option<Tick>,
    pub train_last_departed: Option<Tick>,
    pub protects_junction: bool,
}

impl Signal {
    pub fn new(id: SignalId, working_method: WorkingMethod, protects_junction: bool) -> Signal {
        Signal {
            id,
            working_method,
            state: Aspect::Danger,
            train_last_passed: None,
            train_last_departed: None,
            protects_junction,
        }
    }

    pub fn set_state(&mut self, aspect: Aspect) {
        self.state = aspect;
    }

    pub fn get_state(&self) -> Aspect {
        self.state
    }

    pub fn is_clear_for(&self, strength: u8) -> bool {
        self.state.strength() >= strength.max(1)
    }

    /// A train has passed the signal, or departed from a stop at it.
    /// The signal returns to danger; time-interval signals remember when.
    pub fn train_passed(&mut self, now: Tick, departing: bool) {
        self.state = Aspect::Danger;
        if self.working_method.is_time_interval() {
            if departing {
                self.train_last_departed = Some(now);
            } else {
                self.train_last_passed = Some(now);
            }
        }
    }

    /// Time of the most recent train movement past this signal.
    pub fn last_train(&self) -> Option<Tick> {
        match (self.train_last_passed, self.train_last_departed) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[test]
fn test_strength_and_no_choose() {
    for s in 0..5 {
        assert_eq!(Aspect::from_strength(s, false).strength(), s);
        assert_eq!(Aspect::from_strength(s, true).strength(), s);
    }
    assert_eq!(Aspect::from_strength(0, true), Aspect::Danger);
    assert!(Aspect::from_strength(4, true).is_no_choose());
    assert_eq!(Aspect::from_strength(9, false), Aspect::Clear);
    assert_eq!(Aspect::CallOn.strength(), 0);
}

#[test]
fn test_time_interval_stamps() {
    let mut ti = Signal::new(0, WorkingMethod::TimeInterval, false);
    ti.set_state(Aspect::Clear);
    assert!(ti.is_clear_for(4));
    ti.train_passed(10, false);
    ti.train_passed(25, true);
    assert_eq!(ti.get_state(), Aspect::Danger);
    assert!(!ti.is_clear_for(0));
    assert_eq!(ti.last_train(), Some(25));

    let mut ab = Signal::new(1, WorkingMethod::AbsoluteBlock, false);
    ab.set_state(Aspect::Caution);
    ab.train_passed(10, false);
    assert_eq!(ab.last_train(), None);
}
