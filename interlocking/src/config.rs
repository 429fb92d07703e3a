use serde::{Deserialize, Serialize};

use crate::eventsim::Tick;

/// Simulation settings. Missing fields in a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How far a driver sees under drive-by-sight and time interval working.
    pub sighting_distance_tiles: u32,
    /// Bound on the choose-signal route search; 0 means unbounded.
    pub max_choose_route_steps: u32,
    pub time_interval_caution_ticks: Tick,
    pub time_interval_clear_ticks: Tick,
    pub one_train_staff_radius: u32,
    pub max_route_search_steps: u32,
    pub retry_ticks: Tick,
    pub dwell_ticks: Tick,
    pub max_ticks: Tick,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            sighting_distance_tiles: 4,
            max_choose_route_steps: 200,
            time_interval_caution_ticks: 60,
            time_interval_clear_ticks: 120,
            one_train_staff_radius: 3,
            max_route_search_steps: 10_000,
            retry_ticks: 4,
            dwell_ticks: 10,
            max_ticks: 5_000,
        }
    }
}

impl Config {
    pub fn choose_steps(&self) -> Option<usize> {
        match self.max_choose_route_steps {
            0 => None,
            n => Some(n as usize),
        }
    }

    pub fn route_steps(&self) -> Option<usize> {
        match self.max_route_search_steps {
            0 => None,
            n => Some(n as usize),
        }
    }

    pub fn from_json(s: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[test]
fn test_partial_config() {
    let c = Config::from_json(r#"{ "sighting_distance_tiles": 2, "max_choose_route_steps": 0 }"#).unwrap();
    assert_eq!(c.sighting_distance_tiles, 2);
    assert_eq!(c.choose_steps(), None);
    assert_eq!(c.time_interval_clear_ticks, 120);
    assert_eq!(Config::default().choose_steps(), Some(200));
}
