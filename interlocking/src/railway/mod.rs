//! Railway simulation: track reservation, signalling and convoys.

pub mod ribi;
pub mod segment;
pub mod signal;
pub mod working_method;
pub mod distant;
pub mod crossing;
pub mod route;
pub mod convoy;
pub mod infrastructure;
pub mod pathfind;
pub mod reserver;
pub mod choose;
pub mod deadlock;
pub mod dynamics;
pub mod driver;
pub mod world;

use crate::eventsim;
use crate::railway::world::World;
pub type Sim = eventsim::Simulation<World>;
