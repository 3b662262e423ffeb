#![warn(clippy::all)]

mod cell;
mod config;
mod engine;
mod error;
mod grid;
mod neighborhood;
mod utils;

pub use cell::{transition, Cell};
pub use config::EngineConfig;
pub use engine::{GenerationEngine, GenerationStats, Phase};
pub use error::{EngineError, Result};
pub use grid::{Coord, Grid, PopulationId};
pub use neighborhood::{candidate_frontier, neighbors, occupied_neighbors, MOORE_OFFSETS};
pub use utils::NiceInt;
