//! Logic-grid puzzle generation: a hidden assignment, a rule graph that
//! obscures it, and a clue list that is guaranteed to pin it down again.

pub mod error;
pub mod events;
pub mod game;
pub mod model;
pub mod solver;

pub use error::{GenerationError, Result};
