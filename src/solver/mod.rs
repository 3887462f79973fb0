pub mod narrower;
pub mod verification;

pub use narrower::{narrow, Narrower};
pub use verification::{first_unsound_node, is_derivable, is_sound, SoundnessSweep, SweepStatus};
