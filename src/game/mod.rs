mod assignment;
pub mod clue_compiler;
pub mod generation_context;
pub mod generation_host;
pub mod generation_task;
pub mod obscurer;
pub mod scheduler;
pub mod settings;
pub mod simplifier;

pub use assignment::assign_solution;
pub use clue_compiler::ClueCompiler;
pub use generation_context::GenerationContext;
pub use generation_host::GenerationHost;
pub use generation_task::{generate_puzzle, GenerationTask, TaskStatus};
pub use scheduler::{CancellationToken, StepMeter};
pub use settings::Settings;
