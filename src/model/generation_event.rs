use uuid::Uuid;

use super::GenerationStats;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationPhase {
    Obscure,
    Simplify,
    Collapse,
    Compile,
    /// Replaying the compiled clues to confirm every node is pinned down.
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Started { run_id: Uuid },
    PhaseStarted { run_id: Uuid, phase: GenerationPhase },
    Yielded { run_id: Uuid, steps: u64 },
    Cancelled { run_id: Uuid },
    Completed { run_id: Uuid, stats: GenerationStats },
}

impl GenerationEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            GenerationEvent::Started { run_id }
            | GenerationEvent::PhaseStarted { run_id, .. }
            | GenerationEvent::Yielded { run_id, .. }
            | GenerationEvent::Cancelled { run_id }
            | GenerationEvent::Completed { run_id, .. } => *run_id,
        }
    }
}
