use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;
use uuid::Uuid;

use super::generation_context::GenerationContext;
use crate::error::{GenerationError, Result};

/// Shared abort flag for one generation run. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts narrowing steps for one run and turns a cancelled token into an
/// error at every checkpoint.
#[derive(Debug)]
pub struct StepMeter {
    run_id: Uuid,
    token: CancellationToken,
    steps: Cell<u64>,
    steps_since_yield: Cell<u64>,
}

impl StepMeter {
    pub fn new(run_id: Uuid, token: CancellationToken) -> Self {
        Self {
            run_id,
            token,
            steps: Cell::new(0),
            steps_since_yield: Cell::new(0),
        }
    }

    /// A meter nobody can cancel, for one-off narrowing outside a run.
    pub fn unbounded() -> Self {
        Self::new(Uuid::nil(), CancellationToken::new())
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            trace!(target: "scheduler", "Run {} observed cancellation", self.run_id);
            return Err(GenerationError::Cancelled {
                run_id: self.run_id,
            });
        }
        Ok(())
    }

    /// Records one unit of work, then checks for cancellation.
    pub fn tick(&self) -> Result<()> {
        self.steps.set(self.steps.get() + 1);
        self.steps_since_yield.set(self.steps_since_yield.get() + 1);
        self.checkpoint()
    }

    pub fn should_yield(&self, step_budget: u64) -> bool {
        self.steps_since_yield.get() >= step_budget
    }

    /// Starts a new budget window; returns the steps spent in the last one.
    pub fn start_window(&self) -> u64 {
        self.steps_since_yield.replace(0)
    }

    pub fn total_steps(&self) -> u64 {
        self.steps.get()
    }
}

/// Outcome of one step of a resumable [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    /// Finished; whether the job changed the graph.
    Done(bool),
}

/// A unit of generation work that can be suspended between steps. Each step
/// costs at most a handful of narrowings.
pub trait Job {
    fn step(&mut self, ctx: &mut GenerationContext) -> Result<JobStatus>;
}

/// Steps `job` until it finishes.
pub fn run_job<J: Job>(job: &mut J, ctx: &mut GenerationContext) -> Result<bool> {
    loop {
        if let JobStatus::Done(changed) = job.step(ctx)? {
            return Ok(changed);
        }
    }
}
