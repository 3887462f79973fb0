use std::collections::VecDeque;

use log::{debug, info};
use rand::seq::SliceRandom;
use uuid::Uuid;

use super::clue_compiler::ClueCompiler;
use super::generation_context::GenerationContext;
use super::obscurer::ObscureJob;
use super::scheduler::{CancellationToken, Job, JobStatus};
use super::settings::Settings;
use super::simplifier::{collapsible_rules, CollapseJob, PruneJob};
use crate::error::{GenerationError, Result};
use crate::events::EventEmitter;
use crate::model::{
    Clue, GenerationEvent, GenerationPhase, GenerationRequest, NodeId, Placement, Puzzle,
    PuzzleNode, RuleGraph,
};
use crate::solver::{SoundnessSweep, SweepStatus};

enum Stage {
    Obscure {
        queue: VecDeque<NodeId>,
        job: Option<ObscureJob>,
    },
    Prune {
        queue: VecDeque<(NodeId, NodeId)>,
        job: Option<PruneJob>,
        pruned_this_pass: usize,
        after_collapse: bool,
    },
    Collapse {
        queue: VecDeque<(NodeId, usize)>,
        job: Option<CollapseJob>,
        collapsed: usize,
    },
    Compile {
        compiler: ClueCompiler,
    },
    Verify {
        replayed: RuleGraph,
        sweep: SoundnessSweep,
        clues: Vec<Clue>,
    },
    Finished(Puzzle),
    Failed(GenerationError),
    /// Held while a work item owns the stage it advances.
    Stepping,
}

impl Stage {
    fn phase(&self) -> Option<GenerationPhase> {
        match self {
            Stage::Obscure { .. } => Some(GenerationPhase::Obscure),
            Stage::Prune { .. } => Some(GenerationPhase::Simplify),
            Stage::Collapse { .. } => Some(GenerationPhase::Collapse),
            Stage::Compile { .. } => Some(GenerationPhase::Compile),
            Stage::Verify { .. } => Some(GenerationPhase::Verify),
            Stage::Finished(_) | Stage::Failed(_) | Stage::Stepping => None,
        }
    }
}

#[derive(Debug)]
pub enum TaskStatus {
    /// Yielded after spending the step budget; poll again to continue.
    Pending,
    Ready(Puzzle),
}

/// One generation run, broken into small work items so the host can stay
/// responsive. Each [`GenerationTask::poll`] runs work items until the step
/// budget is spent, then yields. A work item is one obscure attempt, one
/// node of a soundness check, or one clue pairing attempt.
pub struct GenerationTask {
    ctx: GenerationContext,
    stage: Stage,
    step_budget: u64,
    started: bool,
    event_emitter: Option<EventEmitter<GenerationEvent>>,
}

impl GenerationTask {
    pub fn new(request: &GenerationRequest, settings: &Settings) -> Result<Self> {
        let mut ctx = GenerationContext::new(request, settings)?;
        let mut queue = ctx.graph.non_fixed_ids();
        queue.shuffle(&mut ctx.rng);
        Ok(Self {
            ctx,
            stage: Stage::Obscure {
                queue: queue.into(),
                job: None,
            },
            step_budget: settings.step_budget.max(1),
            started: false,
            event_emitter: None,
        })
    }

    pub fn with_events(mut self, event_emitter: EventEmitter<GenerationEvent>) -> Self {
        self.event_emitter = Some(event_emitter);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.ctx.run_id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.token().clone()
    }

    pub fn graph(&self) -> &RuleGraph {
        &self.ctx.graph
    }

    /// Runs until the step budget is spent or the puzzle is ready.
    pub fn poll(&mut self) -> Result<TaskStatus> {
        match &self.stage {
            Stage::Finished(puzzle) => return Ok(TaskStatus::Ready(puzzle.clone())),
            Stage::Failed(error) => return Err(error.clone()),
            _ => (),
        }
        if !self.started {
            self.started = true;
            self.emit(GenerationEvent::Started {
                run_id: self.ctx.run_id,
            });
            self.emit_phase(GenerationPhase::Obscure);
        }

        self.ctx.meter.start_window();
        loop {
            let phase = self.stage.phase();
            let stage = std::mem::replace(&mut self.stage, Stage::Stepping);
            match self.ctx.meter.checkpoint().and_then(|_| self.advance(stage)) {
                Ok(next) => self.stage = next,
                Err(error) => {
                    if let GenerationError::Cancelled { run_id } = error {
                        self.emit(GenerationEvent::Cancelled { run_id });
                    }
                    self.stage = Stage::Failed(error.clone());
                    return Err(error);
                }
            }

            let next_phase = self.stage.phase();
            if let Some(next_phase) = next_phase.filter(|next| Some(*next) != phase) {
                debug!(target: "scheduler", "Run {} entering {:?}", self.ctx.run_id, next_phase);
                self.emit_phase(next_phase);
            }
            if let Stage::Finished(puzzle) = &self.stage {
                return Ok(TaskStatus::Ready(puzzle.clone()));
            }
            if self.ctx.meter.should_yield(self.step_budget) {
                self.ctx.stats.n_yields += 1;
                let steps = self.ctx.meter.start_window();
                self.emit(GenerationEvent::Yielded {
                    run_id: self.ctx.run_id,
                    steps,
                });
                return Ok(TaskStatus::Pending);
            }
        }
    }

    /// Polls until the puzzle is ready.
    pub fn run_to_completion(mut self) -> Result<Puzzle> {
        loop {
            if let TaskStatus::Ready(puzzle) = self.poll()? {
                return Ok(puzzle);
            }
        }
    }

    /// Runs one work item of `stage` and returns the stage to continue with.
    fn advance(&mut self, stage: Stage) -> Result<Stage> {
        let ctx = &mut self.ctx;
        match stage {
            Stage::Obscure { mut queue, job } => {
                let mut job = match job {
                    Some(job) => job,
                    None => match queue.pop_front() {
                        Some(id) => match ObscureJob::start(ctx, id) {
                            Some(job) => job,
                            None => return Ok(Stage::Obscure { queue, job: None }),
                        },
                        None => {
                            info!(
                                target: "obscurer",
                                "Obscured {} node(s), {} kept their trivial clue",
                                ctx.stats.n_obscured,
                                ctx.stats.n_fallbacks
                            );
                            return Ok(Self::prune_pass(ctx, false));
                        }
                    },
                };
                let job = match job.step(ctx)? {
                    JobStatus::Pending => Some(job),
                    JobStatus::Done(_) => None,
                };
                Ok(Stage::Obscure { queue, job })
            }
            Stage::Prune {
                mut queue,
                job,
                mut pruned_this_pass,
                after_collapse,
            } => {
                let mut job = match job {
                    Some(job) => job,
                    None => match queue.pop_front() {
                        Some((holder, target)) => match PruneJob::start(ctx, holder, target) {
                            Some(job) => job,
                            None => {
                                return Ok(Stage::Prune {
                                    queue,
                                    job: None,
                                    pruned_this_pass,
                                    after_collapse,
                                })
                            }
                        },
                        None if pruned_this_pass > 0 => {
                            return Ok(Self::prune_pass(ctx, after_collapse))
                        }
                        None if after_collapse => {
                            return Ok(Stage::Compile {
                                compiler: ClueCompiler::new(ctx),
                            })
                        }
                        None => {
                            return Ok(Stage::Collapse {
                                queue: collapsible_rules(ctx).into(),
                                job: None,
                                collapsed: 0,
                            })
                        }
                    },
                };
                let job = match job.step(ctx)? {
                    JobStatus::Pending => Some(job),
                    JobStatus::Done(pruned) => {
                        pruned_this_pass += usize::from(pruned);
                        None
                    }
                };
                Ok(Stage::Prune {
                    queue,
                    job,
                    pruned_this_pass,
                    after_collapse,
                })
            }
            Stage::Collapse {
                mut queue,
                job,
                mut collapsed,
            } => {
                let mut job = match job {
                    Some(job) => job,
                    None => match queue.pop_front() {
                        Some((id, category)) => match CollapseJob::start(ctx, id, category) {
                            Some(job) => job,
                            None => {
                                return Ok(Stage::Collapse {
                                    queue,
                                    job: None,
                                    collapsed,
                                })
                            }
                        },
                        None if collapsed > 0 => return Ok(Self::prune_pass(ctx, true)),
                        None => {
                            return Ok(Stage::Compile {
                                compiler: ClueCompiler::new(ctx),
                            })
                        }
                    },
                };
                let job = match job.step(ctx)? {
                    JobStatus::Pending => Some(job),
                    JobStatus::Done(kept) => {
                        collapsed += usize::from(kept);
                        None
                    }
                };
                Ok(Stage::Collapse {
                    queue,
                    job,
                    collapsed,
                })
            }
            Stage::Compile { mut compiler } => match compiler.step(ctx)? {
                JobStatus::Pending => Ok(Stage::Compile { compiler }),
                JobStatus::Done(_) => {
                    let clues = compiler.finish(ctx);
                    let replayed = RuleGraph::from_clues(&ctx.graph.solution(), &clues)?;
                    Ok(Stage::Verify {
                        sweep: SoundnessSweep::new(&replayed),
                        replayed,
                        clues,
                    })
                }
            },
            Stage::Verify {
                replayed,
                mut sweep,
                clues,
            } => match sweep.step(&replayed, &ctx.meter)? {
                SweepStatus::Pending => Ok(Stage::Verify {
                    replayed,
                    sweep,
                    clues,
                }),
                SweepStatus::Sound => Ok(Stage::Finished(self.assemble(clues))),
                SweepStatus::Unsound(node) => Err(GenerationError::Unsound { node }),
            },
            Stage::Finished(_) | Stage::Failed(_) | Stage::Stepping => Ok(stage),
        }
    }

    fn prune_pass(ctx: &mut GenerationContext, after_collapse: bool) -> Stage {
        let mut queue = ctx.graph.negative_rules();
        queue.shuffle(&mut ctx.rng);
        Stage::Prune {
            queue: queue.into(),
            job: None,
            pruned_this_pass: 0,
            after_collapse,
        }
    }

    /// Lays out the verified puzzle: givens on the grid, the rest in the
    /// tray in shuffled draw order.
    fn assemble(&mut self, clues: Vec<Clue>) -> Puzzle {
        let ctx = &mut self.ctx;
        let solution = ctx.graph.solution();

        let mut nodes: Vec<PuzzleNode> = ctx
            .graph
            .nodes()
            .iter()
            .map(|node| PuzzleNode {
                id: node.id,
                category: node.category,
                symbol: ctx.categories[node.category].symbols[node.symbol].clone(),
                fixed: node.fixed,
                placement: Placement::Tray { slot: 0 },
            })
            .collect();
        nodes.shuffle(&mut ctx.rng);
        let mut slot = 0;
        for node in nodes.iter_mut() {
            node.placement = if node.fixed {
                Placement::Grid {
                    category: node.category,
                    column: solution.column_of(node.id),
                }
            } else {
                slot += 1;
                Placement::Tray { slot: slot - 1 }
            };
        }

        ctx.stats.n_narrow_steps = ctx.meter.total_steps();
        info!(
            target: "clue_compiler",
            "Run {} finished with {} clue(s); stats {:?}",
            ctx.run_id,
            clues.len(),
            ctx.stats
        );
        let puzzle = Puzzle {
            run_id: ctx.run_id,
            seed: ctx.seed,
            categories: ctx.categories.clone(),
            nodes,
            clues,
            solution,
            stats: ctx.stats.clone(),
        };
        self.emit(GenerationEvent::Completed {
            run_id: puzzle.run_id,
            stats: puzzle.stats.clone(),
        });
        puzzle
    }

    fn emit_phase(&self, phase: GenerationPhase) {
        self.emit(GenerationEvent::PhaseStarted {
            run_id: self.ctx.run_id,
            phase,
        });
    }

    fn emit(&self, event: GenerationEvent) {
        if let Some(emitter) = &self.event_emitter {
            emitter.emit(&event);
        }
    }
}

/// Generates a puzzle in one go.
pub fn generate_puzzle(request: &GenerationRequest, settings: &Settings) -> Result<Puzzle> {
    GenerationTask::new(request, settings)?.run_to_completion()
}
