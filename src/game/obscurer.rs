use log::{debug, trace};
use rand::{seq::SliceRandom, Rng};

use super::generation_context::GenerationContext;
use super::scheduler::{run_job, Job, JobStatus};
use crate::error::Result;
use crate::model::{ColumnSet, NodeId, RuleGraph, CANONICAL_CATEGORY};
use crate::solver::{SoundnessSweep, SweepStatus};

/// Replaces the trivial clue of one node with some other justification.
///
/// Each attempt starts from the graph as it was before this node was touched
/// and only sticks when the node and every other solvable node still narrow
/// to their own column. When the retry budget runs out the trivial clue is
/// restored, so the node stays solvable by construction.
///
/// One step is either a single attempt or the check of one node, so the
/// caller may yield in between.
pub struct ObscureJob {
    id: NodeId,
    snapshot: RuleGraph,
    attempts: usize,
    sweep: Option<SoundnessSweep>,
}

impl ObscureJob {
    /// `None` when `id` no longer carries its trivial clue.
    pub fn start(ctx: &GenerationContext, id: NodeId) -> Option<Self> {
        ctx.graph.has_trivial_rule(id).then(|| Self {
            id,
            snapshot: ctx.graph.clone(),
            attempts: 0,
            sweep: None,
        })
    }

    fn roll_back(&mut self, ctx: &mut GenerationContext) {
        ctx.graph = self.snapshot.clone();
        self.sweep = None;
    }
}

impl Job for ObscureJob {
    /// Finishes with `Done(true)` when the trivial clue was removed.
    fn step(&mut self, ctx: &mut GenerationContext) -> Result<JobStatus> {
        let id = self.id;
        if let Some(sweep) = self.sweep.as_mut() {
            match sweep.step(&ctx.graph, &ctx.meter)? {
                SweepStatus::Pending => (),
                SweepStatus::Sound => {
                    trace!(
                        target: "obscurer",
                        "Obscured {:?} after {} attempt(s): {:?}",
                        id,
                        self.attempts,
                        ctx.graph.node(id).rules
                    );
                    ctx.stats.n_obscured += 1;
                    return Ok(JobStatus::Done(true));
                }
                SweepStatus::Unsound(_) => self.roll_back(ctx),
            }
            return Ok(JobStatus::Pending);
        }

        if self.attempts >= ctx.retry_budget {
            debug!(
                target: "obscurer",
                "Retry budget spent on {:?}; keeping its trivial clue",
                id
            );
            self.roll_back(ctx);
            ctx.stats.n_fallbacks += 1;
            return Ok(JobStatus::Done(false));
        }

        self.attempts += 1;
        ctx.stats.n_obscure_attempts += 1;
        ctx.graph.remove_rule(id, CANONICAL_CATEGORY);
        if justify(ctx, id)? {
            self.sweep = Some(SoundnessSweep::new(&ctx.graph));
        } else {
            self.roll_back(ctx);
        }
        Ok(JobStatus::Pending)
    }
}

/// Runs a whole [`ObscureJob`] for `id`. Returns whether the trivial clue
/// was removed.
pub fn obscure_node(ctx: &mut GenerationContext, id: NodeId) -> Result<bool> {
    match ObscureJob::start(ctx, id) {
        Some(mut job) => run_job(&mut job, ctx),
        None => Ok(false),
    }
}

/// One attempt at making `id` derivable without its trivial clue.
fn justify(ctx: &mut GenerationContext, id: NodeId) -> Result<bool> {
    let column = ctx.graph.node(id).solution_column;
    let candidates = ctx.narrow(id)?;
    if candidates.singleton() == Some(column) {
        return Ok(true);
    }
    if candidates.len() == 2 {
        return eliminate_wrong_column(ctx, id, candidates);
    }

    if ctx.rng.random_bool(0.5) {
        free_column_through_row(ctx, id)?;
    } else {
        link_to_column_peer(ctx, id)?;
    }
    Ok(ctx.narrow(id)?.singleton() == Some(column))
}

/// With two candidates left, rule out the wrong one by pointing at a node
/// known to sit there.
fn eliminate_wrong_column(
    ctx: &mut GenerationContext,
    id: NodeId,
    candidates: ColumnSet,
) -> Result<bool> {
    let column = ctx.graph.node(id).solution_column;
    let Some(wrong) = candidates.iter().find(|c| *c != column) else {
        return Ok(false);
    };

    let mut occupants = ctx.graph.column_peers(wrong, ctx.graph.node(id).category);
    occupants.shuffle(&mut ctx.rng);
    for occupant in occupants {
        if ctx.graph.node(id).same_as(ctx.graph.node(occupant).category).is_some() {
            continue;
        }
        if ctx.is_derivable(occupant)? {
            ctx.graph.add_different(id, occupant);
            trace!(
                target: "obscurer",
                "{:?} is not with {:?} (column {})",
                id,
                occupant,
                wrong
            );
            return Ok(ctx.narrow(id)?.singleton() == Some(column));
        }
    }
    Ok(false)
}

/// Row-mediated: push every sibling that could still take this node's
/// column out of it, leaving the column to this node alone.
fn free_column_through_row(ctx: &mut GenerationContext, id: NodeId) -> Result<()> {
    let column = ctx.graph.node(id).solution_column;
    let category = ctx.graph.node(id).category;
    let siblings: Vec<NodeId> = ctx
        .graph
        .row_mates(id)
        .filter(|sibling| !ctx.graph.node(*sibling).fixed)
        .collect();

    for sibling in siblings {
        if !ctx.narrow(sibling)?.contains(column) {
            continue;
        }

        let mut excluders: Vec<NodeId> = ctx
            .graph
            .column_peers(column, category)
            .into_iter()
            .filter(|peer| ctx.graph.layout.category_of(*peer) != CANONICAL_CATEGORY)
            .collect();
        excluders.shuffle(&mut ctx.rng);

        let mut linked = false;
        for excluder in excluders {
            let excluder_category = ctx.graph.node(excluder).category;
            if ctx.graph.node(sibling).same_as(excluder_category).is_some() {
                continue;
            }
            if ctx.is_derivable(excluder)? {
                linked = ctx.graph.add_different(sibling, excluder);
                if linked {
                    break;
                }
            }
        }
        if !linked {
            let canonical = ctx.graph.layout.canonical_node(column);
            ctx.graph.add_different(sibling, canonical);
        }
        trace!(
            target: "obscurer",
            "Sibling {:?} excluded from column {} for {:?}",
            sibling,
            column,
            id
        );
    }
    Ok(())
}

/// Column-mediated: "same column as" some other derivable node of that column.
fn link_to_column_peer(ctx: &mut GenerationContext, id: NodeId) -> Result<()> {
    let column = ctx.graph.node(id).solution_column;
    let category = ctx.graph.node(id).category;
    let mut peers: Vec<NodeId> = ctx
        .graph
        .column_peers(column, category)
        .into_iter()
        .filter(|peer| {
            let peer_category = ctx.graph.layout.category_of(*peer);
            peer_category != CANONICAL_CATEGORY
                && !ctx.graph.node(id).rules.contains_key(&peer_category)
        })
        .collect();
    peers.shuffle(&mut ctx.rng);

    let mut undecided_peer = None;
    for peer in peers {
        let candidates = ctx.narrow(peer)?;
        if candidates.singleton() == Some(column) {
            ctx.graph.set_same(id, peer);
            trace!(target: "obscurer", "{:?} linked to {:?}", id, peer);
            return Ok(());
        }
        if candidates.len() == 2 && undecided_peer.is_none() {
            undecided_peer = Some((peer, candidates));
        }
    }

    if let Some((peer, candidates)) = undecided_peer {
        if eliminate_wrong_column(ctx, peer, candidates)? {
            ctx.graph.set_same(id, peer);
            trace!(
                target: "obscurer",
                "{:?} linked to {:?} after resolving it",
                id,
                peer
            );
        }
    }
    Ok(())
}
