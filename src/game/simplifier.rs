use log::trace;

use super::generation_context::GenerationContext;
use super::scheduler::{run_job, Job, JobStatus};
use crate::error::Result;
use crate::model::{ColumnSet, NodeId, Rule, ANCHOR_COLUMN};
use crate::solver::{SoundnessSweep, SweepStatus};

/// Tentatively drops the negative rule `holder -> target`, then checks the
/// graph one node per step. The rule comes back if any node stops narrowing
/// to its column.
pub struct PruneJob {
    holder: NodeId,
    target: NodeId,
    sweep: SoundnessSweep,
}

impl PruneJob {
    /// `None` when the rule is already gone.
    pub fn start(ctx: &mut GenerationContext, holder: NodeId, target: NodeId) -> Option<Self> {
        ctx.graph.remove_different(holder, target).then(|| Self {
            holder,
            target,
            sweep: SoundnessSweep::new(&ctx.graph),
        })
    }
}

impl Job for PruneJob {
    fn step(&mut self, ctx: &mut GenerationContext) -> Result<JobStatus> {
        match self.sweep.step(&ctx.graph, &ctx.meter)? {
            SweepStatus::Pending => Ok(JobStatus::Pending),
            SweepStatus::Sound => {
                trace!(target: "simplifier", "Pruned {:?} != {:?}", self.holder, self.target);
                ctx.stats.n_pruned += 1;
                Ok(JobStatus::Done(true))
            }
            SweepStatus::Unsound(_) => {
                ctx.graph.add_different(self.holder, self.target);
                Ok(JobStatus::Done(false))
            }
        }
    }
}

/// Drops the negative rule `holder -> target` when every solvable node
/// still narrows to its column without it. Returns whether it was dropped.
pub fn prune_negative_rule(
    ctx: &mut GenerationContext,
    holder: NodeId,
    target: NodeId,
) -> Result<bool> {
    match PruneJob::start(ctx, holder, target) {
        Some(mut job) => run_job(&mut job, ctx),
        None => Ok(false),
    }
}

/// (node, category) pairs whose negative list leaves a single column open.
pub fn collapsible_rules(ctx: &GenerationContext) -> Vec<(NodeId, usize)> {
    let threshold = ctx.graph.layout.column_count.saturating_sub(2);
    ctx.graph
        .nodes()
        .iter()
        .flat_map(|node| {
            node.rules.iter().filter_map(move |(category, rule)| match rule {
                Rule::Different(targets) if targets.len() == threshold => {
                    Some((node.id, *category))
                }
                _ => None,
            })
        })
        .collect()
}

/// Rewrites "not with any of these" as "same column as the one left over",
/// keeping the rewrite only if the graph stays sound.
pub struct CollapseJob {
    id: NodeId,
    category: usize,
    remaining: NodeId,
    previous: Rule,
    sweep: SoundnessSweep,
}

impl CollapseJob {
    /// `None` when the negative list for `category` does not leave exactly
    /// one column open.
    pub fn start(ctx: &mut GenerationContext, id: NodeId, category: usize) -> Option<Self> {
        let targets = ctx.graph.node(id).different_from(category)?;
        let excluded: ColumnSet = targets
            .iter()
            .map(|target| ctx.graph.node(*target).solution_column)
            .collect();
        let column = ColumnSet::all_except(ctx.graph.layout.column_count, ANCHOR_COLUMN)
            .difference(&excluded)
            .singleton()?;

        let remaining = ctx.graph.node_in_column(category, column);
        let previous = ctx.graph.remove_rule(id, category)?;
        ctx.graph.set_same(id, remaining);
        Some(Self {
            id,
            category,
            remaining,
            previous,
            sweep: SoundnessSweep::new(&ctx.graph),
        })
    }
}

impl Job for CollapseJob {
    fn step(&mut self, ctx: &mut GenerationContext) -> Result<JobStatus> {
        match self.sweep.step(&ctx.graph, &ctx.meter)? {
            SweepStatus::Pending => Ok(JobStatus::Pending),
            SweepStatus::Sound => {
                trace!(
                    target: "simplifier",
                    "Collapsed negatives of {:?} into == {:?}",
                    self.id,
                    self.remaining
                );
                ctx.stats.n_collapsed += 1;
                Ok(JobStatus::Done(true))
            }
            SweepStatus::Unsound(_) => {
                ctx.graph.remove_rule(self.id, self.category);
                if let Rule::Different(targets) = &self.previous {
                    for target in targets {
                        ctx.graph.add_different(self.id, *target);
                    }
                }
                Ok(JobStatus::Done(false))
            }
        }
    }
}

/// Runs a whole [`CollapseJob`]. Returns whether the collapse was kept.
pub fn collapse_negative_rules(
    ctx: &mut GenerationContext,
    id: NodeId,
    category: usize,
) -> Result<bool> {
    match CollapseJob::start(ctx, id, category) {
        Some(mut job) => run_job(&mut job, ctx),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::settings::Settings;
    use crate::model::{GenerationRequest, CANONICAL_CATEGORY};

    fn context(categories: usize, columns: usize, seed: u64) -> GenerationContext {
        let request = GenerationRequest::new(categories, columns, false).with_seed(seed);
        GenerationContext::new(&request, &Settings::default()).unwrap()
    }

    #[test]
    fn test_redundant_negative_rule_is_pruned() {
        let mut ctx = context(3, 4, 1);
        // a category 1 node that still has its trivial clue
        let id = ctx.graph.non_fixed_ids()[0];
        let column = ctx.graph.node(id).solution_column;
        let other = ctx
            .graph
            .node_in_column(2, if column == 1 { 2 } else { 1 });
        assert!(ctx.graph.add_different(id, other));

        assert!(prune_negative_rule(&mut ctx, id, other).unwrap());
        assert!(ctx.graph.negative_rules().is_empty());
        assert_eq!(ctx.stats.n_pruned, 1);
        assert!(ctx.is_sound().unwrap());
    }

    #[test]
    fn test_needed_negative_rule_is_kept() {
        // one solvable row with two symbols
        let mut ctx = context(2, 3, 4);
        let ids = ctx.graph.non_fixed_ids();
        let (first, second) = (ids[0], ids[1]);
        let wrong = ctx.graph.node(second).solution_column;
        let canonical = ctx.graph.layout.canonical_node(wrong);
        ctx.graph.remove_rule(first, CANONICAL_CATEGORY);
        ctx.graph.remove_rule(second, CANONICAL_CATEGORY);
        ctx.graph.add_different(first, canonical);
        assert!(ctx.is_sound().unwrap());

        assert!(!prune_negative_rule(&mut ctx, first, canonical).unwrap());
        assert_eq!(ctx.graph.negative_rules(), vec![(first, canonical)]);
        assert_eq!(ctx.stats.n_pruned, 0);
    }

    #[test]
    fn test_collapse_near_complete_negative_list() {
        let mut ctx = context(2, 4, 9);
        let id = ctx.graph.non_fixed_ids()[0];
        let column = ctx.graph.node(id).solution_column;
        ctx.graph.remove_rule(id, CANONICAL_CATEGORY);
        for other in (1..4).filter(|c| *c != column) {
            let canonical = ctx.graph.layout.canonical_node(other);
            ctx.graph.add_different(id, canonical);
        }
        assert_eq!(collapsible_rules(&ctx), vec![(id, CANONICAL_CATEGORY)]);

        assert!(collapse_negative_rules(&mut ctx, id, CANONICAL_CATEGORY).unwrap());
        assert!(ctx.graph.has_trivial_rule(id));
        assert_eq!(ctx.graph.node(id).negative_rule_count(), 0);
        assert!(ctx.is_sound().unwrap());
        assert_eq!(ctx.stats.n_collapsed, 1);
    }
}
