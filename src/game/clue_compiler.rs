use std::collections::{HashSet, VecDeque};

use log::{debug, trace};
use rand::{
    seq::{IndexedRandom, SliceRandom},
    Rng,
};

use super::generation_context::GenerationContext;
use super::scheduler::{Job, JobStatus, StepMeter};
use crate::error::Result;
use crate::model::{Clue, NodeId, RuleGraph, SimpleClue, Solution, CANONICAL_CATEGORY};
use crate::solver::narrow;

/// One clue per positive rule and one per negative reference.
pub fn compile_rules(graph: &RuleGraph) -> Vec<SimpleClue> {
    let mut clues = Vec::new();
    for node in graph.nodes() {
        for (category, target) in node.positive_references() {
            clues.push(SimpleClue::same(node.id, category, target));
        }
        for (category, target) in node.negative_references() {
            clues.push(SimpleClue::different(node.id, category, target));
        }
    }
    clues
}

/// The rule graph a player holding only `clues` (plus the givens) can build.
pub fn graph_from_simple_clues<'c>(
    solution: &Solution,
    clues: impl IntoIterator<Item = &'c SimpleClue>,
) -> RuleGraph {
    let mut graph = RuleGraph::from_solution(solution);
    for clue in clues {
        if clue.negated {
            graph.add_different(clue.subject, clue.referenced);
        } else {
            graph.set_same(clue.subject, clue.referenced);
        }
    }
    graph
}

/// Whether the false clue `lie` is already refuted by `context` alone.
pub fn is_giveaway(context: &RuleGraph, lie: &SimpleClue, meter: &StepMeter) -> Result<bool> {
    let subject = narrow(context, lie.subject, meter)?;
    let referenced = narrow(context, lie.referenced, meter)?;
    if lie.negated {
        Ok(subject.singleton().is_some() && subject.singleton() == referenced.singleton())
    } else {
        Ok(subject.is_disjoint(&referenced))
    }
}

#[derive(Debug, Clone, Copy)]
struct XorPair {
    truth: SimpleClue,
    lie: SimpleClue,
}

/// A pending clue looking for a false partner.
struct Conversion {
    truth: SimpleClue,
    context: RuleGraph,
    attempts: usize,
}

/// Checks pairs against the final simple clues, starting over after each
/// revert, until none is given away.
struct RevertPass {
    context: RuleGraph,
    next: usize,
}

/// Turns the final rule graph into the presented clue list, recasting clues
/// as exclusive-or pairs when enabled.
///
/// Each step is one pairing attempt or one giveaway check of an existing
/// pair, so the caller may yield in between.
pub struct ClueCompiler {
    solution: Solution,
    simple: Vec<SimpleClue>,
    pending: VecDeque<SimpleClue>,
    current: Option<Conversion>,
    revert: Option<RevertPass>,
    pairs: Vec<XorPair>,
    used_entities: HashSet<(NodeId, NodeId)>,
}

impl ClueCompiler {
    pub fn new(ctx: &mut GenerationContext) -> Self {
        let solution = ctx.graph.solution();
        let mut clues = compile_rules(&ctx.graph);
        clues.shuffle(&mut ctx.rng);

        let mut simple = Vec::new();
        if ctx.xor_enabled && !clues.is_empty() {
            // keep one plain column-identifying clue
            let reserved = clues
                .iter()
                .position(|clue| clue.category == CANONICAL_CATEGORY)
                .unwrap_or(0);
            simple.push(clues.remove(reserved));
        } else {
            simple.append(&mut clues);
        }

        Self {
            solution,
            simple,
            pending: clues.into(),
            current: None,
            revert: None,
            pairs: Vec::new(),
            used_entities: HashSet::new(),
        }
    }

    /// Whether clues are still waiting for a false partner.
    pub fn has_pending(&self) -> bool {
        self.current.is_some() || !self.pending.is_empty()
    }

    /// One attempt at pairing the current clue with a false counterpart. A
    /// clue stays simple when no acceptable counterpart turns up within the
    /// retry budget.
    fn pairing_step(&mut self, ctx: &mut GenerationContext) -> Result<()> {
        let mut conversion = match self.current.take() {
            Some(conversion) => conversion,
            None => {
                let Some(truth) = self.pending.pop_front() else {
                    return Ok(());
                };
                let context = graph_from_simple_clues(
                    &self.solution,
                    self.simple.iter().chain(self.pending.iter()),
                );
                Conversion {
                    truth,
                    context,
                    attempts: 0,
                }
            }
        };
        let truth = conversion.truth;

        if conversion.attempts >= ctx.retry_budget {
            trace!(target: "clue_compiler", "No false partner for {:?}", truth);
            self.simple.push(truth);
            return Ok(());
        }
        conversion.attempts += 1;
        ctx.meter.tick()?;

        let accepted = match self.synthesize_lie(ctx, &truth) {
            None => None,
            Some(lie) => {
                let entities = lie.entities();
                if entities == truth.entities() || self.used_entities.contains(&entities) {
                    ctx.stats.n_rejected_duplicate_pairs += 1;
                    None
                } else if is_giveaway(&conversion.context, &lie, &ctx.meter)? {
                    ctx.stats.n_rejected_giveaways += 1;
                    None
                } else {
                    Some(lie)
                }
            }
        };

        match accepted {
            Some(lie) => {
                trace!(target: "clue_compiler", "XOR pair {:?} / {:?}", truth, lie);
                self.used_entities.insert(truth.entities());
                self.used_entities.insert(lie.entities());
                self.pairs.push(XorPair { truth, lie });
            }
            None => self.current = Some(conversion),
        }
        Ok(())
    }

    /// One giveaway check during the final revert pass. Returns whether the
    /// pass is complete.
    fn revert_step(&mut self, ctx: &mut GenerationContext) -> Result<bool> {
        let pass = self.revert.get_or_insert_with(|| RevertPass {
            context: graph_from_simple_clues(&self.solution, self.simple.iter()),
            next: 0,
        });
        let Some(pair) = self.pairs.get(pass.next) else {
            return Ok(true);
        };
        if !is_giveaway(&pass.context, &pair.lie, &ctx.meter)? {
            pass.next += 1;
            return Ok(pass.next >= self.pairs.len());
        }

        let pair = self.pairs.remove(pass.next);
        debug!(
            target: "clue_compiler",
            "Reverting XOR pair for {:?}; its false half is given away",
            pair.truth
        );
        self.simple.push(pair.truth);
        ctx.stats.n_reverted_xor_pairs += 1;
        self.revert = None;
        Ok(false)
    }

    /// A clue of the same polarity as `truth` that is false under the solution.
    fn synthesize_lie(&self, ctx: &mut GenerationContext, truth: &SimpleClue) -> Option<SimpleClue> {
        let layout = self.solution.layout;
        let subject = *ctx.graph.non_fixed_ids().choose(&mut ctx.rng)?;
        let subject_category = layout.category_of(subject);
        let categories: Vec<usize> = (0..layout.category_count)
            .filter(|category| *category != subject_category)
            .collect();
        let category = *categories.choose(&mut ctx.rng)?;
        let subject_column = self.solution.column_of(subject);

        let lie = if truth.negated {
            let referenced = self.solution.node_at(category, subject_column);
            SimpleClue::different(subject, category, referenced)
        } else {
            let wrong: Vec<NodeId> = layout
                .category_node_ids(category)
                .filter(|id| self.solution.column_of(*id) != subject_column)
                .collect();
            SimpleClue::same(subject, category, *wrong.choose(&mut ctx.rng)?)
        };
        (!lie.holds(&self.solution)).then_some(lie)
    }

    /// Shuffles the surviving simple clues and pairs into the final list.
    /// Call once stepping reports `Done`.
    pub fn finish(self, ctx: &mut GenerationContext) -> Vec<Clue> {
        ctx.stats.n_xor_pairs = self.pairs.len();
        let mut clues: Vec<Clue> = self.simple.into_iter().map(Clue::Simple).collect();
        for XorPair { truth, lie } in self.pairs {
            if ctx.rng.random_bool(0.5) {
                clues.push(Clue::Xor(truth, lie));
            } else {
                clues.push(Clue::Xor(lie, truth));
            }
        }
        clues.shuffle(&mut ctx.rng);
        clues
    }
}

impl Job for ClueCompiler {
    fn step(&mut self, ctx: &mut GenerationContext) -> Result<JobStatus> {
        if self.has_pending() {
            self.pairing_step(ctx)?;
            return Ok(JobStatus::Pending);
        }
        if self.revert_step(ctx)? {
            return Ok(JobStatus::Done(!self.pairs.is_empty()));
        }
        Ok(JobStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scheduler::run_job;
    use crate::game::settings::Settings;
    use crate::model::{GenerationRequest, GridLayout};

    fn context(xor_enabled: bool, seed: u64) -> GenerationContext {
        let request = GenerationRequest::new(4, 5, xor_enabled).with_seed(seed);
        GenerationContext::new(&request, &Settings::default()).unwrap()
    }

    #[test]
    fn test_compile_rules_flattens_every_reference() {
        let solution = Solution::new(GridLayout::new(3, 3), vec![0, 1, 2, 1, 0, 2, 2, 1, 0]);
        let mut graph = RuleGraph::from_solution(&solution);
        graph.set_trivial_rule(NodeId(3));
        graph.add_different(NodeId(5), NodeId(7));
        graph.add_different(NodeId(5), NodeId(8));
        graph.set_same(NodeId(6), NodeId(5));

        let clues = compile_rules(&graph);
        assert_eq!(clues.len(), graph.rule_count());
        assert_eq!(clues.len(), 4);
        assert!(clues.contains(&SimpleClue::same(NodeId(3), 0, NodeId(1))));
        assert!(clues.contains(&SimpleClue::different(NodeId(5), 2, NodeId(8))));
        assert!(clues.iter().all(|clue| clue.holds(&solution)));
        assert_eq!(graph_from_simple_clues(&solution, clues.iter()), graph);
    }

    #[test]
    fn test_without_xor_every_clue_stays_simple() {
        let mut ctx = context(false, 3);
        let rule_count = ctx.graph.rule_count();
        let mut compiler = ClueCompiler::new(&mut ctx);
        assert!(!compiler.has_pending());
        assert_eq!(compiler.step(&mut ctx).unwrap(), JobStatus::Done(false));
        let clues = compiler.finish(&mut ctx);
        assert_eq!(clues.len(), rule_count);
        assert!(clues.iter().all(|clue| !clue.is_xor()));
    }

    #[test]
    fn test_xor_pairs_hold_exactly_once() {
        let mut ctx = context(true, 8);
        let solution = ctx.graph.solution();
        let rule_count = ctx.graph.rule_count();
        let mut compiler = ClueCompiler::new(&mut ctx);
        run_job(&mut compiler, &mut ctx).unwrap();
        assert!(!compiler.has_pending());
        let clues = compiler.finish(&mut ctx);

        assert_eq!(clues.len(), rule_count);
        // the reserved clue names a column directly
        assert!(clues
            .iter()
            .any(|clue| matches!(clue, Clue::Simple(c) if c.category == CANONICAL_CATEGORY)));

        let simple: Vec<SimpleClue> = clues
            .iter()
            .filter_map(|clue| match clue {
                Clue::Simple(c) => Some(*c),
                Clue::Xor(..) => None,
            })
            .collect();
        let context = graph_from_simple_clues(&solution, simple.iter());
        let mut seen = HashSet::new();
        for clue in clues.iter().filter(|clue| clue.is_xor()) {
            let halves = clue.halves();
            let holding: Vec<&SimpleClue> =
                halves.iter().filter(|half| half.holds(&solution)).collect();
            assert_eq!(holding.len(), 1, "{} must hold exactly once", clue);
            let lie = halves.iter().find(|half| !half.holds(&solution)).unwrap();
            assert!(!is_giveaway(&context, lie, &ctx.meter).unwrap());
            assert!(seen.insert(lie.entities()), "entity pair reused by {}", clue);
        }
        assert_eq!(
            ctx.stats.n_xor_pairs,
            clues.iter().filter(|clue| clue.is_xor()).count()
        );
    }

    #[test]
    fn test_giveaway_detection() {
        let solution = Solution::new(GridLayout::new(2, 3), vec![0, 1, 2, 2, 0, 1]);
        let meter = StepMeter::unbounded();
        let mut context = RuleGraph::from_solution(&solution);
        context.set_trivial_rule(NodeId(3));

        // #3 is known to be in column 2, so "#3 == #1" is plainly false
        let lie = SimpleClue::same(NodeId(3), 0, NodeId(1));
        assert!(is_giveaway(&context, &lie, &meter).unwrap());
        // "#3 != #2" contradicts two known singletons
        let lie = SimpleClue::different(NodeId(3), 0, NodeId(2));
        assert!(is_giveaway(&context, &lie, &meter).unwrap());

        let open = RuleGraph::from_solution(&solution);
        let lie = SimpleClue::same(NodeId(3), 0, NodeId(1));
        assert!(!is_giveaway(&open, &lie, &meter).unwrap());
    }
}
