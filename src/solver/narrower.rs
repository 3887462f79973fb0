use std::collections::HashMap;

use log::trace;

use crate::error::Result;
use crate::game::scheduler::StepMeter;
use crate::model::{ColumnSet, NodeId, RuleGraph, ANCHOR_COLUMN, CANONICAL_CATEGORY};

/// One narrowing invocation over a fixed rule graph. The memo table lives and
/// dies with this value, so results never leak across graph mutations.
pub struct Narrower<'a> {
    graph: &'a RuleGraph,
    meter: &'a StepMeter,
    universe: ColumnSet,
    /// holders of a negative rule pointing at each node
    incoming_negative: Vec<Vec<NodeId>>,
    /// holders of a positive rule pointing at each node
    incoming_positive: Vec<Vec<NodeId>>,
    memo: HashMap<NodeId, ColumnSet>,
}

impl<'a> Narrower<'a> {
    pub fn new(graph: &'a RuleGraph, meter: &'a StepMeter) -> Self {
        let node_count = graph.layout.node_count();
        let mut incoming_negative = vec![Vec::new(); node_count];
        let mut incoming_positive = vec![Vec::new(); node_count];
        for node in graph.nodes() {
            for (_, target) in node.negative_references() {
                incoming_negative[target.0].push(node.id);
            }
            for (_, target) in node.positive_references() {
                incoming_positive[target.0].push(node.id);
            }
        }

        Self {
            graph,
            meter,
            universe: ColumnSet::all_except(graph.layout.column_count, ANCHOR_COLUMN),
            incoming_negative,
            incoming_positive,
            memo: HashMap::new(),
        }
    }

    /// Smallest set of columns consistent with the rules for `id`.
    ///
    /// A node that is already being narrowed further up the call stack
    /// answers with its best-known value from the memo instead of being
    /// re-entered, which is what makes cyclic rule graphs terminate.
    pub fn narrow(&mut self, id: NodeId) -> Result<ColumnSet> {
        self.meter.tick()?;
        if let Some(known) = self.memo.get(&id) {
            return Ok(*known);
        }

        let graph = self.graph;
        let node = graph.node(id);

        if let Some(column) = node.given_column() {
            return Ok(self.remember(id, ColumnSet::single(column)));
        }
        if let Some(column) = node
            .same_as(CANONICAL_CATEGORY)
            .and_then(|target| graph.node(target).given_column())
        {
            return Ok(self.remember(id, ColumnSet::single(column)));
        }

        let mut candidates = self.universe;
        self.memo.insert(id, candidates);

        // direct exclusions against the canonical row
        if let Some(targets) = node.different_from(CANONICAL_CATEGORY) {
            for target in targets {
                if let Some(column) = graph.node(*target).given_column() {
                    candidates.remove(column);
                }
            }
        }
        self.memo.insert(id, candidates);

        // known-wrong columns, both directions
        let mut excluders: Vec<NodeId> = node
            .negative_references()
            .filter(|(category, _)| *category != CANONICAL_CATEGORY)
            .map(|(_, target)| target)
            .collect();
        excluders.extend(self.incoming_negative[id.0].iter().copied());
        for other in excluders {
            if other == id {
                continue;
            }
            if let Some(column) = self.narrow(other)?.singleton() {
                candidates.remove(column);
                self.memo.insert(id, candidates);
            }
        }

        // column-mates share a column
        let mut column_mates: Vec<NodeId> = node
            .positive_references()
            .filter(|(category, _)| *category != CANONICAL_CATEGORY)
            .map(|(_, target)| target)
            .collect();
        column_mates.extend(self.incoming_positive[id.0].iter().copied());
        for other in column_mates {
            if other == id {
                continue;
            }
            candidates = candidates.intersection(&self.narrow(other)?);
            self.memo.insert(id, candidates);
        }

        // row-mates never share a column
        let mut claimed_by_row_mates = ColumnSet::empty();
        for other in graph.row_mates(id) {
            let theirs = self.narrow(other)?;
            if let Some(column) = theirs.singleton() {
                candidates.remove(column);
            }
            claimed_by_row_mates = claimed_by_row_mates.union(&theirs);
        }
        if let Some(column) = candidates.difference(&claimed_by_row_mates).singleton() {
            candidates = ColumnSet::single(column);
        }

        trace!(
            target: "narrower",
            "Narrowed {:?} to {:?}",
            id,
            candidates
        );

        Ok(self.remember(id, candidates))
    }

    fn remember(&mut self, id: NodeId, columns: ColumnSet) -> ColumnSet {
        self.memo.insert(id, columns);
        columns
    }
}

/// Narrows one node with a fresh memo table.
pub fn narrow(graph: &RuleGraph, id: NodeId, meter: &StepMeter) -> Result<ColumnSet> {
    Narrower::new(graph, meter).narrow(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridLayout, Solution};

    /// 3 categories x 3 columns.
    /// category 1: #3 -> 1, #4 -> 0 (given), #5 -> 2
    /// category 2: #6 -> 2, #7 -> 1, #8 -> 0 (given)
    fn small_graph() -> RuleGraph {
        let solution = Solution::new(GridLayout::new(3, 3), vec![0, 1, 2, 1, 0, 2, 2, 1, 0]);
        RuleGraph::from_solution(&solution)
    }

    /// 2 categories x 4 columns; category 1: #4 -> 0 (given), #5 -> 3, #6 -> 1, #7 -> 2
    fn wide_graph() -> RuleGraph {
        let solution = Solution::new(GridLayout::new(2, 4), vec![0, 1, 2, 3, 0, 3, 1, 2]);
        RuleGraph::from_solution(&solution)
    }

    #[test]
    fn test_givens_and_trivial_rules_are_singletons() {
        let mut graph = small_graph();
        graph.set_trivial_rule(NodeId(5));
        let meter = StepMeter::unbounded();
        assert_eq!(narrow(&graph, NodeId(2), &meter).unwrap(), ColumnSet::single(2));
        assert_eq!(narrow(&graph, NodeId(4), &meter).unwrap(), ColumnSet::single(0));
        assert_eq!(narrow(&graph, NodeId(5), &meter).unwrap(), ColumnSet::single(2));
    }

    #[test]
    fn test_unconstrained_node_gets_universe() {
        let graph = small_graph();
        let meter = StepMeter::unbounded();
        let candidates = narrow(&graph, NodeId(3), &meter).unwrap();
        assert_eq!(candidates, [1, 2].into_iter().collect());
        assert!(!candidates.contains(ANCHOR_COLUMN));
    }

    #[test]
    fn test_negative_rule_against_canonical_row() {
        let mut graph = small_graph();
        graph.add_different(NodeId(3), NodeId(2));
        let meter = StepMeter::unbounded();
        assert_eq!(narrow(&graph, NodeId(3), &meter).unwrap(), ColumnSet::single(1));
        // the row-mate follows by elimination
        assert_eq!(narrow(&graph, NodeId(5), &meter).unwrap(), ColumnSet::single(2));
    }

    #[test]
    fn test_negative_rule_is_read_in_both_directions() {
        let mut graph = small_graph();
        graph.set_trivial_rule(NodeId(3));
        graph.add_different(NodeId(6), NodeId(3));
        let meter = StepMeter::unbounded();
        assert_eq!(narrow(&graph, NodeId(6), &meter).unwrap(), ColumnSet::single(2));

        let mut graph = small_graph();
        graph.set_trivial_rule(NodeId(5));
        graph.add_different(NodeId(5), NodeId(7));
        // #7 learns from the rule #5 holds against it
        assert_eq!(narrow(&graph, NodeId(7), &meter).unwrap(), ColumnSet::single(1));
    }

    #[test]
    fn test_cyclic_positive_rules_terminate() {
        let mut graph = small_graph();
        graph.set_same(NodeId(3), NodeId(7));
        graph.set_same(NodeId(7), NodeId(3));
        graph.set_trivial_rule(NodeId(5));
        let meter = StepMeter::unbounded();

        assert_eq!(narrow(&graph, NodeId(3), &meter).unwrap(), ColumnSet::single(1));
        assert_eq!(narrow(&graph, NodeId(7), &meter).unwrap(), ColumnSet::single(1));
        assert_eq!(narrow(&graph, NodeId(6), &meter).unwrap(), ColumnSet::single(2));
    }

    #[test]
    fn test_cyclic_negative_rules_terminate() {
        let mut graph = small_graph();
        graph.add_different(NodeId(3), NodeId(6));
        graph.add_different(NodeId(6), NodeId(3));
        graph.add_different(NodeId(5), NodeId(7));
        graph.add_different(NodeId(7), NodeId(5));
        let meter = StepMeter::unbounded();

        for id in graph.non_fixed_ids() {
            let candidates = narrow(&graph, id, &meter).unwrap();
            assert!(candidates.contains(graph.node(id).solution_column));
        }
    }

    #[test]
    fn test_pigeonhole() {
        let mut graph = wide_graph();
        graph.add_different(NodeId(6), NodeId(3));
        graph.add_different(NodeId(7), NodeId(3));
        let meter = StepMeter::unbounded();
        // nobody else can take column 3
        assert_eq!(narrow(&graph, NodeId(5), &meter).unwrap(), ColumnSet::single(3));
        assert_eq!(
            narrow(&graph, NodeId(6), &meter).unwrap(),
            [1, 2].into_iter().collect()
        );
    }

    #[test]
    fn test_narrowing_is_deterministic() {
        let mut graph = wide_graph();
        graph.add_different(NodeId(6), NodeId(3));
        graph.set_same(NodeId(7), NodeId(2));
        graph.add_different(NodeId(5), NodeId(6));
        let meter = StepMeter::unbounded();
        for id in graph.layout.node_ids() {
            let first = narrow(&graph, id, &meter).unwrap();
            let second = narrow(&graph, id, &meter).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_cancelled_meter_stops_narrowing() {
        let graph = small_graph();
        let meter = StepMeter::unbounded();
        meter.token().cancel();
        assert!(narrow(&graph, NodeId(3), &meter).is_err());
    }
}
