use log::trace;
use rand::{seq::SliceRandom, Rng};

use crate::model::{GridLayout, RuleGraph, Solution, CANONICAL_CATEGORY};

/// Draws the hidden solution and seeds every solvable node with its trivial
/// clue: "same column as the canonical symbol of my column".
pub fn assign_solution<R: Rng + ?Sized>(layout: GridLayout, rng: &mut R) -> RuleGraph {
    let mut columns = Vec::with_capacity(layout.node_count());
    for category in 0..layout.category_count {
        let mut row: Vec<usize> = (0..layout.column_count).collect();
        if category != CANONICAL_CATEGORY {
            // Shuffle just this row's columns
            row.shuffle(rng);
        }
        columns.extend(row);
    }

    let solution = Solution::new(layout, columns);
    trace!(target: "assignment", "Solution grid:\n{}", solution);

    let mut graph = RuleGraph::from_solution(&solution);
    for id in graph.non_fixed_ids() {
        graph.set_trivial_rule(id);
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ANCHOR_COLUMN, NodeId};
    use crate::solver::is_sound;
    use crate::game::scheduler::StepMeter;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_every_category_is_a_bijection() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let graph = assign_solution(GridLayout::new(5, 6), &mut rng);
            assert!(graph.solution().is_bijection());
        }
    }

    #[test]
    fn test_canonical_row_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let graph = assign_solution(GridLayout::new(3, 4), &mut rng);
        for column in 0..4 {
            let node = graph.node(NodeId(column));
            assert_eq!(node.solution_column, column);
            assert!(node.fixed);
            assert!(node.rules.is_empty());
        }
    }

    #[test]
    fn test_givens_and_trivial_rules() {
        let mut rng = StdRng::seed_from_u64(11);
        let graph = assign_solution(GridLayout::new(4, 4), &mut rng);
        let non_fixed = graph.non_fixed_ids();
        // 3 solvable rows of 3 non-anchor symbols
        assert_eq!(non_fixed.len(), 9);
        for node in graph.nodes() {
            if node.solution_column == ANCHOR_COLUMN {
                assert!(node.fixed);
            }
            if node.fixed {
                assert!(node.rules.is_empty());
            } else {
                assert!(graph.has_trivial_rule(node.id));
                assert_eq!(node.rules.len(), 1);
            }
        }
        assert!(is_sound(&graph, &StepMeter::unbounded()).unwrap());
    }

    #[test]
    fn test_same_seed_same_solution() {
        let layout = GridLayout::new(4, 5);
        let a = assign_solution(layout, &mut StdRng::seed_from_u64(99));
        let b = assign_solution(layout, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
