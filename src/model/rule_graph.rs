use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Clue, GridLayout, Node, NodeId, Rule, Solution, CANONICAL_CATEGORY};
use crate::error::{GenerationError, Result};

/// Arena of nodes and the rules between them. Rules may form cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGraph {
    pub layout: GridLayout,
    nodes: Vec<Node>,
}

impl RuleGraph {
    /// Nodes placed per `solution`, with givens marked and no rules yet.
    pub fn from_solution(solution: &Solution) -> Self {
        let layout = solution.layout;
        let nodes = layout
            .node_ids()
            .map(|id| {
                let mut node = Node::new(
                    id,
                    layout.category_of(id),
                    layout.symbol_of(id),
                    solution.column_of(id),
                );
                node.fixed = solution.is_given(id);
                node
            })
            .collect();
        Self { layout, nodes }
    }

    /// Rebuilds the rule graph a player could assemble from `clues`. XOR clues
    /// contribute their true half.
    pub fn from_clues(solution: &Solution, clues: &[Clue]) -> Result<Self> {
        let mut graph = Self::from_solution(solution);
        let layout = graph.layout;
        for (index, clue) in clues.iter().enumerate() {
            let in_range = clue.halves().iter().all(|half| {
                half.subject.0 < layout.node_count() && half.referenced.0 < layout.node_count()
            });
            if !in_range || !clue.holds(solution) {
                return Err(GenerationError::InvalidClue { index });
            }
            let half = clue
                .true_half(solution)
                .ok_or(GenerationError::InvalidClue { index })?;
            let valid = half.column_offset == 0
                && layout.category_of(half.referenced) == half.category
                && layout.category_of(half.subject) != half.category;
            if !valid {
                return Err(GenerationError::InvalidClue { index });
            }
            if half.negated {
                graph.add_different(half.subject, half.referenced);
            } else {
                graph.set_same(half.subject, half.referenced);
            }
        }
        Ok(graph)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn solution(&self) -> Solution {
        Solution::new(
            self.layout,
            self.nodes.iter().map(|n| n.solution_column).collect(),
        )
    }

    pub fn non_fixed_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| !n.fixed)
            .map(|n| n.id)
            .collect()
    }

    /// Other nodes of the same category.
    pub fn row_mates(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        self.layout
            .category_node_ids(self.layout.category_of(id))
            .filter(move |other| *other != id)
    }

    /// The node of `category` whose solution column is `column`.
    pub fn node_in_column(&self, category: usize, column: usize) -> NodeId {
        self.layout
            .category_node_ids(category)
            .find(|id| self.node(*id).solution_column == column)
            .unwrap_or_else(|| panic!("no node of category {} in column {}", category, column))
    }

    /// Nodes of other categories whose solution column is `column`.
    pub fn column_peers(&self, column: usize, except_category: usize) -> Vec<NodeId> {
        (0..self.layout.category_count)
            .filter(|category| *category != except_category)
            .map(|category| self.node_in_column(category, column))
            .collect()
    }

    pub fn trivial_rule_target(&self, id: NodeId) -> NodeId {
        self.layout.canonical_node(self.node(id).solution_column)
    }

    pub fn has_trivial_rule(&self, id: NodeId) -> bool {
        self.node(id).same_as(CANONICAL_CATEGORY) == Some(self.trivial_rule_target(id))
    }

    pub fn set_trivial_rule(&mut self, id: NodeId) {
        let target = self.trivial_rule_target(id);
        self.set_same(id, target);
    }

    pub fn remove_rule(&mut self, id: NodeId, category: usize) -> Option<Rule> {
        self.nodes[id.0].rules.remove(&category)
    }

    pub fn set_same(&mut self, id: NodeId, target: NodeId) {
        let category = self.layout.category_of(target);
        debug_assert_ne!(category, self.layout.category_of(id));
        self.nodes[id.0].rules.insert(category, Rule::Same(target));
    }

    /// Adds "`id` is not in `target`'s column". No-op when a positive rule
    /// already covers that category.
    pub fn add_different(&mut self, id: NodeId, target: NodeId) -> bool {
        let category = self.layout.category_of(target);
        debug_assert_ne!(category, self.layout.category_of(id));
        match self.nodes[id.0]
            .rules
            .entry(category)
            .or_insert_with(|| Rule::Different(BTreeSet::new()))
        {
            Rule::Different(ids) => ids.insert(target),
            Rule::Same(_) => false,
        }
    }

    pub fn remove_different(&mut self, id: NodeId, target: NodeId) -> bool {
        let category = self.layout.category_of(target);
        let node = &mut self.nodes[id.0];
        let (removed, now_empty) = match node.rules.get_mut(&category) {
            Some(Rule::Different(ids)) => (ids.remove(&target), ids.is_empty()),
            _ => (false, false),
        };
        if now_empty {
            node.rules.remove(&category);
        }
        removed
    }

    /// Every negative rule as (holder, referenced).
    pub fn negative_rules(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .flat_map(|node| node.negative_references().map(move |(_, target)| (node.id, target)))
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.positive_references().count() + node.negative_rule_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimpleClue;

    fn solution() -> Solution {
        // 2 categories x 3 columns; category 1 maps 3->2, 4->0, 5->1
        Solution::new(GridLayout::new(2, 3), vec![0, 1, 2, 2, 0, 1])
    }

    #[test]
    fn test_from_solution_marks_givens() {
        let graph = RuleGraph::from_solution(&solution());
        assert_eq!(graph.non_fixed_ids(), vec![NodeId(3), NodeId(5)]);
        assert!(graph.node(NodeId(4)).fixed);
        assert_eq!(graph.node_in_column(1, 1), NodeId(5));
        assert_eq!(graph.column_peers(2, 1), vec![NodeId(2)]);
    }

    #[test]
    fn test_negative_rules_share_a_category_entry() {
        let mut graph = RuleGraph::from_solution(&solution());
        assert!(graph.add_different(NodeId(3), NodeId(1)));
        assert!(!graph.add_different(NodeId(3), NodeId(1)));
        assert_eq!(graph.negative_rules(), vec![(NodeId(3), NodeId(1))]);
        assert!(graph.remove_different(NodeId(3), NodeId(1)));
        assert!(graph.node(NodeId(3)).rules.is_empty());
    }

    #[test]
    fn test_trivial_rule() {
        let mut graph = RuleGraph::from_solution(&solution());
        graph.set_trivial_rule(NodeId(5));
        assert!(graph.has_trivial_rule(NodeId(5)));
        assert_eq!(graph.node(NodeId(5)).same_as(0), Some(NodeId(1)));
        assert!(!graph.add_different(NodeId(5), NodeId(2)));
        assert_eq!(graph.rule_count(), 1);
    }

    #[test]
    fn test_from_clues_uses_true_half_of_xor() {
        let solution = solution();
        let truth = SimpleClue::same(NodeId(3), 0, NodeId(2));
        let lie = SimpleClue::same(NodeId(5), 0, NodeId(2));
        let graph = RuleGraph::from_clues(&solution, &[Clue::Xor(lie, truth)]).unwrap();
        assert!(graph.has_trivial_rule(NodeId(3)));
        assert!(graph.node(NodeId(5)).rules.is_empty());
    }

    #[test]
    fn test_from_clues_rejects_false_clue() {
        let lie = Clue::Simple(SimpleClue::same(NodeId(5), 0, NodeId(2)));
        assert_eq!(
            RuleGraph::from_clues(&solution(), &[lie]),
            Err(GenerationError::InvalidClue { index: 0 })
        );
    }
}
