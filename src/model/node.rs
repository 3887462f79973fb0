use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node in the rule graph arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a node knows about one other category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// Same column as the referenced node.
    Same(NodeId),
    /// Different column than each referenced node.
    Different(BTreeSet<NodeId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub category: usize,
    pub symbol: usize,
    pub fixed: bool,
    /// Set once by the assignment generator.
    pub solution_column: usize,
    /// Keyed by the referenced category, never the node's own.
    pub rules: BTreeMap<usize, Rule>,
}

impl Node {
    pub fn new(id: NodeId, category: usize, symbol: usize, solution_column: usize) -> Self {
        Self {
            id,
            category,
            symbol,
            fixed: false,
            solution_column,
            rules: BTreeMap::new(),
        }
    }

    /// The column a solver may read directly: only givens expose theirs.
    pub fn given_column(&self) -> Option<usize> {
        self.fixed.then_some(self.solution_column)
    }

    pub fn same_as(&self, category: usize) -> Option<NodeId> {
        match self.rules.get(&category) {
            Some(Rule::Same(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn different_from(&self, category: usize) -> Option<&BTreeSet<NodeId>> {
        match self.rules.get(&category) {
            Some(Rule::Different(ids)) => Some(ids),
            _ => None,
        }
    }

    /// Every (category, referenced node) pair with a negative rule.
    pub fn negative_references(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.rules.iter().flat_map(|(category, rule)| {
            let ids: Vec<NodeId> = match rule {
                Rule::Different(ids) => ids.iter().copied().collect(),
                Rule::Same(_) => Vec::new(),
            };
            ids.into_iter().map(move |id| (*category, id))
        })
    }

    pub fn positive_references(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.rules.iter().filter_map(|(category, rule)| match rule {
            Rule::Same(id) => Some((*category, *id)),
            Rule::Different(_) => None,
        })
    }

    pub fn negative_rule_count(&self) -> usize {
        self.negative_references().count()
    }
}
