use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Clue, GenerationStats, NodeId, Solution};

/// Where a token currently sits; free-form as far as the clue graph is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Grid { category: usize, column: usize },
    Tray { slot: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleNode {
    pub id: NodeId,
    pub category: usize,
    pub symbol: String,
    pub fixed: bool,
    pub placement: Placement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    pub run_id: Uuid,
    pub seed: u64,
    pub categories: Vec<Category>,
    /// In draw order, which is shuffled.
    pub nodes: Vec<PuzzleNode>,
    pub clues: Vec<Clue>,
    pub solution: Solution,
    pub stats: GenerationStats,
}

impl Puzzle {
    pub fn node(&self, id: NodeId) -> Option<&PuzzleNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Moves a non-fixed token; returns false for givens and unknown ids.
    pub fn place(&mut self, id: NodeId, placement: Placement) -> bool {
        match self.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) if !node.fixed => {
                node.placement = placement;
                true
            }
            _ => false,
        }
    }

    /// Geometric win check: every non-fixed token sits in its own category's
    /// row at its solution column.
    pub fn is_solved(&self) -> bool {
        self.nodes.iter().filter(|node| !node.fixed).all(|node| {
            node.placement
                == Placement::Grid {
                    category: node.category,
                    column: self.solution.column_of(node.id),
                }
        })
    }

    pub fn describe_clues(&self) -> Vec<String> {
        let column_count = self.solution.layout.column_count;
        self.clues
            .iter()
            .map(|clue| clue.describe(&self.categories, column_count))
            .collect()
    }
}
