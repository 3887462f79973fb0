use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{GridLayout, NodeId};

/// The hidden answer: one solution column per node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub layout: GridLayout,
    columns: Vec<usize>,
}

impl Solution {
    pub fn new(layout: GridLayout, columns: Vec<usize>) -> Self {
        assert_eq!(
            columns.len(),
            layout.node_count(),
            "solution must place every node"
        );
        Self { layout, columns }
    }

    pub fn column_of(&self, id: NodeId) -> usize {
        self.columns[id.0]
    }

    /// The node of `category` that sits in `column`.
    pub fn node_at(&self, category: usize, column: usize) -> NodeId {
        self.layout
            .category_node_ids(category)
            .find(|id| self.column_of(*id) == column)
            .unwrap_or_else(|| panic!("no node of category {} in column {}", category, column))
    }

    /// Whether every category maps its alphabet onto the columns one-to-one.
    pub fn is_bijection(&self) -> bool {
        (0..self.layout.category_count).all(|category| {
            let mut seen = vec![false; self.layout.column_count];
            self.layout.category_node_ids(category).all(|id| {
                let column = self.column_of(id);
                column < seen.len() && !std::mem::replace(&mut seen[column], true)
            })
        })
    }

    pub fn is_given(&self, id: NodeId) -> bool {
        self.layout.category_of(id) == super::CANONICAL_CATEGORY
            || self.column_of(id) == super::ANCHOR_COLUMN
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for category in 0..self.layout.category_count {
            let row = (0..self.layout.column_count)
                .map(|column| format!("{:>3}", self.node_at(category, column).0))
                .join("|");
            writeln!(f, "{}|{}|", category, row)?;
        }
        Ok(())
    }
}
