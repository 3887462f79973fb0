use serde::{Deserialize, Serialize};

use super::NodeId;

/// Upper bound on columns; candidate sets are stored as a 64-bit mask.
pub const MAX_COLUMNS: usize = 64;

/// The canonical row: its symbols are the column identities themselves.
pub const CANONICAL_CATEGORY: usize = 0;

/// Column 0 is given for free and never a candidate of a solvable node.
pub const ANCHOR_COLUMN: usize = 0;

/// Shape of a puzzle: `category_count` rows of `column_count` symbols each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridLayout {
    pub category_count: usize,
    pub column_count: usize,
}

impl GridLayout {
    pub fn new(category_count: usize, column_count: usize) -> Self {
        Self {
            category_count,
            column_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.category_count * self.column_count
    }

    pub fn node_id(&self, category: usize, symbol: usize) -> NodeId {
        debug_assert!(category < self.category_count && symbol < self.column_count);
        NodeId(category * self.column_count + symbol)
    }

    pub fn category_of(&self, id: NodeId) -> usize {
        id.0 / self.column_count
    }

    pub fn symbol_of(&self, id: NodeId) -> usize {
        id.0 % self.column_count
    }

    /// The canonical node naming `column`.
    pub fn canonical_node(&self, column: usize) -> NodeId {
        self.node_id(CANONICAL_CATEGORY, column)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId)
    }

    pub fn category_node_ids(&self, category: usize) -> impl Iterator<Item = NodeId> {
        let start = category * self.column_count;
        (start..start + self.column_count).map(NodeId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_addressing() {
        let layout = GridLayout::new(3, 4);
        assert_eq!(layout.node_count(), 12);
        let id = layout.node_id(2, 1);
        assert_eq!(id, NodeId(9));
        assert_eq!(layout.category_of(id), 2);
        assert_eq!(layout.symbol_of(id), 1);
        assert_eq!(layout.canonical_node(3), NodeId(3));
        assert_eq!(
            layout.category_node_ids(1).collect::<Vec<_>>(),
            vec![NodeId(4), NodeId(5), NodeId(6), NodeId(7)]
        );
    }
}
