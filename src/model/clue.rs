use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

use super::{Category, NodeId, Solution};

/// "`subject` is (not) in the same column as `referenced`", shifted by
/// `column_offset` columns. The generator only emits offset 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimpleClue {
    pub subject: NodeId,
    pub negated: bool,
    pub category: usize,
    pub referenced: NodeId,
    pub column_offset: i32,
}

impl SimpleClue {
    pub fn same(subject: NodeId, category: usize, referenced: NodeId) -> Self {
        Self {
            subject,
            negated: false,
            category,
            referenced,
            column_offset: 0,
        }
    }

    pub fn different(subject: NodeId, category: usize, referenced: NodeId) -> Self {
        Self {
            subject,
            negated: true,
            category,
            referenced,
            column_offset: 0,
        }
    }

    pub fn holds(&self, solution: &Solution) -> bool {
        let subject = solution.column_of(self.subject) as i64 + self.column_offset as i64;
        let aligned = subject == solution.column_of(self.referenced) as i64;
        aligned != self.negated
    }

    /// The two nodes the clue talks about, smallest id first.
    pub fn entities(&self) -> (NodeId, NodeId) {
        if self.subject <= self.referenced {
            (self.subject, self.referenced)
        } else {
            (self.referenced, self.subject)
        }
    }

    pub fn describe(&self, categories: &[Category], column_count: usize) -> String {
        let name = |id: NodeId| {
            let category = id.0 / column_count;
            categories
                .get(category)
                .and_then(|c| c.symbols.get(id.0 % column_count))
                .cloned()
                .unwrap_or_else(|| id.to_string())
        };
        format!(
            "{} is {}in the same column as {}",
            name(self.subject),
            if self.negated { "not " } else { "" },
            name(self.referenced)
        )
    }
}

impl Debug for SimpleClue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} {:?}",
            self.subject,
            if self.negated { "!=" } else { "==" },
            self.referenced
        )?;
        if self.column_offset != 0 {
            write!(f, " {:+}", self.column_offset)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clue {
    Simple(SimpleClue),
    /// Exactly one of the two halves holds.
    Xor(SimpleClue, SimpleClue),
}

impl Clue {
    pub fn is_xor(&self) -> bool {
        matches!(self, Clue::Xor(..))
    }

    pub fn halves(&self) -> Vec<SimpleClue> {
        match self {
            Clue::Simple(clue) => vec![*clue],
            Clue::Xor(a, b) => vec![*a, *b],
        }
    }

    /// Whether the clue is true of `solution`.
    pub fn holds(&self, solution: &Solution) -> bool {
        match self {
            Clue::Simple(clue) => clue.holds(solution),
            Clue::Xor(a, b) => a.holds(solution) != b.holds(solution),
        }
    }

    /// The half that holds; for a simple clue, the clue itself if it holds.
    pub fn true_half(&self, solution: &Solution) -> Option<SimpleClue> {
        self.halves().into_iter().find(|half| half.holds(solution))
    }

    pub fn describe(&self, categories: &[Category], column_count: usize) -> String {
        match self {
            Clue::Simple(clue) => clue.describe(categories, column_count),
            Clue::Xor(a, b) => format!(
                "either {} or {}, but not both",
                a.describe(categories, column_count),
                b.describe(categories, column_count)
            ),
        }
    }
}

impl Display for Clue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clue::Simple(clue) => write!(f, "{:?}", clue),
            Clue::Xor(a, b) => write!(f, "{:?} XOR {:?}", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GridLayout;

    fn solution() -> Solution {
        // category 1: node 3 -> col 2, node 4 -> col 0, node 5 -> col 1
        Solution::new(GridLayout::new(2, 3), vec![0, 1, 2, 2, 0, 1])
    }

    #[test]
    fn test_simple_clue_holds() {
        let solution = solution();
        assert!(SimpleClue::same(NodeId(3), 0, NodeId(2)).holds(&solution));
        assert!(!SimpleClue::same(NodeId(3), 0, NodeId(1)).holds(&solution));
        assert!(SimpleClue::different(NodeId(5), 0, NodeId(2)).holds(&solution));
        assert!(!SimpleClue::different(NodeId(5), 0, NodeId(1)).holds(&solution));
    }

    #[test]
    fn test_xor_holds_with_exactly_one_half() {
        let solution = solution();
        let truth = SimpleClue::same(NodeId(3), 0, NodeId(2));
        let lie = SimpleClue::same(NodeId(5), 0, NodeId(2));
        assert!(Clue::Xor(truth, lie).holds(&solution));
        assert!(Clue::Xor(lie, truth).holds(&solution));
        assert!(!Clue::Xor(truth, truth).holds(&solution));
        assert_eq!(Clue::Xor(lie, truth).true_half(&solution), Some(truth));
    }

    #[test]
    fn test_describe_uses_symbols() {
        let categories = vec![
            Category::new(vec!["1".into(), "2".into(), "3".into()]),
            Category::new(vec!["cat".into(), "dog".into(), "fox".into()]),
        ];
        let clue = Clue::Simple(SimpleClue::different(NodeId(4), 0, NodeId(2)));
        assert_eq!(
            clue.describe(&categories, 3),
            "dog is not in the same column as 3"
        );
        assert_eq!(format!("{}", clue), "#4 != #2");
    }
}
