use std::fmt;

use serde::{Deserialize, Serialize};

/// A set of column identities, stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ColumnSet(u64);

impl ColumnSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(column: usize) -> Self {
        Self(1 << column)
    }

    /// All of `0..column_count` except `excluded`.
    pub fn all_except(column_count: usize, excluded: usize) -> Self {
        let all = if column_count >= 64 {
            u64::MAX
        } else {
            (1u64 << column_count) - 1
        };
        Self(all & !(1 << excluded))
    }

    pub fn contains(&self, column: usize) -> bool {
        self.0 & (1 << column) != 0
    }

    pub fn insert(&mut self, column: usize) {
        self.0 |= 1 << column;
    }

    pub fn remove(&mut self, column: usize) {
        self.0 &= !(1 << column);
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The only column in the set, if there is exactly one.
    pub fn singleton(&self) -> Option<usize> {
        (self.len() == 1).then(|| self.0.trailing_zeros() as usize)
    }

    pub fn intersection(&self, other: &ColumnSet) -> ColumnSet {
        Self(self.0 & other.0)
    }

    pub fn union(&self, other: &ColumnSet) -> ColumnSet {
        Self(self.0 | other.0)
    }

    pub fn difference(&self, other: &ColumnSet) -> ColumnSet {
        Self(self.0 & !other.0)
    }

    pub fn is_subset(&self, other: &ColumnSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_disjoint(&self, other: &ColumnSet) -> bool {
        self.0 & other.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..64usize).filter(move |c| bits & (1 << c) != 0)
    }
}

impl FromIterator<usize> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = ColumnSet::empty();
        for column in iter {
            set.insert(column);
        }
        set
    }
}

impl fmt::Debug for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
