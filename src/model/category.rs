use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One attribute row: an ordered alphabet of unique symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub symbols: Vec<String>,
}

impl Category {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Symbols of the form "0a", "0b", ... for row `category`.
    pub fn default_alphabet(category: usize, column_count: usize) -> Self {
        let symbols = (0..column_count)
            .map(|index| {
                if index < 26 {
                    format!("{}{}", category, Self::usize_to_variant(index))
                } else {
                    format!("{}-{}", category, index)
                }
            })
            .collect();
        Self { symbols }
    }

    pub fn usize_to_variant(index: usize) -> char {
        (index + 'a' as usize) as u8 as char
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn has_unique_symbols(&self) -> bool {
        let mut seen = HashSet::new();
        self.symbols.iter().all(|symbol| seen.insert(symbol))
    }
}
