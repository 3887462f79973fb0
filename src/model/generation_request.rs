use serde::{Deserialize, Serialize};

use super::{Category, Difficulty, GridLayout, MAX_COLUMNS};
use crate::error::{GenerationError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub category_count: usize,
    pub column_count: usize,
    #[serde(default)]
    pub xor_enabled: bool,
    /// One alphabet per category; generated when empty.
    #[serde(default)]
    pub alphabet_per_category: Vec<Category>,
    /// Fixes every random choice of the run.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(category_count: usize, column_count: usize, xor_enabled: bool) -> Self {
        Self {
            category_count,
            column_count,
            xor_enabled,
            alphabet_per_category: Vec::new(),
            seed: None,
        }
    }

    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self::new(
            difficulty.category_count(),
            difficulty.column_count(),
            difficulty.xor_enabled(),
        )
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_alphabets(mut self, alphabets: Vec<Category>) -> Self {
        self.alphabet_per_category = alphabets;
        self
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.category_count, self.column_count)
    }

    pub fn validate(&self) -> Result<()> {
        if self.column_count < 2 {
            return Err(GenerationError::InvalidRequest(format!(
                "column_count must be at least 2, got {}",
                self.column_count
            )));
        }
        if self.column_count > MAX_COLUMNS {
            return Err(GenerationError::InvalidRequest(format!(
                "column_count must be at most {}, got {}",
                MAX_COLUMNS, self.column_count
            )));
        }
        if self.category_count < 2 {
            return Err(GenerationError::InvalidRequest(format!(
                "category_count must be at least 2, got {}",
                self.category_count
            )));
        }
        if self.alphabet_per_category.is_empty() {
            return Ok(());
        }
        if self.alphabet_per_category.len() != self.category_count {
            return Err(GenerationError::InvalidRequest(format!(
                "expected {} alphabets, got {}",
                self.category_count,
                self.alphabet_per_category.len()
            )));
        }
        for (index, category) in self.alphabet_per_category.iter().enumerate() {
            if category.len() != self.column_count {
                return Err(GenerationError::InvalidRequest(format!(
                    "alphabet {} has {} symbols, expected {}",
                    index,
                    category.len(),
                    self.column_count
                )));
            }
            if !category.has_unique_symbols() {
                return Err(GenerationError::InvalidRequest(format!(
                    "alphabet {} repeats a symbol",
                    index
                )));
            }
        }
        Ok(())
    }

    /// The alphabets to use, generating defaults when none were given.
    pub fn categories(&self) -> Vec<Category> {
        if self.alphabet_per_category.is_empty() {
            (0..self.category_count)
                .map(|category| Category::default_alphabet(category, self.column_count))
                .collect()
        } else {
            self.alphabet_per_category.clone()
        }
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::default())
    }
}
