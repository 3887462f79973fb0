use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
    Veteran,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Easy
    }
}

impl Difficulty {
    pub fn all() -> Vec<Difficulty> {
        vec![
            Difficulty::Easy,
            Difficulty::Moderate,
            Difficulty::Hard,
            Difficulty::Veteran,
        ]
    }

    pub fn from_name(name: &str) -> Option<Difficulty> {
        match name.to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "moderate" => Some(Difficulty::Moderate),
            "hard" => Some(Difficulty::Hard),
            "veteran" => Some(Difficulty::Veteran),
            _ => None,
        }
    }

    pub fn category_count(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Moderate => 4,
            Difficulty::Hard => 5,
            Difficulty::Veteran => 6,
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            Difficulty::Easy => 4,
            Difficulty::Moderate => 5,
            Difficulty::Hard => 5,
            Difficulty::Veteran => 6,
        }
    }

    /// Whether some clues are recast as exclusive-or pairs.
    pub fn xor_enabled(&self) -> bool {
        matches!(self, Difficulty::Hard | Difficulty::Veteran)
    }
}
