use crate::model::Difficulty;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON settings file.
pub const SETTINGS_PATH_ENV: &str = "GRIDCLUE_SETTINGS";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_version")]
    version: u32,

    #[serde(default)]
    pub difficulty: Difficulty,

    /// Justification attempts per node before the trivial clue is restored.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: usize,

    /// Narrowing steps between yields to the host.
    #[serde(default = "default_step_budget")]
    pub step_budget: u64,
}

// Helper functions for default values
fn default_version() -> u32 {
    2
}
fn default_retry_budget() -> usize {
    100
}
fn default_step_budget() -> u64 {
    5_000
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: default_version(),
            difficulty: Difficulty::default(),
            retry_budget: default_retry_budget(),
            step_budget: default_step_budget(),
        }
    }
}

impl Settings {
    /// Loads from the file named by `GRIDCLUE_SETTINGS`, falling back to defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Settings::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(contents) = fs::read_to_string(path) {
            if let Ok(mut settings) = serde_json::from_str::<Settings>(&contents) {
                settings.migrate();
                return settings;
            }
        }
        Settings::default()
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        // Ensure the directory exists
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
    }

    fn settings_path() -> Option<PathBuf> {
        std::env::var(SETTINGS_PATH_ENV).ok().map(PathBuf::from)
    }

    fn migrate(&mut self) {
        match self.version {
            0 | 1 => {
                // version 1 stored an unbounded retry count as 0
                if self.retry_budget == 0 {
                    self.retry_budget = default_retry_budget();
                }
                self.version = 2;
            }
            _ => (),
        }
        if self.step_budget == 0 {
            self.step_budget = default_step_budget();
        }
    }

    pub fn is_debug_mode() -> bool {
        std::env::var("DEBUG").map(|v| v == "1").unwrap_or(false)
    }

    pub fn seed_from_env() -> Option<u64> {
        std::env::var("SEED").ok().and_then(|v| v.parse::<u64>().ok())
    }

    pub fn difficulty_from_env() -> Option<Difficulty> {
        std::env::var("DIFFICULTY")
            .ok()
            .and_then(|v| Difficulty::from_name(&v))
    }
}
