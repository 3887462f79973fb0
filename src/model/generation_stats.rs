use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub n_obscured: usize,
    pub n_obscure_attempts: usize,
    pub n_fallbacks: usize,
    pub n_pruned: usize,
    pub n_collapsed: usize,
    pub n_xor_pairs: usize,
    pub n_rejected_giveaways: usize,
    pub n_rejected_duplicate_pairs: usize,
    pub n_reverted_xor_pairs: usize,
    pub n_narrow_steps: u64,
    pub n_yields: usize,
}
