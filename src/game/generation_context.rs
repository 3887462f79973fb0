use log::info;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use uuid::Uuid;

use super::assignment::assign_solution;
use super::scheduler::{CancellationToken, StepMeter};
use super::settings::Settings;
use crate::error::Result;
use crate::model::{
    Category, Clue, ColumnSet, GenerationRequest, GenerationStats, NodeId, RuleGraph,
};
use crate::solver;

/// Everything one generation run mutates. Created per request, never shared.
pub struct GenerationContext {
    pub run_id: Uuid,
    pub seed: u64,
    pub categories: Vec<Category>,
    pub graph: RuleGraph,
    pub clues: Vec<Clue>,
    pub rng: StdRng,
    pub meter: StepMeter,
    pub retry_budget: usize,
    pub xor_enabled: bool,
    pub stats: GenerationStats,
}

impl GenerationContext {
    pub(crate) fn new(request: &GenerationRequest, settings: &Settings) -> Result<Self> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let seed = request.seed.unwrap_or_else(|| rand::rng().next_u64());
        let mut rng = StdRng::seed_from_u64(seed);
        let graph = assign_solution(request.layout(), &mut rng);

        info!(
            target: "assignment",
            "Run {}: {}x{} grid, seed {}, xor {}",
            run_id,
            request.category_count,
            request.column_count,
            seed,
            request.xor_enabled
        );

        Ok(Self {
            run_id,
            seed,
            categories: request.categories(),
            graph,
            clues: Vec::new(),
            rng,
            meter: StepMeter::new(run_id, CancellationToken::new()),
            retry_budget: settings.retry_budget,
            xor_enabled: request.xor_enabled,
            stats: GenerationStats::default(),
        })
    }

    pub fn token(&self) -> &CancellationToken {
        self.meter.token()
    }

    pub fn narrow(&self, id: NodeId) -> Result<ColumnSet> {
        solver::narrow(&self.graph, id, &self.meter)
    }

    pub fn is_derivable(&self, id: NodeId) -> Result<bool> {
        solver::is_derivable(&self.graph, id, &self.meter)
    }

    /// Whether every non-fixed node still narrows to its solution column.
    pub fn is_sound(&self) -> Result<bool> {
        solver::is_sound(&self.graph, &self.meter)
    }
}
