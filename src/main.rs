use log::{debug, error, info};
use std::process::ExitCode;

use gridclue::events::Channel;
use gridclue::game::{GenerationHost, Settings};
use gridclue::model::{Difficulty, GenerationEvent, GenerationRequest};

fn init_logging() {
    env_logger::init();
}

/// Difficulty comes from the first argument, then `DIFFICULTY`, then settings.
fn requested_difficulty(settings: &Settings) -> Result<Difficulty, String> {
    match std::env::args().nth(1) {
        Some(name) => Difficulty::from_name(&name).ok_or_else(|| {
            format!(
                "unknown difficulty {:?}, expected one of {:?}",
                name,
                Difficulty::all()
            )
        }),
        None => Ok(Settings::difficulty_from_env().unwrap_or(settings.difficulty)),
    }
}

fn main() -> ExitCode {
    init_logging();

    let settings = Settings::load();
    let difficulty = match requested_difficulty(&settings) {
        Ok(difficulty) => difficulty,
        Err(message) => {
            error!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let mut request = GenerationRequest::from_difficulty(difficulty);
    if let Some(seed) = Settings::seed_from_env() {
        request = request.with_seed(seed);
    }

    let (emitter, observer) = Channel::new();
    observer.subscribe(|event: &GenerationEvent| debug!(target: "events", "{:?}", event));
    let mut host = GenerationHost::new(settings, emitter);

    let puzzle = match host.generate(&request) {
        Ok(puzzle) => puzzle,
        Err(err) => {
            error!("Generation failed: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Generated {:?} puzzle {} (seed {}) with {} clue(s)",
        difficulty,
        puzzle.run_id,
        puzzle.seed,
        puzzle.clues.len()
    );

    if Settings::is_debug_mode() {
        eprintln!("{}", puzzle.solution);
        for line in puzzle.describe_clues() {
            eprintln!("{}", line);
        }
    }

    match serde_json::to_string_pretty(&puzzle) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Could not serialize puzzle: {}", err);
            ExitCode::FAILURE
        }
    }
}
