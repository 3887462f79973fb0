mod category;
mod clue;
mod column_set;
mod difficulty;
mod generation_event;
mod generation_request;
mod generation_stats;
mod layout;
mod node;
mod puzzle;
mod rule_graph;
mod solution;

pub use category::Category;
pub use clue::{Clue, SimpleClue};
pub use column_set::ColumnSet;
pub use difficulty::Difficulty;
pub use generation_event::{GenerationEvent, GenerationPhase};
pub use generation_request::GenerationRequest;
pub use generation_stats::GenerationStats;
pub use layout::{GridLayout, ANCHOR_COLUMN, CANONICAL_CATEGORY, MAX_COLUMNS};
pub use node::{Node, NodeId, Rule};
pub use puzzle::{Placement, Puzzle, PuzzleNode};
pub use rule_graph::RuleGraph;
pub use solution::Solution;
