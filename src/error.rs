use thiserror::Error;
use uuid::Uuid;

use crate::model::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("generation run {run_id} was cancelled")]
    Cancelled { run_id: Uuid },

    #[error("node {node:?} does not narrow to its solution column")]
    Unsound { node: NodeId },

    #[error("clue {index} references an unknown node or category")]
    InvalidClue { index: usize },
}

pub type Result<T> = std::result::Result<T, GenerationError>;
