use crate::CardId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("caller identity is not resolved")]
    Unauthenticated,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cards not found or not owned: {}", join_ids(.0))]
    CardsNotFound(Vec<CardId>),
    #[error("storage error: {0}")]
    Storage(&'static str),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl EngineError {
    /// Stable machine-readable code surfaced at the boundary.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Unauthenticated => "unauthenticated",
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::CardsNotFound(_) => "cards_not_found",
            EngineError::Storage(_) => "storage_failure",
            EngineError::Unexpected(_) => "unexpected_failure",
        }
    }
}

fn join_ids(ids: &[CardId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
