use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn learner_not_found(user_id: &str) -> Self {
        Self::NotFound(format!("learner {user_id}"))
    }

    pub fn concept_not_found(concept_id: &str) -> Self {
        Self::NotFound(format!("concept {concept_id}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
