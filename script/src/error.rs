use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("cost limit {limit} exceeded")]
    CostExceeded { limit: u64 },

    #[error("malformed program bytes: {0}")]
    Deserialize(String),

    #[error("malformed condition: {0}")]
    InvalidCondition(String),
}
