use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Plan(String),

    #[error("op[{index}] ({op}): {reason}")]
    Validation { index: usize, op: String, reason: String },

    #[error("op[{index}] ({op}) failed after {applied} op(s) were applied: {reason}")]
    Apply { index: usize, op: String, reason: String, applied: usize },
}

impl WorkflowError {
    /// The plan was refused before anything was written.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Apply { .. })
    }
}

/// What one op will do, or did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpSummary {
    pub index: usize,
    pub op: String,
    pub why: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(OpSummary),
    Reject(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    /// False for a preview; nothing was written.
    pub confirm: bool,
    pub preview: Vec<OpSummary>,
    pub applied: Vec<OpSummary>,
}
