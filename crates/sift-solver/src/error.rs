use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SolverError {
    // Resolution errors: every failed branch and every failed run reports
    // through this one kind, with the human-readable reasons aggregated.
    #[error("Can't resolve transaction: {0}")]
    Unsatisfiable(String),
}

impl SolverError {
    pub fn unsatisfiable(reason: impl Into<String>) -> Self {
        SolverError::Unsatisfiable(reason.into())
    }

    /// The explanation carried by the error
    pub fn reason(&self) -> &str {
        match self {
            SolverError::Unsatisfiable(reason) => reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
