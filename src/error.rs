use thiserror::Error;

//-----------------------------------------------------------------------------
// Error types
//-----------------------------------------------------------------------------

/// Failure of the fitness evaluation of a single individual
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Evaluation of individual #{id} failed: {reason}")]
pub struct EvaluationFailure {
    /// Identifier of the individual whose evaluation failed
    pub id: u64,
    /// Human readable cause
    pub reason: String,
}

impl EvaluationFailure {
    pub fn new(id: u64, reason: impl Into<String>) -> Self {
        EvaluationFailure { id, reason: reason.into() }
    }
}

/// Errors raised while configuring or running a feature selection
#[derive(Debug, Error)]
pub enum NsgaError {
    /// Inconsistent or out-of-range parameters, detected before the loop starts
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Dataset that cannot be used (missing target column, non numeric values...)
    #[error("Invalid data: {0}")]
    Data(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// An individual could not be evaluated and the failure policy is to abort
    #[error(transparent)]
    Evaluation(#[from] EvaluationFailure),

    /// The reference point set cannot be built within its budget
    #[error("Reference point generation for {n_objectives} objectives requires {required} points, above the limit of {limit}")]
    GenerationTimeout {
        n_objectives: usize,
        required: usize,
        limit: usize,
    },

    /// Niching was asked for more individuals than the boundary front holds
    #[error("Niching cannot select {requested} individuals from a boundary front of {available}")]
    SelectionUnderflow { requested: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, NsgaError>;
