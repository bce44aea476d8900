use thiserror::Error;

/// Structural failures. Data-quality problems (empty keys, colliding keys,
/// no match) are reported through results and statistics instead.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (bad key field, misplaced fuzzy step, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// A match plan that cannot be executed.
    #[error("invalid match plan: {0}")]
    InvalidPlan(String),

    /// Missing required column in input data.
    #[error("role '{role}': missing column '{column}'")]
    MissingColumn { role: String, column: String },

    /// Malformed delimited input.
    #[error("role '{role}': CSV error: {message}")]
    Csv { role: String, message: String },

    /// Malformed JSON input.
    #[error("role '{role}': JSON error: {message}")]
    Json { role: String, message: String },

    /// IO error (file read/write, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
