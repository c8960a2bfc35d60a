use thiserror::Error;

/// Failures specific to coverage estimation
///
/// Everything else (I/O, parsing, htslib) is reported through anyhow with context
#[derive(Debug, Error)]
pub enum CovError {
    #[error("Target sequence {0} not found in abundance table")]
    TargetNotFound(String),

    #[error("Required column {0} missing from abundance table header")]
    MissingColumn(String),

    #[error("Sequence {0} occurs more than once in abundance table")]
    DuplicateSequence(String),

    #[error("Invalid abundance {value} for sequence {name}")]
    InvalidAbundance { name: String, value: f64 },

    #[error("Sequence {0} from alignment input not found in abundance table")]
    UnknownSequence(String),

    #[error("Read {read} aligned to {target} at invalid position {pos}")]
    InvariantViolation {
        read: String,
        target: String,
        pos: i64,
    },
}
