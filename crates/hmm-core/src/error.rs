//! Error types for the HMM inference and training engine.

use thiserror::Error;

/// Result type alias used throughout `hmm-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the trellis builder, parameter store, and solvers.
#[derive(Debug, Error)]
pub enum Error {
    /// Parameters missing, dimensions mismatched, a probability vector
    /// does not sum to one, or the discrete/continuous variant is
    /// inconsistent with the data supplied.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A `LOG_ZERO` entry in continuous emissions, or an observation
    /// symbol out of range.
    #[error("domain error: {0}")]
    Domain(String),

    /// The best-path weight is `LOG_ZERO`: current parameters forbid
    /// every trajectory consistent with the observations.
    #[error("no path through the trellis is consistent with the observations")]
    NoPath,

    /// A `NaN` appeared during `lnsum` accumulation. Should be
    /// unreachable if inputs were validated; surfaced rather than
    /// silently propagated.
    #[error("numerical instability: {0}")]
    Numeric(String),
}
