//! Error types for the extraction and mixture-fitting core.
//!
//! Command-level code wraps these in `anyhow` errors; library functions return
//! `ContamError` so callers can tell a failed sample apart from a recoverable
//! zero-count condition.

use crate::mixture::MixtureModel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContamError {
    /// Missing or unusable input at the collection stage, fatal for the sample
    #[error("Data error: {message}")]
    Data { message: String },

    /// Fewer than two distinct positive values were available to fit the mixture
    #[error("Insufficient data for mixture fit: {distinct} distinct positive value(s), need at least 2")]
    InsufficientData { distinct: usize },

    /// The EM loop hit its iteration cap; `best_effort` holds the last estimate
    #[error("Mixture fit did not converge within {iterations} iterations")]
    Convergence {
        iterations: usize,
        best_effort: Box<MixtureModel>,
    },

    #[error("Cannot compute {feature}: no {denominator} observed")]
    DivisionByZero {
        feature: &'static str,
        denominator: &'static str,
    },

    #[error("Cannot compute {feature}: no values observed")]
    EmptyInput { feature: &'static str },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Invalid distribution parameters: {0}")]
    Distribution(#[from] statrs::StatsError),

    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
}

impl ContamError {
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Whether a batch may continue past this error (retry, skip or substitute a sentinel).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ContamError::InsufficientData { .. }
                | ContamError::Convergence { .. }
                | ContamError::DivisionByZero { .. }
                | ContamError::EmptyInput { .. }
        )
    }
}
