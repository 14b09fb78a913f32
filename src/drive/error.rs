//! Error types for chain drive calculations.

use thiserror::Error;

use crate::drive::chain::SprocketPair;

/// Result type for chain drive calculations.
pub type DriveResult<T> = Result<T, DriveError>;

/// Errors that can occur while solving chain drive geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriveError {
    /// The chain cannot wrap both sprockets at any positive center distance.
    #[error("Chain of {length_in_pitches} pitches is too short to wrap {pair} sprockets")]
    ChainTooShort {
        /// Requested chain length in pitches.
        length_in_pitches: f64,
        /// The sprockets the chain should wrap.
        pair: SprocketPair,
    },

    /// Center distance was zero, negative or not finite.
    #[error("Center distance must be positive, got {distance}")]
    NonPositiveDistance {
        /// The rejected distance.
        distance: f64,
    },

    /// Chain pitch was zero, negative, not finite, or an unknown chain size.
    #[error("Invalid chain pitch: {message}")]
    InvalidPitch {
        /// Description of what's wrong.
        message: String,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// A tooth count search range contained no candidates.
    #[error("Tooth count range {min}..={max} is empty")]
    EmptyRange {
        /// Lower bound of the range.
        min: u32,
        /// Upper bound of the range.
        max: u32,
    },
}

impl DriveError {
    /// Creates an invalid pitch error.
    pub fn invalid_pitch(message: impl Into<String>) -> Self {
        Self::InvalidPitch {
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}
