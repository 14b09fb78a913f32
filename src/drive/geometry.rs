//! Two-sprocket chain drive geometry.
//!
//! The chain is modelled as a belt running tangent to two pitch circles. For
//! sprockets with `N1 <= N2` teeth at center distance `C`, the chain length in
//! pitches is
//!
//! ```text
//! L = 2C/p + (N1 + N2)/2 + p * ((N2 - N1) / 2π)² / C
//! ```
//!
//! The first term is the two straight spans, the second the half-wrap on each
//! sprocket, and the last corrects for the larger sprocket carrying more than
//! half a wrap. That correction comes from linearising the wrap angle, which is
//! also where the `8/π²` constant in the inverse originates. Solving the
//! quadratic in `C` gives
//!
//! ```text
//! C = p/8 * (R + sqrt(R² - (8/π²)(N2 - N1)²)),   R = 2L - N1 - N2
//! ```
//!
//! Both are the standard ANSI/ASME roller chain approximations and are treated
//! here as given; they are pinned by golden values in the tests.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::drive::chain::{validate_pitch, SprocketPair};
use crate::drive::error::{DriveError, DriveResult};
use crate::drive::rounding::nearest_practical_length;

/// Wrap-angle correction coefficient, `8/π²`.
const WRAP_CORRECTION: f64 = 8.0 / (PI * PI);

/// Calculates the center-to-center distance for a chain of a given length.
///
/// # Errors
///
/// - [`DriveError::InvalidPitch`] if `pitch` is not positive and finite
/// - [`DriveError::InvalidParameter`] if `length_in_pitches` is not finite
/// - [`DriveError::ChainTooShort`] if the chain cannot wrap both sprockets at
///   any positive distance
#[allow(clippy::suboptimal_flops)] // Evaluated unfused, in table order
pub fn center_distance(
    pitch: f64,
    length_in_pitches: f64,
    tooth_a: u32,
    tooth_b: u32,
) -> DriveResult<f64> {
    validate_pitch(pitch)?;
    if !length_in_pitches.is_finite() {
        return Err(DriveError::invalid_parameter(
            "length_in_pitches",
            format!("must be finite, got {length_in_pitches}"),
        ));
    }

    let pair = SprocketPair::new(tooth_a, tooth_b);
    let difference = pair.difference();
    let remainder = 2.0 * length_in_pitches - pair.sum();

    let discriminant = remainder * remainder - WRAP_CORRECTION * (difference * difference);
    let too_short = || DriveError::ChainTooShort {
        length_in_pitches,
        pair,
    };

    if discriminant < 0.0 {
        return Err(too_short());
    }

    let distance = (pitch / 8.0) * (remainder + discriminant.sqrt());
    if distance <= 0.0 {
        return Err(too_short());
    }

    Ok(distance)
}

/// Calculates the exact chain length, in pitches, needed at a center distance.
///
/// # Errors
///
/// - [`DriveError::InvalidPitch`] if `pitch` is not positive and finite
/// - [`DriveError::NonPositiveDistance`] if `distance` is not positive and finite
#[allow(clippy::suboptimal_flops)] // Evaluated unfused, in table order
pub fn chain_length_in_pitches(
    distance: f64,
    pitch: f64,
    tooth_a: u32,
    tooth_b: u32,
) -> DriveResult<f64> {
    validate_pitch(pitch)?;
    validate_distance(distance)?;

    let pair = SprocketPair::new(tooth_a, tooth_b);
    let correction = pair.difference() / (2.0 * PI);

    Ok((2.0 * distance) / pitch + pair.sum() / 2.0 + (pitch * correction * correction) / distance)
}

/// Checks that a center distance is usable as a divisor.
pub(crate) fn validate_distance(distance: f64) -> DriveResult<()> {
    if distance.is_finite() && distance > 0.0 {
        Ok(())
    } else {
        Err(DriveError::NonPositiveDistance { distance })
    }
}

/// How a real chain fits a given center distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainFit {
    /// Exact chain length required at the requested distance, in pitches.
    pub exact_length: f64,

    /// Shortest buildable (even) chain length, in pitches.
    pub practical_length: f64,

    /// Extra chain beyond the exact length, in pitches.
    pub length_error: f64,

    /// Center distance at which the practical chain is taut.
    pub practical_distance: f64,
}

/// Fits a buildable chain to two sprockets at a fixed center distance.
///
/// # Errors
///
/// Returns an error if the pitch or distance is invalid.
pub fn fit_chain(distance: f64, pitch: f64, tooth_a: u32, tooth_b: u32) -> DriveResult<ChainFit> {
    let exact_length = chain_length_in_pitches(distance, pitch, tooth_a, tooth_b)?;
    let practical_length = nearest_practical_length(exact_length);
    let practical_distance = center_distance(pitch, practical_length, tooth_a, tooth_b)?;

    Ok(ChainFit {
        exact_length,
        practical_length,
        length_error: practical_length - exact_length,
        practical_distance,
    })
}
