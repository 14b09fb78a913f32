//! Rounding exact chain lengths to buildable ones.
//!
//! A roller chain alternates inner and outer links, so a closed loop without
//! an offset link always has an even number of pitches.

/// Returns the smallest even number of pitches not shorter than `exact_length`.
///
/// Always rounds up: a chain that is too short cannot be closed.
#[must_use]
pub fn nearest_practical_length(exact_length: f64) -> f64 {
    (exact_length * 0.5).ceil() * 2.0
}
