//! Sprocket sizing for a fixed center distance.
//!
//! When the shaft positions are already fixed, the only free variables are
//! the tooth counts. Each candidate tooth count needs some exact chain length,
//! but a real chain comes in whole pairs of links, so the chain has to be
//! rounded up and the drive runs with that much slack. The solvers here pick
//! the tooth counts that minimise the slack.
//!
//! Ties are resolved in favour of the lowest tooth count, scanning upwards.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::drive::chain::validate_pitch;
use crate::drive::error::{DriveError, DriveResult};
use crate::drive::geometry::{chain_length_in_pitches, validate_distance};
use crate::drive::rounding::nearest_practical_length;

/// Best tooth counts found by a solver.
///
/// `T` is `u32` for a single-sprocket search and `[u32; 2]` for a search over
/// both sprockets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SprocketSolution<T> {
    /// Resolved tooth count(s), in the order the sprockets were searched.
    pub teeth: T,

    /// Practical chain length minus exact chain length, in pitches.
    ///
    /// Never negative; zero means the chain fits without slack.
    pub length_error: f64,
}

/// One row of a single-sprocket search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SprocketCandidate {
    /// Tooth count of the searched sprocket.
    pub teeth: u32,

    /// Exact chain length in pitches.
    pub exact_length: f64,

    /// Even chain length in pitches.
    pub practical_length: f64,

    /// Slack introduced by rounding, in pitches.
    pub length_error: f64,
}

/// Normalises search bounds so that `min <= max`.
#[must_use]
pub fn tooth_range(min: u32, max: u32) -> RangeInclusive<u32> {
    if min > max {
        max..=min
    } else {
        min..=max
    }
}

/// Folds scored items down to the first one with the strictly smallest error.
///
/// Later items only replace the current best if they are strictly better, so
/// equal errors keep the earliest item. The first failed item aborts the fold.
fn first_minimum<T>(
    items: impl IntoIterator<Item = DriveResult<(T, f64)>>,
) -> DriveResult<Option<(T, f64)>> {
    items.into_iter().try_fold(None, |best, scored| {
        let (item, error) = scored?;
        Ok(match best {
            Some((_, best_error)) if error >= best_error => best,
            _ => Some((item, error)),
        })
    })
}

/// Lazily evaluates every tooth count in `range` against the fixed sprocket.
///
/// Inputs must already be validated.
fn candidates(
    distance: f64,
    pitch: f64,
    fixed_teeth: u32,
    range: RangeInclusive<u32>,
) -> impl Iterator<Item = DriveResult<SprocketCandidate>> {
    range.map(move |teeth| {
        let exact_length = chain_length_in_pitches(distance, pitch, teeth, fixed_teeth)?;
        let practical_length = nearest_practical_length(exact_length);
        Ok(SprocketCandidate {
            teeth,
            exact_length,
            practical_length,
            length_error: practical_length - exact_length,
        })
    })
}

/// Evaluates every tooth count in `min..=max` against a fixed sprocket.
///
/// The bounds may be given in either order. Rows are returned in ascending
/// tooth count order.
///
/// # Errors
///
/// Returns an error if the distance or pitch is invalid.
pub fn scan_sprocket_candidates(
    distance: f64,
    pitch: f64,
    fixed_teeth: u32,
    min_teeth: u32,
    max_teeth: u32,
) -> DriveResult<Vec<SprocketCandidate>> {
    validate_distance(distance)?;
    validate_pitch(pitch)?;

    candidates(distance, pitch, fixed_teeth, tooth_range(min_teeth, max_teeth)).collect()
}

/// Finds the tooth count for one sprocket that best fits a fixed center
/// distance, given the other sprocket.
///
/// # Errors
///
/// Returns an error if the distance or pitch is invalid, or
/// [`DriveError::EmptyRange`] if there is nothing to search.
pub fn solve_for_one_sprocket(
    distance: f64,
    pitch: f64,
    fixed_teeth: u32,
    min_teeth: u32,
    max_teeth: u32,
) -> DriveResult<SprocketSolution<u32>> {
    validate_distance(distance)?;
    validate_pitch(pitch)?;

    let range = tooth_range(min_teeth, max_teeth);
    let empty = DriveError::EmptyRange {
        min: *range.start(),
        max: *range.end(),
    };

    let scored = candidates(distance, pitch, fixed_teeth, range)
        .map(|candidate| candidate.map(|c| (c.teeth, c.length_error)));
    let (teeth, length_error) = first_minimum(scored)?.ok_or(empty)?;

    Ok(SprocketSolution {
        teeth,
        length_error,
    })
}

/// Finds tooth counts for both sprockets that best fit a fixed center distance.
///
/// Every tooth count in the first range is paired with its best partner from
/// the second range, and the best pair overall is returned as `[a, b]`.
///
/// # Errors
///
/// Returns an error if the distance or pitch is invalid, or
/// [`DriveError::EmptyRange`] if there is nothing to search.
pub fn solve_for_both_sprockets(
    distance: f64,
    pitch: f64,
    min_teeth_a: u32,
    max_teeth_a: u32,
    min_teeth_b: u32,
    max_teeth_b: u32,
) -> DriveResult<SprocketSolution<[u32; 2]>> {
    let range_a = tooth_range(min_teeth_a, max_teeth_a);
    let range_b = tooth_range(min_teeth_b, max_teeth_b);
    let empty = DriveError::EmptyRange {
        min: *range_a.start(),
        max: *range_a.end(),
    };

    let (min_b, max_b) = (*range_b.start(), *range_b.end());
    let scored = range_a.map(|teeth_a| {
        solve_for_one_sprocket(distance, pitch, teeth_a, min_b, max_b)
            .map(|partner| ([teeth_a, partner.teeth], partner.length_error))
    });
    let (teeth, length_error) = first_minimum(scored)?.ok_or(empty)?;

    Ok(SprocketSolution {
        teeth,
        length_error,
    })
}
