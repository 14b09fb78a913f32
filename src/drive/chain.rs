//! Chain and sprocket value types.
//!
//! Roller chain is sized by pitch, the distance between consecutive pins.
//! ANSI B29.1 chain numbers encode the pitch in their leading digits as
//! eighths of an inch: `40` chain has a 4/8" = 0.5" pitch. The trailing digit
//! marks the variant (`0` standard, `1` lightweight, `5` rollerless bushing).

use std::fmt;

use crate::drive::error::{DriveError, DriveResult};

/// A roller chain described by its pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSpec {
    pitch: f64,
}

impl ChainSpec {
    /// Creates a chain spec from a raw pitch.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::InvalidPitch`] if the pitch is not a positive,
    /// finite number.
    pub fn new(pitch: f64) -> DriveResult<Self> {
        validate_pitch(pitch)?;
        Ok(Self { pitch })
    }

    /// Looks up a chain by its ANSI chain number.
    ///
    /// Accepts `"40"`, `"#40"`, `"ANSI 40"` (case-insensitive). The pitch is
    /// returned in inches.
    ///
    /// # Errors
    ///
    /// Returns [`DriveError::InvalidPitch`] if the string is not a known ANSI
    /// roller chain size.
    pub fn from_ansi(number: &str) -> DriveResult<Self> {
        let trimmed = number.trim();
        let digits = trimmed
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("ansi"))
            .map_or(trimmed, |_| &trimmed[4..])
            .trim()
            .trim_start_matches('#');

        let unknown = || DriveError::invalid_pitch(format!("unknown ANSI chain number '{number}'"));

        if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }

        let (eighths, variant) = digits.split_at(digits.len() - 1);
        let eighths: u32 = eighths.parse().map_err(|_| unknown())?;

        if !matches!(variant, "0" | "1" | "5") || !(2..=24).contains(&eighths) {
            return Err(unknown());
        }

        Self::new(f64::from(eighths) / 8.0)
    }

    /// Returns the chain pitch.
    #[must_use]
    pub const fn pitch(&self) -> f64 {
        self.pitch
    }
}

/// Checks that a pitch is usable as a divisor and a length scale.
pub(crate) fn validate_pitch(pitch: f64) -> DriveResult<()> {
    if pitch.is_finite() && pitch > 0.0 {
        Ok(())
    } else {
        Err(DriveError::invalid_pitch(format!(
            "pitch must be positive and finite, got {pitch}"
        )))
    }
}

/// Two sprockets connected by one chain.
///
/// The order of the tooth counts carries no meaning; all geometry is computed
/// from the larger and smaller count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprocketPair {
    /// Tooth count of the first sprocket.
    pub a: u32,
    /// Tooth count of the second sprocket.
    pub b: u32,
}

impl SprocketPair {
    /// Creates a sprocket pair.
    #[must_use]
    pub const fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    /// Returns the tooth count of the larger sprocket.
    #[must_use]
    pub fn larger(&self) -> u32 {
        self.a.max(self.b)
    }

    /// Returns the tooth count of the smaller sprocket.
    #[must_use]
    pub fn smaller(&self) -> u32 {
        self.a.min(self.b)
    }

    /// Returns the tooth count difference as a float.
    #[must_use]
    pub fn difference(&self) -> f64 {
        f64::from(self.larger() - self.smaller())
    }

    /// Returns the combined tooth count as a float.
    #[must_use]
    pub fn sum(&self) -> f64 {
        f64::from(self.smaller()) + f64::from(self.larger())
    }
}

impl fmt::Display for SprocketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T/{}T", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_chain_numbers() {
        assert!((ChainSpec::from_ansi("25").unwrap().pitch() - 0.25).abs() < f64::EPSILON);
        assert!((ChainSpec::from_ansi("#35").unwrap().pitch() - 0.375).abs() < f64::EPSILON);
        assert!((ChainSpec::from_ansi("ANSI 40").unwrap().pitch() - 0.5).abs() < f64::EPSILON);
        assert!((ChainSpec::from_ansi("41").unwrap().pitch() - 0.5).abs() < f64::EPSILON);
        assert!((ChainSpec::from_ansi("80").unwrap().pitch() - 1.0).abs() < f64::EPSILON);
        assert!((ChainSpec::from_ansi("240").unwrap().pitch() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reject_unknown_ansi_numbers() {
        assert!(ChainSpec::from_ansi("").is_err());
        assert!(ChainSpec::from_ansi("4").is_err());
        assert!(ChainSpec::from_ansi("43").is_err());
        assert!(ChainSpec::from_ansi("10").is_err());
        assert!(ChainSpec::from_ansi("260").is_err());
        assert!(ChainSpec::from_ansi("40H").is_err());
    }

    #[test]
    fn reject_bad_pitch() {
        assert!(ChainSpec::new(0.0).is_err());
        assert!(ChainSpec::new(-0.25).is_err());
        assert!(ChainSpec::new(f64::NAN).is_err());
        assert!(ChainSpec::new(f64::INFINITY).is_err());
        assert!(ChainSpec::new(0.25).is_ok());
    }

    #[test]
    fn pair_is_order_independent() {
        let pair = SprocketPair::new(15, 20);
        let swapped = SprocketPair::new(20, 15);
        assert_eq!(pair.larger(), swapped.larger());
        assert_eq!(pair.smaller(), swapped.smaller());
        assert!((pair.difference() - 5.0).abs() < f64::EPSILON);
        assert!((pair.sum() - 35.0).abs() < f64::EPSILON);
        assert_eq!(pair.to_string(), "15T/20T");
    }
}
