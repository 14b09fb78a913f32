//! Roller chain drive geometry and sprocket sizing.
//!
//! This module relates center distance, chain length and tooth counts for a
//! drive made of two sprockets and a single roller chain. Everything here is
//! a pure calculation; nothing logs or touches I/O.
//!
//! # Units
//!
//! Chain length is always expressed in **pitches** (number of links). Pitch
//! and center distance share whatever linear unit the caller picks; ANSI chain
//! numbers resolve to inches.
//!
//! # Modules
//!
//! - [`chain`] - Pitch and sprocket pair value types, ANSI chain lookup
//! - [`geometry`] - Distance to length and length to distance
//! - [`rounding`] - Rounding up to a buildable (even) link count
//! - [`solver`] - Tooth count search for a fixed center distance
//!
//! # Example
//!
//! ```
//! use sprocket_mcp::drive::{
//!     chain::ChainSpec,
//!     geometry::{center_distance, chain_length_in_pitches},
//!     rounding::nearest_practical_length,
//!     solver::solve_for_one_sprocket,
//! };
//!
//! let chain = ChainSpec::from_ansi("25").unwrap();
//!
//! // How many links does a 15T/25T drive need at 3.371"?
//! let exact = chain_length_in_pitches(3.371, chain.pitch(), 15, 25).unwrap();
//! let links = nearest_practical_length(exact);
//! assert_eq!(links, 48.0);
//!
//! // Where do the shafts end up with that chain?
//! let distance = center_distance(chain.pitch(), links, 15, 25).unwrap();
//! assert!(distance > 3.371);
//!
//! // Which driven sprocket suits an 11T driver at exactly 3.5"?
//! let best = solve_for_one_sprocket(3.5, chain.pitch(), 11, 18, 36).unwrap();
//! assert_eq!(best.teeth, 24);
//! ```

pub mod chain;
pub mod error;
pub mod geometry;
pub mod rounding;
pub mod solver;

pub use chain::{ChainSpec, SprocketPair};
pub use error::{DriveError, DriveResult};
pub use geometry::{center_distance, chain_length_in_pitches, fit_chain, ChainFit};
pub use rounding::nearest_practical_length;
pub use solver::{
    scan_sprocket_candidates, solve_for_both_sprockets, solve_for_one_sprocket,
    SprocketCandidate, SprocketSolution,
};
