//! Score types for representing solution quality
//!
//! Scores are used to compare solutions and accumulate constraint impacts.
//! All score types are immutable `Copy` values with arithmetic operations.

#[macro_use]
mod macros;

mod hard_medium_soft;
mod hard_soft;
mod simple;
mod traits;


pub use hard_medium_soft::HardMediumSoftScore;
pub use hard_soft::HardSoftScore;
pub use simple::SimpleScore;
pub use traits::{ParseableScore, Score, ScoreParseError};

/// Score level representing different constraint priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreLevel {
    /// Hard constraints - must be satisfied for feasibility
    Hard,
    /// Medium constraints - secondary priority
    Medium,
    /// Soft constraints - optimization objectives
    Soft,
}
