//! Bavet Core - shared types for incremental constraint scoring
//!
//! This crate provides the vocabulary every other Bavet crate speaks:
//! - Score types for representing solution quality
//! - The [`Fact`] trait for values flowing through the scoring network
//! - Constraint identification and impact direction
//! - The error taxonomy of the engine

pub mod constraint;
pub mod error;
pub mod fact;
pub mod score;


pub use constraint::{ConstraintRef, ImpactType};
pub use error::{BavetError, Result};
pub use fact::Fact;
pub use score::{
    HardMediumSoftScore, HardSoftScore, ParseableScore, Score, ScoreLevel, ScoreParseError,
    SimpleScore,
};
