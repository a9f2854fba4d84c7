//! Incremental constraint matching and scoring for Bavet.
//!
//! This crate provides the scoring network and everything around it:
//! - A constraint stream builder (`ConstraintFactory`, `ConstraintDef`)
//! - Indexed joins, exists/not-exists, grouping with incremental collectors
//! - Layered propagation of inserts, updates and retracts (`Session`)
//! - Score inlining with optional match ledgers, explanations and indictments
//!
//! # Architecture
//!
//! Tuples live in a per-session generational arena and carry one scratch slot
//! per consuming node input. Every derived tuple is produced by exactly one
//! node and every change is reversed by a stored token (index keys, collector
//! undo, score impact), so a settled session depends only on its live facts.

// Stream descriptors store user functions as `Arc<dyn Fn>` aliases
#![allow(clippy::type_complexity)]

// Core modules
pub mod api;
pub mod collector;
pub mod index;
pub mod inliner;
pub mod session;
pub mod stream;
pub mod tuple;

mod node;

// ============================================================================
// Constraint Streams
// ============================================================================

pub use stream::joiner;
pub use stream::{key, ConstraintDef, ConstraintFactory, Joiner, StreamId};

// ============================================================================
// Sessions
// ============================================================================

pub use session::{
    FactHandle, NodeStatistics, Session, SessionFactory, SessionPlan, SessionStatistics,
};

// ============================================================================
// Collectors and Inliner
// ============================================================================

pub use collector::{Accumulator, Collector, SharedCollector, Undo};
pub use inliner::{ConstraintTotal, ScoreImpact, ScoreInliner, WeightedConstraint};

// ============================================================================
// Analysis (for score explanation)
// ============================================================================

pub use api::analysis::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, Indictment, IndictmentMap,
    ScoreExplanation,
};
pub use api::weight_overrides::{ConstraintWeightOverrides, WeightProvider};
