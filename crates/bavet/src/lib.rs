//! Bavet - incremental constraint matching and scoring in Rust
//!
//! Describe constraints once, then feed fact changes to a session and read
//! the score it keeps up to date.
//!
//! # Example
//!
//! ```rust
//! use bavet::prelude::*;
//! use bavet_test::{timetable, Class, Value};
//!
//! let mut factory = ConstraintFactory::new();
//! let lessons = factory.for_each_including_unassigned(Class::Lesson);
//! let unassigned = factory
//!     .filter(lessons, |t: &[Value]| !t[0].is_assigned())
//!     .unwrap();
//! let constraints = vec![ConstraintDef::penalize(
//!     ConstraintRef::new("timetable", "Unassigned lesson"),
//!     unassigned,
//!     HardSoftScore::ONE_SOFT,
//! )];
//!
//! let sessions = SessionFactory::new(factory, constraints, SessionConfig::default()).unwrap();
//! let mut session = sessions
//!     .build_session(&ConstraintWeightOverrides::new())
//!     .unwrap();
//!
//! let lesson = session.insert(timetable::lesson(0, 1, None, None)).unwrap();
//! assert_eq!(session.settle().unwrap(), HardSoftScore::of(0, -1));
//!
//! session
//!     .update(lesson, timetable::assigned_lesson(0, 1, 2, 3))
//!     .unwrap();
//! assert_eq!(session.settle().unwrap(), HardSoftScore::ZERO);
//! ```

// Score types and core vocabulary
pub use bavet_core::{
    BavetError, ConstraintRef, Fact, HardMediumSoftScore, HardSoftScore, ImpactType,
    ParseableScore, Result, Score, SimpleScore,
};

// Configuration
pub use bavet_config::{ConfigError, ConstraintMatchPolicy, EnvironmentMode, SessionConfig};

// Constraint stream API
pub use bavet_scoring::{collector, joiner, stream};
pub use bavet_scoring::{key, ConstraintDef, ConstraintFactory, StreamId};

// Sessions
pub use bavet_scoring::{
    ConstraintWeightOverrides, FactHandle, Session, SessionFactory, SessionStatistics,
};

// Score analysis
pub use bavet_scoring::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, ConstraintTotal, Indictment,
    IndictmentMap, ScoreExplanation,
};

#[cfg(feature = "console")]
pub mod console;

pub mod prelude {
    pub use super::collector::{
        compose, conditionally, count, count_distinct, load_balance, max, min, sum, to_list,
    };
    pub use super::stream::{joiner, key, ConstraintDef, ConstraintFactory};
    pub use super::{
        ConstraintMatchPolicy, ConstraintRef, ConstraintWeightOverrides, EnvironmentMode, Fact,
        HardMediumSoftScore, HardSoftScore, Score, Session, SessionConfig, SessionFactory,
        SimpleScore,
    };
}
