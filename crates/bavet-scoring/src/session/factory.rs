use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bavet_config::SessionConfig;
use bavet_core::{BavetError, ConstraintRef, Fact, ParseableScore, Result};
use tracing::debug;

use super::plan::{compile, SessionPlan};
use super::Session;
use crate::api::weight_overrides::ConstraintWeightOverrides;
use crate::stream::{ConstraintDef, ConstraintFactory, StreamDef};

/// Validated constraint definitions plus configuration, ready to build
/// sessions.
///
/// Each [`build_session`](Self::build_session) call resolves weights
/// (definition default, then the configuration's `constraint_weights`, then
/// the caller's overrides), compiles a fresh plan and instantiates a session
/// from it.
///
/// # Example
///
/// ```
/// use bavet_config::SessionConfig;
/// use bavet_core::{ConstraintRef, SimpleScore};
/// use bavet_scoring::api::weight_overrides::ConstraintWeightOverrides;
/// use bavet_scoring::session::SessionFactory;
/// use bavet_scoring::stream::{ConstraintDef, ConstraintFactory};
/// use bavet_test::{nqueens, Class};
///
/// let mut factory = ConstraintFactory::new();
/// let queens = factory.for_each(Class::Queen);
/// let constraints = vec![ConstraintDef::reward(
///     ConstraintRef::new("", "Placed queen"),
///     queens,
///     SimpleScore::of(1),
/// )];
///
/// let sessions = SessionFactory::new(factory, constraints, SessionConfig::default()).unwrap();
/// let mut session = sessions
///     .build_session(&ConstraintWeightOverrides::new())
///     .unwrap();
///
/// session.insert(nqueens::queen(0, 0, 3)).unwrap();
/// session.insert(nqueens::unassigned_queen(1, 1)).unwrap();
/// assert_eq!(session.settle().unwrap(), SimpleScore::of(1));
/// ```
pub struct SessionFactory<F: Fact, Sc: ParseableScore> {
    streams: Vec<StreamDef<F>>,
    constraints: Vec<ConstraintDef<F, Sc>>,
    config: SessionConfig,
    configured_weights: ConstraintWeightOverrides<Sc>,
}

impl<F: Fact, Sc: ParseableScore> SessionFactory<F, Sc> {
    /// Validates the definitions and the configured weights.
    ///
    /// Fails with [`BavetError::Config`] when a constraint scores a stream of
    /// another factory, two constraints share a full name, or a configured
    /// weight is unparseable or names no constraint.
    pub fn new(
        factory: ConstraintFactory<F>,
        constraints: Vec<ConstraintDef<F, Sc>>,
        config: SessionConfig,
    ) -> Result<Self> {
        let streams = factory.streams;
        let mut names = HashSet::new();
        for constraint in &constraints {
            let name = constraint.constraint_ref.full_name();
            if constraint.stream.index() >= streams.len() {
                return Err(BavetError::config(format!(
                    "constraint '{}' scores {:?}, which its factory does not define",
                    name, constraint.stream
                )));
            }
            if !names.insert(name.clone()) {
                return Err(BavetError::config(format!(
                    "constraint '{}' is defined twice",
                    name
                )));
            }
        }

        let configured_weights = ConstraintWeightOverrides::from_config(&config)
            .map_err(|e| BavetError::config(e.to_string()))?;
        let refs: Vec<ConstraintRef> = constraints
            .iter()
            .map(|c| c.constraint_ref.clone())
            .collect();
        configured_weights.validate(&refs)?;

        debug!(
            event = "session_factory_created",
            streams = streams.len(),
            constraints = constraints.len(),
            policy = ?config.constraint_match_policy,
            environment_mode = ?config.environment_mode,
        );

        Ok(Self {
            streams,
            constraints,
            config,
            configured_weights,
        })
    }

    /// Constraint identities in definition order.
    pub fn constraint_refs(&self) -> Vec<&ConstraintRef> {
        self.constraints.iter().map(|c| &c.constraint_ref).collect()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Compiles the network for the given overrides without instantiating it.
    ///
    /// Overrides naming no constraint fail with [`BavetError::Config`].
    pub fn compile(
        &self,
        overrides: &ConstraintWeightOverrides<Sc>,
    ) -> Result<Arc<SessionPlan<F, Sc>>> {
        let weights = self.configured_weights.clone().merged_with(overrides);
        let plan = compile(
            &self.streams,
            &self.constraints,
            &weights,
            self.config.constraint_match_policy,
            self.config.environment_mode,
        )?;
        Ok(Arc::new(plan))
    }

    /// Builds an empty session.
    pub fn build_session(
        &self,
        overrides: &ConstraintWeightOverrides<Sc>,
    ) -> Result<Session<F, Sc>> {
        Ok(Session::new(self.compile(overrides)?))
    }
}

impl<F: Fact, Sc: ParseableScore> fmt::Debug for SessionFactory<F, Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("streams", &self.streams.len())
            .field("constraints", &self.constraint_refs())
            .field("config", &self.config)
            .finish()
    }
}
