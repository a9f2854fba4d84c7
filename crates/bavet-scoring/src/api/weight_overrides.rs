// Runtime constraint weight configuration.
//
// Allows adjusting constraint weights per session without redefining the
// constraints. A weight equal to the zero score disables its constraint:
// the session factory prunes it before building any node.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use bavet_config::{ConfigError, SessionConfig};
use bavet_core::{BavetError, ConstraintRef, ParseableScore, Result, Score};

// Holds runtime overrides for constraint weights, keyed by constraint name.
//
// Names may be short ("Room conflict") or fully qualified
// ("timetable/Room conflict"); both resolve against `ConstraintRef::matches_name`.
#[derive(Clone)]
pub struct ConstraintWeightOverrides<Sc: Score> {
    weights: HashMap<String, Sc>,
}

impl<Sc: Score> Debug for ConstraintWeightOverrides<Sc> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintWeightOverrides")
            .field("count", &self.weights.len())
            .finish()
    }
}

impl<Sc: Score> Default for ConstraintWeightOverrides<Sc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sc: Score> ConstraintWeightOverrides<Sc> {
    // Creates an empty overrides container.
    pub fn new() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    // Creates overrides from an iterator of (name, weight) pairs.
    pub fn from_pairs<I, N>(iter: I) -> Self
    where
        I: IntoIterator<Item = (N, Sc)>,
        N: Into<String>,
    {
        let weights = iter.into_iter().map(|(n, w)| (n.into(), w)).collect();
        Self { weights }
    }

    // Sets the weight for a constraint.
    pub fn put<N: Into<String>>(&mut self, name: N, weight: Sc) {
        self.weights.insert(name.into(), weight);
    }

    // Removes the override for a constraint.
    pub fn remove(&mut self, name: &str) -> Option<Sc> {
        self.weights.remove(name)
    }

    // Gets the overridden weight if present.
    pub fn get(&self, name: &str) -> Option<&Sc> {
        self.weights.get(name)
    }

    // Gets the overridden weight, or returns the default if not overridden.
    pub fn get_or_default(&self, name: &str, default: Sc) -> Sc {
        self.weights.get(name).copied().unwrap_or(default)
    }

    // Resolves the weight of a constraint by its short or full name.
    pub fn resolve(&self, constraint_ref: &ConstraintRef, default: Sc) -> Sc {
        self.weights
            .get(&constraint_ref.full_name())
            .or_else(|| self.weights.get(&constraint_ref.name))
            .copied()
            .unwrap_or(default)
    }

    // Fails on the first override naming no known constraint.
    pub fn validate(&self, known: &[ConstraintRef]) -> Result<()> {
        let mut names: Vec<&String> = self.weights.keys().collect();
        names.sort();
        for name in names {
            if !known.iter().any(|c| c.matches_name(name)) {
                return Err(BavetError::config(format!(
                    "constraint weight override for unknown constraint '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    // Returns true if this constraint has an override.
    pub fn contains(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    // Returns the number of overrides.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    // Returns true if there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    // Clears all overrides.
    pub fn clear(&mut self) {
        self.weights.clear();
    }

    // Layers `other` on top of these overrides; its entries win.
    pub fn merged_with(mut self, other: &ConstraintWeightOverrides<Sc>) -> Self {
        for (name, weight) in &other.weights {
            self.weights.insert(name.clone(), *weight);
        }
        self
    }

    // Creates an Arc-wrapped version for sharing across threads.
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl<Sc: ParseableScore> ConstraintWeightOverrides<Sc> {
    // Parses the `constraint_weights` table of a session configuration.
    pub fn from_config(config: &SessionConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self::from_pairs(config.parsed_weights::<Sc>()?))
    }
}

// Source of per-constraint weights consulted while building a session.
pub trait WeightProvider<Sc: Score>: Send + Sync {
    // Gets the weight for a constraint by name.
    fn weight(&self, name: &str) -> Option<Sc>;

    // Gets the weight or returns the default.
    fn weight_or_default(&self, name: &str, default: Sc) -> Sc {
        self.weight(name).unwrap_or(default)
    }
}

impl<Sc: Score> WeightProvider<Sc> for ConstraintWeightOverrides<Sc> {
    fn weight(&self, name: &str) -> Option<Sc> {
        self.get(name).copied()
    }
}

impl<Sc: Score> WeightProvider<Sc> for Arc<ConstraintWeightOverrides<Sc>> {
    fn weight(&self, name: &str) -> Option<Sc> {
        self.get(name).copied()
    }
}
