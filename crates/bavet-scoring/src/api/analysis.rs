//! Score analysis types for detailed constraint tracking.
//!
//! This module provides types for explaining a settled score: which matches
//! each constraint has, why they matched, and which facts are to blame.
//! They are assembled from the score inliner's ledger, so their detail
//! depends on the session's constraint match policy.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use bavet_core::{ConstraintRef, Score};

/// Justification for why a constraint matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintJustification<F> {
    /// Facts involved in the match.
    pub facts: Vec<F>,
    /// Human-readable description of why the constraint matched.
    pub description: String,
}

impl<F: Debug> ConstraintJustification<F> {
    /// Creates a justification from facts, auto-generating the description.
    pub fn new(facts: Vec<F>) -> Self {
        let description = if facts.is_empty() {
            "No facts".to_string()
        } else {
            facts
                .iter()
                .map(|f| format!("{:?}", f))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self { facts, description }
    }
}

impl<F> ConstraintJustification<F> {
    /// Creates a justification with a custom description.
    pub fn with_description(facts: Vec<F>, description: impl Into<String>) -> Self {
        Self {
            facts,
            description: description.into(),
        }
    }
}

/// One live constraint match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintMatch<F, Sc: Score> {
    /// Reference to the constraint that matched.
    pub constraint_ref: ConstraintRef,
    /// Score impact of this match.
    pub score: Sc,
    /// Present when justifications are enabled.
    pub justification: Option<ConstraintJustification<F>>,
    /// Facts to blame for this match; empty unless justifications are enabled.
    pub indicted: Vec<F>,
}

/// Per-constraint breakdown in a score explanation.
#[derive(Debug, Clone)]
pub struct ConstraintAnalysis<F, Sc: Score> {
    /// Constraint reference.
    pub constraint_ref: ConstraintRef,
    /// Constraint weight (score per unit of match weight).
    pub weight: Sc,
    /// Total score from this constraint.
    pub score: Sc,
    /// Number of live matches, known even when matches are not recorded.
    pub match_count: usize,
    /// Recorded matches; empty when constraint matches are disabled.
    pub matches: Vec<ConstraintMatch<F, Sc>>,
    /// Whether the weight has a hard component.
    pub is_hard: bool,
}

impl<F, Sc: Score> ConstraintAnalysis<F, Sc> {
    /// Returns the number of matches.
    pub fn match_count(&self) -> usize {
        self.match_count
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.constraint_ref.name
    }
}

/// Complete score explanation with per-constraint breakdown.
#[derive(Debug, Clone)]
pub struct ScoreExplanation<F, Sc: Score> {
    /// The total score.
    pub score: Sc,
    /// Per-constraint breakdown, in constraint definition order.
    pub constraint_analyses: Vec<ConstraintAnalysis<F, Sc>>,
}

impl<F, Sc: Score> ScoreExplanation<F, Sc> {
    /// Returns the total match count across all constraints.
    pub fn total_match_count(&self) -> usize {
        self.constraint_analyses.iter().map(|a| a.match_count()).sum()
    }

    /// Returns constraints with non-zero scores.
    pub fn non_zero_constraints(&self) -> Vec<&ConstraintAnalysis<F, Sc>> {
        self.constraint_analyses
            .iter()
            .filter(|a| !a.score.is_zero())
            .collect()
    }

    /// Returns all recorded matches across all constraints.
    pub fn all_matches(&self) -> Vec<&ConstraintMatch<F, Sc>> {
        self.constraint_analyses
            .iter()
            .flat_map(|a| &a.matches)
            .collect()
    }

    /// Looks up a constraint by short or fully qualified name.
    pub fn get(&self, name: &str) -> Option<&ConstraintAnalysis<F, Sc>> {
        self.constraint_analyses
            .iter()
            .find(|a| a.constraint_ref.matches_name(name))
    }
}

/// Analysis of how a single fact impacts the score.
#[derive(Debug, Clone)]
pub struct Indictment<F, Sc: Score> {
    /// The fact being analyzed.
    pub fact: F,
    /// Total score impact of matches indicting this fact.
    pub score: Sc,
    /// Matches indicting this fact, grouped by constraint.
    pub constraint_matches: HashMap<ConstraintRef, Vec<ConstraintMatch<F, Sc>>>,
}

impl<F: Clone, Sc: Score> Indictment<F, Sc> {
    /// Creates an empty indictment for a fact.
    pub fn new(fact: F) -> Self {
        Self {
            fact,
            score: Sc::zero(),
            constraint_matches: HashMap::new(),
        }
    }

    /// Adds a match to this indictment.
    pub fn add_match(&mut self, constraint_match: ConstraintMatch<F, Sc>) {
        self.score = self.score + constraint_match.score;
        self.constraint_matches
            .entry(constraint_match.constraint_ref.clone())
            .or_default()
            .push(constraint_match);
    }

    /// Returns the total number of matches.
    pub fn match_count(&self) -> usize {
        self.constraint_matches.values().map(Vec::len).sum()
    }

    /// Returns the constraint refs for all matched constraints.
    pub fn violated_constraints(&self) -> Vec<&ConstraintRef> {
        self.constraint_matches.keys().collect()
    }

    /// Returns the number of distinct constraints matched.
    pub fn constraint_count(&self) -> usize {
        self.constraint_matches.len()
    }
}

/// Indictments keyed by fact.
#[derive(Debug, Clone)]
pub struct IndictmentMap<F, Sc: Score> {
    pub indictments: HashMap<F, Indictment<F, Sc>>,
}

impl<F, Sc> IndictmentMap<F, Sc>
where
    F: Clone + Eq + Hash,
    Sc: Score,
{
    /// Creates an empty indictment map.
    pub fn new() -> Self {
        Self {
            indictments: HashMap::new(),
        }
    }

    /// Builds an indictment map from recorded matches.
    ///
    /// A fact indicted twice by the same match is counted once.
    pub fn from_matches(matches: impl IntoIterator<Item = ConstraintMatch<F, Sc>>) -> Self {
        let mut map = Self::new();
        for m in matches {
            let mut seen: Vec<&F> = Vec::with_capacity(m.indicted.len());
            for fact in &m.indicted {
                if seen.contains(&fact) {
                    continue;
                }
                seen.push(fact);
                map.indictments
                    .entry(fact.clone())
                    .or_insert_with(|| Indictment::new(fact.clone()))
                    .add_match(m.clone());
            }
        }
        map
    }

    /// Gets the indictment for a specific fact.
    pub fn get(&self, fact: &F) -> Option<&Indictment<F, Sc>> {
        self.indictments.get(fact)
    }

    /// Returns all indicted facts.
    pub fn facts(&self) -> impl Iterator<Item = &F> {
        self.indictments.keys()
    }

    /// Returns facts sorted by worst score impact first.
    pub fn worst_facts(&self) -> Vec<&F> {
        let mut facts: Vec<_> = self.indictments.keys().collect();
        facts.sort_by(|a, b| self.indictments[*a].score.cmp(&self.indictments[*b].score));
        facts
    }

    /// Returns the number of indicted facts.
    pub fn len(&self) -> usize {
        self.indictments.len()
    }

    /// Returns true if no fact is indicted.
    pub fn is_empty(&self) -> bool {
        self.indictments.is_empty()
    }
}

impl<F, Sc> Default for IndictmentMap<F, Sc>
where
    F: Clone + Eq + Hash,
    Sc: Score,
{
    fn default() -> Self {
        Self::new()
    }
}
