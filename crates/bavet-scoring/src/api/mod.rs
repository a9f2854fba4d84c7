//! Public API surface around the scoring network: analysis and weight overrides.

pub mod analysis;
pub mod weight_overrides;

#[cfg(test)]
mod analysis_tests;
#[cfg(test)]
mod tests;
