//! Consolidated tests for the api module.

mod weight_overrides;
