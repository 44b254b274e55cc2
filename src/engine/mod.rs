//! Execution engine for crmsync
//!
//! The engine orchestrates:
//! 1. Planning - Decide per primitive what a pass would change
//! 2. Executing - Run declared actions with parallelism across primitives

pub mod differ;
pub mod executor;

pub use executor::{ExecuteOptions, execute};
