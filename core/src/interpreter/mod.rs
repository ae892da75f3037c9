//! Script interpreter
//!
//! A resumable, stack-driven evaluator for the scripts being stepped.

pub mod executor;
