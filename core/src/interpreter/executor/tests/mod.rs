//! Tests for the executor
//!
//! Organized by feature area

mod helpers;

mod assign_tests;
mod eval_tests;
mod function_tests;
mod if_tests;
mod literal_tests;
mod suspend_tests;
mod watch_tests;
