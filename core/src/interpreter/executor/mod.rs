//! # Executor - Resumable Stack-Driven Interpreter
//!
//! Runs parsed scripts one frame at a time so that execution can stop at any
//! checkpoint and continue later from exactly the same state.
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: All state in `frames: Vec<Frame>` plus an
//!    operand stack, no recursion on the Rust stack
//! 2. **Statement-level execution**: Each frame carries a phase tracking micro-steps
//! 3. **Centralized control flow**: `Control` manages break/continue/return/throw/suspend
//! 4. **Pure executor**: No I/O, no async - just runs until suspend or complete
//!
//! Checkpoints are `yield` statements. Reaching one evaluates its record and
//! suspends with `Control::Suspend(record)`; the owner clears the control and
//! calls `run_until_done` again to resume.

pub mod calls;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod operators;
pub mod properties;
pub mod scope;
pub mod statements;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use exec_loop::{run_until_done, step};
pub use expressions::EvalResult;
pub use scope::{Env, Scope};
pub use stdlib::{global_scope, ConsoleLevel, ConsoleLine};
pub use types::{Control, Expr, Stmt, Val, WatchEntry};
pub use vm::{ExecutionLimits, Step, VM};
