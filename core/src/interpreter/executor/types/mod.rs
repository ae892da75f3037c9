//! Type definitions for the executor
//!
//! This module contains all the core types used by the executor:
//! - AST nodes (Stmt, Expr)
//! - Runtime values (Val)
//! - Control flow (Control, Frame, FrameKind)
//! - Phase enums for each frame kind

pub mod ast;
pub mod control;
pub mod phase;
pub mod values;

// Re-export all types for convenient access
pub use ast::{Expr, Stmt};
pub use control::{Control, Frame, FrameKind, IterMethod, WatchEntry};
pub use phase::*;
pub use values::{Closure, Val};
