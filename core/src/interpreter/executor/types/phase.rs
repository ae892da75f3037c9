//! Execution phase enums for each frame kind
//!
//! Each statement type has its own Phase enum that tracks which execution
//! step it's currently at.

/// Execution phase for If statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum IfPhase {
    /// Evaluate the test
    Eval = 0,
    /// Test value is on the operand stack; pick a branch
    Branch = 1,
}

/// Execution phase for Expr statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum ExprPhase {
    Eval = 0,
    Discard = 1,
}

/// Execution phase for Declare statements (per declarator)
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum DeclarePhase {
    Init = 0,
    Bind = 1,
}

/// Execution phase for While statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum WhilePhase {
    /// Evaluate the loop test
    Test = 0,
    /// Test value is on the operand stack
    Check = 1,
}

/// Execution phase for do/while statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum DoWhilePhase {
    Body = 0,
    Test = 1,
    Check = 2,
}

/// Execution phase for `for(;;)` statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum ForPhase {
    Init = 0,
    Test = 1,
    Check = 2,
    /// Body finished (or continued): copy bindings, run the update
    Update = 3,
}

/// Execution phase for for-of / for-in statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum ForLoopPhase {
    /// Evaluate the iterable
    Eval = 0,
    /// Iterable is on the operand stack; snapshot its items
    Collect = 1,
    /// Bind the next item and run the body
    Next = 2,
}

/// Execution phase for Try statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum TryPhase {
    /// Executing the try block
    ExecuteTry = 0,
    /// Executing the catch block (error was caught)
    ExecuteCatch = 1,
    /// Executing the finally block, pending control restored afterwards
    ExecuteFinally = 2,
}

/// Execution phase for Return / Throw / Yield statements
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum ValuePhase {
    Eval = 0,
    /// Operand is on the stack
    Apply = 1,
}

/// Execution phase for watch snapshots
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum WatchPhase {
    /// Start evaluating the next entry
    Next = 0,
    /// Entry value is on the operand stack
    Record = 1,
}

/// Execution phase for array callback iteration
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum IteratePhase {
    /// Invoke the callback for the current item
    Invoke = 0,
    /// Callback result is on the operand stack
    Collect = 1,
}
