//! Names shared between the instrumenter, which emits them, and the parser and
//! runtime, which give them meaning.

/// Step counter declared by the instrumentation header
pub const STEP_COUNTER: &str = "__step";

/// Evaluates to the evaluation capability of the current scope
pub const EVALUATE: &str = "__evaluate";

/// `__watch()` evaluates to the watch snapshot of the current scope
pub const WATCH: &str = "__watch";

/// Native global turning any thrown value into a fault payload object
pub const NORMALIZE_ERROR: &str = "__normalizeError";

/// Binding of the caught fault in the footer's `catch`
pub const CAUGHT_ERROR: &str = "__error";

pub const FINAL_WATCH: &str = "__finalWatch";
pub const ERROR_WATCH: &str = "__errorWatch";
