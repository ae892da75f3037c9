pub mod cli;
pub mod compiler;
pub mod config;
pub mod driver;
pub mod errors;
pub mod instrument;
pub mod interpreter;
pub mod intrinsics;
pub mod normalize;
pub mod parser;
pub mod step;

// Re-export main types
pub use compiler::{CompiledProgram, Execution, Resumption};
pub use config::{Config, OptionsPatch, RuntimeOptions};
pub use driver::{DriverState, StepDriver};
pub use errors::{CompileFault, RuntimeFault, StepError, UsageFault};
pub use instrument::{instrument_source, strip_line_comments};
pub use interpreter::executor::{ConsoleLevel, ConsoleLine, ExecutionLimits, Val};
pub use normalize::WatchResult;
pub use step::{EvaluationCapability, StepKind, StepRecord};
