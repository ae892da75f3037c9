//! console.* and report(...)

use super::{value, ConsoleLevel, ConsoleLine};
use crate::interpreter::executor::expressions::EvalResult;
use crate::interpreter::executor::types::Val;
use crate::interpreter::executor::vm::VM;
use tracing::trace;

/// Append one line to the VM's output buffer
///
/// Arguments are joined with spaces: strings raw, other values inspected.
pub fn write(vm: &mut VM, level: ConsoleLevel, args: &[Val]) -> EvalResult {
    let text = args
        .iter()
        .map(Val::to_display)
        .collect::<Vec<_>>()
        .join(" ");
    trace!(?level, %text, "console output");
    vm.output.push(ConsoleLine { level, text });
    value(Val::Undefined)
}
