//! One suspendable run of a compiled program

use crate::config::RuntimeOptions;
use crate::interpreter::executor::{
    global_scope, run_until_done, ConsoleLine, Control, ExecutionLimits, Step, Stmt, Val,
    WatchEntry, VM,
};
use std::rc::Rc;
use uuid::Uuid;

/// Outcome of resuming an execution
#[derive(Debug, Clone, PartialEq)]
pub enum Resumption {
    /// Paused at a checkpoint, which produced this value
    Suspended(Val),
    /// Ran to completion with this result (normally the footer's record)
    Returned(Val),
    /// A fault escaped the program, e.g. after it was aborted for exceeding
    /// its step budget
    Threw(Val),
}

/// Execution state of one program instance
///
/// Owns its interpreter, globals and output buffer; nothing is shared with
/// other executions of the same program.
#[derive(Debug)]
pub struct Execution {
    id: Uuid,
    vm: VM,
    limits: ExecutionLimits,
    finished: bool,
}

impl Execution {
    pub(crate) fn new(body: Rc<Stmt>, options: &RuntimeOptions) -> Self {
        let watch: Rc<[WatchEntry]> = options
            .watch
            .iter()
            .map(|expression| WatchEntry::new(expression.as_str()))
            .collect();
        Self {
            id: Uuid::new_v4(),
            vm: VM::new(body, &global_scope(), watch, options.limits),
            limits: options.limits,
            finished: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run until the next checkpoint or the end of the program
    ///
    /// Returns `None` once the execution has finished.
    pub fn resume(&mut self) -> Option<Resumption> {
        if self.finished {
            return None;
        }
        if matches!(self.vm.control, Control::Suspend(_)) {
            self.vm.control = Control::None;
        }

        if run_until_done(&mut self.vm) == Step::Yield {
            if let Control::Suspend(value) = &self.vm.control {
                return Some(Resumption::Suspended(value.clone()));
            }
        }

        self.finished = true;
        Some(match std::mem::replace(&mut self.vm.control, Control::None) {
            Control::Throw(error) => Resumption::Threw(error),
            Control::Return(value) => Resumption::Returned(value),
            _ => Resumption::Returned(Val::Undefined),
        })
    }

    /// Console output produced since the last call
    pub fn take_output(&mut self) -> Vec<ConsoleLine> {
        self.vm.take_output()
    }
}
