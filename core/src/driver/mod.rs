//! # Step Driver
//!
//! Owns one compiled program and at most one live execution of it.
//!
//! ```text
//! Uninitialized --advance--> Running --end/error record--> Done
//!       ^                       |
//!       +---- reset/configure --+
//! ```
//!
//! The execution is created lazily on the first `advance`, bound to the
//! options current at that moment. `configure` and `reset` discard it so the
//! next `advance` starts over from the start record.
//!
//! Faults never escape `advance` as errors: a program that throws produces a
//! terminal error record, and anything that goes wrong outside the program's
//! own handler is synthesized into one.


use crate::compiler::{CompiledProgram, Execution, Resumption};
use crate::config::{OptionsPatch, RuntimeOptions};
use crate::errors::{Result, UsageFault};
use crate::interpreter::executor::{ExecutionLimits, Val};
use crate::normalize::fault_payload;
use crate::step::{EvaluationCapability, StepRecord};
use std::future::Future;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`StepDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No execution yet; the next `advance` creates one
    Uninitialized,
    Running,
    /// A terminal record was produced; `advance` returns `None` until reset
    Done,
}

#[derive(Debug)]
pub struct StepDriver {
    program: CompiledProgram,
    options: RuntimeOptions,
    instance: Option<Execution>,
    evaluator: Option<EvaluationCapability>,
    done: bool,
    last_index: Option<u32>,
}

impl StepDriver {
    /// Compile `source` and hold it ready for stepping
    pub fn new(source: &str, options: RuntimeOptions) -> Result<Self> {
        check_limits(options.limits)?;
        let program = CompiledProgram::compile(source)?;
        info!(fingerprint = %program.fingerprint(), "driver ready");
        Ok(Self {
            program,
            options,
            instance: None,
            evaluator: None,
            done: false,
            last_index: None,
        })
    }

    /// Replace the program, and the options when given
    ///
    /// On a compile fault the driver keeps its previous program and state.
    pub fn reset(&mut self, source: &str, options: Option<RuntimeOptions>) -> Result<()> {
        if let Some(options) = &options {
            check_limits(options.limits)?;
        }
        let program = CompiledProgram::compile(source)?;
        info!(
            previous = %self.program.fingerprint(),
            fingerprint = %program.fingerprint(),
            "driver reset"
        );
        self.program = program;
        if let Some(options) = options {
            self.options = options;
        }
        self.discard();
        Ok(())
    }

    /// Merge `patch` into the options; takes effect from the next execution
    ///
    /// The program is not recompiled, but the live execution is dropped.
    pub fn configure(&mut self, patch: OptionsPatch) -> std::result::Result<(), UsageFault> {
        if let Some(limits) = patch.limits {
            check_limits(limits)?;
        }
        self.options.apply(patch);
        debug!(watch = ?self.options.watch, "driver reconfigured");
        self.discard();
        Ok(())
    }

    /// Produce the next step record, or `None` once the execution is done
    pub fn advance(&mut self) -> Option<StepRecord> {
        if self.done {
            return None;
        }
        let index = self.next_index();
        let (line, column) = self.program.end_position();
        let instance = self
            .instance
            .get_or_insert_with(|| self.program.instantiate(&self.options));
        let limits = instance.limits();

        let mut record = loop {
            let Some(resumption) = instance.resume() else {
                break StepRecord::early_end(index, line, column);
            };
            match resumption {
                Resumption::Suspended(value) => match StepRecord::from_value(&value, limits) {
                    Some(record) => break record,
                    None => debug!(value = %value.inspect(), "skipping non-record suspension"),
                },
                Resumption::Returned(value) => {
                    break match StepRecord::from_value(&value, limits) {
                        Some(record) if record.kind.is_terminal() => record,
                        // A top-level `return` skipped the footer
                        _ => StepRecord::early_end(index, line, column),
                    }
                }
                Resumption::Threw(thrown) => {
                    warn!(error = %thrown.inspect(), "fault escaped the program");
                    break StepRecord::synthesized_error(index, line, column, fault_payload(&thrown));
                }
            }
        };

        record.output = instance.take_output();
        debug!(
            execution_id = %instance.id(),
            index = record.index,
            kind = ?record.kind,
            "step"
        );
        if let Some(evaluate) = &record.evaluate {
            self.evaluator = Some(evaluate.clone());
        }
        if record.kind.is_terminal() {
            self.done = true;
        }
        self.last_index = Some(record.index);
        Some(record)
    }

    /// Evaluate `expression` in the scope of the most recent checkpoint
    pub fn evaluate_expression(&self, expression: &str) -> Result<Val> {
        let evaluator = self
            .evaluator
            .as_ref()
            .ok_or(UsageFault::NoEvaluationContext)?;
        Ok(evaluator.evaluate(expression)?)
    }

    /// Advance until done, awaiting `on_step` for every record in order
    pub async fn run_to_completion<F, Fut>(&mut self, mut on_step: F)
    where
        F: FnMut(StepRecord) -> Fut,
        Fut: Future<Output = ()>,
    {
        while let Some(record) = self.advance() {
            on_step(record).await;
        }
    }

    /// Remaining records of the current execution
    pub fn steps(&mut self) -> impl Iterator<Item = StepRecord> + '_ {
        std::iter::from_fn(move || self.advance())
    }

    /// Instrumented body of the current source, recomputed on every call
    pub fn instrumented_source(&self) -> String {
        crate::instrument::instrument_source(self.program.source())
    }

    pub fn source(&self) -> &str {
        self.program.source()
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    pub fn state(&self) -> DriverState {
        if self.done {
            DriverState::Done
        } else if self.instance.is_some() {
            DriverState::Running
        } else {
            DriverState::Uninitialized
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn discard(&mut self) {
        self.instance = None;
        self.evaluator = None;
        self.done = false;
        self.last_index = None;
    }

    fn next_index(&self) -> u32 {
        self.last_index.map_or(0, |index| index + 1)
    }
}

fn check_limits(limits: ExecutionLimits) -> std::result::Result<(), UsageFault> {
    if limits.max_frames == 0 || limits.max_ticks == 0 {
        return Err(UsageFault::InvalidArgument(
            "execution limits must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
