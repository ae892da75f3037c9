//! Source instrumentation
//!
//! Rewrites program text so that it suspends after every statement. The
//! result is the body of the resumable program: a header opening a `try`
//! and emitting the start checkpoint, the user text with a checkpoint after
//! each statement boundary, and a footer producing the end or error record.
//!
//! Checkpoints are placed on the same line as the terminator they follow, so
//! a user line `n` is instrumented line `n + HEADER_LINES`.

pub mod scanner;

#[cfg(test)]
mod tests;

use crate::intrinsics::{
    CAUGHT_ERROR, ERROR_WATCH, EVALUATE, FINAL_WATCH, NORMALIZE_ERROR, STEP_COUNTER, WATCH,
};
use scanner::{Context, Scanner, Segment, Statement};

/// Lines the header adds before the user text
pub const HEADER_LINES: usize = 2;

/// Record kinds as they appear in emitted checkpoints
pub const KIND_START: &str = "start";
pub const KIND_STATEMENT: &str = "statement";
pub const KIND_END: &str = "end";
pub const KIND_ERROR: &str = "error";

/// Instrument `source` into a resumable program body
pub fn instrument_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 2 + 512);
    out.push_str(&header());

    let mut scanner = Scanner::new(source);
    while let Some(segment) = scanner.next() {
        match segment {
            Segment::Code(text) | Segment::LineComment(text) | Segment::BlockComment(text) => {
                out.push_str(text)
            }
            Segment::Boundary(statement) => out.push_str(&checkpoint(&statement)),
            Segment::Trailing(statement) => {
                if scanner.context() == Context::LineComment {
                    out.push('\n');
                }
                out.push(';');
                out.push_str(&checkpoint(&statement));
            }
        }
    }

    let (line, column) = scanner.position();
    out.push_str(&footer(line, column));
    out
}

/// Remove `//` comments, keeping their line breaks; quoted text is untouched
pub fn strip_line_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for segment in Scanner::new(source) {
        match segment {
            Segment::Code(text) | Segment::BlockComment(text) => out.push_str(text),
            Segment::LineComment(_) | Segment::Boundary(_) | Segment::Trailing(_) => {}
        }
    }
    out
}

/// Line and column just past the end of `source`, as end records report it
pub fn end_position(source: &str) -> (u32, u32) {
    let mut scanner = Scanner::new(source);
    scanner.by_ref().for_each(drop);
    scanner.position()
}

/* ===================== Emitted Code ===================== */

fn header() -> String {
    format!(
        "let {step} = 0; try {{\n{start}\n",
        step = STEP_COUNTER,
        start = record(KIND_START, STEP_COUNTER, 1, 1, "\"\"", &format!("{}()", WATCH)),
    )
}

fn checkpoint(statement: &Statement) -> String {
    // A JSON string is also a valid script string literal
    let code = serde_json::to_string(&statement.code).unwrap_or_else(|_| "\"\"".to_string());
    record(
        KIND_STATEMENT,
        &format!("++{}", STEP_COUNTER),
        statement.line,
        statement.column,
        &code,
        &format!("{}()", WATCH),
    )
}

fn record(kind: &str, index: &str, line: u32, column: u32, code: &str, watch: &str) -> String {
    format!(
        "yield {{ kind: \"{kind}\", index: {index}, line: {line}, column: {column}, code: {code}, evaluate: {evaluate}, watch: {watch} }};",
        evaluate = EVALUATE,
    )
}

fn footer(line: u32, column: u32) -> String {
    format!(
        "\nconst {final_watch} = {watch}();\n\
         return {{ kind: \"{end}\", index: ++{step}, line: {line}, column: {column}, code: \"\", evaluate: {evaluate}, watch: {final_watch} }};\n\
         }} catch ({error}) {{\n\
         const {error_watch} = {watch}();\n\
         return {{ kind: \"{kind_error}\", index: ++{step}, line: {line}, column: {column}, code: \"\", error: {normalize}({error}), watch: {error_watch} }};\n\
         }}\n",
        final_watch = FINAL_WATCH,
        error_watch = ERROR_WATCH,
        watch = WATCH,
        end = KIND_END,
        kind_error = KIND_ERROR,
        step = STEP_COUNTER,
        evaluate = EVALUATE,
        error = CAUGHT_ERROR,
        normalize = NORMALIZE_ERROR,
    )
}
