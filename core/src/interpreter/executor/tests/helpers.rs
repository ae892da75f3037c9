//! Test helpers for executor tests
//!
//! Common utilities for parsing scripts and building VMs

use crate::interpreter::executor::{
    global_scope, run_until_done, Control, ExecutionLimits, Val, WatchEntry, VM,
};
use crate::parser::{self, semantic_validator, ScriptDef};

/// Parse source, validate, serialize/deserialize, and create a VM
///
/// This helper:
/// - Parses the script
/// - Validates the script semantically
/// - Serializes and deserializes the AST (to test round-trip compatibility)
/// - Creates a VM over a fresh global scope
pub fn build_vm_with(source: &str, watch: &[&str], limits: ExecutionLimits) -> VM {
    let script = parser::parse_program(source).expect("Parse script failed");
    let errors = semantic_validator::validate_script(&script);
    assert!(errors.is_empty(), "Script validation failed: {:?}", errors);
    let json = serde_json::to_string(&script).expect("Script serialization failed");
    let script: ScriptDef = serde_json::from_str(&json).expect("Script deserialization failed");

    let watch = watch.iter().map(|e| WatchEntry::new(*e)).collect();
    VM::new(script.body, &global_scope(), watch, limits)
}

pub fn build_vm(source: &str) -> VM {
    build_vm_with(source, &[], ExecutionLimits::default())
}

/// Build and run a script to its first suspension or completion
pub fn run(source: &str) -> VM {
    let mut vm = build_vm(source);
    run_until_done(&mut vm);
    vm
}

/// Run a script that must complete with `return value`
pub fn returned(source: &str) -> Val {
    let vm = run(source);
    let Control::Return(v) = vm.control else {
        unreachable!("Expected Control::Return, got {:?}", vm.control);
    };
    v
}

/// Run a script that must end with an uncaught error; returns (name, message)
pub fn thrown(source: &str) -> (String, String) {
    let vm = run(source);
    let Control::Throw(Val::Error(info)) = vm.control else {
        unreachable!("Expected Control::Throw with Error, got {:?}", vm.control);
    };
    (info.name.clone(), info.message.clone())
}

/// Property of a plain object value
pub fn field(v: &Val, key: &str) -> Val {
    let Val::Obj(map) = v else {
        unreachable!("Expected object, got {:?}", v);
    };
    let value = map.borrow().get(key).cloned();
    value.unwrap_or(Val::Undefined)
}

pub fn num(n: f64) -> Val {
    Val::Num(n)
}

pub fn s(text: &str) -> Val {
    Val::str(text)
}

pub fn list(items: Vec<Val>) -> Val {
    Val::list(items)
}
