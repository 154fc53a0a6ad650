//! End-to-end tests: bytecode text in, console output out.


use crate::{buffer_console, scripted_console, EvalError, SharedConsole, Vm, VmError};

fn run_on(console: &SharedConsole, threads: usize, source: &str) -> Result<(), VmError> {
    let vm = Vm::builder().max_threads(threads).console(console.clone()).build();
    let result = vm.run_source(source, "test.bbvm");
    assert_eq!(vm.gate().active(), 0, "every background permit is returned");
    result.and(vm.shutdown().map_err(VmError::from))
}

/// Run serially; return the outcome and the printed text.
pub(super) fn run_program(source: &str) -> (Result<(), VmError>, String) {
    run_threaded(source, 0)
}

pub(super) fn run_threaded(source: &str, threads: usize) -> (Result<(), VmError>, String) {
    let console = buffer_console();
    let result = run_on(&console, threads, source);
    (result, console.output())
}

pub(super) fn run_with_input(source: &str, input: &[&str]) -> String {
    let console = scripted_console(input.iter().copied());
    run_on(&console, 0, source).unwrap();
    console.output()
}

/// Printed text of a program that must succeed.
pub(super) fn output(source: &str) -> String {
    let (result, out) = run_program(source);
    if let Err(error) = result {
        panic!("program failed: {error}\noutput so far:\n{out}");
    }
    out
}

/// Runtime error of a program that must fail while running.
pub(super) fn eval_error(source: &str) -> EvalError {
    match run_program(source).0 {
        Err(VmError::Eval(error)) => error,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}
