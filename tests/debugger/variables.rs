use crate::assert_contains_in_order;
use crate::common::{Session, FIRST_STATE, PROGRAM, SECOND_STATE};
use pathstalker::debugger::DebuggerOptions;

#[test]
fn test_read_variables() {
    let mut session = Session::new(
        PROGRAM,
        &["break test.c:7", "continue", "print y", "p x", "print nothere"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Breakpoint 1, at test.c:7",
            "Printing variable: y\ny = 5",
            "Printing variable: x\nx = (ReadLSB w32 0 x)",
            "unable to find variable nothere",
        ]
    );
}

#[test]
fn test_unreadable_variable_is_not_fatal() {
    // `x` is allocated but nothing is stored yet
    let mut session = Session::new(PROGRAM, &["stepi", "print x", "stepi"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "unable to access variable x: memory at",
            "is not initialized",
            &format!("{FIRST_STATE} main at test.c:4"),
        ]
    );
    assert!(!output.contains("fatal debugger error"));
}

#[test]
fn test_make_symbolic() {
    let mut session = Session::new(
        PROGRAM,
        &[
            "break test.c:7",
            "continue",
            "set y",
            "print y",
            "generate-input",
            "set nothere",
        ],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "y is now symbolic",
            "y = (ReadLSB w32 0 y)",
            "x (size 4): \\0x00\\0x00\\0x00\\0x00\ny (size 4): \\0x00\\0x00\\0x00\\0x00",
            "unable to find variable nothere",
        ]
    );
}

#[test]
fn test_shadowed_variable_in_sibling_block() {
    // both branches declare their own `y` in different blocks
    let mut session = Session::new(
        PROGRAM,
        &["break test.c:11", "continue", "print y"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(output, ["Breakpoint 1, at test.c:11", "y = 7"]);
}

#[test]
fn test_register_value() {
    let mut session = Session::new(PROGRAM, &["break util.c:22", "continue", "print tmp", "print y"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Breakpoint 1, at util.c:22",
            "tmp = 42",
            // callee frame does not see caller variables
            "unable to find variable y",
        ]
    );
}

#[test]
fn test_stop_on_error() {
    let mut session = Session::new(
        PROGRAM,
        &["toggle stop-on-error", "continue", "info state"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Execution will stop on errors",
            "Error: division by zero",
            &format!("{SECOND_STATE} main at test.c:11"),
            "LLVM:       error division by zero",
        ]
    );
}

#[test]
fn test_no_stop_on_error() {
    let options = DebuggerOptions {
        stop_on_error: true,
        ..Default::default()
    };
    let mut session = Session::with_options(
        PROGRAM,
        &["toggle stop-on-error", "continue"],
        options,
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        ["Execution will not stop on errors", "Error: division by zero"]
    );
    assert!(!output.contains(&format!("{SECOND_STATE} main at test.c:11")));
}
