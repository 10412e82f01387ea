use crate::assert_contains_in_order;
use crate::common::{Session, FIRST_STATE, PROGRAM, SECOND_STATE};
use pathstalker::debugger::engine::{ExecutionScheduler, InstructionId, Marker, TrapTable};
use pathstalker::playground::RunOutcome;

#[test]
fn test_breakpoint_hit() {
    let mut session = Session::new(PROGRAM, &["break test.c:6", "continue", "info break"]);
    assert_eq!(session.run(), RunOutcome::Halted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Breakpoint 1 at test.c:6",
            "Continuing execution",
            "Breakpoint 1, at test.c:6",
            "Num      Location\n1        test.c:6",
        ]
    );
    assert_eq!(session.engine.marker(InstructionId(4)), Marker::Stop(1));

    let current = session.engine.current_state().unwrap();
    assert_eq!(current.to_string(), FIRST_STATE);
    assert_eq!(session.engine.snapshot(current).unwrap().pc, InstructionId(4));
}

#[test]
fn test_function_breakpoint() {
    let mut session = Session::new(PROGRAM, &["break helper", "c"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(output, ["Breakpoint 1 at util.c:21", "Breakpoint 1, at util.c:21"]);
    assert_eq!(session.engine.marker(InstructionId(10)), Marker::Stop(1));
}

#[test]
fn test_breakpoint_resolution_errors() {
    let mut session = Session::new(
        PROGRAM,
        &[
            "break nosuch.c:1",
            "break test.c:99",
            "break nofunc",
            "kill util.c:22",
            "info killpoints",
        ],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "no source file named: nosuch.c",
            "no corresponding instruction for line 99 in test.c",
            "no function named nofunc",
            // failed attempts never consume a number
            "Killpoint 1 at util.c:22",
            "Num      Location\n1        util.c:22",
        ]
    );
}

#[test]
fn test_duplicate_breakpoint() {
    let mut session = Session::new(
        PROGRAM,
        &["break test.c:6", "kill test.c:6", "info killpoints", "b test.c:5"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Breakpoint 1 at test.c:6",
            "Killpoint at test.c:6 already exists",
            "No killpoints",
            "Breakpoint 2 at test.c:5",
        ]
    );
    assert_eq!(session.engine.marker(InstructionId(4)), Marker::Stop(1));
    assert_eq!(session.engine.marker(InstructionId(3)), Marker::Stop(2));
}

#[test]
fn test_killpoint_terminates_state() {
    let mut session = Session::new(PROGRAM, &["kill test.c:10", "continue"]);
    assert_eq!(session.run(), RunOutcome::Exhausted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Killpoint 1 at test.c:10",
            &format!("Continuing execution from state {SECOND_STATE}"),
            "Killpoint 1, at test.c:10",
            &format!("Terminating current state {SECOND_STATE}"),
        ]
    );
    // killed state never reaches its error
    assert!(!output.contains("division by zero"));
    assert_eq!(session.engine.statistics().terminated_states, 2);
}

#[test]
fn test_delete() {
    let mut session = Session::new(
        PROGRAM,
        &[
            "break test.c:6",
            "kill test.c:10",
            "break util.c:21",
            "delete 7",
            "delete 1 7",
            "info break",
            "delete",
            "info killpoints",
        ],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Deleted 0 entries\nno breakpoint(s)/killpoint(s) with number(s): [7]",
            "Deleted 1 entries\nno breakpoint(s)/killpoint(s) with number(s): [7]",
            "Num      Location\n3        util.c:21",
            "Deleted all breakpoints and killpoints (2)",
            "No killpoints",
        ]
    );
    for id in [4, 7, 10] {
        assert_eq!(session.engine.marker(InstructionId(id)), Marker::None);
    }
}

#[test]
fn test_run_removes_breakpoints_only() {
    let mut session = Session::new(PROGRAM, &["break test.c:6", "kill test.c:10", "run"]);
    assert_eq!(session.run(), RunOutcome::Exhausted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Running until the end of the program, 1 breakpoint(s) removed",
            "Killpoint 2, at test.c:10",
        ]
    );
    assert!(!output.contains("Breakpoint 1, at"));
    assert_eq!(session.engine.marker(InstructionId(4)), Marker::None);
    assert_eq!(session.engine.marker(InstructionId(7)), Marker::Kill(2));
}
