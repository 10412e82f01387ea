use crate::assert_contains_in_order;
use crate::common::{Session, FIRST_STATE, PROGRAM};
use pathstalker::debugger::engine::{ExecutionScheduler, InstructionId, StateId};
use pathstalker::debugger::ExecutionMode;

#[test]
fn test_step_over_lines() {
    let mut session = Session::new(PROGRAM, &["step", "s"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            &format!("{FIRST_STATE} main at test.c:2"),
            &format!("{FIRST_STATE} main at test.c:3"),
            &format!("{FIRST_STATE} main at test.c:4"),
        ]
    );
    assert_eq!(session.controller.debugger().mode(), ExecutionMode::Stepping);
}

#[test]
fn test_step_skips_instructions_without_source() {
    let mut session = Session::new(PROGRAM, &["break util.c:21", "continue", "step", "info stack"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Breakpoint 1, at util.c:21",
            &format!("{FIRST_STATE} helper at util.c:22"),
            "stack dump:\n#0 in helper at util.c:22\n#1 in main at test.c:7",
        ]
    );

    let snapshot = session.engine.snapshot(StateId(0x5000_0000)).unwrap();
    assert_eq!(snapshot.pc, InstructionId(12));
    assert_eq!(snapshot.prev_pc, Some(InstructionId(11)));
}

#[test]
fn test_stepi_stops_everywhere() {
    let mut session = Session::new(
        PROGRAM,
        &["break util.c:21", "c", "stepi", "si", "info state"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Breakpoint 1, at util.c:21",
            // debug intrinsic has no source line
            "(no source information)",
            &format!("{FIRST_STATE} helper at util.c:22"),
            "LLVM:       ret",
        ]
    );
}

#[test]
fn test_free_run_resolves_forks() {
    let mut session = Session::new(PROGRAM, &["continue"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Execution branched from:",
            "Branch 1",
            "Branch 2",
            "Continuing execution from state @0x50000040",
            "Error: division by zero",
        ]
    );
    assert!(!output.contains("Select a state"));
    assert!(session.engine.states().is_empty());
}
