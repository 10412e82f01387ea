use crate::assert_contains_in_order;
use crate::common::{Session, FIRST_STATE, PROGRAM, SECOND_STATE, UNSAT_PROGRAM};
use pathstalker::debugger::engine::{ExecutionScheduler, StateId};
use pathstalker::playground::RunOutcome;

/// Step up to the fork and keep the first state.
fn after_fork(tail: &[&'static str]) -> Vec<&'static str> {
    ["stepi", "stepi", "stepi", "1"]
        .iter()
        .chain(tail)
        .copied()
        .collect()
}

#[test]
fn test_info_states() {
    let mut session = Session::new(PROGRAM, &after_fork(&["info states", "info states -c"]));
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Total number of states: 2",
            &format!("current state --> \nAddress:    {FIRST_STATE}"),
            &format!("Address:    {SECOND_STATE}"),
            "Total number of states: 2",
            &format!("current state --> {FIRST_STATE} test.c:5"),
            &format!("{SECOND_STATE} test.c:10"),
        ]
    );
}

#[test]
fn test_switch_states() {
    let mut session = Session::new(
        PROGRAM,
        &after_fork(&[
            "state next",
            "state next",
            "state prev",
            "state 0x50000000",
            "state 50000040",
            "state zzz",
            "state 0x1234",
        ]),
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            &format!("Moved to state {SECOND_STATE}"),
            &format!("Moved to state {FIRST_STATE}"),
            &format!("Moved to state {SECOND_STATE}"),
            &format!("Moved to state {FIRST_STATE}"),
            &format!("Moved to state {SECOND_STATE}"),
            "please enter a valid address (hex number): zzz",
            "no execution state at address 0x1234",
        ]
    );
    assert_eq!(
        session.engine.current_state(),
        Some(StateId(0x5000_0040))
    );
}

#[test]
fn test_terminate() {
    let mut session = Session::new(PROGRAM, &after_fork(&["terminate", "terminate"]));
    assert_eq!(session.run(), RunOutcome::Exhausted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            &format!("Terminated current state, current state is now {SECOND_STATE}"),
            "Terminated, no states left",
        ]
    );
    assert_eq!(session.engine.statistics().terminated_states, 2);
}

#[test]
fn test_terminate_others() {
    let mut session = Session::new(
        PROGRAM,
        &after_fork(&["state next", "terminate others", "info states -c", "t -o"]),
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Terminated 1 state(s)",
            &format!("Total number of states: 1\ncurrent state --> {SECOND_STATE} test.c:10"),
            "Terminated 0 state(s)",
        ]
    );
    assert_eq!(session.engine.states(), vec![StateId(0x5000_0040)]);
}

#[test]
fn test_generate_input() {
    let mut session = Session::new(
        PROGRAM,
        &after_fork(&["generate-input", "state next", "generate-input"]),
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "constraints for state:\n(Eq 0 x)",
            "Concrete input value(s) that will reach this path:",
            "x (size 4): \\0x00\\0x00\\0x00\\0x00",
            "constraints for state:\n(Ne 0 x)",
            "x (size 4): \\0x01\\0x00\\0x00\\0x00",
        ]
    );
}

#[test]
fn test_generate_input_unsatisfiable() {
    let mut session = Session::new(UNSAT_PROGRAM, &["stepi", "1", "info constraints", "generate-input"]);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "You selected state @0x50000000.",
            "false",
            "constraints for state:\nfalse",
            "No satisfying input values found",
        ]
    );
}

#[test]
fn test_compact_toggle() {
    let mut session = Session::new(
        PROGRAM,
        &after_fork(&["toggle compact", "info state", "toggle compact", "info state"]),
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Now using compact representation",
            &format!("{FIRST_STATE} test.c:5"),
            "Now using default representation",
            &format!("Address:    {FIRST_STATE}"),
            "Location:   main at test.c:5",
            "LLVM:       alloca y",
            "Constraints:(Eq 0 x)",
        ]
    );
}
