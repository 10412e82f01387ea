use crate::assert_contains_in_order;
use crate::common::{Session, FIRST_STATE, PROGRAM, SECOND_STATE, TRAILING_FORK_PROGRAM};
use pathstalker::debugger::arbiter::ArbiterState;
use pathstalker::debugger::engine::{ExecutionScheduler, InstructionId, StateId};
use pathstalker::debugger::{DebuggerOptions, ExecutionMode};
use pathstalker::playground::RunOutcome;

const TO_FORK: [&str; 3] = ["stepi", "stepi", "stepi"];

fn script(tail: &[&'static str]) -> Vec<&'static str> {
    TO_FORK.iter().chain(tail).copied().collect()
}

#[test]
fn test_operator_selects_branch() {
    let mut session = Session::new(PROGRAM, &script(&["2"]));
    assert_eq!(session.run(), RunOutcome::Halted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Execution branched from:",
            "test.c:4",
            "Enter 1 to select the following state",
            &format!("Address:    {FIRST_STATE}"),
            "Constraints:(Eq 0 x)",
            "Enter 2 to select the following state",
            &format!("Address:    {SECOND_STATE}"),
            "Constraints:(Ne 0 x)",
            &format!("You selected state {SECOND_STATE}."),
            // single-shot stepping is re-armed
            &format!("{SECOND_STATE} main at test.c:10"),
        ]
    );

    assert_eq!(
        session.prompts().last().map(String::as_str),
        Some("(pstalker) ")
    );
    assert!(session
        .prompts()
        .contains(&"(Select a state to continue) ".to_string()));

    let current = session.engine.current_state().unwrap();
    assert_eq!(current.to_string(), SECOND_STATE);
    assert_eq!(session.engine.states().len(), 2);
    assert_eq!(
        session.controller.debugger().mode(),
        ExecutionMode::SteppingInstruction
    );
    // resolved fork is released once the control point returns
    assert_eq!(
        session.controller.debugger().arbiter().state(),
        &ArbiterState::Armed
    );
}

#[test]
fn test_invalid_selection_reprompts() {
    let mut session = Session::new(PROGRAM, &script(&["0", "3", "first", "1 -t"]));
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "selection 0 is out of range, expected a number between 1 and 2",
            "selection 3 is out of range, expected a number between 1 and 2",
            "unsupported option or argument for \"selection\": first",
            &format!("You selected state {FIRST_STATE}."),
        ]
    );

    let selection_prompts = session
        .prompts()
        .iter()
        .filter(|p| p.as_str() == "(Select a state to continue) ")
        .count();
    assert_eq!(selection_prompts, 4);

    // `-t` terminates every other state
    assert_eq!(session.engine.states(), vec![StateId(0x5000_0000)]);
    assert_eq!(
        session.controller.debugger().arbiter().state(),
        &ArbiterState::Armed
    );
}

#[test]
fn test_end_of_input_cancels_selection() {
    let mut session = Session::new(PROGRAM, &script(&[]));
    assert_eq!(session.run(), RunOutcome::Halted);

    assert!(session.controller.is_halted());
    assert_eq!(
        session.controller.debugger().arbiter().state(),
        &ArbiterState::Armed
    );
    // nothing executed after the fork
    let first = session.engine.snapshot(StateId(0x5000_0000)).unwrap();
    assert_eq!(first.pc, InstructionId(3));
    assert!(session
        .output
        .contents()
        .contains("branch selection cancelled, halt the engine"));
}

#[test]
fn test_stop_on_branch() {
    let mut session = Session::new(PROGRAM, &["continue -s", "1"]);
    assert_eq!(session.run(), RunOutcome::Halted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Continuing execution until the next branch",
            "Enter 1 to select the following state",
            &format!("You selected state {FIRST_STATE}."),
            &format!("{FIRST_STATE} main at test.c:5"),
        ]
    );
}

#[test]
fn test_compact_branch_listing() {
    let options = DebuggerOptions {
        compact: true,
        ..Default::default()
    };
    let mut session = Session::with_options(PROGRAM, &script(&["1"]), options);
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Enter 1 to select the following state",
            &format!("{FIRST_STATE} test.c:5"),
            "Enter 2 to select the following state",
            &format!("{SECOND_STATE} test.c:10"),
        ]
    );
    assert!(!output.contains("Address:"));
}

#[test]
fn test_fork_on_last_instruction() {
    let mut session = Session::new(
        TRAILING_FORK_PROGRAM,
        &["stepi", "stepi", "1", "info states", "q"],
    );
    assert_eq!(session.run(), RunOutcome::Halted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Execution branched from:",
            "last.c:2",
            "Enter 1 to select the following state",
            &format!("Address:    {SECOND_STATE}"),
            &format!("You selected state {SECOND_STATE}."),
            &format!("{SECOND_STATE} main at last.c:1"),
            &format!("Total number of states: 1\ncurrent state --> \nAddress:    {SECOND_STATE}"),
        ]
    );
    assert!(!output.contains("Enter 2 to select"));
    assert_eq!(session.engine.states(), vec![StateId(0x5000_0040)]);
    assert_eq!(session.engine.current_state(), Some(StateId(0x5000_0040)));
}
