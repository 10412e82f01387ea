use crate::assert_contains_in_order;
use crate::common::{Session, PROGRAM};
use pathstalker::debugger::arbiter::ArbiterState;
use pathstalker::playground::RunOutcome;
use pathstalker::ui::console::prompt::ReadOutcome;
use pathstalker::ui::console::{INTERRUPTED_PROMPT, PROMPT, SELECTION_PROMPT};

#[test]
fn test_interrupted_prompt() {
    let mut session = Session::new(PROGRAM, &["stepi"]);
    session.interrupt.set();
    session.run();

    assert_eq!(session.prompts(), [INTERRUPTED_PROMPT, PROMPT]);
    assert!(!session.interrupt.is_set());
}

#[test]
fn test_empty_line_repeats_last_command() {
    let mut session = Session::new(PROGRAM, &["", "stepi", "", ""]);
    session.run();

    assert_eq!(
        session.prompts(),
        [PROMPT, PROMPT, PROMPT, PROMPT, SELECTION_PROMPT]
    );
    assert_eq!(session.controller.lines().history(), ["stepi"]);
}

#[test]
fn test_ctrl_c_while_typing() {
    let mut session = Session::new(PROGRAM, &[]);
    session
        .controller
        .lines_mut()
        .push(ReadOutcome::Interrupted);
    session
        .controller
        .lines_mut()
        .push(ReadOutcome::Line("quit".to_string()));
    assert_eq!(session.run(), RunOutcome::Halted);

    assert_eq!(session.prompts(), [PROMPT, PROMPT]);
    assert!(session
        .output
        .contents()
        .contains("Quitting the engine and the debugger"));
}

#[test]
fn test_ctrl_c_during_selection() {
    let mut session = Session::new(PROGRAM, &["stepi", "stepi", "stepi"]);
    session
        .controller
        .lines_mut()
        .push(ReadOutcome::Interrupted);
    assert_eq!(session.run(), RunOutcome::Halted);

    assert!(session.controller.is_halted());
    assert_eq!(
        session.controller.debugger().arbiter().state(),
        &ArbiterState::Armed
    );
    assert_eq!(session.prompts().last().map(String::as_str), Some(SELECTION_PROMPT));
}

#[test]
fn test_help() {
    let mut session = Session::new(
        PROGRAM,
        &["help break", "help nothing", "blah", "info", "h info states"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "break|b <file:line|function>",
            "unknown command: nothing",
            "COMMANDS",
            "unknown command",
            "COMMANDS",
            "missing argument for \"info\"",
            "info states [-c|--compact]",
            "USAGE:\n  info states [-c|--compact]",
        ]
    );
}

#[test]
fn test_source_without_files() {
    let mut session = Session::new(
        PROGRAM,
        &["list", "list 3", "list helper", "list nofunc", "source", "source many"],
    );
    session.run();

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Current line out of range.",
            "Line 3 out of range.",
            "Function helper out of range.",
            "Function nofunc out of range.",
            "no source for test.c:2",
            "unsupported option or argument for \"source\": many",
        ]
    );
}
