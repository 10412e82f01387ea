mod common;

mod branches;
mod breakpoints;
mod prompt;
mod states;
mod steps;
mod variables;

use crate::common::{Session, FIRST_STATE, PROGRAM};
use pathstalker::debugger::engine::ExecutionScheduler;
use pathstalker::playground::RunOutcome;

#[test]
fn test_initial_stop() {
    let mut session = Session::new(PROGRAM, &[]);
    assert_eq!(session.run(), RunOutcome::Halted);

    let output = session.output.contents();
    assert_contains_in_order!(output, [&format!("{FIRST_STATE} main at test.c:2"), "test.c:2"]);
    assert_eq!(session.prompts(), ["(pstalker) "]);
    assert!(session.controller.is_halted());
}

#[test]
fn test_quit() {
    let mut session = Session::new(PROGRAM, &["quit", "info stats"]);
    assert_eq!(session.run(), RunOutcome::Halted);

    let output = session.output.contents();
    assert!(output.contains("Quitting the engine and the debugger"));
    assert!(!output.contains("Executed instructions"));
    assert_eq!(session.controller.lines().remaining(), 1);
    assert_eq!(session.engine.states().len(), 1);
}

#[test]
fn test_run_to_the_end() {
    let mut session = Session::new(PROGRAM, &["continue"]);
    assert_eq!(session.run(), RunOutcome::Exhausted);

    let output = session.output.contents();
    assert_contains_in_order!(
        output,
        [
            "Continuing execution",
            "Execution branched from:",
            "Branch 1",
            "Branch 2",
            "Error: division by zero"
        ]
    );
    assert!(session.engine.states().is_empty());
    assert!(!session.controller.is_halted());
}

#[test]
fn test_info_stats() {
    let mut session = Session::new(PROGRAM, &["stepi", "stepi", "info stats"]);
    session.run();

    let output = session.output.contents();
    let stat = |name: &str, value: u64| format!("{:<24}{value}", format!("{name}:"));
    assert_contains_in_order!(
        output,
        [
            &stat("Executed instructions", 2),
            &stat("Forks", 0),
            &stat("Live states", 1),
            &stat("Terminated states", 0),
        ]
    );
}
