//! Interactive console: prompt loop, branch selection dialog and command execution.

use crate::debugger::arbiter::Decision;
use crate::debugger::engine::{Action, ControlPoint, Engine, StateId};
use crate::debugger::{Debugger, Error, TerminateTarget, Trap};
use crate::ui::command::parser::{tokenize, Dispatcher};
use crate::ui::command::{
    execution, info, print as print_cmd, r#break, state, Command, CommandResult, Toggle,
};
use crate::ui::console::file::FileView;
use crate::ui::console::help::{SELECTION_HELP, WELCOME_TEXT};
use crate::ui::console::print::style::{ErrorView, FilePathView, KeywordView, StateView};
use crate::ui::console::print::Printer;
use crate::ui::console::prompt::{InterruptFlag, LineSource, PromptExit, ReadOutcome};
use crate::ui::console::view::{StateRenderer, SEPARATOR};
use crate::ui::config;
use log::debug;
use std::sync::Once;

pub mod editor;
pub mod file;
pub mod help;
pub mod print;
pub mod prompt;
pub mod view;

pub const PROMPT: &str = "(pstalker) ";
pub const INTERRUPTED_PROMPT: &str = "(pstalker, interrupted) ";
pub const SELECTION_PROMPT: &str = "(Select a state to continue) ";

pub static LOGGER_ONCE: Once = Once::new();
pub static HELLO_ONCE: Once = Once::new();

/// Debugger front end called by the engine at every control point.
pub struct Controller<L: LineSource> {
    debugger: Debugger,
    dispatcher: Dispatcher,
    lines: L,
    printer: Printer,
    interrupt: InterruptFlag,
    file_view: FileView,
    /// Tokens of the last non-empty command, repeated on empty input.
    last_command: Vec<String>,
    /// Operator quit or input is over, no more prompts.
    halted: bool,
}

impl<L: LineSource> Controller<L> {
    pub fn new(debugger: Debugger, lines: L, printer: Printer, interrupt: InterruptFlag) -> Self {
        Self {
            debugger,
            dispatcher: Dispatcher::new(),
            lines,
            printer,
            interrupt,
            file_view: FileView::new(),
            last_command: vec![],
            halted: false,
        }
    }

    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Print welcome text, once per process.
    pub fn greet(&self) {
        HELLO_ONCE.call_once(|| self.printer.print(WELCOME_TEXT));
    }

    fn renderer<'a, E: Engine>(&'a self, engine: &'a E) -> StateRenderer<'a, E> {
        StateRenderer::new(engine, &self.file_view)
    }

    fn print_error(&self, err: impl std::fmt::Display) {
        self.printer.print(ErrorView::from(err));
    }

    /// Print the current state position in one line plus its source line.
    fn print_position<E: Engine>(&self, engine: &E) {
        let Some(state) = engine.current_state() else {
            return;
        };
        let Some(site) = engine.snapshot(state).and_then(|s| engine.site(s.pc).cloned()) else {
            return;
        };
        self.printer
            .print(format!("{} {}", StateView::from(state), view::location(&site)));
        self.printer
            .print(view::source_line(&self.file_view, &site));
    }

    /// Read and execute commands until one of them returns control to the engine.
    pub fn show_prompt<E: Engine>(&mut self, engine: &mut E) -> PromptExit {
        loop {
            let prompt = if self.interrupt.take() {
                INTERRUPTED_PROMPT
            } else {
                PROMPT
            };

            let outcome = match self.lines.read_line(prompt) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.print_error(format!("input error: {e:#}"));
                    ReadOutcome::EndOfInput
                }
            };

            let tokens = match outcome {
                ReadOutcome::Line(line) => {
                    let tokens = tokenize(&line);
                    if tokens.is_empty() {
                        if self.last_command.is_empty() {
                            continue;
                        }
                        self.last_command.clone()
                    } else {
                        self.lines.add_history(&line);
                        self.last_command = tokens.clone();
                        tokens
                    }
                }
                ReadOutcome::Interrupted => continue,
                ReadOutcome::EndOfInput => {
                    debug!(target: "debugger", "end of input, halt the engine");
                    self.halted = true;
                    return PromptExit::EndOfInput;
                }
            };

            let command = match self.dispatcher.parse(&tokens) {
                Ok(command) => command,
                Err(failure) => {
                    self.print_error(failure.error);
                    self.printer.print(failure.usage);
                    continue;
                }
            };

            let result = self.execute(engine, command);
            if !result.message.is_empty() {
                if result.succeeded {
                    self.printer.print(&result.message);
                } else {
                    self.print_error(&result.message);
                }
            }

            if self.halted {
                return PromptExit::Quit;
            }
            if !result.remain_in_prompt {
                return PromptExit::Resume;
            }
        }
    }

    fn prompt<E: Engine>(&mut self, engine: &mut E) -> Action {
        match self.show_prompt(engine) {
            PromptExit::Resume => Action::Continue,
            PromptExit::Quit | PromptExit::EndOfInput => Action::Stop,
        }
    }

    fn handle_error(&mut self, err: Error) -> CommandResult {
        if err.is_fatal() {
            self.halted = true;
            return CommandResult {
                succeeded: false,
                remain_in_prompt: false,
                message: format!("fatal debugger error: {err:#}"),
            };
        }
        CommandResult::failed(err.to_string())
    }

    /// Execute a parsed command.
    pub fn execute<E: Engine>(&mut self, engine: &mut E, command: Command) -> CommandResult {
        let result = match command {
            Command::Execution(cmd) => Ok(self.execute_flow(engine, &cmd)),
            Command::Quit => {
                self.halted = true;
                Ok(CommandResult::resume("Quitting the engine and the debugger"))
            }
            Command::Breakpoint(cmd) => self.execute_breakpoint(engine, &cmd),
            Command::Print(cmd) => self.execute_print(engine, cmd),
            Command::Info(cmd) => self.execute_info(engine, &cmd),
            Command::State(cmd) => self.execute_state(engine, &cmd),
            Command::List(location) => Ok(self.execute_list(engine, location)),
            Command::Source(bounds) => self.execute_source(engine, bounds),
            Command::Toggle(toggle) => Ok(self.execute_toggle(toggle)),
            Command::Help(words) => Ok(match self.dispatcher.help(&words) {
                Ok(usage) => CommandResult::stay(usage),
                Err(e) => CommandResult::failed(format!(
                    "{e}: {}\n{}",
                    words.join(" "),
                    self.dispatcher.root_usage()
                )),
            }),
            Command::Select { .. } => Ok(CommandResult::failed(
                "no branch selection in progress",
            )),
        };

        result.unwrap_or_else(|e| self.handle_error(e))
    }

    fn execute_flow<E: Engine>(&mut self, engine: &mut E, cmd: &execution::Command) -> CommandResult {
        match execution::Handler::new(&mut self.debugger, engine).handle(cmd) {
            execution::ExecutionResult::Continued { stop_on_branch } => {
                if stop_on_branch {
                    CommandResult::resume("Continuing execution until the next branch")
                } else {
                    CommandResult::resume("Continuing execution")
                }
            }
            execution::ExecutionResult::Ran { removed } => CommandResult::resume(format!(
                "Running until the end of the program, {removed} breakpoint(s) removed"
            )),
            execution::ExecutionResult::Stepped => CommandResult::resume(""),
        }
    }

    fn execute_breakpoint<E: Engine>(
        &mut self,
        engine: &mut E,
        cmd: &r#break::Command,
    ) -> Result<CommandResult, Error> {
        let result = match r#break::Handler::new(&mut self.debugger, engine).handle(cmd)? {
            r#break::ExecutionResult::New(brkpt) => CommandResult::stay(format!(
                "{} {} at {}:{}",
                brkpt.kind,
                brkpt.number,
                FilePathView::from(&brkpt.file),
                brkpt.line
            )),
            r#break::ExecutionResult::Removed(outcome) if outcome.all => CommandResult::stay(
                format!("Deleted all breakpoints and killpoints ({})", outcome.removed),
            ),
            r#break::ExecutionResult::Removed(outcome) => {
                let mut result = CommandResult::stay(format!("Deleted {} entries", outcome.removed));
                if !outcome.unknown.is_empty() {
                    result.succeeded = false;
                    result.message += &format!(
                        "\n{}",
                        Error::UnknownBreakpointId(outcome.unknown)
                    );
                }
                result
            }
        };
        Ok(result)
    }

    fn execute_print<E: Engine>(
        &mut self,
        engine: &mut E,
        cmd: print_cmd::Command,
    ) -> Result<CommandResult, Error> {
        let result = match print_cmd::Handler::new(&self.debugger, engine).handle(cmd)? {
            print_cmd::ExecutionResult::Value { name, value } => CommandResult::stay(format!(
                "Printing variable: {name}\n{} = {value}",
                KeywordView::from(&name)
            )),
            print_cmd::ExecutionResult::Symbolic(name) => {
                CommandResult::stay(format!("{} is now symbolic", KeywordView::from(&name)))
            }
        };
        Ok(result)
    }

    fn execute_info<E: Engine>(
        &mut self,
        engine: &mut E,
        cmd: &info::Command,
    ) -> Result<CommandResult, Error> {
        let engine = &*engine;
        let renderer = self.renderer(engine);
        let message = match info::Handler::new(&self.debugger, engine).handle(cmd)? {
            info::ExecutionResult::Breakpoints { kind, list } => {
                view::render_breakpoints(kind, &list)
            }
            info::ExecutionResult::Stack(snapshot) => renderer.render_stack(&snapshot),
            info::ExecutionResult::Constraints(constraints) => {
                view::render_constraints(&constraints)
            }
            info::ExecutionResult::States {
                states,
                current,
                compact,
            } => renderer.render_list(&states, current, compact),
            info::ExecutionResult::Stats(stats) => view::render_stats(&stats),
            info::ExecutionResult::State { snapshot, compact } => {
                renderer.render(&snapshot, compact)
            }
        };
        Ok(CommandResult::stay(message))
    }

    fn execute_state<E: Engine>(
        &mut self,
        engine: &mut E,
        cmd: &state::Command,
    ) -> Result<CommandResult, Error> {
        let result = match state::Handler::new(&mut self.debugger, engine).handle(cmd)? {
            state::ExecutionResult::Moved(state) => {
                CommandResult::stay(format!("Moved to state {}", StateView::from(state)))
            }
            state::ExecutionResult::Terminated(outcome) => {
                let target = match cmd {
                    state::Command::Terminate(target) => *target,
                    _ => TerminateTarget::Current,
                };
                match (target, outcome.current) {
                    (_, None) => CommandResult::resume("Terminated, no states left"),
                    (TerminateTarget::Current, Some(current)) => CommandResult::stay(format!(
                        "Terminated current state, current state is now {}",
                        StateView::from(current)
                    )),
                    (TerminateTarget::Others, Some(_)) => CommandResult::stay(format!(
                        "Terminated {} state(s)",
                        outcome.terminated
                    )),
                }
            }
            state::ExecutionResult::Input(report) => {
                CommandResult::stay(view::render_inputs(&report))
            }
        };
        Ok(result)
    }

    fn execute_list<E: Engine>(&mut self, engine: &mut E, location: Option<String>) -> CommandResult {
        let out_of_range = || match location {
            Some(ref loc) if loc.parse::<u64>().is_err() => format!("Function {loc} out of range."),
            Some(ref loc) => format!("Line {loc} out of range."),
            None => "Current line out of range.".to_string(),
        };

        let place = match self.debugger.list_place(&*engine, location.as_deref()) {
            Ok(place) => place,
            Err(Error::NoSuchFunction(_)) | Err(Error::NoSuchFile(_)) => {
                return CommandResult::failed(out_of_range())
            }
            Err(e) => return self.handle_error(e),
        };

        match self.file_view.render_listing(&place) {
            Ok(listing) => CommandResult::stay(listing.trim_end()),
            Err(e) => {
                debug!(target: "debugger", "render listing: {e:#}");
                CommandResult::failed(out_of_range())
            }
        }
    }

    fn execute_source<E: Engine>(
        &mut self,
        engine: &mut E,
        bounds: Option<u64>,
    ) -> Result<CommandResult, Error> {
        let place = self.debugger.list_place(&*engine, None)?;
        let bounds = bounds.unwrap_or(config::current().source_bounds);
        let result = match self.file_view.render_source(&place, bounds) {
            Ok(source) => CommandResult::stay(source.trim_end()),
            Err(e) => CommandResult::failed(format!(
                "no source for {}:{}: {e:#}",
                FilePathView::from(&place.file),
                place.line
            )),
        };
        Ok(result)
    }

    fn execute_toggle(&mut self, toggle: Toggle) -> CommandResult {
        match toggle {
            Toggle::Compact => {
                if self.debugger.toggle_compact() {
                    CommandResult::stay("Now using compact representation")
                } else {
                    CommandResult::stay("Now using default representation")
                }
            }
            Toggle::StopOnError => {
                if self.debugger.toggle_stop_on_error() {
                    CommandResult::stay("Execution will stop on errors")
                } else {
                    CommandResult::stay("Execution will not stop on errors")
                }
            }
        }
    }

    /// Print forked states.
    fn alert_branching<E: Engine>(&self, engine: &E, added: &[StateId], ask: bool) {
        let origin = added
            .iter()
            .find_map(|s| engine.snapshot(*s))
            .and_then(|s| s.prev_pc)
            .and_then(|pc| engine.site(pc));
        if let Some(site) = origin {
            self.printer.print("Execution branched from:");
            self.printer
                .print(view::source_line(&self.file_view, site));
        }

        let compact = self.debugger.options().compact
            || added.len() > self.debugger.options().compact_threshold;
        let renderer = self.renderer(engine);
        // numbers follow positions in `added`, the selection answer indexes it
        for (i, state) in added.iter().enumerate() {
            let num = i + 1;
            if ask {
                self.printer
                    .print(format!("Enter {num} to select the following state"));
            } else {
                self.printer.print(format!("Branch {num}"));
            }
            match engine.snapshot(*state) {
                Some(snapshot) => self.printer.print(renderer.render(&snapshot, compact)),
                None => self
                    .printer
                    .print(format!("{} (state is gone)", StateView::from(*state))),
            }
            if !compact {
                self.printer.print(SEPARATOR);
            }
        }
    }

    /// Ask operator which of the forked states survives.
    fn arbitrate<E: Engine>(&mut self, engine: &mut E, added: Vec<StateId>) -> Action {
        self.alert_branching(&*engine, &added, true);
        self.printer.print(SELECTION_HELP);

        loop {
            let outcome = match self.lines.read_line(SELECTION_PROMPT) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.print_error(format!("input error: {e:#}"));
                    ReadOutcome::EndOfInput
                }
            };

            let line = match outcome {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted | ReadOutcome::EndOfInput => {
                    self.debugger.cancel_arbitration();
                    self.halted = true;
                    self.print_error("branch selection cancelled, halt the engine");
                    return Action::Stop;
                }
            };
            let tokens = tokenize(&line);
            if tokens.is_empty() {
                continue;
            }

            match self.dispatcher.parse_selection(&tokens) {
                Ok(Command::Select {
                    index,
                    terminate_others,
                }) => match self.debugger.select_branch(engine, index, terminate_others) {
                    Ok(state) => {
                        self.printer
                            .print(format!("You selected state {}.", StateView::from(state)));
                        return Action::Continue;
                    }
                    Err(e) => self.print_error(e),
                },
                Ok(_) => {}
                Err(failure) => {
                    self.print_error(failure.error);
                    self.printer.print(failure.usage);
                }
            }
        }
    }
}

impl<L: LineSource> Controller<L> {
    /// Fork detection, interruption and trap handling for the current state.
    fn control_point<E: Engine>(&mut self, engine: &mut E) -> Action {
        if self.halted {
            return Action::Stop;
        }
        if engine.current_state().is_none() {
            return Action::Continue;
        }

        match self.debugger.detect_fork(engine) {
            Decision::NoFork => {}
            Decision::Auto { added, selected } => {
                self.alert_branching(&*engine, &added, false);
                self.printer.print(format!(
                    "Continuing execution from state {}",
                    StateView::from(selected)
                ));
            }
            Decision::Ask(added) => {
                if self.arbitrate(engine, added) == Action::Stop {
                    return Action::Stop;
                }
            }
        }

        if self.interrupt.is_set() {
            self.debugger.mark_stopped(&*engine);
            self.print_position(&*engine);
            return self.prompt(engine);
        }

        match self.debugger.check_trap(engine) {
            Ok(None) => Action::Continue,
            Ok(Some(Trap::Killpoint { breakpoint, state })) => {
                self.printer.print(format!(
                    "Killpoint {}, at {}:{}",
                    breakpoint.number,
                    FilePathView::from(&breakpoint.file),
                    breakpoint.line
                ));
                self.printer
                    .print(format!("Terminating current state {}", StateView::from(state)));
                // successor state must pass its own control point before it runs
                self.control_point(engine)
            }
            Ok(Some(Trap::Breakpoint(breakpoint))) => {
                self.printer.print(format!(
                    "Breakpoint {}, at {}:{}",
                    breakpoint.number,
                    FilePathView::from(&breakpoint.file),
                    breakpoint.line
                ));
                if let Some(site) = engine.site(breakpoint.site) {
                    self.printer
                        .print(view::source_line(&self.file_view, site));
                }
                self.prompt(engine)
            }
            Ok(Some(Trap::Step)) => {
                self.print_position(&*engine);
                self.prompt(engine)
            }
            Err(e) if e.is_fatal() => {
                self.print_error(format!("fatal debugger error: {e:#}"));
                self.halted = true;
                Action::Stop
            }
            Err(e) => {
                self.print_error(e);
                Action::Continue
            }
        }
    }
}

impl<E: Engine, L: LineSource> ControlPoint<E> for Controller<L> {
    fn on_control_point(&mut self, engine: &mut E) -> Action {
        let action = self.control_point(engine);
        self.debugger.release_arbiter();
        action
    }

    fn on_error(&mut self, engine: &mut E, message: &str) -> Action {
        if self.halted {
            return Action::Stop;
        }
        self.print_error(format!("Error: {message}"));
        if !self.debugger.options().stop_on_error || engine.current_state().is_none() {
            return Action::Continue;
        }
        self.debugger.mark_stopped(&*engine);
        self.print_position(&*engine);
        self.prompt(engine)
    }
}

/// Debugger options from the ui configuration.
pub fn options_from_config() -> crate::debugger::DebuggerOptions {
    let config = config::current();
    crate::debugger::DebuggerOptions {
        compact: false,
        stop_on_error: config.stop_on_error,
        compact_threshold: config.compact_threshold,
    }
}
