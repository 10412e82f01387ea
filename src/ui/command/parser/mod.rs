use super::node::{Args, CommandNode, Grammar, NodeError};
use super::{execution, info, print, r#break, state, Command, ParseError, Toggle};
use crate::debugger::breakpoint::BreakpointKind;
use crate::debugger::TerminateTarget;
use chumsky::error::Rich;
use chumsky::prelude::{end, just};
use chumsky::{extra, text, Parser};

pub const CONTINUE_COMMAND: &str = "continue";
pub const CONTINUE_COMMAND_SHORT: &str = "c";
pub const RUN_COMMAND: &str = "run";
pub const RUN_COMMAND_SHORT: &str = "r";
pub const STEP_COMMAND: &str = "step";
pub const STEP_COMMAND_SHORT: &str = "s";
pub const STEP_INSTRUCTION_COMMAND: &str = "stepi";
pub const STEP_INSTRUCTION_COMMAND_SHORT: &str = "si";
pub const QUIT_COMMAND: &str = "quit";
pub const QUIT_COMMAND_SHORT: &str = "q";
pub const BREAK_COMMAND: &str = "break";
pub const BREAK_COMMAND_SHORT: &str = "b";
pub const KILL_COMMAND: &str = "kill";
pub const KILL_COMMAND_SHORT: &str = "k";
pub const DELETE_COMMAND: &str = "delete";
pub const DELETE_COMMAND_SHORT: &str = "d";
pub const PRINT_COMMAND: &str = "print";
pub const PRINT_COMMAND_SHORT: &str = "p";
pub const SET_SYMBOLIC_COMMAND: &str = "set";
pub const SET_SYMBOLIC_COMMAND_LONG: &str = "set-symbolic";
pub const INFO_COMMAND: &str = "info";
pub const INFO_COMMAND_BREAK_SUBCOMMAND: &str = "break";
pub const INFO_COMMAND_KILL_SUBCOMMAND: &str = "killpoints";
pub const INFO_COMMAND_STACK_SUBCOMMAND: &str = "stack";
pub const INFO_COMMAND_CONSTRAINTS_SUBCOMMAND: &str = "constraints";
pub const INFO_COMMAND_STATES_SUBCOMMAND: &str = "states";
pub const INFO_COMMAND_STATS_SUBCOMMAND: &str = "stats";
pub const INFO_COMMAND_STATE_SUBCOMMAND: &str = "state";
pub const STATE_COMMAND: &str = "state";
pub const STATE_COMMAND_NEXT_SUBCOMMAND: &str = "next";
pub const STATE_COMMAND_PREV_SUBCOMMAND: &str = "prev";
pub const TERMINATE_COMMAND: &str = "terminate";
pub const TERMINATE_COMMAND_SHORT: &str = "t";
pub const GENERATE_INPUT_COMMAND: &str = "generate-input";
pub const LIST_COMMAND: &str = "list";
pub const LIST_COMMAND_SHORT: &str = "l";
pub const SOURCE_COMMAND: &str = "source";
pub const TOGGLE_COMMAND: &str = "toggle";
pub const TOGGLE_COMMAND_COMPACT_SUBCOMMAND: &str = "compact";
pub const TOGGLE_COMMAND_STOP_ON_ERROR_SUBCOMMAND: &str = "stop-on-error";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";

type Err<'a> = extra::Err<Rich<'a, char>>;

/// Hexadecimal number, `0x` prefix is optional.
pub fn hex<'a>() -> impl Parser<'a, &'a str, u64, Err<'a>> + Clone {
    let prefix = just("0x").or(just("0X"));
    prefix
        .or_not()
        .ignore_then(
            text::digits(16)
                .at_least(1)
                .to_slice()
                .try_map(|s: &str, span| {
                    u64::from_str_radix(s, 16).map_err(|e| Rich::custom(span, e))
                }),
        )
        .padded()
        .labelled("hexidecimal number")
}

/// Parse an execution state address as printed by the debugger.
pub fn state_address(input: &str) -> Option<u64> {
    hex().then_ignore(end()).parse(input).into_result().ok()
}

/// Split a command line into tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(ToString::to_string).collect()
}

/// Parsing failure with the usage of the most specific node matched by prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub error: ParseError,
    pub usage: String,
}

/// Owner of the command tree, routes tokenized input to it.
#[derive(Debug)]
pub struct Dispatcher {
    root: CommandNode,
    selection: CommandNode,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn location(args: Args, kind: BreakpointKind) -> Result<Command, ParseError> {
    let location = args.value.ok_or(ParseError::MissingArgument(args.command))?;
    Ok(Command::Breakpoint(r#break::Command::Add { kind, location }))
}

fn terminate_target(args: Args) -> Result<Command, ParseError> {
    let positional = args.value.as_deref().map(|v| match v {
        "others" => TerminateTarget::Others,
        _ => TerminateTarget::Current,
    });
    let flag = args.flag.map(|f| match f {
        "-o" => TerminateTarget::Others,
        _ => TerminateTarget::Current,
    });
    let target = match (positional, flag) {
        (Some(p), Some(f)) if p != f => return Err(ParseError::ConflictingOption(args.command)),
        (p, f) => p.or(f).unwrap_or(TerminateTarget::Current),
    };
    Ok(Command::State(state::Command::Terminate(target)))
}

fn source_bounds(args: Args) -> Result<Command, ParseError> {
    let bounds = args
        .value
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ParseError::UnsupportedArgument(args.command, value))
        })
        .transpose()?;
    Ok(Command::Source(bounds))
}

fn selection(args: Args) -> Result<Command, ParseError> {
    let value = args.value.unwrap_or_default();
    let index = value
        .parse::<usize>()
        .map_err(|_| ParseError::UnsupportedArgument(args.command, value))?;
    Ok(Command::Select {
        index,
        terminate_others: args.flag.is_some(),
    })
}

fn root() -> CommandNode {
    CommandNode::group(
        &[],
        "",
        [
            CommandNode::leaf(
                &[CONTINUE_COMMAND, CONTINUE_COMMAND_SHORT],
                "continue execution until the next breakpoint",
                Grammar::new().flag(&["-s", "--stop-on-branch"], "stop when execution branches"),
                |args| {
                    Ok(Command::Execution(execution::Command::Continue {
                        stop_on_branch: args.flag.is_some(),
                    }))
                },
            ),
            CommandNode::leaf(
                &[RUN_COMMAND, RUN_COMMAND_SHORT],
                "remove all breakpoints and run until the end",
                Grammar::new(),
                |_| Ok(Command::Execution(execution::Command::Run)),
            ),
            CommandNode::leaf(
                &[STEP_COMMAND, STEP_COMMAND_SHORT],
                "execute until the source line changes",
                Grammar::new(),
                |_| Ok(Command::Execution(execution::Command::Step)),
            ),
            CommandNode::leaf(
                &[STEP_INSTRUCTION_COMMAND, STEP_INSTRUCTION_COMMAND_SHORT],
                "execute a single instruction",
                Grammar::new(),
                |_| Ok(Command::Execution(execution::Command::StepInstruction)),
            ),
            CommandNode::leaf(
                &[BREAK_COMMAND, BREAK_COMMAND_SHORT],
                "set a breakpoint",
                Grammar::new().value("file:line|function"),
                |args| location(args, BreakpointKind::Stop),
            ),
            CommandNode::leaf(
                &[KILL_COMMAND, KILL_COMMAND_SHORT],
                "set a killpoint, states reaching it are terminated",
                Grammar::new().value("file:line|function"),
                |args| location(args, BreakpointKind::Kill),
            ),
            CommandNode::leaf(
                &[DELETE_COMMAND, DELETE_COMMAND_SHORT],
                "delete breakpoints and killpoints, all of them if no number given",
                Grammar::new().numbers("number"),
                |args| Ok(Command::Breakpoint(r#break::Command::Delete(args.numbers))),
            ),
            CommandNode::leaf(
                &[PRINT_COMMAND, PRINT_COMMAND_SHORT],
                "print value of a variable",
                Grammar::new().value("variable"),
                |args| {
                    Ok(Command::Print(print::Command::Variable(
                        args.value.unwrap_or_default(),
                    )))
                },
            ),
            CommandNode::leaf(
                &[SET_SYMBOLIC_COMMAND, SET_SYMBOLIC_COMMAND_LONG],
                "make a variable symbolic",
                Grammar::new().value("variable"),
                |args| {
                    Ok(Command::Print(print::Command::SetSymbolic(
                        args.value.unwrap_or_default(),
                    )))
                },
            ),
            CommandNode::group(
                &[INFO_COMMAND],
                "Show information about the debugged program",
                [
                    CommandNode::leaf(
                        &[INFO_COMMAND_BREAK_SUBCOMMAND, "breakpoints", "b"],
                        "list breakpoints",
                        Grammar::new(),
                        |_| {
                            Ok(Command::Info(info::Command::Breakpoints(
                                BreakpointKind::Stop,
                            )))
                        },
                    ),
                    CommandNode::leaf(
                        &[INFO_COMMAND_KILL_SUBCOMMAND, "kill", "k"],
                        "list killpoints",
                        Grammar::new(),
                        |_| {
                            Ok(Command::Info(info::Command::Breakpoints(
                                BreakpointKind::Kill,
                            )))
                        },
                    ),
                    CommandNode::leaf(
                        &[INFO_COMMAND_STACK_SUBCOMMAND],
                        "print stack of the current state",
                        Grammar::new(),
                        |_| Ok(Command::Info(info::Command::Stack)),
                    ),
                    CommandNode::leaf(
                        &[INFO_COMMAND_CONSTRAINTS_SUBCOMMAND],
                        "print path constraints of the current state",
                        Grammar::new(),
                        |_| Ok(Command::Info(info::Command::Constraints)),
                    ),
                    CommandNode::leaf(
                        &[INFO_COMMAND_STATES_SUBCOMMAND],
                        "print all execution states",
                        Grammar::new().flag(&["-c", "--compact"], "one line per state"),
                        |args| {
                            Ok(Command::Info(info::Command::States {
                                compact: args.flag.is_some(),
                            }))
                        },
                    ),
                    CommandNode::leaf(
                        &[INFO_COMMAND_STATS_SUBCOMMAND],
                        "print engine statistics",
                        Grammar::new(),
                        |_| Ok(Command::Info(info::Command::Stats)),
                    ),
                    CommandNode::leaf(
                        &[INFO_COMMAND_STATE_SUBCOMMAND],
                        "print the current state",
                        Grammar::new(),
                        |_| Ok(Command::Info(info::Command::State)),
                    ),
                ],
            ),
            CommandNode::group(
                &[STATE_COMMAND],
                "Switch the current execution state",
                [
                    CommandNode::leaf(
                        &[STATE_COMMAND_NEXT_SUBCOMMAND],
                        "move to the next state",
                        Grammar::new(),
                        |_| Ok(Command::State(state::Command::Next)),
                    ),
                    CommandNode::leaf(
                        &[STATE_COMMAND_PREV_SUBCOMMAND],
                        "move to the previous state",
                        Grammar::new(),
                        |_| Ok(Command::State(state::Command::Prev)),
                    ),
                    CommandNode::leaf(
                        &[],
                        "move to the state at address",
                        Grammar::new().value("address"),
                        |args| {
                            Ok(Command::State(state::Command::Move(
                                args.value.unwrap_or_default(),
                            )))
                        },
                    ),
                ],
            ),
            CommandNode::leaf(
                &[TERMINATE_COMMAND, TERMINATE_COMMAND_SHORT],
                "terminate the current state or all the others",
                Grammar::new()
                    .one_of("target", &["current", "others"])
                    .flag(&["-c", "--current"], "terminate the current state")
                    .flag(&["-o", "--others"], "terminate all states except the current"),
                terminate_target,
            ),
            CommandNode::leaf(
                &[GENERATE_INPUT_COMMAND],
                "print concrete input that reaches the current state",
                Grammar::new(),
                |_| Ok(Command::State(state::Command::GenerateInput)),
            ),
            CommandNode::leaf(
                &[LIST_COMMAND, LIST_COMMAND_SHORT],
                "show source code around a line or a function",
                Grammar::new().opt_value("line|function"),
                |args| Ok(Command::List(args.value)),
            ),
            CommandNode::leaf(
                &[SOURCE_COMMAND],
                "show source code around the current line",
                Grammar::new().opt_value("bounds"),
                source_bounds,
            ),
            CommandNode::group(
                &[TOGGLE_COMMAND],
                "Switch debugger options",
                [
                    CommandNode::leaf(
                        &[TOGGLE_COMMAND_COMPACT_SUBCOMMAND],
                        "switch compact state representation",
                        Grammar::new(),
                        |_| Ok(Command::Toggle(Toggle::Compact)),
                    ),
                    CommandNode::leaf(
                        &[TOGGLE_COMMAND_STOP_ON_ERROR_SUBCOMMAND],
                        "switch stop on execution errors",
                        Grammar::new(),
                        |_| Ok(Command::Toggle(Toggle::StopOnError)),
                    ),
                ],
            ),
            CommandNode::leaf(
                &[HELP_COMMAND, HELP_COMMAND_SHORT],
                "show help for a command",
                Grammar::new().words("command"),
                |args| Ok(Command::Help(args.words)),
            ),
            CommandNode::leaf(
                &[QUIT_COMMAND, QUIT_COMMAND_SHORT],
                "exit the debugger",
                Grammar::new(),
                |_| Ok(Command::Quit),
            ),
        ],
    )
}

fn selection_root() -> CommandNode {
    CommandNode::group(
        &[],
        "",
        [CommandNode::leaf(
            &[],
            "continue execution from the chosen state",
            Grammar::new()
                .value("n")
                .flag(&["-t", "--terminate", "-T"], "terminate all other states"),
            selection,
        )
        .labeled("selection")],
    )
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            root: root(),
            selection: selection_root(),
        }
    }

    fn failure(&self, err: NodeError<'_>) -> ParseFailure {
        ParseFailure {
            usage: err
                .node
                .map(|node| node.usage())
                .unwrap_or_else(|| self.root_usage()),
            error: err.error,
        }
    }

    /// Parse a prompt command.
    pub fn parse(&self, tokens: &[String]) -> Result<Command, ParseFailure> {
        self.root.parse(tokens).map_err(|e| self.failure(e))
    }

    /// Parse an answer to the branch selection question.
    pub fn parse_selection(&self, tokens: &[String]) -> Result<Command, ParseFailure> {
        self.selection.parse(tokens).map_err(|err| ParseFailure {
            error: err.error,
            usage: self.selection.usage(),
        })
    }

    pub fn root_usage(&self) -> String {
        format!("COMMANDS\n{}", self.root.usage())
    }

    /// Help text for a command path, root listing if the path is empty.
    pub fn help(&self, words: &[String]) -> Result<String, ParseError> {
        if words.is_empty() {
            return Ok(self.root_usage());
        }
        self.root
            .find(words)
            .map(|node| node.usage())
            .ok_or(ParseError::UnknownCommand)
    }

    /// Top level commands with their aliases and subcommand names.
    pub fn commands(&self) -> impl Iterator<Item = &CommandNode> {
        self.root.children().iter()
    }
}
