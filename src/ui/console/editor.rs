use crate::ui::command::node::CommandNode;
use crate::ui::command::parser::{
    BREAK_COMMAND, BREAK_COMMAND_SHORT, KILL_COMMAND, KILL_COMMAND_SHORT, LIST_COMMAND,
    LIST_COMMAND_SHORT,
};
use crate::ui::console::prompt::{LineSource, ReadOutcome};
use crate::weak_error;
use chumsky::prelude::{any, choice, just};
use chumsky::text::whitespace;
use chumsky::{extra, text, Parser};
use crossterm::style::{Color, Stylize};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::HistoryHinter;
use rustyline::history::FileHistory;
use rustyline::line_buffer::LineBuffer;
use rustyline::{Changeset, CompletionType, Config, Context, Editor};
use rustyline_derive::{Helper, Hinter, Validator};
use std::borrow::Cow;
use std::borrow::Cow::{Borrowed, Owned};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use trie_rs::{Trie, TrieBuilder};

/// History file location relative to the home directory.
const HISTORY_FILE: &str = ".pstalker_history";

struct CommandHint {
    short: Option<String>,
    long: String,
    subcommands: Vec<String>,
}

impl CommandHint {
    fn display_with_short(&self) -> String {
        if let Some(ref short) = self.short {
            if self.long.starts_with(short) {
                format!(
                    "{}{}",
                    short.clone().bold().underlined(),
                    &self.long[short.len()..]
                )
            } else {
                format!("{}|{}", &self.long, short.clone().bold().underlined())
            }
        } else {
            self.long.clone()
        }
    }
}

impl From<&CommandNode> for CommandHint {
    fn from(node: &CommandNode) -> Self {
        let short = node
            .aliases()
            .iter()
            .skip(1)
            .filter(|alias| alias.len() < node.name().len())
            .min_by_key(|alias| alias.len())
            .map(ToString::to_string);
        CommandHint {
            short,
            long: node.name().to_string(),
            subcommands: node
                .children()
                .iter()
                .map(CommandNode::name)
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

pub struct CommandCompleter {
    commands: Vec<CommandHint>,
    subcommand_hints: HashMap<String, Vec<String>>,
    file_hints: Trie<u8>,
}

impl CommandCompleter {
    fn new<'a>(commands: impl IntoIterator<Item = &'a CommandNode>) -> Self {
        let commands: Vec<CommandHint> = commands.into_iter().map(CommandHint::from).collect();
        let subcommand_hints = commands
            .iter()
            .filter(|cmd| !cmd.subcommands.is_empty())
            .flat_map(|cmd| {
                let mut hints = vec![(cmd.long.clone(), cmd.subcommands.clone())];
                if let Some(ref short) = cmd.short {
                    hints.push((short.clone(), cmd.subcommands.clone()));
                }
                hints
            })
            .collect::<HashMap<String, Vec<String>>>();

        Self {
            commands,
            subcommand_hints,
            file_hints: TrieBuilder::new().build(),
        }
    }

    /// Replace source file names suggested after `break` and `kill`.
    pub fn replace_file_hints(&mut self, files: impl IntoIterator<Item = String>) {
        let mut builder = TrieBuilder::new();
        files.into_iter().for_each(|file| {
            builder.push(file);
        });
        self.file_hints = builder.build();
    }
}

#[derive(Debug)]
enum CompletableCommand<'a> {
    Location(&'a str),
    Unrecognized(&'a str, Option<&'a str>),
}

impl<'a> CompletableCommand<'a> {
    fn recognize(line: &'a str) -> Option<CompletableCommand<'a>> {
        let op = just::<_, _, extra::Default>;

        let location = choice((
            op(BREAK_COMMAND),
            op(BREAK_COMMAND_SHORT),
            op(KILL_COMMAND),
            op(KILL_COMMAND_SHORT),
            op(LIST_COMMAND),
            op(LIST_COMMAND_SHORT),
        ))
        .then(whitespace().at_least(1))
        .ignore_then(any().repeated().to_slice())
        .map(CompletableCommand::Location);

        let other = text::ident()
            .then_ignore(whitespace().at_least(1))
            .then(text::ident().or_not())
            .map(|(s1, s2): (&str, Option<&str>)| CompletableCommand::Unrecognized(s1.trim(), s2))
            .padded();

        choice((location, other)).parse(line).into_result().ok()
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        match CompletableCommand::recognize(line) {
            Some(CompletableCommand::Location(maybe_file)) => {
                if maybe_file.trim().is_empty() {
                    return Ok((0, vec![]));
                }

                let variants: Vec<String> = self
                    .file_hints
                    .predictive_search(maybe_file)
                    .into_iter()
                    .filter_map(|var: Vec<u8>| String::from_utf8(var).ok())
                    .collect();
                if !variants.is_empty() {
                    let pos = line.len() - maybe_file.len();
                    let pairs = variants
                        .into_iter()
                        .map(|v| Pair {
                            display: v.clone(),
                            replacement: v + ":",
                        })
                        .collect();
                    return Ok((pos, pairs));
                }
            }
            Some(CompletableCommand::Unrecognized(cmd, mb_subcmd_part)) => {
                if let Some(subcommands) = self.subcommand_hints.get(cmd) {
                    let pos = cmd.len() + 1;
                    let subcmd_part = mb_subcmd_part.unwrap_or_default();
                    let subcommands = subcommands
                        .iter()
                        .filter(|&subcmd| subcmd.starts_with(subcmd_part))
                        .map(|subcmd| Pair {
                            display: subcmd.to_string(),
                            replacement: subcmd.to_string(),
                        })
                        .collect();

                    return Ok((pos, subcommands));
                }
            }
            None => {}
        }

        let pairs = self
            .commands
            .iter()
            .filter(|&cmd| cmd.long.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.display_with_short(),
                replacement: cmd.long.clone(),
            })
            .collect();
        Ok((0, pairs))
    }
}

#[derive(Helper, Hinter, Validator)]
pub struct RLHelper {
    pub completer: Arc<Mutex<CommandCompleter>>,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    pub colored_prompt: String,
}

impl Completer for RLHelper {
    type Candidate = <CommandCompleter as Completer>::Candidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        self.completer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .complete(line, pos, ctx)
    }

    fn update(&self, line: &mut LineBuffer, start: usize, elected: &str, cl: &mut Changeset) {
        self.completer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(line, start, elected, cl)
    }
}

impl Highlighter for RLHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default && self.colored_prompt.contains(prompt) {
            Borrowed(&self.colored_prompt)
        } else {
            Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(format!("{}", hint.with(Color::Grey)))
    }
}

pub type PSEditor = Editor<RLHelper, FileHistory>;

pub fn create_editor<'a>(
    prompt: &str,
    commands: impl IntoIterator<Item = &'a CommandNode>,
) -> anyhow::Result<PSEditor> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let h = RLHelper {
        completer: Arc::new(Mutex::new(CommandCompleter::new(commands))),
        hinter: HistoryHinter {},
        colored_prompt: format!("{}", prompt.with(Color::DarkGreen)),
    };

    let mut editor = Editor::with_history(config, FileHistory::new())?;
    editor.set_helper(Some(h));
    Ok(editor)
}

/// Terminal line source backed by `rustyline`.
pub struct RustylineSource {
    editor: PSEditor,
    history_file: Option<PathBuf>,
}

impl RustylineSource {
    /// Create a terminal line source, `save_history` keeps history between sessions.
    pub fn new<'a>(
        prompt: &str,
        commands: impl IntoIterator<Item = &'a CommandNode>,
        save_history: bool,
    ) -> anyhow::Result<Self> {
        let mut editor = create_editor(prompt, commands)?;
        let history_file = save_history
            .then(home::home_dir)
            .flatten()
            .map(|home| home.join(HISTORY_FILE));
        if let Some(ref path) = history_file {
            if path.exists() {
                weak_error!(editor.load_history(path), "load history:");
            }
        }
        Ok(Self {
            editor,
            history_file,
        })
    }

    /// Set source file names for `break`/`kill` completion.
    pub fn set_file_hints(&mut self, files: impl IntoIterator<Item = String>) {
        if let Some(h) = self.editor.helper_mut() {
            h.completer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace_file_hints(files)
        }
    }

    /// Persist history if history file is enabled.
    pub fn save_history(&mut self) -> anyhow::Result<()> {
        if let Some(ref path) = self.history_file {
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::EndOfInput),
            Err(e) => Err(e.into()),
        }
    }

    fn add_history(&mut self, line: &str) {
        weak_error!(self.editor.add_history_entry(line));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ui::command::parser::Dispatcher;
    use rustyline::history::MemHistory;

    #[test]
    fn test_completion() {
        let dispatcher = Dispatcher::new();
        let mut completer = CommandCompleter::new(dispatcher.commands());
        completer.replace_file_hints(["main.c".to_string(), "util.c".to_string()]);
        let history = MemHistory::new();
        let ctx = Context::new(&history);

        let (pos, pairs) = completer.complete("b ma", 4, &ctx).unwrap();
        assert_eq!(pos, 2);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "main.c:");

        let (pos, pairs) = completer.complete("info st", 7, &ctx).unwrap();
        assert_eq!(pos, 5);
        let names: Vec<_> = pairs.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, vec!["stack", "states", "stats", "state"]);

        let (_, pairs) = completer.complete("gen", 3, &ctx).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].replacement, "generate-input");
    }
}
