//! Command tree.
//!
//! Leaf nodes own an argument grammar and produce a [`Command`], group nodes own a prefix and an
//! ordered list of children. Parsing is done in two phases: prefix against the first token, then
//! the full grammar against the remaining ones. The phases are distinguishable: a wrong prefix
//! is [`ParseError::UnknownCommand`], right prefix with bad arguments is any other error.

use crate::ui::command::{Command, ParseError};

const DOC_COLUMN: usize = 28;

/// Single positional value.
#[derive(Debug, Clone)]
pub struct Positional {
    pub name: &'static str,
    pub required: bool,
    /// Allowed values, any value is allowed if empty.
    pub choices: &'static [&'static str],
}

/// Flag option, all aliases are equal.
#[derive(Debug, Clone)]
pub struct Flag {
    pub aliases: &'static [&'static str],
    pub doc: &'static str,
}

/// Argument grammar of a leaf command.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub positional: Option<Positional>,
    /// Name of repeated numeric values.
    pub numbers: Option<&'static str>,
    /// Name of repeated free words.
    pub words: Option<&'static str>,
    /// Mutually exclusive flags.
    pub flags: Vec<Flag>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: &'static str) -> Self {
        self.positional = Some(Positional {
            name,
            required: true,
            choices: &[],
        });
        self
    }

    pub fn opt_value(mut self, name: &'static str) -> Self {
        self.positional = Some(Positional {
            name,
            required: false,
            choices: &[],
        });
        self
    }

    pub fn one_of(mut self, name: &'static str, choices: &'static [&'static str]) -> Self {
        self.positional = Some(Positional {
            name,
            required: false,
            choices,
        });
        self
    }

    pub fn numbers(mut self, name: &'static str) -> Self {
        self.numbers = Some(name);
        self
    }

    pub fn words(mut self, name: &'static str) -> Self {
        self.words = Some(name);
        self
    }

    pub fn flag(mut self, aliases: &'static [&'static str], doc: &'static str) -> Self {
        self.flags.push(Flag { aliases, doc });
        self
    }

    fn synopsis(&self) -> String {
        let mut parts = vec![];
        if !self.flags.is_empty() {
            let flags = self
                .flags
                .iter()
                .map(|f| f.aliases.join("|"))
                .collect::<Vec<_>>()
                .join("|");
            parts.push(format!("[{flags}]"));
        }
        if let Some(ref pos) = self.positional {
            let name = if pos.choices.is_empty() {
                pos.name.to_string()
            } else {
                pos.choices.join("|")
            };
            if pos.required {
                parts.push(format!("<{name}>"));
            } else {
                parts.push(format!("[{name}]"));
            }
        }
        if let Some(numbers) = self.numbers {
            parts.push(format!("[{numbers}...]"));
        }
        if let Some(words) = self.words {
            parts.push(format!("[{words}...]"));
        }
        parts.join(" ")
    }
}

/// Arguments collected by a leaf grammar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// Leaf name, for error reporting.
    pub command: String,
    pub value: Option<String>,
    pub numbers: Vec<u32>,
    pub words: Vec<String>,
    /// First alias of a chosen flag.
    pub flag: Option<&'static str>,
}

pub type Build = fn(Args) -> Result<Command, ParseError>;

#[derive(Debug)]
pub struct Leaf {
    /// Prefix aliases, the first one is the command name. Empty prefix matches any input.
    prefix: &'static [&'static str],
    /// Names of enclosing groups.
    parent: String,
    /// Name used in error messages when the prefix is empty.
    label: Option<&'static str>,
    doc: &'static str,
    grammar: Grammar,
    build: Build,
}

#[derive(Debug)]
pub struct Group {
    prefix: &'static [&'static str],
    parent: String,
    doc: &'static str,
    children: Vec<CommandNode>,
}

#[derive(Debug)]
pub enum CommandNode {
    Leaf(Leaf),
    Group(Group),
}

/// Parsing failure and the most specific node matched by prefix.
#[derive(Debug)]
pub struct NodeError<'a> {
    pub error: ParseError,
    pub node: Option<&'a CommandNode>,
}

impl ParseError {
    fn at(self, node: &CommandNode) -> NodeError<'_> {
        NodeError {
            error: self,
            node: Some(node),
        }
    }
}

fn pad_doc(synopsis: &str, doc: &str) -> String {
    if synopsis.len() >= DOC_COLUMN {
        format!("{synopsis} {doc}")
    } else {
        format!("{synopsis:<DOC_COLUMN$}{doc}")
    }
}

impl CommandNode {
    pub fn leaf(
        prefix: &'static [&'static str],
        doc: &'static str,
        grammar: Grammar,
        build: Build,
    ) -> Self {
        CommandNode::Leaf(Leaf {
            prefix,
            parent: String::default(),
            label: None,
            doc,
            grammar,
            build,
        })
    }

    pub fn group(
        prefix: &'static [&'static str],
        doc: &'static str,
        children: impl IntoIterator<Item = CommandNode>,
    ) -> Self {
        let name = prefix.first().copied().unwrap_or_default();
        let children = children
            .into_iter()
            .map(|mut child| {
                child.set_parent(name);
                child
            })
            .collect();
        CommandNode::Group(Group {
            prefix,
            parent: String::default(),
            doc,
            children,
        })
    }

    /// Name a leaf that matches any input, groups are left as is.
    pub fn labeled(mut self, label: &'static str) -> Self {
        if let CommandNode::Leaf(ref mut leaf) = self {
            leaf.label = Some(label);
        }
        self
    }

    fn set_parent(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let parent = match self {
            CommandNode::Leaf(leaf) => &mut leaf.parent,
            CommandNode::Group(group) => {
                group
                    .children
                    .iter_mut()
                    .for_each(|child| child.set_parent(name));
                &mut group.parent
            }
        };
        *parent = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{name} {parent}")
        };
    }

    fn prefix(&self) -> &'static [&'static str] {
        match self {
            CommandNode::Leaf(leaf) => leaf.prefix,
            CommandNode::Group(group) => group.prefix,
        }
    }

    /// Command name, the first prefix alias.
    pub fn name(&self) -> &'static str {
        self.prefix().first().copied().unwrap_or_default()
    }

    /// Invocation path, enclosing group names and own name.
    pub fn path(&self) -> String {
        match self {
            CommandNode::Leaf(leaf) => leaf.path(),
            CommandNode::Group(group) => group.path(),
        }
    }

    /// All aliases of the node.
    pub fn aliases(&self) -> &'static [&'static str] {
        self.prefix()
    }

    pub fn children(&self) -> &[CommandNode] {
        match self {
            CommandNode::Leaf(_) => &[],
            CommandNode::Group(group) => &group.children,
        }
    }

    fn is_root(&self) -> bool {
        self.prefix().is_empty() && matches!(self, CommandNode::Group(_))
    }

    /// One line synopsis padded to documentation column plus description.
    /// For groups, one line per child.
    pub fn doc_string(&self) -> String {
        match self {
            CommandNode::Leaf(leaf) => pad_doc(&leaf.synopsis(), leaf.doc),
            CommandNode::Group(group) => group
                .children
                .iter()
                .map(|child| child.doc_string())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Full usage text.
    pub fn usage(&self) -> String {
        match self {
            CommandNode::Leaf(leaf) => {
                let mut usage = format!("USAGE:\n  {}\n\n{}\n", leaf.synopsis(), leaf.doc);
                for flag in &leaf.grammar.flags {
                    usage += &format!("  {}\n", pad_doc(&flag.aliases.join(", "), flag.doc));
                }
                usage
            }
            CommandNode::Group(_) if self.is_root() => format!("{}\n", self.doc_string()),
            CommandNode::Group(group) => {
                format!("{}\n\nUSAGE:\n{}\n", group.doc, self.doc_string())
            }
        }
    }

    fn match_prefix<'t>(&self, tokens: &'t [String]) -> Option<&'t [String]> {
        let prefix = self.prefix();
        if prefix.is_empty() {
            return Some(tokens);
        }
        let (first, rest) = tokens.split_first()?;
        prefix.contains(&first.as_str()).then_some(rest)
    }

    /// Parse tokens into a command.
    pub fn parse(&self, tokens: &[String]) -> Result<Command, NodeError<'_>> {
        let unknown = NodeError {
            error: ParseError::UnknownCommand,
            node: None,
        };
        let Some(rest) = self.match_prefix(tokens) else {
            return Err(unknown);
        };

        match self {
            CommandNode::Leaf(leaf) => leaf.parse(rest).map_err(|e| e.at(self)),
            CommandNode::Group(group) => {
                if rest.is_empty() {
                    return if self.is_root() {
                        Err(unknown)
                    } else {
                        Err(ParseError::MissingArgument(self.path()).at(self))
                    };
                }

                for child in &group.children {
                    match child.parse(rest) {
                        Ok(cmd) => return Ok(cmd),
                        Err(NodeError {
                            error: ParseError::UnknownCommand,
                            ..
                        }) => continue,
                        Err(e) => return Err(e),
                    }
                }

                if self.is_root() {
                    Err(unknown)
                } else {
                    Err(ParseError::UnsupportedArgument(self.path(), rest[0].clone()).at(self))
                }
            }
        }
    }

    /// Find the most specific node matched by prefixes of the tokens.
    pub fn find(&self, tokens: &[String]) -> Option<&CommandNode> {
        let rest = self.match_prefix(tokens)?;
        match self {
            CommandNode::Leaf(_) => Some(self),
            CommandNode::Group(group) => {
                let child = group
                    .children
                    .iter()
                    .filter(|child| !child.prefix().is_empty())
                    .find_map(|child| child.find(rest));
                match child {
                    Some(child) => Some(child),
                    None if self.is_root() => None,
                    None => Some(self),
                }
            }
        }
    }
}

impl Group {
    fn path(&self) -> String {
        let name = self.prefix.first().copied().unwrap_or_default();
        if self.parent.is_empty() {
            name.to_string()
        } else {
            format!("{} {name}", self.parent)
        }
    }
}

impl Leaf {
    fn path(&self) -> String {
        let name = self
            .prefix
            .first()
            .copied()
            .or(self.label)
            .unwrap_or_default();
        match (self.parent.is_empty(), name.is_empty()) {
            (true, _) => name.to_string(),
            (false, true) => self.parent.clone(),
            (false, false) => format!("{} {name}", self.parent),
        }
    }

    fn synopsis(&self) -> String {
        let mut synopsis = self.parent.clone();
        if !self.prefix.is_empty() {
            if !synopsis.is_empty() {
                synopsis.push(' ');
            }
            synopsis.push_str(&self.prefix.join("|"));
        }
        let args = self.grammar.synopsis();
        if !args.is_empty() {
            if !synopsis.is_empty() {
                synopsis.push(' ');
            }
            synopsis.push_str(&args);
        }
        synopsis
    }

    fn parse(&self, tokens: &[String]) -> Result<Command, ParseError> {
        let name = self.path();
        let grammar = &self.grammar;
        let mut args = Args {
            command: name.clone(),
            ..Default::default()
        };

        for token in tokens {
            let looks_like_flag =
                token.starts_with('-') && token.len() > 1 && token.parse::<i64>().is_err();
            if looks_like_flag {
                let flag = grammar
                    .flags
                    .iter()
                    .find(|f| f.aliases.contains(&token.as_str()))
                    .ok_or_else(|| ParseError::UnsupportedArgument(name.clone(), token.clone()))?;
                let flag_name = flag.aliases[0];
                match args.flag {
                    Some(chosen) if chosen != flag_name => {
                        return Err(ParseError::ConflictingOption(name));
                    }
                    _ => args.flag = Some(flag_name),
                }
                continue;
            }

            if let Some(ref pos) = grammar.positional {
                if args.value.is_none() {
                    if !pos.choices.is_empty() && !pos.choices.contains(&token.as_str()) {
                        return Err(ParseError::UnsupportedArgument(name, token.clone()));
                    }
                    args.value = Some(token.clone());
                    continue;
                }
            }

            if grammar.numbers.is_some() {
                let number = token
                    .parse::<u32>()
                    .map_err(|_| ParseError::UnsupportedArgument(name.clone(), token.clone()))?;
                args.numbers.push(number);
                continue;
            }

            if grammar.words.is_some() {
                args.words.push(token.clone());
                continue;
            }

            return Err(ParseError::UnsupportedArgument(name, token.clone()));
        }

        if let Some(ref pos) = grammar.positional {
            if pos.required && args.value.is_none() {
                return Err(ParseError::MissingArgument(name));
            }
        }

        (self.build)(args)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ui::command::print::Command as PrintCommand;
    use crate::ui::command::r#break::Command as BreakCommand;

    fn tokens(input: &str) -> Vec<String> {
        input.split_whitespace().map(ToString::to_string).collect()
    }

    fn tree() -> CommandNode {
        CommandNode::group(
            &[],
            "",
            [
                CommandNode::leaf(
                    &["break", "b"],
                    "Set a breakpoint",
                    Grammar::new().value("file:line|func"),
                    |args| Ok(Command::Print(PrintCommand::Variable(args.value.unwrap_or_default()))),
                ),
                CommandNode::leaf(
                    &["delete", "d"],
                    "Delete breakpoints",
                    Grammar::new().numbers("ids"),
                    |args| Ok(Command::Breakpoint(BreakCommand::Delete(args.numbers))),
                ),
                CommandNode::group(
                    &["info"],
                    "Show various information",
                    [CommandNode::leaf(
                        &["states"],
                        "Print all states",
                        Grammar::new()
                            .flag(&["--compact", "-c"], "Use compact representation")
                            .flag(&["--full", "-f"], "Use full representation"),
                        |args| Ok(Command::Help(args.flag.into_iter().map(String::from).collect())),
                    )],
                ),
            ],
        )
    }

    #[test]
    fn test_two_phase_parse() {
        struct TestCase {
            input: &'static str,
            expected: Result<Command, ParseError>,
        }
        let cases = vec![
            TestCase {
                input: "break main.c:1",
                expected: Ok(Command::Print(PrintCommand::Variable("main.c:1".to_string()))),
            },
            TestCase {
                input: "break",
                expected: Err(ParseError::MissingArgument("break".to_string())),
            },
            TestCase {
                input: "brk",
                expected: Err(ParseError::UnknownCommand),
            },
            TestCase {
                input: "b main.c:1 extra",
                expected: Err(ParseError::UnsupportedArgument(
                    "break".to_string(),
                    "extra".to_string(),
                )),
            },
            TestCase {
                input: "d 1 2 3",
                expected: Ok(Command::Breakpoint(BreakCommand::Delete(vec![1, 2, 3]))),
            },
            TestCase {
                input: "d",
                expected: Ok(Command::Breakpoint(BreakCommand::Delete(vec![]))),
            },
            TestCase {
                input: "d 1 x",
                expected: Err(ParseError::UnsupportedArgument(
                    "delete".to_string(),
                    "x".to_string(),
                )),
            },
            TestCase {
                input: "info states -c",
                expected: Ok(Command::Help(vec!["--compact".to_string()])),
            },
            TestCase {
                input: "info states -c --compact",
                expected: Ok(Command::Help(vec!["--compact".to_string()])),
            },
            TestCase {
                input: "info states -c -f",
                expected: Err(ParseError::ConflictingOption("info states".to_string())),
            },
            TestCase {
                input: "info states -x",
                expected: Err(ParseError::UnsupportedArgument(
                    "info states".to_string(),
                    "-x".to_string(),
                )),
            },
            TestCase {
                input: "info",
                expected: Err(ParseError::MissingArgument("info".to_string())),
            },
            TestCase {
                input: "info nothing",
                expected: Err(ParseError::UnsupportedArgument(
                    "info".to_string(),
                    "nothing".to_string(),
                )),
            },
        ];

        let root = tree();
        for tc in cases {
            let result = root.parse(&tokens(tc.input)).map_err(|e| e.error);
            assert_eq!(result, tc.expected, "input: {}", tc.input);
        }
    }

    #[test]
    fn test_most_specific_node() {
        let root = tree();

        let err = root.parse(&tokens("info states -x")).unwrap_err();
        assert_eq!(err.node.unwrap().path(), "info states");

        let err = root.parse(&tokens("info nothing")).unwrap_err();
        assert_eq!(err.node.unwrap().path(), "info");

        let err = root.parse(&tokens("unknown")).unwrap_err();
        assert!(err.node.is_none());

        assert_eq!(root.find(&tokens("info states")).unwrap().path(), "info states");
        assert_eq!(root.find(&tokens("info")).unwrap().path(), "info");
        assert_eq!(root.find(&tokens("b")).unwrap().path(), "break");
        assert!(root.find(&tokens("nothing")).is_none());
    }

    #[test]
    fn test_doc_string() {
        let root = tree();
        let delete = root.find(&tokens("delete")).unwrap();
        assert_eq!(
            delete.doc_string(),
            "delete|d [ids...]           Delete breakpoints"
        );

        let info = root.find(&tokens("info")).unwrap();
        assert_eq!(
            info.doc_string(),
            "info states [--compact|-c|--full|-f] Print all states"
        );

        let usage = root.usage();
        assert!(usage.contains("break|b <file:line|func>    Set a breakpoint"));
        assert!(usage.contains("delete|d [ids...]"));
    }
}
