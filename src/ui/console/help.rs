pub const WELCOME_TEXT: &str = r#"
pathstalker greets
Execution stops at the first instruction, type `help` for a list of commands.
"#;

pub const SELECTION_HELP: &str = "\
Enter the number of a state to continue with it, add `-t` to terminate all the others.
End of input or Ctrl-C halts the engine.";
