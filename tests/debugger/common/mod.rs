use pathstalker::debugger::{Debugger, DebuggerOptions};
use pathstalker::playground::{Playground, RunOutcome};
use pathstalker::ui::config::{self, Config};
use pathstalker::ui::console::print::{OutputBuffer, Printer};
use pathstalker::ui::console::prompt::{InterruptFlag, ScriptedLines};
use pathstalker::ui::console::Controller;

/// Address of the initial state.
pub const FIRST_STATE: &str = "@0x50000000";
/// Address of the state forked by the first fork.
pub const SECOND_STATE: &str = "@0x50000040";

/// `main` forks at line 4: the first branch (`x == 0`) stays in the initial state and goes
/// through `helper`, the second one (`x != 0`) is forked and fails at line 11.
pub const PROGRAM: &str = r#"
[[function]]
name = "main"
file = "test.c"
line = 1
scope = 1

[[function.instruction]]
op = "alloca"
var = "x"
line = 2

[[function.instruction]]
op = "symbolic"
var = "x"
line = 3

[[function.instruction]]
op = "fork"
line = 4
branches = [
    { constraint = "(Eq 0 x)", inputs = { x = [0, 0, 0, 0] } },
    { constraint = "(Ne 0 x)", target = "nonzero", inputs = { x = [1, 0, 0, 0] } },
]

[[function.instruction]]
op = "alloca"
var = "y"
line = 5
scope = 2
parent = 1

[[function.instruction]]
op = "store"
var = "y"
value = 5
line = 6
scope = 2
parent = 1

[[function.instruction]]
op = "call"
callee = "helper"
line = 7
scope = 2
parent = 1

[[function.instruction]]
op = "ret"
line = 8

[[function.instruction]]
label = "nonzero"
op = "alloca"
var = "y"
line = 10
scope = 3
parent = 1

[[function.instruction]]
op = "store"
var = "y"
value = 7
line = 10
scope = 3
parent = 1

[[function.instruction]]
op = "error"
message = "division by zero"
line = 11

[[function]]
name = "helper"
file = "util.c"
line = 21

[[function.instruction]]
op = "value"
var = "tmp"
value = 42
line = 21

[[function.instruction]]
op = "nop"
file = ""
text = "call void @llvm.dbg.declare()"

[[function.instruction]]
op = "ret"
line = 22
"#;

/// Single state whose only path is unsatisfiable.
pub const UNSAT_PROGRAM: &str = r#"
[[function]]
name = "main"
file = "unsat.c"
line = 1

[[function.instruction]]
op = "fork"
line = 2
branches = [
    { constraint = "false" },
    { constraint = "true", target = "end" },
]

[[function.instruction]]
op = "nop"
line = 3

[[function.instruction]]
label = "end"
op = "ret"
line = 4
"#;

/// Path that ends with a fork, the second branch loops back.
pub const TRAILING_FORK_PROGRAM: &str = r#"
[[function]]
name = "main"
file = "last.c"
line = 1

[[function.instruction]]
label = "start"
op = "nop"
line = 1

[[function.instruction]]
op = "fork"
line = 2
branches = [
    { constraint = "(Eq 0 x)" },
    { constraint = "(Ne 0 x)", target = "start" },
]
"#;

/// Debugging session over a playground program driven by a command script.
pub struct Session {
    pub engine: Playground,
    pub controller: Controller<ScriptedLines>,
    pub output: OutputBuffer,
    pub interrupt: InterruptFlag,
}

impl Session {
    pub fn new(program: &str, script: &[&str]) -> Self {
        Self::with_options(program, script, DebuggerOptions::default())
    }

    pub fn with_options(program: &str, script: &[&str], options: DebuggerOptions) -> Self {
        config::set(Config {
            colored: false,
            ..Default::default()
        });

        let engine = Playground::from_toml(program).unwrap();
        let (printer, output) = Printer::buffered();
        let interrupt = InterruptFlag::new();
        let controller = Controller::new(
            Debugger::new(options),
            ScriptedLines::new(script.iter().copied()),
            printer,
            interrupt.clone(),
        );
        Self {
            engine,
            controller,
            output,
            interrupt,
        }
    }

    pub fn run(&mut self) -> RunOutcome {
        self.engine.run(&mut self.controller)
    }

    pub fn prompts(&self) -> &[String] {
        self.controller.lines().prompts()
    }
}

/// Assert that text contains every fragment, in order.
#[macro_export]
macro_rules! assert_contains_in_order {
    ($text: expr, [$($fragment: expr),+ $(,)?]) => {{
        let text: &str = &$text;
        let mut rest = text;
        $(
            match rest.find($fragment) {
                Some(pos) => rest = &rest[pos + $fragment.len()..],
                None => panic!("{:?} not found in order in:\n{}", $fragment, text),
            }
        )+
    }};
}
