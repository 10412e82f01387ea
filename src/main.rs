use clap::Parser;
use log::warn;
use pathstalker::debugger::Debugger;
use pathstalker::playground::{Playground, RunOutcome};
use pathstalker::ui::command::parser::Dispatcher;
use pathstalker::ui::config::{self, Config, Theme};
use pathstalker::ui::console::editor::RustylineSource;
use pathstalker::ui::console::print::Printer;
use pathstalker::ui::console::prompt::InterruptFlag;
use pathstalker::ui::console::{options_from_config, Controller, LOGGER_ONCE, PROMPT};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Playground program (TOML) to debug
    program: PathBuf,

    /// Configuration file, default is ~/.config/pstalker/config.toml
    #[clap(long, env = "PSTALKER_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[clap(long)]
    no_color: bool,

    /// Show prompt when a state hits an execution error
    #[clap(long)]
    stop_on_error: bool,

    /// Syntax highlighting theme
    #[clap(long)]
    theme: Option<Theme>,

    /// Keep command history between sessions
    #[clap(long)]
    save_history: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    LOGGER_ONCE.call_once(env_logger::init);

    let mut config = Config::load(args.config.as_deref());
    config.colored &= !args.no_color;
    config.stop_on_error |= args.stop_on_error;
    config.save_history |= args.save_history;
    if let Some(theme) = args.theme {
        config.theme = theme;
    }
    let save_history = config.save_history;
    config::set(config);

    let mut engine = Playground::load(&args.program)?;

    let interrupt = InterruptFlag::new();
    {
        let interrupt = interrupt.clone();
        if let Err(e) = ctrlc::set_handler(move || interrupt.set()) {
            warn!(target: "debugger", "install ctrl-c handler: {e}");
        }
    }

    let dispatcher = Dispatcher::new();
    let mut lines = RustylineSource::new(PROMPT, dispatcher.commands(), save_history)?;
    lines.set_file_hints(engine.program().source_files());

    let debugger = Debugger::new(options_from_config());
    let mut controller = Controller::new(debugger, lines, Printer::stdout(), interrupt);
    controller.greet();

    let outcome = engine.run(&mut controller);
    if outcome == RunOutcome::Exhausted {
        println!("All states terminated");
    }

    controller.lines_mut().save_history()?;
    Ok(())
}
