//! Text representation of debugger entities.

use crate::debugger::breakpoint::{BreakpointKind, BreakpointView};
use crate::debugger::engine::{Engine, InstructionSite, StateId, StateSnapshot, Statistics};
use crate::debugger::{InputReport, SourcePlace};
use crate::ui::console::file::FileView;
use crate::ui::console::print::style::{
    FilePathView, FunctionNameView, InstructionView, KeywordView, StateView,
};
use itertools::Itertools;

const LABEL_WIDTH: usize = 12;
const NUM_WIDTH: usize = 9;
const CURRENT_MARKER: &str = "current state --> ";

/// Separator between states in a branch listing.
pub const SEPARATOR: &str = "--------------------------------------------------";

fn label(name: &str) -> String {
    format!("{:<LABEL_WIDTH$}", format!("{name}:"))
}

fn place_of(site: &InstructionSite) -> SourcePlace {
    SourcePlace {
        file: site.file.clone(),
        line: site.line,
    }
}

/// Source line of an instruction as `<line>  <text>`.
pub fn source_line(file_view: &FileView, site: &InstructionSite) -> String {
    if !site.has_source() {
        return "(no source information)".to_string();
    }
    match file_view.line(&place_of(site)) {
        Some(text) => format!("{}  {}", site.line, text.trim_end()),
        None => format!("{}:{}", FilePathView::from(site.file_name()), site.line),
    }
}

/// `file:line` of an instruction.
pub fn location(site: &InstructionSite) -> String {
    format!(
        "{} at {}:{}",
        FunctionNameView::from(&site.function),
        FilePathView::from(site.file_name()),
        site.line
    )
}

pub struct StateRenderer<'a, E: Engine> {
    engine: &'a E,
    file_view: &'a FileView,
}

impl<'a, E: Engine> StateRenderer<'a, E> {
    pub fn new(engine: &'a E, file_view: &'a FileView) -> Self {
        Self { engine, file_view }
    }

    /// Multiline state description, compact form is a single line.
    pub fn render(&self, snapshot: &StateSnapshot, compact: bool) -> String {
        let site = self.engine.site(snapshot.pc);
        let source = site
            .map(|site| source_line(self.file_view, site))
            .unwrap_or_default();

        if compact {
            let place = site
                .filter(|site| site.has_source())
                .map(|site| format!("{}:{}", FilePathView::from(site.file_name()), site.line));
            return format!(
                "{} {}",
                StateView::from(snapshot.id),
                place.unwrap_or_else(|| source.clone())
            );
        }

        let mut lines = vec![format!("{}{}", label("Address"), StateView::from(snapshot.id))];
        if let Some(site) = site {
            lines.push(format!("{}{}", label("Location"), location(site)));
        }
        lines.push(format!("{}{source}", label("Source")));
        if let Some(site) = site {
            lines.push(format!("{}{}", label("LLVM"), InstructionView::from(&site.text)));
        }
        if !snapshot.constraints.is_empty() {
            lines.push(format!("{}{}", label("Constraints"), snapshot.constraints.join(" && ")));
        }
        lines.join("\n")
    }

    /// All states with the current one marked.
    pub fn render_list(
        &self,
        states: &[StateSnapshot],
        current: Option<StateId>,
        compact: bool,
    ) -> String {
        let mut out = format!("Total number of states: {}\n", states.len());
        for snapshot in states {
            let marker = if Some(snapshot.id) == current {
                CURRENT_MARKER.to_string()
            } else {
                " ".repeat(CURRENT_MARKER.len())
            };
            let state = self.render(snapshot, compact);
            if compact {
                out += &format!("{marker}{state}\n");
            } else {
                out += &format!("{marker}\n{state}\n{SEPARATOR}\n");
            }
        }
        out
    }

    /// Call stack from the innermost frame.
    pub fn render_stack(&self, snapshot: &StateSnapshot) -> String {
        let mut out = String::from("stack dump:\n");
        let mut position = Some(snapshot.pc);
        for (num, frame) in snapshot.stack.iter().rev().enumerate() {
            let place = position
                .and_then(|pc| self.engine.site(pc))
                .filter(|site| site.has_source())
                .map(|site| format!("{}:{}", FilePathView::from(site.file_name()), site.line));
            out += &format!(
                "#{num} in {} at {}\n",
                FunctionNameView::from(&frame.function),
                place.unwrap_or_else(|| "???".to_string())
            );
            position = frame.caller;
        }
        out
    }
}

pub fn render_constraints(constraints: &[String]) -> String {
    if constraints.is_empty() {
        return "No constraints".to_string();
    }
    constraints.iter().join("\n")
}

pub fn render_stats(stats: &Statistics) -> String {
    [
        ("Executed instructions", stats.executed_instructions.to_string()),
        ("Forks", stats.forks.to_string()),
        ("Live states", stats.live_states.to_string()),
        ("Terminated states", stats.terminated_states.to_string()),
        ("Solver queries", stats.solver_queries.to_string()),
    ]
    .into_iter()
    .map(|(name, value)| format!("{:<24}{}", format!("{name}:"), value))
    .join("\n")
}

pub fn render_inputs(report: &InputReport) -> String {
    let mut out = format!("constraints for state:\n{}\n", render_constraints(&report.constraints));
    match report.inputs {
        None => out += "No satisfying input values found",
        Some(ref inputs) => {
            out += "Concrete input value(s) that will reach this path:";
            for (name, bytes) in inputs {
                let rendered: String = bytes.iter().map(|b| format!("\\{b:#04x}")).collect();
                out += &format!(
                    "\n{} (size {}): {rendered}",
                    KeywordView::from(name),
                    bytes.len()
                );
            }
        }
    }
    out
}

pub fn render_breakpoints(kind: BreakpointKind, list: &[BreakpointView]) -> String {
    if list.is_empty() {
        return format!("No {}s", kind.to_string().to_lowercase());
    }
    let mut out = format!("{:<NUM_WIDTH$}Location", "Num");
    for brkpt in list {
        out += &format!(
            "\n{:<NUM_WIDTH$}{}:{}",
            brkpt.number,
            FilePathView::from(&brkpt.file),
            brkpt.line
        );
    }
    out
}
