pub mod arbiter;
pub mod breakpoint;
pub mod engine;
pub mod error;
pub mod location;
pub mod symbol;

pub use error::Error;

use crate::debugger::arbiter::{ArbiterState, BranchArbiter, Decision};
use crate::debugger::breakpoint::{
    Breakpoint, BreakpointKind, BreakpointRegistry, BreakpointView, DeleteOutcome,
};
use crate::debugger::engine::{
    basename, Engine, Expr, InstructionId, ScopeKey, StateId, StateSnapshot,
};
use crate::debugger::location::LocationSpec;
use crate::debugger::symbol::SymbolValue;
use log::{debug, info};
use std::collections::HashMap;

/// Policy for the next control points.
///
/// Anything but [`ExecutionMode::Free`] makes the debugger ask the operator which state survives
/// when execution branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Stop at breakpoints only, forks are resolved automatically.
    Free,
    /// Stop when the source line changes.
    Stepping,
    /// Stop at every instruction.
    #[default]
    SteppingInstruction,
    /// Like [`ExecutionMode::Free`], but stop when execution branches.
    StopOnBranchRequested,
}

#[derive(Debug, Clone, Copy)]
pub struct DebuggerOptions {
    /// Use one line state representation.
    pub compact: bool,
    /// Show prompt when a state hits an execution error.
    pub stop_on_error: bool,
    /// State lists longer than this are always rendered in compact form.
    pub compact_threshold: usize,
}

impl Default for DebuggerOptions {
    fn default() -> Self {
        Self {
            compact: false,
            stop_on_error: false,
            compact_threshold: 3,
        }
    }
}

/// Reason to interrupt the engine at a control point.
#[derive(Debug, Clone, PartialEq)]
pub enum Trap {
    Breakpoint(Breakpoint),
    /// Killpoint reached, `state` already terminated.
    Killpoint {
        breakpoint: Breakpoint,
        state: StateId,
    },
    /// Step (or instruction step) finished.
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateDirection {
    Next,
    Prev,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminateTarget {
    Current,
    Others,
}

/// Result of state termination.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminateOutcome {
    pub terminated: usize,
    /// Current state after termination.
    pub current: Option<StateId>,
}

/// Concrete input values that lead to a state.
#[derive(Debug, Clone, PartialEq)]
pub struct InputReport {
    pub constraints: Vec<String>,
    /// `None` if constraints are unsatisfiable.
    pub inputs: Option<Vec<(String, Vec<u8>)>>,
}

/// Source code fragment to show.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlace {
    /// File path as recorded in debug info.
    pub file: String,
    pub line: u64,
}

/// Engine agnostic debugger core: breakpoints, branch arbitration and stepping policy.
///
/// Engine is not owned by the debugger, every operation that needs engine receives it as an
/// argument.
pub struct Debugger {
    breakpoints: BreakpointRegistry,
    arbiter: BranchArbiter,
    mode: ExecutionMode,
    options: DebuggerOptions,
    /// Instruction where each state stopped last time.
    last_stepped: HashMap<StateId, InstructionId>,
}

impl Debugger {
    pub fn new(options: DebuggerOptions) -> Self {
        Self {
            breakpoints: BreakpointRegistry::default(),
            arbiter: BranchArbiter::default(),
            mode: ExecutionMode::default(),
            options,
            last_stepped: HashMap::new(),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn options(&self) -> &DebuggerOptions {
        &self.options
    }

    pub fn arbiter(&self) -> &BranchArbiter {
        &self.arbiter
    }

    pub fn breakpoints(&self) -> &BreakpointRegistry {
        &self.breakpoints
    }

    /// Resume execution until the next breakpoint.
    pub fn continue_execution(&mut self, stop_on_branch: bool) {
        self.mode = if stop_on_branch {
            ExecutionMode::StopOnBranchRequested
        } else {
            ExecutionMode::Free
        };
    }

    /// Resume execution until the end of program, breakpoints are removed, killpoints stay.
    pub fn run<E: Engine>(&mut self, engine: &mut E) -> usize {
        self.mode = ExecutionMode::Free;
        self.breakpoints.remove_kind(BreakpointKind::Stop, engine)
    }

    pub fn step(&mut self) {
        self.mode = ExecutionMode::Stepping;
    }

    pub fn step_instruction(&mut self) {
        self.mode = ExecutionMode::SteppingInstruction;
    }

    pub fn add_breakpoint<E: Engine>(
        &mut self,
        engine: &mut E,
        location: &str,
        kind: BreakpointKind,
    ) -> Result<BreakpointView<'_>, Error> {
        self.breakpoints.add(location, kind, engine)
    }

    pub fn delete_breakpoints<E: Engine>(
        &mut self,
        engine: &mut E,
        numbers: &[u32],
    ) -> DeleteOutcome {
        self.breakpoints.delete(numbers, engine)
    }

    pub fn breakpoint_list(&self, kind: Option<BreakpointKind>) -> Vec<BreakpointView<'_>> {
        self.breakpoints.list(kind)
    }

    /// Ask scheduler about new states and decide whether operator must choose a survivor.
    ///
    /// In free mode the state is selected here.
    pub fn detect_fork<E: Engine>(&mut self, engine: &mut E) -> Decision {
        let added = engine.states_added_since_last_check();
        let decision = self.arbiter.detect(self.mode, added);
        if let Decision::Auto { selected, .. } = &decision {
            info!(target: "debugger", "continue execution from state {selected}");
            engine.select_state(*selected);
        }
        decision
    }

    /// Choose a survivor between forked states by 1-based index.
    pub fn select_branch<E: Engine>(
        &mut self,
        engine: &mut E,
        index: usize,
        terminate_others: bool,
    ) -> Result<StateId, Error> {
        let state = self.arbiter.select(index)?;
        engine.select_state(state);
        if terminate_others {
            engine.terminate_all_except(state);
            self.forget_dead_states(&*engine);
        }
        self.mode = ExecutionMode::SteppingInstruction;
        Ok(state)
    }

    /// Abandon arbitration in progress.
    pub fn cancel_arbitration(&mut self) {
        self.arbiter.reset();
    }

    /// Control goes back to the engine, a resolved fork is forgotten and the arbiter waits for
    /// the next one.
    pub fn release_arbiter(&mut self) {
        if let &ArbiterState::Resolved(state) = self.arbiter.state() {
            debug!(target: "debugger", "fork resolved with state {state}, arbiter armed");
            self.arbiter.reset();
        }
    }

    /// Check breakpoint markers and stepping policy for the current state.
    ///
    /// A killpoint terminates the state immediately.
    pub fn check_trap<E: Engine>(&mut self, engine: &mut E) -> Result<Option<Trap>, Error> {
        let state = engine.current_state().ok_or(Error::NoStates)?;
        let snapshot = engine.snapshot(state).ok_or(Error::UnknownState(state))?;
        let pc = snapshot.pc;

        if let Some(brkpt) = self.breakpoints.hit(pc, &*engine).cloned() {
            return match brkpt.kind {
                BreakpointKind::Kill => {
                    debug!(target: "debugger", "killpoint {} terminates state {state}", brkpt.number);
                    engine.terminate(state);
                    self.last_stepped.remove(&state);
                    Ok(Some(Trap::Killpoint {
                        breakpoint: brkpt,
                        state,
                    }))
                }
                BreakpointKind::Stop => {
                    self.last_stepped.insert(state, pc);
                    Ok(Some(Trap::Breakpoint(brkpt)))
                }
            };
        }

        let stop = match self.mode {
            ExecutionMode::Free | ExecutionMode::StopOnBranchRequested => false,
            ExecutionMode::SteppingInstruction => true,
            ExecutionMode::Stepping => {
                let Some(site) = engine.site(pc) else {
                    return Ok(None);
                };
                if !site.has_source() {
                    return Ok(None);
                }
                self.last_stepped
                    .get(&state)
                    .and_then(|last| engine.site(*last))
                    .map(|last| last.file != site.file || last.line != site.line)
                    .unwrap_or(true)
            }
        };

        if stop {
            self.last_stepped.insert(state, pc);
            return Ok(Some(Trap::Step));
        }
        Ok(None)
    }

    /// Remember the current instruction of a state that stopped for a reason other than a trap.
    pub fn mark_stopped<E: Engine>(&mut self, engine: &E) {
        if let Some(state) = engine.current_state() {
            if let Some(snapshot) = engine.snapshot(state) {
                self.last_stepped.insert(state, snapshot.pc);
            }
        }
    }

    /// Snapshot of the current state.
    pub fn current_snapshot<E: Engine>(&self, engine: &E) -> Result<StateSnapshot, Error> {
        let state = engine.current_state().ok_or(Error::NoStates)?;
        engine.snapshot(state).ok_or(Error::UnknownState(state))
    }

    /// Lexical block of the last executed instruction.
    fn focus_scope<E: Engine>(engine: &E, snapshot: &StateSnapshot) -> Option<ScopeKey> {
        let pc = snapshot.prev_pc.unwrap_or(snapshot.pc);
        engine.site(pc).and_then(|site| site.scope).map(|scope| scope.key)
    }

    fn lookup_symbol<E: Engine>(
        &self,
        engine: &E,
        name: &str,
    ) -> Result<(StateId, SymbolValue), Error> {
        let snapshot = self.current_snapshot(engine)?;
        let key = Self::focus_scope(engine, &snapshot);
        let symbol = engine
            .symbols(snapshot.id)
            .and_then(|symbols| symbols.lookup(name, key))
            .cloned()
            .ok_or_else(|| Error::UnboundSymbol(name.to_string()))?;
        Ok((snapshot.id, symbol))
    }

    fn simplified_address<E: Engine>(engine: &E, state: StateId, address: &Expr) -> Expr {
        match address {
            Expr::Concrete(_) => address.clone(),
            Expr::Symbolic(_) => engine.simplify(state, address),
        }
    }

    /// Render current value (concrete or symbolic) of a variable visible at the current state.
    pub fn read_variable<E: Engine>(&self, engine: &E, name: &str) -> Result<String, Error> {
        let (state, symbol) = self.lookup_symbol(engine, name)?;

        if let (Some(address), Some(ty)) = (&symbol.address, &symbol.ty) {
            let address = Self::simplified_address(engine, state, address);
            return engine
                .read(state, &address, ty)
                .map_err(|e| Error::VariableAccess {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
        }

        symbol
            .value
            .and_then(|value| engine.read_value(state, value))
            .ok_or_else(|| Error::UnboundSymbol(name.to_string()))
    }

    /// Replace memory of a variable with a fresh symbolic value.
    pub fn make_symbolic<E: Engine>(&self, engine: &mut E, name: &str) -> Result<(), Error> {
        let (state, symbol) = self.lookup_symbol(&*engine, name)?;
        let address = symbol
            .address
            .as_ref()
            .ok_or_else(|| Error::UnboundSymbol(name.to_string()))?;
        let address = Self::simplified_address(&*engine, state, address);
        engine
            .make_symbolic(state, &address, name)
            .map_err(|e| Error::VariableAccess {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Switch current state to the neighbour in scheduler order.
    pub fn move_state<E: Engine>(
        &mut self,
        engine: &mut E,
        direction: StateDirection,
    ) -> Result<StateId, Error> {
        let current = engine.current_state().ok_or(Error::NoStates)?;
        match direction {
            StateDirection::Next => engine.advance_to_next_state(),
            StateDirection::Prev => {
                let states = engine.states();
                let pos = states
                    .iter()
                    .position(|s| *s == current)
                    .ok_or(Error::UnknownState(current))?;
                let prev = states[(pos + states.len() - 1) % states.len()];
                engine.select_state(prev);
            }
        }
        engine.current_state().ok_or(Error::NoStates)
    }

    /// Switch current state to the one with the given address.
    pub fn move_to_state<E: Engine>(
        &mut self,
        engine: &mut E,
        addr: u64,
    ) -> Result<StateId, Error> {
        let state = engine
            .state_at_address(addr)
            .ok_or(Error::StateNotFound(addr))?;
        engine.select_state(state);
        Ok(state)
    }

    pub fn terminate<E: Engine>(
        &mut self,
        engine: &mut E,
        target: TerminateTarget,
    ) -> Result<TerminateOutcome, Error> {
        let current = engine.current_state().ok_or(Error::NoStates)?;
        let before = engine.states().len();
        match target {
            TerminateTarget::Current => engine.terminate(current),
            TerminateTarget::Others => engine.terminate_all_except(current),
        }
        self.forget_dead_states(&*engine);
        Ok(TerminateOutcome {
            terminated: before.saturating_sub(engine.states().len()),
            current: engine.current_state(),
        })
    }

    fn forget_dead_states<E: Engine>(&mut self, engine: &E) {
        let alive = engine.states();
        self.last_stepped.retain(|state, _| alive.contains(state));
    }

    pub fn generate_input<E: Engine>(&self, engine: &E) -> Result<InputReport, Error> {
        let snapshot = self.current_snapshot(engine)?;
        Ok(InputReport {
            inputs: engine.concrete_inputs(snapshot.id),
            constraints: snapshot.constraints,
        })
    }

    /// Find source place for `list` command.
    ///
    /// No argument means current line, a number is a line in the current file,
    /// anything else is a function name.
    pub fn list_place<E: Engine>(
        &self,
        engine: &E,
        location: Option<&str>,
    ) -> Result<SourcePlace, Error> {
        let current_site = || -> Result<_, Error> {
            let snapshot = self.current_snapshot(engine)?;
            engine
                .site(snapshot.pc)
                .cloned()
                .ok_or(Error::UnknownState(snapshot.id))
        };

        match location {
            None => {
                let site = current_site()?;
                Ok(SourcePlace {
                    file: site.file,
                    line: site.line,
                })
            }
            Some(location) => {
                if let Ok(line) = location.parse::<u64>() {
                    let site = current_site()?;
                    return Ok(SourcePlace {
                        file: site.file,
                        line,
                    });
                }
                match LocationSpec::parse(location) {
                    LocationSpec::Function(name) => {
                        let info = engine
                            .function_info(&name)
                            .ok_or(Error::NoSuchFunction(name))?;
                        Ok(SourcePlace {
                            file: info.file,
                            line: info.line,
                        })
                    }
                    LocationSpec::Line { file, line } => {
                        let site = engine
                            .instructions()
                            .iter()
                            .find(|site| site.file_name() == basename(&file))
                            .ok_or(Error::NoSuchFile(file))?;
                        Ok(SourcePlace {
                            file: site.file.clone(),
                            line,
                        })
                    }
                }
            }
        }
    }

    /// Switch state representation, return `true` if compact mode is on.
    pub fn toggle_compact(&mut self) -> bool {
        self.options.compact = !self.options.compact;
        self.options.compact
    }

    /// Switch stop on error, return `true` if it is on.
    pub fn toggle_stop_on_error(&mut self) -> bool {
        self.options.stop_on_error = !self.options.stop_on_error;
        self.options.stop_on_error
    }
}
