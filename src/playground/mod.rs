//! Toy engine over a [`Program`] described in TOML.
//!
//! Not a symbolic executor: forks are declared in the program, constraints are opaque strings and
//! "solving" returns witness bytes declared next to fork branches. A path constraint `false`
//! makes a state unsatisfiable. It is enough to drive the debugger end to end.

pub mod program;

use crate::debugger::engine::{
    Action, ControlPoint, DebugInfoProvider, ExecutionScheduler, Expr, FrameSnapshot,
    FunctionInfo, InstructionId, InstructionSite, Marker, PathTerminator, StateId,
    StateSnapshot, Statistics, SymbolicEvaluator, TrapTable, TypeDesc, ValueId,
};
use crate::debugger::symbol::{Allocation, SymbolScope};
use anyhow::{anyhow, bail};
use indexmap::IndexMap;
use log::{debug, info};
use program::{Op, Program};
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;

pub use program::Branch;

/// Address of the first state, states are rendered as their address.
const STATE_BASE: u64 = 0x5000_0000;
const STATE_STRIDE: u64 = 0x40;
const STACK_BASE: u64 = 0x7ff0_0000;
const STACK_SLOT: u64 = 0x10;
const UNSAT_CONSTRAINT: &str = "false";

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Concrete(u64),
    Symbolic(String),
}

#[derive(Debug, Clone)]
struct Frame {
    function: String,
    caller: Option<InstructionId>,
    symbols: SymbolScope,
}

#[derive(Debug, Clone)]
struct PathState {
    pc: InstructionId,
    prev_pc: Option<InstructionId>,
    stack: Vec<Frame>,
    constraints: Vec<String>,
    memory: HashMap<u64, Slot>,
    /// Width in bits of every allocated slot.
    widths: HashMap<u64, u32>,
    registers: HashMap<ValueId, u64>,
    /// Symbolic inputs with witness bytes, in creation order.
    inputs: IndexMap<String, Vec<u8>>,
    next_address: u64,
}

impl PathState {
    fn is_unsat(&self) -> bool {
        self.constraints.iter().any(|c| c.trim() == UNSAT_CONSTRAINT)
    }

    fn address_of(&self, var: &str, site: &InstructionSite) -> Result<u64, String> {
        let scope = site.scope.map(|scope| scope.key);
        let address = self
            .stack
            .last()
            .and_then(|frame| frame.symbols.lookup(var, scope))
            .and_then(|symbol| symbol.address.as_ref());
        match address {
            Some(Expr::Concrete(address)) => Ok(*address),
            Some(Expr::Symbolic(expr)) => Err(format!("symbolic address of {var}: {expr}")),
            None => Err(format!("variable {var} is not allocated")),
        }
    }

    /// Return from the innermost frame, `None` if the path is finished.
    fn unwind(&mut self, program: &Program) -> Option<InstructionId> {
        loop {
            let frame = self.stack.pop()?;
            if let Some(next) = program.fallthrough(frame.caller?) {
                return Some(next);
            }
        }
    }

    fn follow(
        &mut self,
        branch: &Branch,
        fallthrough: Option<InstructionId>,
    ) -> Option<InstructionId> {
        self.constraints.push(branch.constraint.clone());
        for (name, bytes) in &branch.inputs {
            self.inputs.insert(name.clone(), bytes.clone());
        }
        branch.target.or(fallthrough)
    }
}

/// How a [`Playground::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// Every state finished or was terminated.
    Exhausted,
    /// Control point asked to stop.
    Halted,
}

/// Toy engine: scheduler, memory model and "solver" over a [`Program`].
pub struct Playground {
    program: Program,
    markers: Vec<Marker>,
    states: IndexMap<StateId, PathState>,
    current: Option<StateId>,
    added: Vec<StateId>,
    next_state: u64,
    executed_instructions: u64,
    forks: u64,
    terminated_states: u64,
    solver_queries: Cell<u64>,
}

impl Playground {
    pub fn new(program: Program) -> Self {
        let mut engine = Self {
            markers: vec![Marker::None; program.sites().len()],
            states: IndexMap::new(),
            current: None,
            added: vec![],
            next_state: 0,
            executed_instructions: 0,
            forks: 0,
            terminated_states: 0,
            solver_queries: Cell::new(0),
            program,
        };

        let initial = PathState {
            pc: engine.program.entry(),
            prev_pc: None,
            stack: vec![Frame {
                function: engine.program.entry_function().to_string(),
                caller: None,
                symbols: SymbolScope::new(),
            }],
            constraints: vec![],
            memory: HashMap::new(),
            widths: HashMap::new(),
            registers: HashMap::new(),
            inputs: IndexMap::new(),
            next_address: STACK_BASE,
        };
        let id = engine.allocate_id();
        engine.states.insert(id, initial);
        engine.current = Some(id);
        engine
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Program::load(path)?))
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        Ok(Self::new(Program::parse(data, None)?))
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    fn allocate_id(&mut self) -> StateId {
        let id = StateId(STATE_BASE + self.next_state * STATE_STRIDE);
        self.next_state += 1;
        id
    }

    /// Interpret the program, calling `control` before every instruction.
    pub fn run<C: ControlPoint<Self>>(&mut self, control: &mut C) -> RunOutcome {
        while self.current.is_some() {
            if control.on_control_point(self) == Action::Stop {
                info!(target: "debugger", "engine halted");
                return RunOutcome::Halted;
            }

            // control point may terminate or switch states
            let Some(state) = self.current else {
                break;
            };

            if let Err(message) = self.execute(state) {
                debug!(target: "debugger", "state {state} failed: {message}");
                let action = control.on_error(self, &message);
                self.terminate(state);
                if action == Action::Stop {
                    return RunOutcome::Halted;
                }
            }
        }
        RunOutcome::Exhausted
    }

    /// Execute one instruction of a state.
    fn execute(&mut self, id: StateId) -> Result<(), String> {
        let Some(state) = self.states.get_mut(&id) else {
            return Ok(());
        };
        let pc = state.pc;
        let (Some(site), Some(op)) = (self.program.sites().get(pc.0), self.program.op(pc)) else {
            return Err(format!("invalid instruction {}", pc.0));
        };

        self.executed_instructions += 1;
        state.prev_pc = Some(pc);
        let fallthrough = self.program.fallthrough(pc);
        let mut forked = vec![];

        let next = match op {
            Op::Nop => fallthrough,
            Op::Alloca { var, ty } => {
                let address = state.next_address;
                state.next_address += STACK_SLOT;
                state.widths.insert(address, ty.width_bits);
                let frame = state.stack.last_mut().ok_or("empty call stack")?;
                let allocation = Allocation::Stack {
                    address: Expr::Concrete(address),
                    ty: ty.clone(),
                };
                frame
                    .symbols
                    .bind_address(var, allocation, site.scope)
                    .map_err(|e| e.to_string())?;
                fallthrough
            }
            Op::Store { var, value } => {
                let address = state.address_of(var, site)?;
                state.memory.insert(address, Slot::Concrete(*value));
                fallthrough
            }
            Op::Value { var, value } => {
                let register = ValueId(pc.0);
                state.registers.insert(register, *value);
                let frame = state.stack.last_mut().ok_or("empty call stack")?;
                frame.symbols.bind_value(var, register, site.scope);
                fallthrough
            }
            Op::Symbolic { var } => {
                let address = state.address_of(var, site)?;
                let width = state.widths.get(&address).copied().unwrap_or(8);
                state.memory.insert(address, Slot::Symbolic(var.clone()));
                state
                    .inputs
                    .entry(var.clone())
                    .or_insert_with(|| vec![0; width.div_ceil(8) as usize]);
                fallthrough
            }
            Op::Fork(branches) => {
                let origin = state.clone();
                let next = state.follow(&branches[0], fallthrough);

                for branch in &branches[1..] {
                    let mut path = origin.clone();
                    match path.follow(branch, fallthrough) {
                        Some(pc) => path.pc = pc,
                        None => {
                            let Some(pc) = path.unwind(&self.program) else {
                                continue;
                            };
                            path.pc = pc;
                        }
                    }
                    forked.push(path);
                }
                next
            }
            Op::Jump(target) => Some(*target),
            Op::Call { function, entry } => {
                state.stack.push(Frame {
                    function: function.clone(),
                    caller: Some(pc),
                    symbols: SymbolScope::new(),
                });
                Some(*entry)
            }
            Op::Ret => state.unwind(&self.program),
            Op::Error(message) => return Err(message.clone()),
        };

        let next = match next {
            Some(next) => Some(next),
            None if matches!(op, Op::Ret) => None,
            None => state.unwind(&self.program),
        };

        let finished = match next {
            Some(next) => {
                state.pc = next;
                false
            }
            None => true,
        };

        // forked paths must be scheduled before the origin goes away
        if !forked.is_empty() {
            self.forks += forked.len() as u64;
            if !finished {
                self.added.push(id);
            }
            for path in forked {
                let new_id = self.allocate_id();
                debug!(target: "debugger", "state {id} forked into {new_id}");
                self.states.insert(new_id, path);
                self.added.push(new_id);
            }
        }

        if finished {
            debug!(target: "debugger", "state {id} finished");
            self.terminate(id);
        }
        Ok(())
    }
}

impl DebugInfoProvider for Playground {
    fn instructions(&self) -> &[InstructionSite] {
        self.program.sites()
    }

    fn function_info(&self, name: &str) -> Option<FunctionInfo> {
        self.program.function_info(name)
    }
}

impl TrapTable for Playground {
    fn marker(&self, id: InstructionId) -> Marker {
        self.markers.get(id.0).copied().unwrap_or_default()
    }

    fn set_marker(&mut self, id: InstructionId, marker: Marker) {
        if let Some(slot) = self.markers.get_mut(id.0) {
            *slot = marker;
        }
    }
}

impl ExecutionScheduler for Playground {
    fn current_state(&self) -> Option<StateId> {
        self.current
    }

    fn states_added_since_last_check(&mut self) -> Vec<StateId> {
        std::mem::take(&mut self.added)
    }

    fn select_state(&mut self, state: StateId) {
        if self.states.contains_key(&state) {
            self.current = Some(state);
        }
    }

    fn advance_to_next_state(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        if let Some(pos) = self.states.get_index_of(&current) {
            let next = (pos + 1) % self.states.len();
            self.current = self.states.get_index(next).map(|(id, _)| *id);
        }
    }

    fn state_at_address(&self, addr: u64) -> Option<StateId> {
        self.states.contains_key(&StateId(addr)).then_some(StateId(addr))
    }

    fn states(&self) -> Vec<StateId> {
        self.states.keys().copied().collect()
    }

    fn snapshot(&self, state: StateId) -> Option<StateSnapshot> {
        let path = self.states.get(&state)?;
        Some(StateSnapshot {
            id: state,
            pc: path.pc,
            prev_pc: path.prev_pc,
            stack: path
                .stack
                .iter()
                .map(|frame| FrameSnapshot {
                    function: frame.function.clone(),
                    caller: frame.caller,
                })
                .collect(),
            constraints: path.constraints.clone(),
        })
    }

    fn symbols(&self, state: StateId) -> Option<&SymbolScope> {
        self.states
            .get(&state)
            .and_then(|path| path.stack.last())
            .map(|frame| &frame.symbols)
    }

    fn statistics(&self) -> Statistics {
        Statistics {
            executed_instructions: self.executed_instructions,
            forks: self.forks,
            live_states: self.states.len(),
            terminated_states: self.terminated_states,
            solver_queries: self.solver_queries.get(),
        }
    }
}

impl PathTerminator for Playground {
    fn terminate(&mut self, state: StateId) {
        let Some(pos) = self.states.get_index_of(&state) else {
            return;
        };
        self.states.shift_remove_index(pos);
        self.added.retain(|s| *s != state);
        self.terminated_states += 1;

        if self.current == Some(state) {
            self.current = match self.states.len() {
                0 => None,
                len => self.states.get_index(pos % len).map(|(id, _)| *id),
            };
        }
    }

    fn terminate_all_except(&mut self, state: StateId) {
        let others: Vec<_> = self.states.keys().copied().filter(|s| *s != state).collect();
        for other in others {
            self.terminate(other);
        }
        self.select_state(state);
    }
}

impl SymbolicEvaluator for Playground {
    fn resolve_concrete_bytes(
        &self,
        state: StateId,
        expr: &Expr,
        width_bits: u32,
    ) -> Option<Vec<u8>> {
        let path = self.states.get(&state)?;
        self.solver_queries.set(self.solver_queries.get() + 1);
        if path.is_unsat() {
            return None;
        }
        let size = width_bits.div_ceil(8) as usize;
        match expr {
            Expr::Concrete(value) => Some(
                value
                    .to_le_bytes()
                    .into_iter()
                    .chain(std::iter::repeat(0))
                    .take(size)
                    .collect(),
            ),
            Expr::Symbolic(name) => Some(
                path.inputs
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| vec![0; size]),
            ),
        }
    }

    fn simplify(&self, _state: StateId, expr: &Expr) -> Expr {
        expr.clone()
    }

    fn read(&self, state: StateId, address: &Expr, ty: &TypeDesc) -> anyhow::Result<String> {
        let path = self
            .states
            .get(&state)
            .ok_or_else(|| anyhow!("unknown state {state}"))?;
        let Expr::Concrete(address) = address else {
            bail!("can not read memory at symbolic address {address}");
        };
        match path.memory.get(address) {
            Some(Slot::Concrete(value)) => {
                let value = if ty.width_bits >= u64::BITS {
                    *value
                } else {
                    value & ((1u64 << ty.width_bits) - 1)
                };
                Ok(value.to_string())
            }
            Some(Slot::Symbolic(name)) => Ok(format!("(ReadLSB w{} 0 {name})", ty.width_bits)),
            None => bail!("memory at {address:#x} is not initialized"),
        }
    }

    fn read_value(&self, state: StateId, value: ValueId) -> Option<String> {
        self.states
            .get(&state)?
            .registers
            .get(&value)
            .map(ToString::to_string)
    }

    fn make_symbolic(&mut self, state: StateId, address: &Expr, name: &str) -> anyhow::Result<()> {
        let path = self
            .states
            .get_mut(&state)
            .ok_or_else(|| anyhow!("unknown state {state}"))?;
        let Expr::Concrete(address) = address else {
            bail!("can not make symbolic memory at symbolic address {address}");
        };
        let width = path
            .widths
            .get(address)
            .copied()
            .ok_or_else(|| anyhow!("no memory object at {address:#x}"))?;
        path.memory
            .insert(*address, Slot::Symbolic(name.to_string()));
        path.inputs
            .insert(name.to_string(), vec![0; width.div_ceil(8) as usize]);
        Ok(())
    }

    fn concrete_inputs(&self, state: StateId) -> Option<Vec<(String, Vec<u8>)>> {
        let path = self.states.get(&state)?;
        self.solver_queries.set(self.solver_queries.get() + 1);
        if path.is_unsat() {
            return None;
        }
        Some(
            path.inputs
                .iter()
                .map(|(name, bytes)| (name.clone(), bytes.clone()))
                .collect(),
        )
    }
}
