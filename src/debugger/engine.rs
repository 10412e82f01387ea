//! Narrow interfaces to the symbolic execution engine.
//!
//! The debugger never reimplements interpretation, forking, solving or debug info extraction.
//! Everything it needs from the host engine is described by the traits in this module, an
//! engine implements all of them and obtains [`Engine`] for free.

use crate::debugger::symbol::SymbolScope;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Opaque identity of one live execution state (one symbolic path).
///
/// An identity is rendered as a hexadecimal address (`@0x...`) and can be given back
/// to the `state <address>` command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct StateId(pub u64);

impl Display for StateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{:#x}", self.0)
    }
}

/// Identity of an instruction, an index into the engine instruction table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct InstructionId(pub usize);

/// Opaque identity of a lexical block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeKey(pub u64);

/// Lexical block attached to an instruction: the block itself and the enclosing one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LexicalScope {
    pub key: ScopeKey,
    pub parent: Option<ScopeKey>,
}

impl LexicalScope {
    pub fn new(key: ScopeKey, parent: Option<ScopeKey>) -> Self {
        Self { key, parent }
    }
}

/// One instruction and its debug attribution.
#[derive(Clone, Debug)]
pub struct InstructionSite {
    pub id: InstructionId,
    pub function: String,
    /// Source file as recorded in debug info, may contain directories.
    pub file: String,
    pub line: u64,
    pub column: u64,
    pub scope: Option<LexicalScope>,
    /// Textual (IR level) representation of the instruction.
    pub text: String,
}

impl InstructionSite {
    /// Source file name with directories stripped.
    pub fn file_name(&self) -> &str {
        basename(&self.file)
    }

    /// True if instruction has a source location.
    pub fn has_source(&self) -> bool {
        !self.file.is_empty()
    }
}

/// Return a file name without directories.
pub fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

/// Function entry attribution.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionInfo {
    pub file: String,
    pub line: u64,
}

/// Breakpoint marker stored by the engine next to each instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Marker {
    #[default]
    None,
    Stop(u32),
    Kill(u32),
}

impl Marker {
    /// Signed representation: positive is a stop, negative is a kill, zero is none.
    pub fn signed(self) -> i64 {
        match self {
            Marker::None => 0,
            Marker::Stop(num) => num as i64,
            Marker::Kill(num) => -(num as i64),
        }
    }

    pub fn from_signed(value: i64) -> Self {
        match value {
            0 => Marker::None,
            v if v > 0 => Marker::Stop(v as u32),
            v => Marker::Kill(v.unsigned_abs() as u32),
        }
    }

    pub fn is_armed(self) -> bool {
        self != Marker::None
    }
}

/// Symbolic or concrete expression as exposed by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Concrete(u64),
    Symbolic(String),
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Concrete(value) => write!(f, "{value:#x}"),
            Expr::Symbolic(expr) => f.write_str(expr),
        }
    }
}

/// Identity of an SSA value (register) of the engine program representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ValueId(pub usize);

/// Type of variable, as far as debugger is concerned.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDesc {
    pub name: String,
    pub width_bits: u32,
}

/// Stack frame of some execution state.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    pub function: String,
    /// Instruction where this frame was called from (`None` for the entry frame).
    pub caller: Option<InstructionId>,
}

/// Read-only view of an execution state.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub id: StateId,
    pub pc: InstructionId,
    pub prev_pc: Option<InstructionId>,
    /// Frames from outermost to innermost.
    pub stack: Vec<FrameSnapshot>,
    pub constraints: Vec<String>,
}

/// Engine statistics for `info stats` command.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub executed_instructions: u64,
    pub forks: u64,
    pub live_states: usize,
    pub terminated_states: u64,
    pub solver_queries: u64,
}

/// Debug information of the program under symbolic execution.
pub trait DebugInfoProvider {
    /// All instructions in source (declaration) order.
    fn instructions(&self) -> &[InstructionSite];

    fn site(&self, id: InstructionId) -> Option<&InstructionSite> {
        self.instructions().get(id.0).filter(|site| site.id == id)
    }

    /// Entry location of a function.
    fn function_info(&self, name: &str) -> Option<FunctionInfo>;
}

/// Per instruction breakpoint slots.
pub trait TrapTable {
    fn marker(&self, id: InstructionId) -> Marker;
    fn set_marker(&mut self, id: InstructionId, marker: Marker);
}

/// Scheduler of the engine, owner of all execution states.
pub trait ExecutionScheduler {
    fn current_state(&self) -> Option<StateId>;

    /// States forked since the previous call, in creation order.
    fn states_added_since_last_check(&mut self) -> Vec<StateId>;

    fn select_state(&mut self, state: StateId);

    fn advance_to_next_state(&mut self);

    fn state_at_address(&self, addr: u64) -> Option<StateId>;

    /// All live states in scheduler order.
    fn states(&self) -> Vec<StateId>;

    fn snapshot(&self, state: StateId) -> Option<StateSnapshot>;

    /// Symbol table of the innermost stack frame.
    fn symbols(&self, state: StateId) -> Option<&SymbolScope>;

    fn statistics(&self) -> Statistics;
}

/// State termination interface.
pub trait PathTerminator {
    fn terminate(&mut self, state: StateId);
    fn terminate_all_except(&mut self, state: StateId);
}

/// Solver backed expression evaluation.
pub trait SymbolicEvaluator {
    /// Concrete bytes of an expression under state constraints, `None` if unsatisfiable.
    fn resolve_concrete_bytes(&self, state: StateId, expr: &Expr, width_bits: u32)
        -> Option<Vec<u8>>;

    fn simplify(&self, state: StateId, expr: &Expr) -> Expr;

    /// Read memory at `address` and render it (concrete value or symbolic expression).
    fn read(&self, state: StateId, address: &Expr, ty: &TypeDesc) -> anyhow::Result<String>;

    /// Render current value of SSA register.
    fn read_value(&self, state: StateId, value: ValueId) -> Option<String>;

    /// Replace memory object at `address` with a fresh symbolic array named `name`.
    fn make_symbolic(&mut self, state: StateId, address: &Expr, name: &str) -> anyhow::Result<()>;

    /// Concrete input values that lead to the state, `None` if constraints are unsatisfiable.
    fn concrete_inputs(&self, state: StateId) -> Option<Vec<(String, Vec<u8>)>>;
}

/// Everything debugger needs from the host engine.
pub trait Engine:
    DebugInfoProvider + TrapTable + ExecutionScheduler + PathTerminator + SymbolicEvaluator
{
}

impl<T> Engine for T where
    T: DebugInfoProvider + TrapTable + ExecutionScheduler + PathTerminator + SymbolicEvaluator
{
}

/// Engine reaction after the debugger handles a control point.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    /// Resume execution.
    Continue,
    /// Halt the engine, no more instructions will be interpreted.
    Stop,
}

/// Entry points called by the engine scheduler.
pub trait ControlPoint<E: Engine> {
    /// Called before the current state executes its next instruction.
    fn on_control_point(&mut self, engine: &mut E) -> Action;

    /// Called when current state hits an execution error.
    fn on_error(&mut self, engine: &mut E, message: &str) -> Action;
}
