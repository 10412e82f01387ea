use crate::debugger::engine::StateId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- location resolution errors --------------------------------
    #[error("no source file named: {0}")]
    NoSuchFile(String),
    #[error("no corresponding instruction for line {1} in {0}")]
    NoSuchLine(String, u64),
    #[error("no function named {0}")]
    NoSuchFunction(String),

    // --------------------------------- breakpoint registry errors --------------------------------
    #[error("{kind} at {file}:{line} already exists")]
    DuplicateBreakpoint {
        kind: &'static str,
        file: String,
        line: u64,
    },
    #[error("no breakpoint(s)/killpoint(s) with number(s): {0:?}")]
    UnknownBreakpointId(Vec<u32>),

    // --------------------------------- branch arbitration errors ---------------------------------
    #[error("selection {0} is out of range, expected a number between 1 and {1}")]
    SelectionOutOfRange(usize, usize),

    // --------------------------------- symbol table errors ---------------------------------------
    #[error("unable to find variable {0}")]
    UnboundSymbol(String),
    #[error("symbol {0} already bound to an address")]
    AlreadyBoundSymbol(String),
    #[error("unable to access variable {name}: {reason}")]
    VariableAccess { name: String, reason: String },

    // --------------------------------- execution state errors ------------------------------------
    #[error("there are no execution states left")]
    NoStates,
    #[error("no execution state at address {0:#x}")]
    StateNotFound(u64),
    #[error("state {0} is not known to the scheduler")]
    UnknownState(StateId),
    #[error("please enter a valid address (hex number): {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or halt the engine.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::NoSuchFile(_) => false,
            Error::NoSuchLine(_, _) => false,
            Error::NoSuchFunction(_) => false,
            Error::DuplicateBreakpoint { .. } => false,
            Error::UnknownBreakpointId(_) => false,
            Error::SelectionOutOfRange(_, _) => false,
            Error::UnboundSymbol(_) => false,
            Error::AlreadyBoundSymbol(_) => false,
            Error::VariableAccess { .. } => false,
            Error::StateNotFound(_) => false,
            Error::InvalidAddress(_) => false,

            // currently fatal errors
            Error::NoStates => true,
            Error::UnknownState(_) => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
