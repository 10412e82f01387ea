//! Fork interception.

use crate::debugger::engine::StateId;
use crate::debugger::error::Error;
use crate::debugger::ExecutionMode;
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ArbiterState {
    /// Waiting for the next fork.
    Armed,
    /// Operator must choose one of these states.
    Arbitrating(Vec<StateId>),
    /// Survivor chosen, the engine may continue.
    Resolved(StateId),
}

/// What to do with a freshly reported fork.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NoFork,
    /// Execution continues from `selected` without operator input.
    Auto {
        added: Vec<StateId>,
        selected: StateId,
    },
    /// Operator must choose between these states.
    Ask(Vec<StateId>),
}

#[derive(Debug)]
pub struct BranchArbiter {
    state: ArbiterState,
}

impl Default for BranchArbiter {
    fn default() -> Self {
        Self {
            state: ArbiterState::Armed,
        }
    }
}

impl BranchArbiter {
    pub fn state(&self) -> &ArbiterState {
        &self.state
    }

    /// States between which operator is choosing, empty if no arbitration in progress.
    pub fn pending(&self) -> &[StateId] {
        match self.state {
            ArbiterState::Arbitrating(ref states) => states,
            _ => &[],
        }
    }

    /// Inspect states added since the last check.
    ///
    /// In free mode the most recently added state is selected automatically,
    /// in any other mode arbitration starts.
    pub fn detect(&mut self, mode: ExecutionMode, added: Vec<StateId>) -> Decision {
        let Some(&last) = added.last() else {
            return Decision::NoFork;
        };
        debug!(target: "debugger", "execution branched into {} states", added.len());

        if mode == ExecutionMode::Free {
            self.state = ArbiterState::Resolved(last);
            Decision::Auto {
                added,
                selected: last,
            }
        } else {
            self.state = ArbiterState::Arbitrating(added.clone());
            Decision::Ask(added)
        }
    }

    /// Choose a survivor by its 1-based index in the pending list.
    pub fn select(&mut self, index: usize) -> Result<StateId, Error> {
        let pending = self.pending();
        if index == 0 || index > pending.len() {
            return Err(Error::SelectionOutOfRange(index, pending.len()));
        }
        let selected = pending[index - 1];
        debug!(target: "debugger", "state {selected} selected");
        self.state = ArbiterState::Resolved(selected);
        Ok(selected)
    }

    /// Return into armed state, ready for the next fork.
    pub fn reset(&mut self) {
        self.state = ArbiterState::Armed;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn added() -> Vec<StateId> {
        vec![StateId(0x10), StateId(0x20), StateId(0x30)]
    }

    #[test]
    fn test_no_fork() {
        let mut arbiter = BranchArbiter::default();
        assert_eq!(arbiter.detect(ExecutionMode::Stepping, vec![]), Decision::NoFork);
        assert_eq!(arbiter.state(), &ArbiterState::Armed);
    }

    #[test]
    fn test_free_mode_selects_last_added() {
        let mut arbiter = BranchArbiter::default();
        assert_eq!(
            arbiter.detect(ExecutionMode::Free, added()),
            Decision::Auto {
                added: added(),
                selected: StateId(0x30)
            }
        );
        assert_eq!(arbiter.state(), &ArbiterState::Resolved(StateId(0x30)));
    }

    #[test]
    fn test_arbitration() {
        struct TestCase {
            mode: ExecutionMode,
        }
        let cases = [
            TestCase {
                mode: ExecutionMode::Stepping,
            },
            TestCase {
                mode: ExecutionMode::SteppingInstruction,
            },
            TestCase {
                mode: ExecutionMode::StopOnBranchRequested,
            },
        ];

        for tc in cases {
            let mut arbiter = BranchArbiter::default();
            assert_eq!(arbiter.detect(tc.mode, added()), Decision::Ask(added()));
            assert_eq!(arbiter.pending(), added().as_slice());

            assert!(matches!(arbiter.select(0), Err(Error::SelectionOutOfRange(0, 3))));
            assert!(matches!(arbiter.select(4), Err(Error::SelectionOutOfRange(4, 3))));
            assert_eq!(arbiter.pending().len(), 3);

            assert_eq!(arbiter.select(2).unwrap(), StateId(0x20));
            assert_eq!(arbiter.state(), &ArbiterState::Resolved(StateId(0x20)));
            assert!(arbiter.pending().is_empty());

            arbiter.reset();
            assert_eq!(arbiter.state(), &ArbiterState::Armed);
        }
    }
}
