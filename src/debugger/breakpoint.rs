use crate::debugger::engine::{DebugInfoProvider, InstructionId, Marker, TrapTable};
use crate::debugger::error::Error;
use crate::debugger::location::{resolve, LocationSpec};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum BreakpointKind {
    #[strum(serialize = "Breakpoint")]
    Stop,
    #[strum(serialize = "Killpoint")]
    Kill,
}

impl BreakpointKind {
    fn marker(self, number: u32) -> Marker {
        match self {
            BreakpointKind::Stop => Marker::Stop(number),
            BreakpointKind::Kill => Marker::Kill(number),
        }
    }
}

/// Source line watched by the debugger.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub kind: BreakpointKind,
    /// Basename of the source file.
    pub file: String,
    pub line: u64,
    pub number: u32,
    /// Instruction where the marker is armed.
    pub site: InstructionId,
}

/// Breakpoint information struct.
#[derive(Debug, Clone)]
pub struct BreakpointView<'a> {
    pub kind: BreakpointKind,
    pub number: u32,
    pub file: Cow<'a, str>,
    pub line: u64,
}

impl<'a> From<&'a Breakpoint> for BreakpointView<'a> {
    fn from(brkpt: &'a Breakpoint) -> Self {
        Self {
            kind: brkpt.kind,
            number: brkpt.number,
            file: Cow::Borrowed(&brkpt.file),
            line: brkpt.line,
        }
    }
}

impl BreakpointView<'_> {
    pub fn to_owned(&self) -> BreakpointView<'static> {
        BreakpointView {
            kind: self.kind,
            number: self.number,
            file: Cow::Owned(self.file.to_string()),
            line: self.line,
        }
    }
}

/// Result of a `delete` operation.
#[derive(Debug, Default, PartialEq)]
pub struct DeleteOutcome {
    /// Number of removed breakpoints and killpoints.
    pub removed: usize,
    /// Requested numbers with no corresponding entry.
    pub unknown: Vec<u32>,
    /// True if all entries were requested for removal.
    pub all: bool,
}

/// Container for breakpoints and killpoints.
///
/// Every entry in the registry has an armed marker in the engine trap table and every armed
/// marker has an entry, the registry is the only writer of markers.
#[derive(Debug)]
pub struct BreakpointRegistry {
    breakpoints: IndexMap<u32, Breakpoint>,
    next_number: u32,
}

impl Default for BreakpointRegistry {
    fn default() -> Self {
        Self {
            breakpoints: IndexMap::new(),
            next_number: 1,
        }
    }
}

impl BreakpointRegistry {
    /// Resolve a location and arm a new breakpoint or killpoint at it.
    ///
    /// # Arguments
    ///
    /// * `location`: `file:line` or a function name
    /// * `kind`: stop or kill
    /// * `engine`: provider of debug information and trap table
    pub fn add<E>(
        &mut self,
        location: &str,
        kind: BreakpointKind,
        engine: &mut E,
    ) -> Result<BreakpointView<'_>, Error>
    where
        E: DebugInfoProvider + TrapTable + ?Sized,
    {
        let spec = LocationSpec::parse(location);
        let resolved = resolve(&spec, &*engine)?;

        if self
            .breakpoints
            .values()
            .any(|b| b.file == resolved.file && b.line == resolved.line)
        {
            return Err(Error::DuplicateBreakpoint {
                kind: kind.into(),
                file: resolved.file,
                line: resolved.line,
            });
        }

        let number = self.next_number;
        self.next_number += 1;
        engine.set_marker(resolved.site, kind.marker(number));
        debug!(target: "debugger", "{kind} {number} armed at {}:{}", resolved.file, resolved.line);

        let brkpt = self.breakpoints.entry(number).or_insert(Breakpoint {
            kind,
            file: resolved.file,
            line: resolved.line,
            number,
            site: resolved.site,
        });
        Ok(BreakpointView::from(&*brkpt))
    }

    /// Remove breakpoints and killpoints by their numbers, an empty list removes everything.
    ///
    /// Repeated numbers count once.
    pub fn delete<E>(&mut self, numbers: &[u32], engine: &mut E) -> DeleteOutcome
    where
        E: TrapTable + ?Sized,
    {
        if numbers.is_empty() {
            let removed = self.breakpoints.len();
            self.breakpoints.drain(..).for_each(|(_, brkpt)| {
                engine.set_marker(brkpt.site, Marker::None);
            });
            debug!(target: "debugger", "all {removed} breakpoints removed");
            return DeleteOutcome {
                removed,
                unknown: vec![],
                all: true,
            };
        }

        let mut outcome = DeleteOutcome::default();
        for &number in numbers.iter().unique() {
            match self.breakpoints.shift_remove(&number) {
                Some(brkpt) => {
                    engine.set_marker(brkpt.site, Marker::None);
                    debug!(target: "debugger", "{} {number} removed", brkpt.kind);
                    outcome.removed += 1;
                }
                None => outcome.unknown.push(number),
            }
        }
        outcome
    }

    /// Remove all entries of a single kind, return number of removed entries.
    pub fn remove_kind<E>(&mut self, kind: BreakpointKind, engine: &mut E) -> usize
    where
        E: TrapTable + ?Sized,
    {
        let before = self.breakpoints.len();
        self.breakpoints.retain(|_, brkpt| {
            if brkpt.kind == kind {
                engine.set_marker(brkpt.site, Marker::None);
                false
            } else {
                true
            }
        });
        before - self.breakpoints.len()
    }

    /// Return breakpoints (in insertion order), optionally filtered by kind.
    pub fn list(&self, kind: Option<BreakpointKind>) -> Vec<BreakpointView<'_>> {
        self.breakpoints
            .values()
            .filter(|b| kind.map(|k| b.kind == k).unwrap_or(true))
            .map(BreakpointView::from)
            .collect()
    }

    /// Translate a marker armed at instruction back to registry entry.
    pub fn hit<E>(&self, site: InstructionId, engine: &E) -> Option<&Breakpoint>
    where
        E: TrapTable + ?Sized,
    {
        let number = match engine.marker(site) {
            Marker::None => return None,
            Marker::Stop(n) | Marker::Kill(n) => n,
        };
        self.breakpoints.get(&number)
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}
