//! Textual source location to instruction site resolution.

use crate::debugger::engine::{basename, DebugInfoProvider, InstructionId};
use crate::debugger::error::Error;
use chumsky::error::Rich;
use chumsky::prelude::{any, end, just};
use chumsky::{extra, text, Parser};

type Err<'a> = extra::Err<Rich<'a, char>>;

/// Location as written by the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSpec {
    /// `<file>:<line>`, file name must have an extension.
    Line { file: String, line: u64 },
    /// Bare function name.
    Function(String),
}

fn line_location<'a>() -> impl Parser<'a, &'a str, LocationSpec, Err<'a>> {
    any()
        .filter(|c: &char| *c != ':')
        .repeated()
        .at_least(1)
        .to_slice()
        .try_map(|file: &str, span| {
            let has_extension = file
                .rsplit_once('.')
                .map(|(_, ext)| ext.chars().all(|c| c.is_alphanumeric() || c == '_'))
                .unwrap_or(false);
            if has_extension {
                Ok(file)
            } else {
                Err(Rich::custom(span, "file name without extension"))
            }
        })
        .then_ignore(just(':'))
        .then(
            text::int(10)
                .from_str::<u64>()
                .try_map(|res, span| res.map_err(|e| Rich::custom(span, e))),
        )
        .then_ignore(end())
        .map(|(file, line)| LocationSpec::Line {
            file: file.to_string(),
            line,
        })
        .labelled("file:line")
}

impl LocationSpec {
    /// Parse location, anything that doesn't look like `file.ext:line` is a function name.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        line_location()
            .parse(input)
            .into_result()
            .unwrap_or_else(|_| LocationSpec::Function(input.to_string()))
    }
}

/// Location bound to a concrete instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub site: InstructionId,
    /// Basename of the instruction source file.
    pub file: String,
    pub line: u64,
}

/// Resolve location to the first instruction (in declaration order) attributed to it.
pub fn resolve<D: DebugInfoProvider + ?Sized>(
    spec: &LocationSpec,
    debug_info: &D,
) -> Result<ResolvedLocation, Error> {
    match spec {
        LocationSpec::Line { file, line } => resolve_line(file, *line, debug_info),
        LocationSpec::Function(name) => {
            let info = debug_info
                .function_info(name)
                .ok_or_else(|| Error::NoSuchFunction(name.clone()))?;
            resolve_line(basename(&info.file), info.line, debug_info)
        }
    }
}

fn resolve_line<D: DebugInfoProvider + ?Sized>(
    file: &str,
    line: u64,
    debug_info: &D,
) -> Result<ResolvedLocation, Error> {
    let mut file_seen = false;
    for site in debug_info.instructions() {
        if site.file_name() != file {
            continue;
        }
        file_seen = true;
        if site.line == line {
            return Ok(ResolvedLocation {
                site: site.id,
                file: site.file_name().to_string(),
                line,
            });
        }
    }

    if file_seen {
        Err(Error::NoSuchLine(file.to_string(), line))
    } else {
        Err(Error::NoSuchFile(file.to_string()))
    }
}
