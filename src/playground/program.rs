//! Toy program description and its compilation into an instruction table.
//!
//! A program is a TOML document with a list of functions, every function holds a list of
//! instructions:
//!
//! ```toml
//! [[function]]
//! name = "main"
//! file = "branch.c"
//! line = 3
//! scope = 1
//!
//! [[function.instruction]]
//! op = "alloca"
//! var = "x"
//! line = 4
//!
//! [[function.instruction]]
//! op = "fork"
//! line = 6
//! branches = [
//!     { constraint = "(Sle 6 x)", target = "big", inputs = { x = [6, 0, 0, 0] } },
//!     { constraint = "(Slt x 6)" },
//! ]
//! ```

use crate::debugger::engine::{
    FunctionInfo, InstructionId, InstructionSite, LexicalScope, ScopeKey, TypeDesc,
};
use anyhow::{anyhow, bail, Context};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_ENTRY: &str = "main";
const DEFAULT_TYPE: &str = "int";
const DEFAULT_WIDTH: u32 = 32;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramDecl {
    entry: Option<String>,
    #[serde(default, rename = "function")]
    functions: Vec<FunctionDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionDecl {
    name: String,
    file: String,
    line: u64,
    /// Outermost lexical block of the function.
    scope: Option<u64>,
    #[serde(default, rename = "instruction")]
    instructions: Vec<InstructionDecl>,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
enum OpKind {
    #[default]
    Nop,
    Alloca,
    Store,
    Value,
    Symbolic,
    Fork,
    Jump,
    Call,
    Ret,
    Error,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct InstructionDecl {
    op: OpKind,
    label: Option<String>,
    line: u64,
    column: u64,
    /// Overrides function file, an empty string means no source attribution.
    file: Option<String>,
    scope: Option<u64>,
    parent: Option<u64>,
    text: Option<String>,
    var: Option<String>,
    #[serde(rename = "type")]
    ty: Option<String>,
    width: Option<u32>,
    value: Option<u64>,
    target: Option<String>,
    callee: Option<String>,
    message: Option<String>,
    branches: Vec<BranchDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BranchDecl {
    constraint: String,
    target: Option<String>,
    #[serde(default)]
    inputs: IndexMap<String, Vec<u8>>,
}

/// One side of a fork.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub constraint: String,
    /// `None` means fall through to the next instruction.
    pub target: Option<InstructionId>,
    /// Witness bytes of symbolic inputs satisfying the path.
    pub inputs: Vec<(String, Vec<u8>)>,
}

/// Executable operation of a single instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Nop,
    /// Allocate a stack slot for a variable.
    Alloca { var: String, ty: TypeDesc },
    /// Write a concrete value into variable memory.
    Store { var: String, value: u64 },
    /// Assign an SSA register to a variable.
    Value { var: String, value: u64 },
    /// Replace variable memory with a symbolic input.
    Symbolic { var: String },
    /// First branch stays in the current state, every other one forks a new state.
    Fork(Vec<Branch>),
    Jump(InstructionId),
    Call { function: String, entry: InstructionId },
    Ret,
    /// Execution error, the state is terminated.
    Error(String),
}

#[derive(Debug, Clone)]
struct FunctionEntry {
    file: String,
    line: u64,
    entry: InstructionId,
    /// One past the last instruction.
    end: usize,
}

/// Compiled program: instruction table plus executable operations.
#[derive(Debug, Clone)]
pub struct Program {
    sites: Vec<InstructionSite>,
    ops: Vec<Op>,
    functions: IndexMap<String, FunctionEntry>,
    entry: InstructionId,
}

impl Program {
    /// Load program from a TOML file, source paths are relative to the file directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read program {}", path.display()))?;
        Self::parse(&data, path.parent())
            .with_context(|| format!("load program {}", path.display()))
    }

    /// Parse and compile a TOML program.
    pub fn parse(data: &str, base_dir: Option<&Path>) -> anyhow::Result<Self> {
        let decl: ProgramDecl = toml::from_str(data)?;
        compile(decl, base_dir)
    }

    pub fn sites(&self) -> &[InstructionSite] {
        &self.sites
    }

    pub fn op(&self, id: InstructionId) -> Option<&Op> {
        self.ops.get(id.0)
    }

    /// First instruction of the entry function.
    pub fn entry(&self) -> InstructionId {
        self.entry
    }

    pub fn entry_function(&self) -> &str {
        self.sites
            .get(self.entry.0)
            .map(|site| site.function.as_str())
            .unwrap_or(DEFAULT_ENTRY)
    }

    pub fn function_info(&self, name: &str) -> Option<FunctionInfo> {
        self.functions.get(name).map(|f| FunctionInfo {
            file: f.file.clone(),
            line: f.line,
        })
    }

    /// Instruction after `id` in the same function.
    pub fn fallthrough(&self, id: InstructionId) -> Option<InstructionId> {
        let function = &self.sites.get(id.0)?.function;
        let end = self.functions.get(function)?.end;
        (id.0 + 1 < end).then_some(InstructionId(id.0 + 1))
    }

    /// Distinct source file names, for completion.
    pub fn source_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .sites
            .iter()
            .filter(|site| site.has_source())
            .map(|site| site.file_name().to_string())
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

fn source_path(file: &str, base_dir: Option<&Path>) -> String {
    match base_dir {
        Some(dir) if !file.is_empty() && Path::new(file).is_relative() => {
            dir.join(file).to_string_lossy().into_owned()
        }
        _ => file.to_string(),
    }
}

fn describe(decl: &InstructionDecl) -> String {
    let args = [
        decl.var.as_deref(),
        decl.target.as_deref(),
        decl.callee.as_deref(),
        decl.message.as_deref(),
    ];
    let mut text = decl.op.to_string();
    for arg in args.into_iter().flatten() {
        text += " ";
        text += arg;
    }
    if let Some(value) = decl.value {
        text += &format!(" {value}");
    }
    text
}

fn compile(decl: ProgramDecl, base_dir: Option<&Path>) -> anyhow::Result<Program> {
    if decl.functions.is_empty() {
        bail!("program has no functions");
    }

    // first pass: layout functions and labels
    let mut functions = IndexMap::new();
    let mut labels = IndexMap::new();
    let mut offset = 0;
    for function in &decl.functions {
        if function.instructions.is_empty() {
            bail!("function {} has no instructions", function.name);
        }
        let entry = FunctionEntry {
            file: source_path(&function.file, base_dir),
            line: function.line,
            entry: InstructionId(offset),
            end: offset + function.instructions.len(),
        };
        if functions.insert(function.name.clone(), entry).is_some() {
            bail!("duplicate function {}", function.name);
        }
        for (i, instruction) in function.instructions.iter().enumerate() {
            if let Some(ref label) = instruction.label {
                let key = (function.name.clone(), label.clone());
                if labels.insert(key, InstructionId(offset + i)).is_some() {
                    bail!("duplicate label {label} in function {}", function.name);
                }
            }
        }
        offset += function.instructions.len();
    }

    let entry_name = decl.entry.as_deref().unwrap_or(DEFAULT_ENTRY);
    let entry = functions
        .get(entry_name)
        .map(|f| f.entry)
        .ok_or_else(|| anyhow!("entry function {entry_name} not found"))?;

    // second pass: sites and operations
    let mut sites = Vec::with_capacity(offset);
    let mut ops = Vec::with_capacity(offset);
    for function in decl.functions {
        let label = |name: &str| {
            labels
                .get(&(function.name.clone(), name.to_string()))
                .copied()
                .ok_or_else(|| anyhow!("unknown label {name} in function {}", function.name))
        };
        let file = source_path(&function.file, base_dir);

        for instruction in function.instructions {
            let id = InstructionId(sites.len());
            let var = || {
                instruction
                    .var
                    .clone()
                    .ok_or_else(|| anyhow!("{} at {}:{} needs a variable", instruction.op, function.name, instruction.line))
            };

            let op = match instruction.op {
                OpKind::Nop => Op::Nop,
                OpKind::Alloca => Op::Alloca {
                    var: var()?,
                    ty: TypeDesc {
                        name: instruction.ty.clone().unwrap_or(DEFAULT_TYPE.to_string()),
                        width_bits: instruction.width.unwrap_or(DEFAULT_WIDTH),
                    },
                },
                OpKind::Store => Op::Store {
                    var: var()?,
                    value: instruction.value.unwrap_or_default(),
                },
                OpKind::Value => Op::Value {
                    var: var()?,
                    value: instruction.value.unwrap_or_default(),
                },
                OpKind::Symbolic => Op::Symbolic { var: var()? },
                OpKind::Fork => {
                    if instruction.branches.len() < 2 {
                        bail!("fork in {} needs at least two branches", function.name);
                    }
                    let branches = instruction
                        .branches
                        .iter()
                        .map(|branch| {
                            Ok(Branch {
                                constraint: branch.constraint.clone(),
                                target: branch.target.as_deref().map(label).transpose()?,
                                inputs: branch
                                    .inputs
                                    .iter()
                                    .map(|(name, bytes)| (name.clone(), bytes.clone()))
                                    .collect(),
                            })
                        })
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    Op::Fork(branches)
                }
                OpKind::Jump => {
                    let target = instruction
                        .target
                        .as_deref()
                        .ok_or_else(|| anyhow!("jump in {} needs a target", function.name))?;
                    Op::Jump(label(target)?)
                }
                OpKind::Call => {
                    let callee = instruction
                        .callee
                        .clone()
                        .ok_or_else(|| anyhow!("call in {} needs a callee", function.name))?;
                    let entry = functions
                        .get(&callee)
                        .map(|f| f.entry)
                        .ok_or_else(|| anyhow!("unknown function {callee}"))?;
                    Op::Call {
                        function: callee,
                        entry,
                    }
                }
                OpKind::Ret => Op::Ret,
                OpKind::Error => Op::Error(
                    instruction
                        .message
                        .clone()
                        .unwrap_or_else(|| "execution error".to_string()),
                ),
            };

            let scope = instruction
                .scope
                .or(function.scope)
                .map(|key| LexicalScope::new(ScopeKey(key), instruction.parent.map(ScopeKey)));

            sites.push(InstructionSite {
                id,
                function: function.name.clone(),
                file: instruction
                    .file
                    .as_deref()
                    .map(|f| source_path(f, base_dir))
                    .unwrap_or_else(|| file.clone()),
                line: instruction.line,
                column: instruction.column,
                scope,
                text: instruction.text.clone().unwrap_or_else(|| describe(&instruction)),
            });
            ops.push(op);
        }
    }

    Ok(Program {
        sites,
        ops,
        functions,
        entry,
    })
}
