//! Scoped table of source level variables.
//!
//! One [`SymbolScope`] per stack frame, rooted at the function outermost lexical block. Nested
//! blocks form a chain of children, there is at most one live child at every level, so the
//! table always describes a single path from the function block down to the innermost block
//! entered so far.

use crate::debugger::engine::{Expr, LexicalScope, ScopeKey, TypeDesc, ValueId};
use crate::debugger::error::Error;
use log::debug;
use std::collections::HashMap;

/// Runtime location of a variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolValue {
    /// Address of variable in memory, present if variable lives on the stack.
    pub address: Option<Expr>,
    /// Last SSA value assigned to variable.
    pub value: Option<ValueId>,
    pub ty: Option<TypeDesc>,
}

impl SymbolValue {
    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// Storage of a declared variable.
#[derive(Debug, Clone)]
pub enum Allocation {
    Stack { address: Expr, ty: TypeDesc },
    /// Globals, heap or registers, not tracked by a symbol scope.
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolScope {
    bindings: HashMap<String, SymbolValue>,
    key: Option<ScopeKey>,
    child: Option<Box<SymbolScope>>,
}

impl SymbolScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_key(key: ScopeKey) -> Self {
        Self {
            key: Some(key),
            ..Default::default()
        }
    }

    pub fn key(&self) -> Option<ScopeKey> {
        self.key
    }

    /// Number of scopes in the chain, including this one.
    pub fn depth(&self) -> usize {
        1 + self.child.as_ref().map(|c| c.depth()).unwrap_or(0)
    }

    /// Find a scope responsible for lexical block `scope`, open or replace children if needed.
    ///
    /// A scope without key adopts the first key it sees. A child is replaced when the new block
    /// is nested directly into this scope, which means control left the previous child.
    fn route(&mut self, scope: Option<LexicalScope>) -> &mut SymbolScope {
        let Some(scope) = scope else {
            return self;
        };

        let key = match self.key {
            None => {
                self.key = Some(scope.key);
                return self;
            }
            Some(key) if key == scope.key => return self,
            Some(key) => key,
        };

        let child = match self.child.take() {
            Some(child) if scope.parent != Some(key) => child,
            Some(_) => {
                debug!(target: "debugger", "scope {:?} replaced by {:?}", key, scope.key);
                Box::new(SymbolScope::with_key(scope.key))
            }
            None => {
                debug!(target: "debugger", "scope {:?} opened", scope.key);
                Box::new(SymbolScope::with_key(scope.key))
            }
        };
        self.child.insert(child).route(Some(scope))
    }

    /// Bind variable address in lexical block `scope`.
    ///
    /// Return `Ok(false)` if allocation is not a stack one and can't be tracked.
    pub fn bind_address(
        &mut self,
        name: &str,
        allocation: Allocation,
        scope: Option<LexicalScope>,
    ) -> Result<bool, Error> {
        let target = self.route(scope);
        if target
            .bindings
            .get(name)
            .map(SymbolValue::has_address)
            .unwrap_or(false)
        {
            return Err(Error::AlreadyBoundSymbol(name.to_string()));
        }

        match allocation {
            Allocation::Stack { address, ty } => {
                debug!(target: "debugger", "bind address {address} to symbol {name}");
                let symbol = target.bindings.entry(name.to_string()).or_default();
                symbol.address = Some(address);
                symbol.ty = Some(ty);
                Ok(true)
            }
            Allocation::Other => Ok(false),
        }
    }

    /// Record the last SSA value of variable, previous value is overwritten.
    pub fn bind_value(&mut self, name: &str, value: ValueId, scope: Option<LexicalScope>) {
        let target = self.route(scope);
        target.bindings.entry(name.to_string()).or_default().value = Some(value);
    }

    /// Find variable visible from lexical block `key`, the deepest binding wins.
    pub fn lookup(&self, name: &str, key: Option<ScopeKey>) -> Option<&SymbolValue> {
        let own = self.bindings.get(name);
        match (self.key, key, &self.child) {
            (Some(this), Some(requested), Some(child)) if this != requested => {
                child.lookup(name, key).or(own)
            }
            _ => own,
        }
    }

    /// Explicit block entry, the block becomes the innermost one.
    pub fn enter_scope(&mut self, scope: LexicalScope) {
        self.route(Some(scope));
    }

    /// Explicit block exit, the block and all nested ones are discarded.
    ///
    /// Return `false` if block is not in the chain.
    pub fn leave_scope(&mut self, key: ScopeKey) -> bool {
        if self.key == Some(key) {
            self.child = None;
            return true;
        }

        let Some(child) = self.child.as_mut() else {
            return false;
        };
        if child.key == Some(key) {
            debug!(target: "debugger", "scope {:?} closed", key);
            self.child = None;
            true
        } else {
            child.leave_scope(key)
        }
    }
}
