//! Component I (part 1): the semantic-analysis artifact.
//!
//! The analyzer that populates an [`AnalysisInfo`] from a parsed program is
//! out of scope (`SPEC_FULL.md` §1); this module only defines the shape of
//! what it hands the validator, and (behind `#[cfg(test)]`) a minimal
//! builder so this crate's own tests don't need an external analyzer.

use std::collections::HashMap;

use yul_ssa_ir::{FunctionId, VariableId};

use crate::ast::ScopeId;

/// One lexical scope: the variables and functions declared directly in it,
/// plus a link to the enclosing scope for name resolution.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    parent: Option<ScopeId>,
    variables: HashMap<String, VariableId>,
    functions: HashMap<String, FunctionId>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    pub fn declare_variable(&mut self, name: impl Into<String>, id: VariableId) {
        self.variables.insert(name.into(), id);
    }

    pub fn declare_function(&mut self, name: impl Into<String>, id: FunctionId) {
        self.functions.insert(name.into(), id);
    }
}

/// Scope table for one program unit: every [`Block`](crate::ast::Block)'s
/// scope, keyed by its [`ScopeId`].
#[derive(Clone, Debug, Default)]
pub struct AnalysisInfo {
    scopes: HashMap<ScopeId, Scope>,
}

impl AnalysisInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ScopeId, scope: Scope) {
        self.scopes.insert(id, scope);
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    /// Walks from `scope` up through enclosing scopes looking for `name`
    /// as a variable.
    pub fn resolve_variable(&self, scope: ScopeId, name: &str) -> Option<VariableId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(&id)?;
            if let Some(&var) = scope.variables.get(name) {
                return Some(var);
            }
            current = scope.parent;
        }
        None
    }

    /// Walks from `scope` up through enclosing scopes looking for `name`
    /// as a function.
    pub fn resolve_function(&self, scope: ScopeId, name: &str) -> Option<FunctionId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(&id)?;
            if let Some(&func) = scope.functions.get(name) {
                return Some(func);
            }
            current = scope.parent;
        }
        None
    }
}
