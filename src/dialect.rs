//! Component I (part 2): the builtin contract.
//!
//! The validator never interprets a builtin's semantics — it only needs to
//! know its output arity, whether control falls through after it, and which
//! of its arguments must be literal constants (`SPEC_FULL.md` §3). One
//! builtin is distinguished as the dialect's equality operator, used by
//! `consume_constant_for_loop`'s post-block check (`SPEC_FULL.md` §4.F).

use std::collections::HashMap;

use yul_ssa_ir::{BuiltinId, Dense};

/// Static facts about one builtin, as seen by the validator.
#[derive(Clone, Debug)]
pub struct BuiltinInfo {
    pub name: String,
    pub num_outputs: usize,
    pub can_continue: bool,
    /// Indices of arguments that must be literal constants at every call
    /// site (e.g. `dataoffset`'s identifier argument in the source dialect).
    pub literal_only_params: Vec<usize>,
}

/// The set of builtins a program may call, plus which one (if any) means
/// equality for the purposes of the constant for-loop post-block check.
#[derive(Clone, Debug, Default)]
pub struct Dialect {
    builtins: Dense<BuiltinId, BuiltinInfo>,
    by_name: HashMap<String, BuiltinId>,
    equality: Option<BuiltinId>,
}

impl Dialect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: BuiltinInfo) -> BuiltinId {
        let name = info.name.clone();
        let id = self.builtins.push(info);
        self.by_name.insert(name, id);
        id
    }

    pub fn set_equality_builtin(&mut self, id: BuiltinId) {
        self.equality = Some(id);
    }

    pub fn find_builtin(&self, name: &str) -> Option<BuiltinId> {
        self.by_name.get(name).copied()
    }

    pub fn builtin(&self, id: BuiltinId) -> &BuiltinInfo {
        self.builtins
            .get(id)
            .unwrap_or_else(|| panic!("BuiltinId {id:?} not registered in this Dialect"))
    }

    pub fn equality_builtin(&self) -> Option<BuiltinId> {
        self.equality
    }

    pub fn is_literal_only(&self, id: BuiltinId, argument_index: usize) -> bool {
        self.builtin(id).literal_only_params.contains(&argument_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_find_round_trips() {
        let mut dialect = Dialect::new();
        let id = dialect.register(BuiltinInfo {
            name: "add".to_string(),
            num_outputs: 1,
            can_continue: true,
            literal_only_params: vec![],
        });
        assert_eq!(dialect.find_builtin("add"), Some(id));
        assert_eq!(dialect.builtin(id).num_outputs, 1);
    }

    #[test]
    fn equality_builtin_defaults_to_none() {
        let dialect = Dialect::new();
        assert_eq!(dialect.equality_builtin(), None);
    }

    #[test]
    fn literal_only_params_are_queryable_by_index() {
        let mut dialect = Dialect::new();
        let id = dialect.register(BuiltinInfo {
            name: "dataoffset".to_string(),
            num_outputs: 1,
            can_continue: true,
            literal_only_params: vec![0],
        });
        assert!(dialect.is_literal_only(id, 0));
        assert!(!dialect.is_literal_only(id, 1));
    }
}
