//! Component E: the validator's working state, a bidirectional relation
//! between source variables and the SSA values they may currently hold.

use std::collections::{HashMap, HashSet};

use yul_ssa_ir::{ValueId, VariableId};

use crate::error::{ErrorKind, ValidationError};

/// Forward map `var -> {value}` plus a reverse index `value -> {var}` used
/// to drive φ substitution.
///
/// The reverse index is a dense `Vec` rather than a hash map, sized once at
/// construction to the owning graph's value-id count (`SPEC_FULL.md` §3) —
/// mirroring the original's pre-sized `m_valueIdToVars` vector rather than
/// growing lazily, since the validator never encounters a value id the CFG
/// builder didn't already allocate.
///
/// Reverse entries for values removed from a forward set are never
/// garbage-collected: `apply_phi_map` and friends tolerate the resulting
/// stale links because they only act on variables whose *current* forward
/// set still contains the key in question (open question in `spec.md` §9,
/// resolved in `DESIGN.md` to preserve the original's behavior exactly).
#[derive(Clone, Debug)]
pub struct VariableMapping {
    forward: HashMap<VariableId, HashSet<ValueId>>,
    reverse: Vec<HashSet<VariableId>>,
}

impl VariableMapping {
    /// `num_value_ids` must be the owning graph's `Graph::num_value_ids()`;
    /// the reverse index never grows past this.
    pub fn new(num_value_ids: usize) -> Self {
        Self {
            forward: HashMap::new(),
            reverse: vec![HashSet::new(); num_value_ids],
        }
    }

    fn reverse_slot(&mut self, vid: ValueId) -> &mut HashSet<VariableId> {
        &mut self.reverse[vid.raw()]
    }

    /// Establishes `var -> values`. Fails if `var` is already defined.
    pub fn define(&mut self, var: VariableId, values: HashSet<ValueId>) -> Result<(), ValidationError> {
        if self.forward.contains_key(&var) {
            return Err(ValidationError::internal(ErrorKind::StructuralMismatch(
                format!("variable {var:?} already defined"),
            )));
        }
        for &vid in &values {
            self.reverse_slot(vid).insert(var);
        }
        self.forward.insert(var, values);
        Ok(())
    }

    /// Replaces `var`'s forward set atomically. Reverse entries for values
    /// dropped from the old set are left in place (see struct docs).
    pub fn set(&mut self, var: VariableId, values: HashSet<ValueId>) {
        for &vid in &values {
            self.reverse_slot(vid).insert(var);
        }
        self.forward.insert(var, values);
    }

    /// Unions `values` into `var`'s forward set, symmetrically updating the
    /// reverse index. Defines `var` if it was not already defined.
    pub fn add_values(&mut self, var: VariableId, values: HashSet<ValueId>) {
        for &vid in &values {
            self.reverse_slot(vid).insert(var);
        }
        self.forward.entry(var).or_default().extend(values);
    }

    /// The set of variables currently defined, used to scope a loop frame's
    /// `merge` calls to the variables live when the loop was entered.
    pub fn domain(&self) -> HashSet<VariableId> {
        self.forward.keys().copied().collect()
    }

    pub fn contains_variable(&self, var: VariableId) -> bool {
        self.forward.contains_key(&var)
    }

    pub fn contains_value(&self, vid: ValueId) -> bool {
        vid.raw() < self.reverse.len() && !self.reverse[vid.raw()].is_empty()
    }

    /// Fails unless `var` is defined.
    pub fn lookup_values(&self, var: VariableId) -> Result<&HashSet<ValueId>, ValidationError> {
        self.forward.get(&var).ok_or_else(|| {
            ValidationError::internal(ErrorKind::LookupFailure(format!(
                "variable {var:?} not defined in current mapping"
            )))
        })
    }

    /// Total: an unused value id simply has no associated variables.
    pub fn lookup_variables(&self, vid: ValueId) -> HashSet<VariableId> {
        self.reverse
            .get(vid.raw())
            .cloned()
            .unwrap_or_default()
    }

    /// Asymmetric join: for every variable already defined in `self`, union
    /// in its set from each `other` that also defines it. Variables known
    /// only to an `other` are ignored — this is what keeps a branch-local
    /// declaration from leaking past the branch that introduced it.
    pub fn merge(&mut self, others: &[&VariableMapping]) {
        let vars: Vec<VariableId> = self.forward.keys().copied().collect();
        for var in vars {
            for other in others {
                if let Some(values) = other.forward.get(&var) {
                    let values = values.clone();
                    self.add_values(var, values);
                }
            }
        }
    }

    /// Applies a φ substitution map built by [`apply_phis`](crate::validator::apply_phis):
    /// for every argument value id `a` with a replacement set in `phi_map`,
    /// every variable currently pointing at `a` additionally points at
    /// `phi_map[a]`.
    pub fn apply_phi_map(&mut self, phi_map: &HashMap<ValueId, HashSet<ValueId>>) {
        for (&argument, replacement) in phi_map {
            let vars = self.lookup_variables(argument);
            for var in vars {
                self.add_values(var, replacement.clone());
            }
        }
    }
}

impl ValidationError {
    /// Helper for errors raised inside [`VariableMapping`], which (unlike
    /// the driver) has no function/block/operation location in scope.
    /// Callers in `validator.rs` map these back to a located error before
    /// they escape the crate.
    pub(crate) fn internal(kind: ErrorKind) -> Self {
        ValidationError {
            function: String::new(),
            block: 0,
            operation: None,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(n: usize) -> ValueId {
        ValueId::from_raw(n)
    }

    fn var(n: usize) -> VariableId {
        VariableId::from_raw(n)
    }

    fn set(ids: impl IntoIterator<Item = ValueId>) -> HashSet<ValueId> {
        ids.into_iter().collect()
    }

    #[test]
    fn define_then_lookup_round_trips() {
        let mut mapping = VariableMapping::new(4);
        mapping.define(var(0), set([vid(1), vid(2)])).unwrap();
        assert_eq!(*mapping.lookup_values(var(0)).unwrap(), set([vid(1), vid(2)]));
        assert!(mapping.contains_variable(var(0)));
    }

    #[test]
    fn define_twice_fails() {
        let mut mapping = VariableMapping::new(2);
        mapping.define(var(0), set([vid(1)])).unwrap();
        assert!(mapping.define(var(0), set([vid(1)])).is_err());
    }

    #[test]
    fn set_replaces_forward_set_but_leaves_stale_reverse_entry() {
        let mut mapping = VariableMapping::new(3);
        mapping.define(var(0), set([vid(1)])).unwrap();
        mapping.set(var(0), set([vid(2)]));
        assert_eq!(*mapping.lookup_values(var(0)).unwrap(), set([vid(2)]));
        // stale: vid(1)'s reverse entry for var(0) was never removed.
        assert!(mapping.lookup_variables(vid(1)).contains(&var(0)));
        assert!(mapping.lookup_variables(vid(2)).contains(&var(0)));
    }

    #[test]
    fn merge_is_asymmetric_on_destination_domain() {
        let mut dest = VariableMapping::new(4);
        dest.define(var(0), set([vid(1)])).unwrap();

        let mut branch_a = VariableMapping::new(4);
        branch_a.define(var(0), set([vid(2)])).unwrap();
        branch_a.define(var(1), set([vid(3)])).unwrap(); // branch-local

        dest.merge(&[&branch_a]);

        assert_eq!(*dest.lookup_values(var(0)).unwrap(), set([vid(1), vid(2)]));
        assert!(!dest.contains_variable(var(1)));
    }

    #[test]
    fn apply_phi_map_extends_every_variable_pointing_at_the_argument() {
        let mut mapping = VariableMapping::new(4);
        mapping.define(var(0), set([vid(1)])).unwrap();
        mapping.define(var(1), set([vid(1)])).unwrap();

        let mut phi_map = HashMap::new();
        phi_map.insert(vid(1), set([vid(3)]));
        mapping.apply_phi_map(&phi_map);

        assert_eq!(*mapping.lookup_values(var(0)).unwrap(), set([vid(1), vid(3)]));
        assert_eq!(*mapping.lookup_values(var(1)).unwrap(), set([vid(1), vid(3)]));
    }

    #[test]
    fn lookup_values_on_undefined_variable_fails() {
        let mapping = VariableMapping::new(2);
        assert!(mapping.lookup_values(var(0)).is_err());
    }
}
