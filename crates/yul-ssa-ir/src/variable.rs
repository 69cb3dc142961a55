//! Identity of a source variable declaration.
//!
//! `VariableId` is the dense handle a [`crate::graph::Graph`]'s `arguments`
//! and `returns` use to name function parameters and return slots, and the
//! key the validator's variable mapping tracks. The declaration it names
//! (its source position, its enclosing scope) lives in the scope table,
//! which is out of scope for this crate and owned by the caller.

use crate::identifier;

identifier! {
    pub struct VariableId
}
