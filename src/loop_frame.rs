//! Component G: per-loop accumulator for `break`/`continue` targets.

use std::collections::HashSet;

use yul_ssa_ir::{BlockId, VariableId};

use crate::varmap::VariableMapping;

/// State for one active `for`-loop.
///
/// Nested loops push a fresh frame rather than swap-and-restore a single
/// slot (`spec.md` §9 sanctions either; an explicit `Vec<LoopFrame>` stack
/// makes the nesting structure visible at every call site instead of
/// requiring RAII-discipline bookkeeping in the caller).
pub struct LoopFrame {
    /// Snapshot of the entry mapping's domain, used to scope `merge` calls
    /// at loop exit to variables actually live when the loop was entered.
    pub loop_variables: HashSet<VariableId>,
    /// Accumulated mapping across every `break` edge seen so far.
    pub exit_values: VariableMapping,
    /// Target block of the first `break` seen; later breaks assert they
    /// agree with it. Unset for a constant non-zero loop until (if ever) a
    /// break actually sets it — the "possibly infinite" case.
    pub exit_block: Option<BlockId>,
    /// Accumulated mapping across every `continue` edge seen so far.
    /// Only populated once the loop has a post block to jump to.
    pub post_values: Option<VariableMapping>,
    /// Target block of the first `continue` seen; later continues assert
    /// they agree with it.
    pub post_block: Option<BlockId>,
}

impl LoopFrame {
    pub fn new(loop_variables: HashSet<VariableId>, num_value_ids: usize) -> Self {
        Self {
            loop_variables,
            exit_values: VariableMapping::new(num_value_ids),
            exit_block: None,
            post_values: None,
            post_block: None,
        }
    }
}
