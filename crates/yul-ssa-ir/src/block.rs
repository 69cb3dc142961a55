//! Component B: basic blocks, operations, and block exits.

use crate::function::FunctionId;
use crate::identifier;
use crate::value::ValueId;

identifier! {
    /// Dense id of a basic block within a single [`crate::graph::Graph`].
    pub struct BlockId
}

identifier! {
    /// Dense id of a builtin in the dialect registry.
    pub struct BuiltinId
}

/// What kind of call an [`Operation`] performs, and whether control may
/// fall through to the next operation afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    BuiltinCall { builtin: BuiltinId, can_continue: bool },
    UserCall { function: FunctionId, can_continue: bool },
}

impl OperationKind {
    pub fn can_continue(self) -> bool {
        match self {
            OperationKind::BuiltinCall { can_continue, .. } => can_continue,
            OperationKind::UserCall { can_continue, .. } => can_continue,
        }
    }
}

/// One builtin or user-function call within a basic block.
///
/// Derives a `bon` builder so test fixtures (component K) can construct one
/// without naming every field positionally: `Operation::builder().kind(..).inputs(..).outputs(..).build()`.
#[derive(Clone, Debug, PartialEq, Eq, bon::Builder)]
pub struct Operation {
    pub kind: OperationKind,
    #[builder(default)]
    pub inputs: Vec<ValueId>,
    #[builder(default)]
    pub outputs: Vec<ValueId>,
}

/// How control leaves a basic block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    Unconditional {
        target: BlockId,
    },
    Conditional {
        condition: ValueId,
        non_zero_target: BlockId,
        zero_target: BlockId,
    },
    FunctionReturn {
        return_values: Vec<ValueId>,
    },
    /// Control never leaves this block (trap/revert).
    Terminated,
}

/// One basic block: its operations, its φ-values, its predecessor list, and
/// how it exits.
///
/// Invariant: for every φ value id in `phis`, that value's
/// `SSAValue::Phi::arguments.len() == entries.len()` (checked by
/// [`crate::graph::Graph::check_phi_shapes`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    pub operations: Vec<Operation>,
    pub phis: Vec<ValueId>,
    /// Predecessor block ids, in the order φ arguments are indexed by.
    pub entries: Vec<BlockId>,
    pub exit: Exit,
}

impl BasicBlock {
    pub fn new(entries: Vec<BlockId>) -> Self {
        Self {
            operations: Vec::new(),
            phis: Vec::new(),
            entries,
            exit: Exit::Terminated,
        }
    }

    /// Offset of `predecessor` in this block's `entries`, i.e. the index a
    /// φ argument at that predecessor lives at.
    pub fn entry_offset(&self, predecessor: BlockId) -> Option<usize> {
        self.entries.iter().position(|&e| e == predecessor)
    }
}

