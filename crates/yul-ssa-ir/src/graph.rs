//! Component C: the per-function graph container.

use crate::arena::Dense;
use crate::block::{BasicBlock, BlockId};
use crate::function::FunctionId;
use crate::value::{SSAValue, ValueStore};
use crate::variable::VariableId;

/// A fully built SSA CFG for one function (or the outermost program body).
///
/// Consumed read-only by the validator; the mutating methods exist for CFG
/// builders and test fixtures (component K of `SPEC_FULL.md`).
#[derive(Clone, Debug)]
pub struct Graph {
    entry: BlockId,
    arguments: Vec<(VariableId, crate::value::ValueId)>,
    returns: Vec<VariableId>,
    blocks: Dense<BlockId, BasicBlock>,
    values: ValueStore,
    /// `None` for the outermost "main" graph; `Some` for a nested function.
    function: Option<FunctionId>,
}

impl Graph {
    pub fn new(function: Option<FunctionId>) -> Self {
        Self {
            entry: BlockId::from_raw(0),
            arguments: Vec::new(),
            returns: Vec::new(),
            blocks: Dense::new(),
            values: ValueStore::new(),
            function,
        }
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn set_entry(&mut self, entry: BlockId) {
        self.entry = entry;
    }

    pub fn arguments(&self) -> &[(VariableId, crate::value::ValueId)] {
        &self.arguments
    }

    pub fn push_argument(&mut self, variable: VariableId, value: crate::value::ValueId) {
        self.arguments.push((variable, value));
    }

    pub fn returns(&self) -> &[VariableId] {
        &self.returns
    }

    pub fn push_return(&mut self, variable: VariableId) {
        self.returns.push(variable);
    }

    pub fn function(&self) -> Option<FunctionId> {
        self.function
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks
            .get(id)
            .unwrap_or_else(|| panic!("BlockId {id:?} not present in this Graph"))
    }

    pub fn push_block(&mut self, block: BasicBlock) -> BlockId {
        self.blocks.push(block)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks.iter()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueStore {
        &mut self.values
    }

    pub fn num_value_ids(&self) -> usize {
        self.values.len()
    }

    /// Checks the structural invariant that every φ in every block has
    /// exactly as many arguments as the block has predecessors.
    ///
    /// Not called by the validator itself (which would simply fail a
    /// `PhiEdgeMismatch` the first time it walked a malformed φ) - this is
    /// a cheap whole-graph sanity check for test fixtures and builders.
    pub fn check_phi_shapes(&self) -> bool {
        self.blocks.iter().all(|(_, block)| {
            block.phis.iter().all(|&phi| match self.values.value_info(phi) {
                SSAValue::Phi { arguments } => arguments.len() == block.entries.len(),
                _ => false,
            })
        })
    }
}
