//! Dense-id SSA graph data model: interned values, basic blocks, per-function
//! graphs, and the program-wide graph registry (components A–D of
//! `SPEC_FULL.md`). Consumed read-only by `yul-ssa-validator`; the mutating
//! constructors on each type exist for CFG builders and test fixtures.

pub mod arena;
pub mod block;
pub mod function;
pub mod graph;
pub mod registry;
pub mod value;
pub mod variable;

pub use arena::{Dense, Id, Identifier};
pub use block::{BasicBlock, BlockId, BuiltinId, Exit, Operation, OperationKind};
pub use function::FunctionId;
pub use graph::Graph;
pub use registry::ProgramGraphs;
pub use value::{SSAValue, ValueId, ValueStore, VariableOrigin};
pub use variable::VariableId;
