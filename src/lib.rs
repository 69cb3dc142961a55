//! Semantic-equivalence checker between a Yul-like structured source AST
//! and an already-built per-function SSA control-flow graph.
//!
//! This crate does not parse source, build a CFG, or run semantic
//! analysis — it consumes all three (component H/I contracts) and walks
//! them in lockstep, failing with a located [`ValidationError`] at the
//! first point the AST's shape and the CFG's recorded operations, jumps,
//! and φ-edges diverge. See `SPEC_FULL.md` for the full contract.

pub mod ast;
pub mod dialect;
pub mod error;
mod loop_frame;
pub mod scope;
mod validator;
mod varmap;

pub use dialect::{BuiltinInfo, Dialect};
pub use error::{ErrorKind, ValidationError, ValidationResult};
pub use scope::{AnalysisInfo, Scope};
pub use validator::validate;
