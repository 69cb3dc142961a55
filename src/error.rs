//! Component J: the validator's failure type.
//!
//! Every validation failure names the function, block, and operation index
//! where it was detected, rendered by [`ValidationError`]'s `Display` impl
//! as `"<function>: block B, operation K: <reason>"` (`SPEC_FULL.md` §6, §7).
//! A bare block-level failure (no operation in progress) uses `K = "-"`.

use yul_ssa_ir::BlockId;

/// The five ways a graph can fail to match the behavior its AST describes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ErrorKind {
    /// The statement being consumed doesn't correspond to any operation,
    /// jump, or block shape the CFG could have produced here.
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),
    /// The operation cursor ran off the end of the block, or stopped short
    /// of it, relative to what the AST still has left to consume.
    #[error("cursor mismatch: {0}")]
    CursorMismatch(String),
    /// A variable or function name the AST references has no entry in the
    /// scope table, or a literal the AST references was never interned.
    #[error("lookup failure: {0}")]
    LookupFailure(String),
    /// A φ's argument count, or the value it supplies along one edge,
    /// disagrees with the block's recorded predecessors.
    #[error("phi edge mismatch: {0}")]
    PhiEdgeMismatch(String),
    /// A function's exit doesn't return the shape its declaration promises.
    #[error("return shape violation: {0}")]
    ReturnShapeViolation(String),
}

/// A validation failure, located to the function/block/operation where it
/// was detected.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub function: String,
    pub block: usize,
    pub operation: Option<usize>,
    pub kind: ErrorKind,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let operation = match self.operation {
            Some(index) => index.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "{}: block {}, operation {}: {}",
            self.function, self.block, operation, self.kind
        )
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl ValidationError {
    pub fn new(
        function: impl Into<String>,
        block: BlockId,
        operation: Option<usize>,
        kind: ErrorKind,
    ) -> Self {
        Self {
            function: function.into(),
            block: block.raw(),
            operation,
            kind,
        }
    }

    /// Stamps an error raised without driver context (e.g. from
    /// [`crate::varmap::VariableMapping`]) with the driver's current
    /// position. A no-op if the error already carries a non-empty function
    /// name, so the driver can call this unconditionally on every `?`.
    pub(crate) fn located(mut self, function: &str, block: BlockId, operation: Option<usize>) -> Self {
        if self.function.is_empty() {
            self.function = function.to_string();
            self.block = block.raw();
            self.operation = operation;
        }
        self
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
