//! Identity of a source function declaration, used as the key into
//! [`crate::registry::ProgramGraphs`] (component D).

use crate::identifier;

identifier! {
    /// Dense id of a source function declaration.
    ///
    /// Assigned by the (external) CFG builder; the validator only ever
    /// receives `FunctionId`s it can resolve through the scope table and
    /// through [`crate::registry::ProgramGraphs::function_graph`].
    pub struct FunctionId
}
