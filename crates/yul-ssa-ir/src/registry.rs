//! Component D: maps each source function declaration to its graph.

use std::collections::HashMap;

use crate::function::FunctionId;
use crate::graph::Graph;

/// The outermost "main" graph plus every nested function's graph.
///
/// This is the `ControlFlow` object of `SPEC_FULL.md` §6: the external CFG
/// builder constructs one of these per program unit and hands it to the
/// validator alongside the AST, scope table, and dialect.
#[derive(Clone, Debug)]
pub struct ProgramGraphs {
    main: Graph,
    functions: HashMap<FunctionId, Graph>,
}

impl ProgramGraphs {
    pub fn new(main: Graph) -> Self {
        Self {
            main,
            functions: HashMap::new(),
        }
    }

    pub fn main_graph(&self) -> &Graph {
        &self.main
    }

    /// Returns the graph for a nested function definition, iff it has one.
    ///
    /// The validator relies on this contract: `fn` must be in scope at the
    /// current program point for this to return `Some`.
    pub fn function_graph(&self, function: FunctionId) -> Option<&Graph> {
        self.functions.get(&function)
    }

    pub fn insert_function_graph(&mut self, function: FunctionId, graph: Graph) {
        self.functions.insert(function, graph);
    }
}
