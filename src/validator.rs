//! Component F: the validator driver.
//!
//! Walks the source AST and the already-built SSA CFG in lockstep,
//! asserting that every statement/expression in the former accounts for
//! exactly the operations, jumps, and φ-edges the latter records at the
//! matching program point. Ported line-for-line against
//! `original_source/libyul/backends/evm/SSACFGValidator.cpp`; deviations
//! from that file's literal behavior (and why) are logged in `DESIGN.md`.

use std::collections::{HashMap, HashSet};

use tracing::instrument;
use yul_ssa_ir::{
    BasicBlock, BlockId, Exit, Graph, Operation, OperationKind, ProgramGraphs, SSAValue, ValueId,
    VariableId,
};

use crate::ast::{self, Expression, FunctionCall, Statement};
use crate::dialect::Dialect;
use crate::error::{ErrorKind, ValidationError, ValidationResult};
use crate::loop_frame::LoopFrame;
use crate::scope::AnalysisInfo;
use crate::varmap::VariableMapping;

/// Validates a whole program: the top-level block against the main graph,
/// descending into nested function definitions as they're encountered.
#[instrument(skip_all)]
pub fn validate(
    program: &ast::Block,
    analysis: &AnalysisInfo,
    dialect: &Dialect,
    graphs: &ProgramGraphs,
) -> ValidationResult<()> {
    let graph = graphs.main_graph();
    let mut validator = Validator::new("main".to_string(), graph, graphs, analysis, dialect);
    validator.current_block = graph.entry();
    validator.current_operation = 0;
    validator.scope = program.scope;
    validator.consume_block(program)?;
    Ok(())
}

/// One validator instance owns the traversal state for exactly one graph
/// (the main program or one nested function). Nested functions get their
/// own fresh instance (`SPEC_FULL.md` §5) rather than sharing this one's
/// mapping or loop stack.
struct Validator<'a> {
    function_name: String,
    graph: &'a Graph,
    program: &'a ProgramGraphs,
    analysis: &'a AnalysisInfo,
    dialect: &'a Dialect,
    current_block: BlockId,
    current_operation: usize,
    mapping: VariableMapping,
    scope: ast::ScopeId,
    loop_stack: Vec<LoopFrame>,
}

impl<'a> Validator<'a> {
    fn new(
        function_name: String,
        graph: &'a Graph,
        program: &'a ProgramGraphs,
        analysis: &'a AnalysisInfo,
        dialect: &'a Dialect,
    ) -> Self {
        Self {
            function_name,
            graph,
            program,
            analysis,
            dialect,
            current_block: graph.entry(),
            current_operation: 0,
            mapping: VariableMapping::new(graph.num_value_ids()),
            scope: ast::ScopeId::from_raw(0),
            loop_stack: Vec::new(),
        }
    }

    fn error(&self, kind: ErrorKind) -> ValidationError {
        ValidationError::new(
            self.function_name.clone(),
            self.current_block,
            Some(self.current_operation),
            kind,
        )
    }

    fn locate(&self, err: ValidationError) -> ValidationError {
        err.located(&self.function_name, self.current_block, Some(self.current_operation))
    }

    fn current_basic_block(&self) -> &BasicBlock {
        self.graph.block(self.current_block)
    }

    fn advance_to_block(&mut self, target: BlockId) {
        self.current_block = target;
        self.current_operation = 0;
    }

    /// Advances into `target` with `mapping` as the new working state.
    fn enter_block(&mut self, target: BlockId, mapping: VariableMapping) -> ValidationResult<()> {
        tracing::debug!(function = %self.function_name, block = target.raw(), "entering block");
        self.advance_to_block(target);
        self.mapping = mapping;
        Ok(())
    }

    fn resolve_variable(&self, name: &str) -> ValidationResult<VariableId> {
        self.analysis
            .resolve_variable(self.scope, name)
            .ok_or_else(|| self.error(ErrorKind::LookupFailure(format!("variable `{name}` not in scope"))))
    }

    fn resolve_function(&self, name: &str) -> ValidationResult<yul_ssa_ir::FunctionId> {
        self.analysis
            .resolve_function(self.scope, name)
            .ok_or_else(|| self.error(ErrorKind::LookupFailure(format!("function `{name}` not in scope"))))
    }

    fn assert_cursor_at_end(&self) -> ValidationResult<()> {
        let block = self.current_basic_block();
        if self.current_operation != block.operations.len() {
            return Err(self.error(ErrorKind::CursorMismatch(format!(
                "expected operation cursor at end of block ({} operations), found at {}",
                block.operations.len(),
                self.current_operation
            ))));
        }
        Ok(())
    }

    fn peek_operation(&self) -> ValidationResult<&Operation> {
        self.current_basic_block()
            .operations
            .get(self.current_operation)
            .ok_or_else(|| {
                self.error(ErrorKind::CursorMismatch(format!(
                    "expected an operation at index {}, block has {}",
                    self.current_operation,
                    self.current_basic_block().operations.len()
                )))
            })
    }

    fn expect_conditional_jump(&self) -> ValidationResult<(ValueId, BlockId, BlockId)> {
        self.assert_cursor_at_end()?;
        match self.current_basic_block().exit {
            Exit::Conditional { condition, non_zero_target, zero_target } => {
                Ok((condition, non_zero_target, zero_target))
            }
            _ => Err(self.error(ErrorKind::StructuralMismatch(
                "expected a conditional jump".to_string(),
            ))),
        }
    }

    fn expect_unconditional_jump(&self) -> ValidationResult<BlockId> {
        self.assert_cursor_at_end()?;
        match self.current_basic_block().exit {
            Exit::Unconditional { target } => Ok(target),
            _ => Err(self.error(ErrorKind::StructuralMismatch(
                "expected an unconditional jump".to_string(),
            ))),
        }
    }

    fn expect_function_return(&self) -> ValidationResult<Vec<ValueId>> {
        self.assert_cursor_at_end()?;
        match &self.current_basic_block().exit {
            Exit::FunctionReturn { return_values } => Ok(return_values.clone()),
            _ => Err(self.error(ErrorKind::StructuralMismatch(
                "expected a function return".to_string(),
            ))),
        }
    }

    /// §4.F.6: builds the φ-substitution map from `source`'s position in
    /// `target.entries`, then returns a copy of the current mapping with it
    /// applied. The original mapping is untouched.
    fn apply_phis(&self, source: BlockId, target: BlockId) -> ValidationResult<VariableMapping> {
        let target_block = self.graph.block(target);
        let predecessor_index = target_block.entry_offset(source).ok_or_else(|| {
            self.error(ErrorKind::PhiEdgeMismatch(format!(
                "block {} is not recorded as a predecessor of block {}",
                source.raw(),
                target.raw()
            )))
        })?;
        let mut phi_map: HashMap<ValueId, HashSet<ValueId>> = HashMap::new();
        for &phi in &target_block.phis {
            let SSAValue::Phi { arguments } = self.graph.values().value_info(phi) else {
                return Err(self.error(ErrorKind::StructuralMismatch(format!(
                    "value {phi:?} listed among block {}'s phis is not a Phi",
                    target.raw()
                ))));
            };
            let argument = *arguments.get(predecessor_index).ok_or_else(|| {
                self.error(ErrorKind::PhiEdgeMismatch(format!(
                    "phi {phi:?} has {} argument(s), expected at least {}",
                    arguments.len(),
                    predecessor_index + 1
                )))
            })?;
            phi_map.entry(argument).or_default().insert(phi);
        }
        let mut applied = self.mapping.clone();
        applied.apply_phi_map(&phi_map);
        Ok(applied)
    }

    /// §4.F.5.
    fn validate_call(&self, op: &Operation, name: &str) -> ValidationResult<()> {
        match op.kind {
            OperationKind::BuiltinCall { builtin, .. } => {
                let resolved = self.dialect.find_builtin(name).ok_or_else(|| {
                    self.error(ErrorKind::LookupFailure(format!("builtin `{name}` not found in dialect")))
                })?;
                if resolved != builtin {
                    return Err(self.error(ErrorKind::StructuralMismatch(format!(
                        "call to `{name}` resolves to builtin {resolved:?}, operation names {builtin:?}"
                    ))));
                }
                let info = self.dialect.builtin(builtin);
                if info.num_outputs != op.outputs.len() {
                    return Err(self.error(ErrorKind::ReturnShapeViolation(format!(
                        "builtin `{name}` declares {} output(s), operation has {}",
                        info.num_outputs,
                        op.outputs.len()
                    ))));
                }
                Ok(())
            }
            OperationKind::UserCall { function, .. } => {
                let resolved = self.resolve_function(name)?;
                if resolved != function {
                    return Err(self.error(ErrorKind::StructuralMismatch(format!(
                        "call to `{name}` resolves to function {resolved:?}, operation names {function:?}"
                    ))));
                }
                let callee = self.program.function_graph(resolved).ok_or_else(|| {
                    self.error(ErrorKind::LookupFailure(format!("no graph registered for function `{name}`")))
                })?;
                if callee.returns().len() != op.outputs.len() {
                    return Err(self.error(ErrorKind::ReturnShapeViolation(format!(
                        "function `{name}` declares {} return(s), operation has {}",
                        callee.returns().len(),
                        op.outputs.len()
                    ))));
                }
                Ok(())
            }
        }
    }

    /// §4.F.3: two passes — `FunctionDefinition`s first (hoisted
    /// visibility), then everything else, scoped to `block.scope`.
    #[instrument(skip_all, fields(function = %self.function_name, scope = block.scope.raw()))]
    fn consume_block(&mut self, block: &ast::Block) -> ValidationResult<bool> {
        let saved_scope = self.scope;
        self.scope = block.scope;
        let result = self.consume_block_inner(block);
        self.scope = saved_scope;
        result
    }

    fn consume_block_inner(&mut self, block: &ast::Block) -> ValidationResult<bool> {
        for statement in &block.statements {
            if let Statement::FunctionDefinition(def) = statement {
                self.validate_function_definition(def)?;
            }
        }
        for statement in &block.statements {
            if matches!(statement, Statement::FunctionDefinition(_)) {
                continue;
            }
            if !self.consume_statement(statement)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[instrument(skip_all, fields(function = %def.name))]
    fn validate_function_definition(&mut self, def: &ast::FunctionDefinition) -> ValidationResult<()> {
        let function_id = self.resolve_function(&def.name)?;
        if function_id != def.id {
            return Err(self.error(ErrorKind::LookupFailure(format!(
                "function `{}` resolves to a different id than its own declaration",
                def.name
            ))));
        }
        let callee_graph = self.program.function_graph(function_id).ok_or_else(|| {
            self.error(ErrorKind::LookupFailure(format!(
                "no graph registered for function `{}`",
                def.name
            )))
        })?;
        if def.parameters.len() != callee_graph.arguments().len() {
            return Err(self.error(ErrorKind::ReturnShapeViolation(format!(
                "function `{}` declares {} parameter(s), graph has {}",
                def.name,
                def.parameters.len(),
                callee_graph.arguments().len()
            ))));
        }
        if def.return_variables.len() != callee_graph.returns().len() {
            return Err(self.error(ErrorKind::ReturnShapeViolation(format!(
                "function `{}` declares {} return variable(s), graph has {}",
                def.name,
                def.return_variables.len(),
                callee_graph.returns().len()
            ))));
        }

        let mut nested = Validator::new(
            def.name.clone(),
            callee_graph,
            self.program,
            self.analysis,
            self.dialect,
        );
        nested.advance_to_block(callee_graph.entry());
        nested.scope = def.body.scope;
        for &(variable, value) in callee_graph.arguments() {
            nested
                .mapping
                .define(variable, HashSet::from([value]))
                .map_err(|e| nested.locate(e))?;
        }
        let zero = callee_graph.values().zero_literal().ok_or_else(|| {
            nested.error(ErrorKind::LookupFailure(
                "function graph has no zero literal to initialize returns with".to_string(),
            ))
        })?;
        for &variable in callee_graph.returns() {
            nested
                .mapping
                .define(variable, HashSet::from([zero]))
                .map_err(|e| nested.locate(e))?;
        }

        if nested.consume_block(&def.body)? {
            nested.do_leave()?;
        }

        for &variable in callee_graph.returns() {
            let values = nested.mapping.lookup_values(variable).map_err(|e| nested.locate(e))?;
            if values.len() != 1 {
                return Err(nested.error(ErrorKind::ReturnShapeViolation(format!(
                    "return variable holds {} value(s) at function exit, expected exactly one",
                    values.len()
                ))));
            }
            let only_value = *values.iter().next().unwrap();
            if nested.mapping.lookup_variables(only_value).is_empty() {
                return Err(nested.error(ErrorKind::ReturnShapeViolation(
                    "return value is no longer associated with its return variable at function exit"
                        .to_string(),
                )));
            }
        }
        Ok(())
    }

    fn do_leave(&mut self) -> ValidationResult<()> {
        let return_values = self.expect_function_return()?;
        if return_values.len() != self.graph.returns().len() {
            return Err(self.error(ErrorKind::ReturnShapeViolation(format!(
                "function return has {} value(s), declared {} return variable(s)",
                return_values.len(),
                self.graph.returns().len()
            ))));
        }
        for (&variable, &value) in self.graph.returns().iter().zip(return_values.iter()) {
            self.mapping.set(variable, HashSet::from([value]));
        }
        Ok(())
    }

    /// §4.F.3. Returns `Ok(true)` iff control fell through to the next
    /// statement.
    fn consume_statement(&mut self, statement: &Statement) -> ValidationResult<bool> {
        match statement {
            Statement::Expression(expr) => match self.consume_expression(expr)? {
                Some(values) => {
                    if !values.is_empty() {
                        return Err(self.error(ErrorKind::CursorMismatch(format!(
                            "expression statement produced {} result(s), expected 0",
                            values.len()
                        ))));
                    }
                    Ok(true)
                }
                None => Ok(false),
            },
            Statement::Assignment(assignment) => match self.consume_expression(&assignment.value)? {
                Some(values) => {
                    if values.len() != assignment.variables.len() {
                        return Err(self.error(ErrorKind::CursorMismatch(format!(
                            "assignment has {} target(s), value expression produced {}",
                            assignment.variables.len(),
                            values.len()
                        ))));
                    }
                    for (name, set) in assignment.variables.iter().zip(values) {
                        let var = self.resolve_variable(name)?;
                        self.mapping.set(var, set);
                    }
                    Ok(true)
                }
                None => Ok(false),
            },
            Statement::VariableDeclaration(decl) => self.consume_variable_declaration(decl),
            Statement::FunctionDefinition(_) => Ok(true),
            Statement::If(stmt) => self.consume_if(stmt),
            Statement::Switch(stmt) => self.consume_switch(stmt),
            Statement::ForLoop(stmt) => self.consume_for_loop(stmt),
            Statement::Break => self.consume_break(),
            Statement::Continue => self.consume_continue(),
            Statement::Leave => {
                self.do_leave()?;
                Ok(false)
            }
            Statement::Block(nested) => self.consume_block(nested),
        }
    }

    fn consume_variable_declaration(&mut self, decl: &ast::VariableDeclaration) -> ValidationResult<bool> {
        match &decl.value {
            None => {
                let zero = self.graph.values().zero_literal().ok_or_else(|| {
                    self.error(ErrorKind::LookupFailure(
                        "graph has no zero literal to initialize uninitialized declaration with".to_string(),
                    ))
                })?;
                for name in &decl.variables {
                    let var = self.resolve_variable(name)?;
                    self.mapping
                        .define(var, HashSet::from([zero]))
                        .map_err(|e| self.locate(e))?;
                }
                Ok(true)
            }
            Some(expr) => match self.consume_expression(expr)? {
                Some(values) => {
                    if values.len() != decl.variables.len() {
                        return Err(self.error(ErrorKind::CursorMismatch(format!(
                            "variable declaration has {} target(s), initializer produced {}",
                            decl.variables.len(),
                            values.len()
                        ))));
                    }
                    for (name, set) in decl.variables.iter().zip(values) {
                        let var = self.resolve_variable(name)?;
                        self.mapping.define(var, set).map_err(|e| self.locate(e))?;
                    }
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    /// §4.F.2.
    fn consume_expression(&mut self, expr: &Expression) -> ValidationResult<Option<Vec<HashSet<ValueId>>>> {
        match expr {
            Expression::Literal(n) => {
                let id = self.graph.values().lookup_literal(*n).ok_or_else(|| {
                    self.error(ErrorKind::LookupFailure(format!("literal {n} not interned in this graph")))
                })?;
                Ok(Some(vec![HashSet::from([id])]))
            }
            Expression::Identifier(identifier) => {
                let var = self.resolve_variable(&identifier.name)?;
                let values = self
                    .mapping
                    .lookup_values(var)
                    .map_err(|e| self.locate(e))?
                    .clone();
                Ok(Some(vec![values]))
            }
            Expression::FunctionCall(call) => self.consume_call(call),
        }
    }

    fn consume_unary_expression(&mut self, expr: &Expression) -> ValidationResult<Option<HashSet<ValueId>>> {
        match self.consume_expression(expr)? {
            Some(mut values) => {
                if values.len() != 1 {
                    return Err(self.error(ErrorKind::CursorMismatch(format!(
                        "expected exactly one result value, got {}",
                        values.len()
                    ))));
                }
                Ok(Some(values.pop().unwrap()))
            }
            None => Ok(None),
        }
    }

    /// The bulk of §4.F.2: arguments are evaluated in reverse syntactic
    /// order (skipping literal-only parameters), multi-valued identifier
    /// arguments are narrowed against the CFG's recorded input, and the
    /// whole computed-argument vector is compared to the next operation's
    /// `inputs` before its outputs are returned.
    fn consume_call(&mut self, call: &FunctionCall) -> ValidationResult<Option<Vec<HashSet<ValueId>>>> {
        let builtin_id = self.dialect.find_builtin(&call.name);
        let n = call.arguments.len();
        let mut gathered: Vec<(usize, Vec<HashSet<ValueId>>)> = Vec::new();
        for rank in 0..n {
            let idx = n - 1 - rank;
            if let Some(bid) = builtin_id {
                if self.dialect.is_literal_only(bid, idx) {
                    continue;
                }
            }
            match self.consume_expression(&call.arguments[idx])? {
                Some(values) => gathered.push((idx, values)),
                None => return Ok(None),
            }
        }

        let op_inputs = self.peek_operation()?.inputs.clone();
        let mut arguments = Vec::with_capacity(gathered.len());
        for (position, (idx, values)) in gathered.iter().enumerate() {
            if values.len() != 1 {
                return Err(self.error(ErrorKind::CursorMismatch(format!(
                    "call to `{}`: argument {idx} must yield exactly one result, got {}",
                    call.name,
                    values.len()
                ))));
            }
            let set = &values[0];
            if set.len() > 1 {
                let Expression::Identifier(identifier) = &call.arguments[*idx] else {
                    return Err(self.error(ErrorKind::StructuralMismatch(format!(
                        "call to `{}`: multi-valued argument {idx} is not an identifier",
                        call.name
                    ))));
                };
                let op_input = *op_inputs.get(position).ok_or_else(|| {
                    self.error(ErrorKind::CursorMismatch(format!(
                        "call to `{}`: missing CFG input at position {position}",
                        call.name
                    )))
                })?;
                if !set.contains(&op_input) {
                    return Err(self.error(ErrorKind::PhiEdgeMismatch(format!(
                        "call to `{}`: CFG input {op_input:?} not among candidate values for `{}`",
                        call.name, identifier.name
                    ))));
                }
                let var = self.resolve_variable(&identifier.name)?;
                self.mapping.set(var, HashSet::from([op_input]));
                arguments.push(op_input);
            } else {
                arguments.push(*set.iter().next().unwrap());
            }
        }

        let op = self.peek_operation()?.clone();
        if !op.kind.can_continue() {
            return Ok(None);
        }
        self.current_operation += 1;

        if op.inputs != arguments {
            return Err(self.error(ErrorKind::CursorMismatch(format!(
                "call to `{}`: CFG inputs {:?} do not match consumed arguments {:?}",
                call.name, op.inputs, arguments
            ))));
        }
        self.validate_call(&op, &call.name)?;
        Ok(Some(op.outputs.iter().map(|&v| HashSet::from([v])).collect()))
    }

    /// §4.F.3 "If". Follows the distilled spec's merge-then-continue
    /// description rather than the original's literal control flow, which
    /// computes an equivalent merge into the post-body mapping and then
    /// immediately discards it by overwriting with the unmerged zero-branch
    /// mapping — see `DESIGN.md` for this deviation.
    fn consume_if(&mut self, stmt: &ast::If) -> ValidationResult<bool> {
        let Some(condition) = self.consume_unary_expression(&stmt.condition)? else {
            return Ok(false);
        };
        let (exit_condition, non_zero_target, zero_target) = self.expect_conditional_jump()?;
        if !condition.contains(&exit_condition) {
            return Err(self.error(ErrorKind::StructuralMismatch(
                "if condition value not among the block's conditional jump candidates".to_string(),
            )));
        }
        let mut zero_mapping = self.apply_phis(self.current_block, zero_target)?;

        self.advance_to_block(non_zero_target);
        if self.consume_block(&stmt.body)? {
            let jump_target = self.expect_unconditional_jump()?;
            if jump_target != zero_target {
                return Err(self.error(ErrorKind::StructuralMismatch(
                    "if body's fall-through jump does not target the condition's zero branch".to_string(),
                )));
            }
            let non_zero_mapping = self.apply_phis(self.current_block, jump_target)?;
            zero_mapping.merge(&[&non_zero_mapping]);
        }

        self.enter_block(zero_target, zero_mapping)?;
        Ok(true)
    }

    /// §4.F.3 "Switch".
    fn consume_switch(&mut self, stmt: &ast::Switch) -> ValidationResult<bool> {
        let Some(condition) = self.consume_unary_expression(&stmt.expression)? else {
            return Ok(false);
        };
        if stmt.cases.is_empty() {
            return Err(self.error(ErrorKind::StructuralMismatch("switch has no cases".to_string())));
        }
        if condition.len() != 1 {
            return Err(self.error(ErrorKind::CursorMismatch(
                "switch discriminant must have exactly one value".to_string(),
            )));
        }
        let discriminant = *condition.iter().next().unwrap();

        let mut after_switch: Option<BlockId> = None;
        let mut joined: Vec<VariableMapping> = Vec::new();
        let last_is_default = stmt.cases.last().map(|c| c.value.is_none()).unwrap_or(false);
        let non_default_cases = if last_is_default {
            &stmt.cases[..stmt.cases.len() - 1]
        } else {
            &stmt.cases[..]
        };

        for case in non_default_cases {
            self.validate_ghost_equality(discriminant)?;
            self.current_operation = self.current_basic_block().operations.len();
            let (exit_condition, non_zero_target, zero_target) = self.expect_conditional_jump()?;
            let ghost_output = self.current_basic_block().operations.last().unwrap().outputs[0];
            if exit_condition != ghost_output {
                return Err(self.error(ErrorKind::StructuralMismatch(
                    "conditional jump does not branch on the ghost equality's output".to_string(),
                )));
            }
            let zero_mapping = self.apply_phis(self.current_block, zero_target)?;
            self.advance_to_block(non_zero_target);
            if self.consume_block(&case.body)? {
                let jump_target = self.expect_unconditional_jump()?;
                if let Some(existing) = after_switch {
                    if existing != jump_target {
                        return Err(self.error(ErrorKind::StructuralMismatch(
                            "switch case fall-through targets disagree on the post-switch block".to_string(),
                        )));
                    }
                } else {
                    after_switch = Some(jump_target);
                }
                joined.push(self.apply_phis(self.current_block, jump_target)?);
            }
            self.mapping = zero_mapping;
            self.advance_to_block(zero_target);
        }

        if !last_is_default {
            let refs: Vec<&VariableMapping> = joined.iter().collect();
            self.mapping.merge(&refs);
            return Ok(true);
        }

        let default_case = stmt.cases.last().unwrap();
        if self.consume_block(&default_case.body)? {
            let jump_target = self.expect_unconditional_jump()?;
            if let Some(existing) = after_switch {
                if existing != jump_target {
                    return Err(self.error(ErrorKind::StructuralMismatch(
                        "default case's fall-through target disagrees with other cases' post-switch block"
                            .to_string(),
                    )));
                }
            } else {
                after_switch = Some(jump_target);
            }
            let tail_mapping = self.apply_phis(self.current_block, jump_target)?;
            joined.push(tail_mapping.clone());
            self.mapping = tail_mapping;
        }
        let refs: Vec<&VariableMapping> = joined.iter().collect();
        self.mapping.merge(&refs);

        match after_switch {
            None => Ok(false),
            Some(target) => {
                self.advance_to_block(target);
                Ok(true)
            }
        }
    }

    fn validate_ghost_equality(&self, discriminant: ValueId) -> ValidationResult<()> {
        let equality = self.dialect.equality_builtin().ok_or_else(|| {
            self.error(ErrorKind::LookupFailure(
                "dialect has no registered equality builtin for switch lowering".to_string(),
            ))
        })?;
        let op = self
            .current_basic_block()
            .operations
            .last()
            .ok_or_else(|| self.error(ErrorKind::CursorMismatch("switch block has no operations".to_string())))?;
        match op.kind {
            OperationKind::BuiltinCall { builtin, .. } if builtin == equality => {}
            _ => {
                return Err(self.error(ErrorKind::StructuralMismatch(
                    "expected the switch case's ghost equality call as the block's last operation".to_string(),
                )));
            }
        }
        if op.inputs.len() != 2 || op.outputs.len() != 1 {
            return Err(self.error(ErrorKind::CursorMismatch(
                "ghost equality call must take two inputs and produce one output".to_string(),
            )));
        }
        if op.inputs[1] != discriminant {
            return Err(self.error(ErrorKind::StructuralMismatch(
                "ghost equality call's second input is not the switch discriminant".to_string(),
            )));
        }
        if self.current_operation != self.current_basic_block().operations.len() - 1 {
            return Err(self.error(ErrorKind::CursorMismatch(
                "ghost equality call is not the next operation to consume".to_string(),
            )));
        }
        Ok(())
    }

    fn consume_for_loop(&mut self, stmt: &ast::ForLoop) -> ValidationResult<bool> {
        let saved_scope = self.scope;
        self.scope = stmt.pre.scope;
        let result = self.consume_for_loop_inner(stmt);
        self.scope = saved_scope;
        result
    }

    fn consume_for_loop_inner(&mut self, stmt: &ast::ForLoop) -> ValidationResult<bool> {
        self.consume_block(&stmt.pre)?;
        let entry_target = self.expect_unconditional_jump()?;
        let entry_mapping = self.apply_phis(self.current_block, entry_target)?;
        self.enter_block(entry_target, entry_mapping.clone())?;

        if let Expression::Literal(n) = &stmt.condition {
            return self.consume_constant_for_loop(stmt, entry_target, entry_mapping, *n == 0);
        }
        self.consume_dynamic_for_loop(stmt, entry_target, entry_mapping)
    }

    /// §4.F.4 "Constant loop". Carries the **[SUPPLEMENT]** post-loop
    /// consistency check from `consumeConstantForLoop`: once a `continue`
    /// has recorded a post-block mapping, every subsequent arrival at the
    /// post block must agree with it exactly, for every variable live at
    /// loop entry.
    fn consume_constant_for_loop(
        &mut self,
        stmt: &ast::ForLoop,
        entry_block: BlockId,
        entry_mapping: VariableMapping,
        condition_is_zero: bool,
    ) -> ValidationResult<bool> {
        let Some(condition) = self.consume_unary_expression(&stmt.condition)? else {
            return Ok(false);
        };
        if condition.len() != 1 {
            return Err(self.error(ErrorKind::CursorMismatch(
                "for-loop condition must have exactly one value".to_string(),
            )));
        }

        if condition_is_zero {
            return Ok(true);
        }

        let loop_variables = entry_mapping.domain();
        let mut frame = LoopFrame::new(loop_variables, self.graph.num_value_ids());
        frame.exit_values = self.mapping.clone();
        self.loop_stack.push(frame);

        let fell_through = self.consume_block(&stmt.body)?;
        let frame = self.loop_stack.pop().expect("loop frame pushed above");
        if !fell_through {
            return Ok(false);
        }

        let continue_target = self.expect_unconditional_jump()?;
        let mut post_mapping = self.apply_phis(self.current_block, continue_target)?;

        if let Some(post_values) = &frame.post_values {
            for &variable in &frame.loop_variables {
                let expected = post_values.lookup_values(variable).map_err(|e| self.locate(e))?;
                let actual = post_mapping.lookup_values(variable).map_err(|e| self.locate(e))?;
                if expected != actual {
                    return Err(self.error(ErrorKind::PhiEdgeMismatch(
                        "post-block value set for a loop variable disagrees between iterations"
                            .to_string(),
                    )));
                }
            }
        }

        self.enter_block(continue_target, post_mapping.clone())?;
        if !self.consume_block(&stmt.post)? {
            return Ok(false);
        }
        let back_edge_target = self.expect_unconditional_jump()?;
        if back_edge_target != entry_block {
            return Err(self.error(ErrorKind::StructuralMismatch(
                "for-loop post block's back-edge does not target the loop header".to_string(),
            )));
        }

        match frame.exit_block {
            None => Ok(false),
            Some(exit_block) => {
                post_mapping = self.apply_phis(self.current_block, back_edge_target)?;
                post_mapping.merge(&[&entry_mapping]);
                self.mapping = post_mapping;
                self.advance_to_block(exit_block);
                self.mapping.merge(&[&frame.exit_values]);
                Ok(true)
            }
        }
    }

    /// §4.F.4 "Dynamic loop".
    fn consume_dynamic_for_loop(
        &mut self,
        stmt: &ast::ForLoop,
        entry_block: BlockId,
        entry_mapping: VariableMapping,
    ) -> ValidationResult<bool> {
        let Some(condition) = self.consume_unary_expression(&stmt.condition)? else {
            return Ok(false);
        };
        let (exit_condition, non_zero_target, zero_target) = self.expect_conditional_jump()?;
        if !condition.contains(&exit_condition) {
            return Err(self.error(ErrorKind::StructuralMismatch(
                "for-loop condition value not among the block's conditional jump candidates".to_string(),
            )));
        }
        // [SUPPLEMENT] narrow a bare-identifier condition to the concrete
        // CFG value, mirroring the argument-narrowing done for calls.
        if let Expression::Identifier(identifier) = &stmt.condition {
            let var = self.resolve_variable(&identifier.name)?;
            self.mapping.set(var, HashSet::from([exit_condition]));
        }
        let exit_mapping = self.apply_phis(self.current_block, zero_target)?;

        let loop_variables = entry_mapping.domain();
        let mut frame = LoopFrame::new(loop_variables, self.graph.num_value_ids());
        frame.exit_values = exit_mapping;
        frame.exit_block = Some(zero_target);
        self.loop_stack.push(frame);

        self.advance_to_block(non_zero_target);
        let fell_through = self.consume_block(&stmt.body)?;
        let frame = self.loop_stack.pop().expect("loop frame pushed above");

        if fell_through {
            let post_target = self.expect_unconditional_jump()?;
            let mut post_mapping = self.apply_phis(self.current_block, post_target)?;
            if let Some(existing) = frame.post_block {
                if existing != post_target {
                    return Err(self.error(ErrorKind::PhiEdgeMismatch(
                        "for-loop's continue edges disagree on the post block".to_string(),
                    )));
                }
            }
            if let Some(post_values) = &frame.post_values {
                for &variable in &frame.loop_variables {
                    let values = post_values.lookup_values(variable).map_err(|e| self.locate(e))?.clone();
                    post_mapping.add_values(variable, values);
                }
            }
            self.enter_block(post_target, post_mapping)?;
            if self.consume_block(&stmt.post)? {
                let back_edge_target = self.expect_unconditional_jump()?;
                let mut back_mapping = self.apply_phis(self.current_block, back_edge_target)?;
                if back_edge_target != entry_block {
                    return Err(self.error(ErrorKind::StructuralMismatch(
                        "for-loop post block's back-edge does not target the loop header".to_string(),
                    )));
                }
                self.advance_to_block(back_edge_target);
                back_mapping.merge(&[&entry_mapping]);
                self.mapping = back_mapping;
            }
        }

        self.advance_to_block(zero_target);
        self.mapping.merge(&[&frame.exit_values]);
        Ok(true)
    }

    fn consume_break(&mut self) -> ValidationResult<bool> {
        let target = self.expect_unconditional_jump()?;
        if self.loop_stack.is_empty() {
            return Err(self.error(ErrorKind::StructuralMismatch("break outside of a loop".to_string())));
        }
        let idx = self.loop_stack.len() - 1;
        match self.loop_stack[idx].exit_block {
            Some(existing) if existing != target => {
                return Err(self.error(ErrorKind::PhiEdgeMismatch(
                    "break target disagrees with the loop's previously recorded exit block".to_string(),
                )));
            }
            Some(_) => {}
            None => self.loop_stack[idx].exit_block = Some(target),
        }
        let applied = self.apply_phis(self.current_block, target)?;
        self.mapping = applied.clone();
        self.loop_stack[idx].exit_values.merge(&[&applied]);
        Ok(false)
    }

    fn consume_continue(&mut self) -> ValidationResult<bool> {
        let target = self.expect_unconditional_jump()?;
        if self.loop_stack.is_empty() {
            return Err(self.error(ErrorKind::StructuralMismatch("continue outside of a loop".to_string())));
        }
        let idx = self.loop_stack.len() - 1;
        match self.loop_stack[idx].post_block {
            Some(existing) if existing != target => {
                return Err(self.error(ErrorKind::PhiEdgeMismatch(
                    "continue target disagrees with the loop's previously recorded post block".to_string(),
                )));
            }
            Some(_) => {}
            None => self.loop_stack[idx].post_block = Some(target),
        }
        let mut applied = self.apply_phis(self.current_block, target)?;
        if let Some(accumulator) = &self.loop_stack[idx].post_values {
            applied.merge(&[accumulator]);
        } else {
            self.loop_stack[idx].post_values = Some(applied.clone());
        }
        self.mapping = applied;
        Ok(false)
    }
}
