//! The tree-walking, resumable interpreter (§4.3, §5, §9).
//!
//! Execution is driven one [`Event`] at a time through [`Handle::advance`].
//! Internally, each statement-level activation (the program body, or a
//! procedure/function called as a *statement*) is an explicit [`CallFrame`]
//! holding a stack of [`Cursor`]s — one per block/loop currently in
//! progress within that activation. Every `Cursor` variant is plain data
//! (`Copy`), so a tick reads the top cursor by value, does whatever
//! evaluation it needs with an unborrowed `&mut self`, then writes the
//! updated cursor back; this sidesteps holding a live borrow of `self`
//! across a recursive call to `eval_expr` (§9's "explicit call stack of
//! evaluator frames").
//!
//! Functions called *from inside an expression* never go through this
//! machine at all (§4.3 "Call semantics — expression mode"): they run via
//! [`Interpreter::invoke_sync`], an ordinary recursive evaluator in the
//! style of a plain tree-walking interpreter, mirroring the teacher's
//! `ControlFlow`-returning `execute_stmt`. No `Step`/`Output`/`Input` event
//! is ever produced from inside it.

pub mod event;
pub mod scope;
pub mod value;

pub use event::{Event, Snapshot};
pub use value::RuntimeValue;

use crate::ast::stmt::{IoDirection, Target};
use crate::ast::{BaseType, BinOpKind, Expr, FunctionDecl, Literal, Param, Program, ProcedureDecl, Stmt, UnOpKind, VarDecl};
use crate::intern::{Interner, Symbol};
use scope::{Scope, ScopeStack};

/// A callable resolved by case-insensitive name (§3 "Function table").
#[derive(Debug, Clone, Copy)]
enum Callable<'a> {
    Function(&'a FunctionDecl<'a>),
    Procedure(&'a ProcedureDecl<'a>),
}

impl<'a> Callable<'a> {
    fn params(&self) -> &'a [Param] {
        match self {
            Callable::Function(f) => &f.params,
            Callable::Procedure(p) => &p.params,
        }
    }

    fn locals(&self) -> &'a [VarDecl] {
        match self {
            Callable::Function(f) => &f.locals,
            Callable::Procedure(p) => &p.locals,
        }
    }

    fn body(&self) -> &'a [Stmt<'a>] {
        match self {
            Callable::Function(f) => f.body,
            Callable::Procedure(p) => p.body,
        }
    }
}

/// Case-insensitive mapping from callable name to declaration (§3). Built
/// once before execution and read-only thereafter.
struct FunctionTable<'a> {
    map: std::collections::HashMap<String, Callable<'a>>,
}

impl<'a> FunctionTable<'a> {
    fn build(program: &'a Program<'a>, interner: &Interner) -> Result<Self, String> {
        let mut map = std::collections::HashMap::new();
        for f in &program.functions {
            let key = interner.resolve(f.name).to_lowercase();
            if map.insert(key, Callable::Function(f)).is_some() {
                return Err(format!(
                    "System Error: duplicate function/procedure name '{}'.",
                    interner.resolve(f.name)
                ));
            }
        }
        for p in &program.procedures {
            let key = interner.resolve(p.name).to_lowercase();
            if map.insert(key, Callable::Procedure(p)).is_some() {
                return Err(format!(
                    "System Error: duplicate function/procedure name '{}'.",
                    interner.resolve(p.name)
                ));
            }
        }
        Ok(FunctionTable { map })
    }

    fn lookup(&self, callee: Symbol, interner: &Interner) -> Option<Callable<'a>> {
        let key = interner.resolve(callee).to_lowercase();
        self.map.get(&key).copied()
    }
}

/// One block/loop/read in progress within a single activation. Every field
/// is `Copy` so a tick can take the current cursor by value.
#[derive(Debug, Clone, Copy)]
enum Cursor<'a> {
    /// A straight-line statement list. `stepped` marks whether the `Step`
    /// event for `stmts[idx]` has already been delivered.
    Block { stmts: &'a [Stmt<'a>], idx: usize, stepped: bool },
    For {
        body: &'a [Stmt<'a>],
        var: Symbol,
        end: f64,
        step: f64,
        line: u32,
        stepped: bool,
        body_started: bool,
    },
    While {
        body: &'a [Stmt<'a>],
        cond: &'a Expr<'a>,
        line: u32,
        stepped: bool,
        body_started: bool,
    },
    /// One `Read(...)`'s argument list, consumed one `Input` reply at a
    /// time (§4.3 "Read semantics").
    Reading { targets: &'a [Target<'a>], next: usize, line: u32, emitted: bool },
}

/// One statement-level activation: the program body itself, or a
/// procedure/function called as a statement (§4.3 "Call semantics —
/// stepping mode"). Parallels a frame on `ScopeStack`.
struct CallFrame<'a> {
    stack: Vec<Cursor<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Active,
    Done,
}

enum Tick {
    Event(Event),
    Continue,
    Finished,
}

/// A resumable interpreter instance (GLOSSARY "Handle"). Constructed by
/// [`interpret`]; advanced one event at a time via [`Handle::advance`].
pub struct Handle<'a> {
    functions: FunctionTable<'a>,
    scopes: ScopeStack,
    frames: Vec<CallFrame<'a>>,
    interner: &'a Interner,
    state: RunState,
    pending_error: Option<String>,
}

/// Constructs a fresh, ready interpreter for `program` (§6). `interner` must
/// be the same interner `parse` populated while building `program` — the
/// interpreter resolves identifiers through it for error messages and
/// case-insensitive function lookup.
pub fn interpret<'a>(program: &'a Program<'a>, interner: &'a Interner) -> Handle<'a> {
    let mut scopes = ScopeStack::new();
    for decl in &program.globals {
        materialize(&mut scopes, decl);
    }
    let (functions, pending_error) = match FunctionTable::build(program, interner) {
        Ok(table) => (table, None),
        Err(msg) => (FunctionTable { map: std::collections::HashMap::new() }, Some(msg)),
    };
    let frames = vec![CallFrame { stack: vec![Cursor::Block { stmts: program.body, idx: 0, stepped: false }] }];
    Handle { functions, scopes, frames, interner, state: RunState::Active, pending_error }
}

fn materialize(scopes: &mut ScopeStack, decl: &VarDecl) {
    for &name in &decl.names {
        let value = if decl.is_array() {
            RuntimeValue::default_array(decl.base_type, &decl.dims)
        } else {
            RuntimeValue::default_for(decl.base_type)
        };
        scopes.declare_in_top(name, value);
    }
}

impl<'a> Handle<'a> {
    /// Advances execution until the next event, suspending there (§6).
    /// `reply` is consumed only when the previously delivered event was
    /// `Input`; it is ignored otherwise.
    pub fn advance(&mut self, reply: Option<&str>) -> Event {
        if self.state == RunState::Done {
            return Event::Done;
        }
        if let Some(message) = self.pending_error.take() {
            self.state = RunState::Done;
            return Event::Error { message };
        }
        loop {
            match self.tick(reply) {
                Ok(Tick::Event(e)) => return e,
                Ok(Tick::Continue) => continue,
                Ok(Tick::Finished) => {
                    self.state = RunState::Done;
                    return Event::Done;
                }
                Err(message) => {
                    self.state = RunState::Done;
                    return Event::Error { message };
                }
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    /// Convenience accessor mirroring `Event::snapshot` (SPEC §5).
    pub fn snapshot_of(event: &Event) -> Option<&Snapshot> {
        event.snapshot()
    }

    fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn undeclared(&self, sym: Symbol) -> String {
        format!("Variable '{}' not declared.", self.name(sym))
    }

    fn set_top_cursor(&mut self, cursor: Cursor<'a>) {
        *self.frames.last_mut().expect("frame stack never empty").stack.last_mut().expect("cursor expected") = cursor;
    }

    fn push_cursor(&mut self, cursor: Cursor<'a>) {
        self.frames.last_mut().expect("frame stack never empty").stack.push(cursor);
    }

    fn pop_cursor(&mut self) {
        self.frames.last_mut().expect("frame stack never empty").stack.pop();
    }

    /// Runs one unit of work: either produces an event, signals the whole
    /// program finished, or asks to be called again immediately.
    fn tick(&mut self, reply: Option<&str>) -> Result<Tick, String> {
        let cursor = match self.frames.last().and_then(|f| f.stack.last().copied()) {
            Some(c) => c,
            None => {
                if self.frames.len() == 1 {
                    return Ok(Tick::Finished);
                }
                self.frames.pop();
                self.scopes.pop();
                return Ok(Tick::Continue);
            }
        };

        match cursor {
            Cursor::Block { stmts, idx, stepped } => self.tick_block(stmts, idx, stepped),
            Cursor::For { body, var, end, step, line, stepped, body_started } => {
                self.tick_for(body, var, end, step, line, stepped, body_started)
            }
            Cursor::While { body, cond, line, stepped, body_started } => {
                self.tick_while(body, cond, line, stepped, body_started)
            }
            Cursor::Reading { targets, next, line, emitted } => self.tick_reading(targets, next, line, emitted, reply),
        }
    }

    fn tick_block(&mut self, stmts: &'a [Stmt<'a>], idx: usize, stepped: bool) -> Result<Tick, String> {
        if idx >= stmts.len() {
            self.pop_cursor();
            return Ok(Tick::Continue);
        }
        let stmt = &stmts[idx];
        if !stepped {
            let snapshot = self.scopes.snapshot();
            self.set_top_cursor(Cursor::Block { stmts, idx, stepped: true });
            return Ok(Tick::Event(Event::Step { line: stmt.line(), snapshot }));
        }
        self.dispatch_statement(stmt, stmts, idx)
    }

    fn tick_for(
        &mut self,
        body: &'a [Stmt<'a>],
        var: Symbol,
        end: f64,
        step: f64,
        line: u32,
        stepped: bool,
        body_started: bool,
    ) -> Result<Tick, String> {
        if !stepped {
            let snapshot = self.scopes.snapshot();
            self.set_top_cursor(Cursor::For { body, var, end, step, line, stepped: true, body_started });
            return Ok(Tick::Event(Event::Step { line, snapshot }));
        }
        if !body_started {
            let current = self.scopes.lookup(var).and_then(RuntimeValue::as_number).ok_or_else(|| self.undeclared(var))?;
            let exhausted = if step >= 0.0 { current > end } else { current < end };
            if exhausted {
                self.pop_cursor();
                return Ok(Tick::Continue);
            }
            self.set_top_cursor(Cursor::For { body, var, end, step, line, stepped, body_started: true });
            self.push_cursor(Cursor::Block { stmts: body, idx: 0, stepped: false });
            return Ok(Tick::Continue);
        }
        {
            let cell = self.scopes.lookup_mut(var).ok_or_else(|| self.undeclared(var))?;
            match cell {
                RuntimeValue::Real(n) => *n += step,
                other => return Err(format!("'{}' is not numeric.", other.type_name())),
            }
        }
        self.set_top_cursor(Cursor::For { body, var, end, step, line, stepped: false, body_started: false });
        Ok(Tick::Continue)
    }

    fn tick_while(
        &mut self,
        body: &'a [Stmt<'a>],
        cond: &'a Expr<'a>,
        line: u32,
        stepped: bool,
        body_started: bool,
    ) -> Result<Tick, String> {
        if !stepped {
            let snapshot = self.scopes.snapshot();
            self.set_top_cursor(Cursor::While { body, cond, line, stepped: true, body_started });
            return Ok(Tick::Event(Event::Step { line, snapshot }));
        }
        if !body_started {
            let value = self.eval_expr(cond)?;
            let truth = value.as_bool().ok_or_else(|| type_error("While condition", &value))?;
            if !truth {
                self.pop_cursor();
                return Ok(Tick::Continue);
            }
            self.set_top_cursor(Cursor::While { body, cond, line, stepped, body_started: true });
            self.push_cursor(Cursor::Block { stmts: body, idx: 0, stepped: false });
            return Ok(Tick::Continue);
        }
        self.set_top_cursor(Cursor::While { body, cond, line, stepped: false, body_started: false });
        Ok(Tick::Continue)
    }

    fn tick_reading(
        &mut self,
        targets: &'a [Target<'a>],
        next: usize,
        line: u32,
        emitted: bool,
        reply: Option<&str>,
    ) -> Result<Tick, String> {
        if next >= targets.len() {
            self.pop_cursor();
            return Ok(Tick::Continue);
        }
        let target = &targets[next];
        if !emitted {
            let current = self.read_target(target)?;
            let expected_type = base_type_of(&current);
            self.set_top_cursor(Cursor::Reading { targets, next, line, emitted: true });
            return Ok(Tick::Event(Event::Input { name: target.name(), expected_type }));
        }
        let reply = reply.ok_or_else(|| "System Error: advance() called without a reply after an Input event.".to_string())?;
        let current = self.read_target(target)?;
        let parsed = parse_reply(&current, reply)?;
        self.store_target(target, parsed)?;
        self.set_top_cursor(Cursor::Reading { targets, next: next + 1, line, emitted: false });
        Ok(Tick::Continue)
    }

    /// Dispatches the effect of `stmts[idx]`, then advances that block's
    /// cursor past it (possibly pushing a child cursor for the statement
    /// that was just entered).
    fn dispatch_statement(&mut self, stmt: &'a Stmt<'a>, stmts: &'a [Stmt<'a>], idx: usize) -> Result<Tick, String> {
        // Note: `stmt` is `&'a Stmt<'a>`, so match ergonomics binds any field that
        // is *itself* already a reference (`&'a Expr<'a>`, `&'a [Stmt<'a>]`) one
        // layer too deep (`&'a &'a Expr<'a>`); every such binding below is
        // dereferenced once before use. Fields of non-reference type (`Symbol`,
        // `Target<'a>`, `Vec<_>`) come through at the expected single reference
        // and need no extra deref.
        match stmt {
            Stmt::Assignment { target, value, .. } => {
                let v = self.eval_expr(*value)?;
                self.store_target(target, v)?;
                self.advance_block(stmts, idx);
                Ok(Tick::Continue)
            }
            Stmt::If { cond, then_block, else_block, .. } => {
                let v = self.eval_expr(*cond)?;
                let truth = v.as_bool().ok_or_else(|| type_error("If condition", &v))?;
                self.advance_block(stmts, idx);
                if truth {
                    self.push_cursor(Cursor::Block { stmts: *then_block, idx: 0, stepped: false });
                } else if let Some(else_block) = else_block {
                    self.push_cursor(Cursor::Block { stmts: *else_block, idx: 0, stepped: false });
                }
                Ok(Tick::Continue)
            }
            Stmt::While { cond, body, line } => {
                self.advance_block(stmts, idx);
                self.push_cursor(Cursor::While { body: *body, cond: *cond, line: *line, stepped: false, body_started: false });
                Ok(Tick::Continue)
            }
            Stmt::For { var, start, end, step, body, line } => {
                let start_v = self.eval_expr(*start)?.as_number().ok_or_else(|| "'For' bounds must be numeric.".to_string())?;
                let end_v = self.eval_expr(*end)?.as_number().ok_or_else(|| "'For' bounds must be numeric.".to_string())?;
                let step_v = match step {
                    Some(e) => self.eval_expr(*e)?.as_number().ok_or_else(|| "'For' step must be numeric.".to_string())?,
                    None => 1.0,
                };
                match self.scopes.lookup_mut(*var) {
                    Some(cell) => *cell = RuntimeValue::Real(start_v),
                    // A bare `For i := ...` names a fresh loop counter rather
                    // than an error: materialize it in the current scope
                    // (§8 scenario 3 never declares its loop variables).
                    None => self.scopes.declare_in_top(*var, RuntimeValue::Real(start_v)),
                }
                self.advance_block(stmts, idx);
                self.push_cursor(Cursor::For {
                    body: *body,
                    var: *var,
                    end: end_v,
                    step: step_v,
                    line: *line,
                    stepped: false,
                    body_started: false,
                });
                Ok(Tick::Continue)
            }
            Stmt::Io { direction: IoDirection::Write, write_args, .. } => {
                let mut parts = Vec::with_capacity(write_args.len());
                for arg in write_args.iter().copied() {
                    parts.push(self.eval_expr(arg)?.format_for_write());
                }
                self.advance_block(stmts, idx);
                Ok(Tick::Event(Event::Output { text: parts.join(" ") }))
            }
            Stmt::Io { direction: IoDirection::Read, read_targets, line, .. } => {
                self.advance_block(stmts, idx);
                self.push_cursor(Cursor::Reading { targets: read_targets, next: 0, line: *line, emitted: false });
                Ok(Tick::Continue)
            }
            Stmt::Call { callee, args, line } => {
                // Advance this block's own cursor past the call *before* pushing the
                // callee's frame: `begin_stepping_call` pushes a new `CallFrame`, so
                // afterwards `self.frames.last_mut()` would no longer be this block.
                self.advance_block(stmts, idx);
                self.begin_stepping_call(*callee, args, *line)?;
                Ok(Tick::Continue)
            }
            Stmt::Return { value, .. } => {
                if self.frames.len() == 1 {
                    return Err("Return statement used outside a function or procedure.".to_string());
                }
                if let Some(expr) = value {
                    self.eval_expr(*expr)?;
                }
                self.frames.last_mut().expect("frame stack never empty").stack.clear();
                Ok(Tick::Continue)
            }
        }
    }

    fn advance_block(&mut self, stmts: &'a [Stmt<'a>], idx: usize) {
        self.set_top_cursor(Cursor::Block { stmts, idx: idx + 1, stepped: false });
    }

    /// Pushes a fresh activation for a *statement-position* call (§4.3
    /// "Call semantics — stepping mode"): the callee's body runs through
    /// the same event-producing cursor machine, so nested `Step`/`Output`/
    /// `Input` events are observed by the host. The return value, if any,
    /// is discarded — statement context never consumes it.
    fn begin_stepping_call(&mut self, callee: Symbol, args: &'a [&'a Expr<'a>], _line: u32) -> Result<(), String> {
        let arg_values = self.eval_args(args)?;
        let callable = self
            .functions
            .lookup(callee, self.interner)
            .ok_or_else(|| format!("Unknown procedure/function '{}'.", self.name(callee)))?;
        let params = callable.params();
        if params.len() != arg_values.len() {
            return Err(format!("'{}' expects {} arguments, got {}.", self.name(callee), params.len(), arg_values.len()));
        }
        let scope = build_call_scope(params, callable.locals(), arg_values);
        self.scopes.push(scope);
        self.frames.push(CallFrame { stack: vec![Cursor::Block { stmts: callable.body(), idx: 0, stepped: false }] });
        Ok(())
    }

    fn eval_args(&mut self, args: &'a [&'a Expr<'a>]) -> Result<Vec<RuntimeValue>, String> {
        args.iter().copied().map(|e| self.eval_expr(e)).collect()
    }

    fn eval_indices(&mut self, indices: &'a [&'a Expr<'a>]) -> Result<Vec<i64>, String> {
        indices
            .iter()
            .copied()
            .map(|e| {
                let v = self.eval_expr(e)?;
                v.as_number().map(|n| n as i64).ok_or_else(|| "Array index must be numeric.".to_string())
            })
            .collect()
    }

    fn read_target(&mut self, target: &'a Target<'a>) -> Result<RuntimeValue, String> {
        match target {
            Target::Name { name, .. } => {
                let base = self.scopes.lookup(*name).ok_or_else(|| self.undeclared(*name))?;
                Ok(base.clone())
            }
            Target::Index { indices, name, .. } => {
                // Index expressions can themselves call functions (§4.3), so they
                // go through the same full evaluator `store_target` uses rather
                // than the reduced literal/variable-only const path.
                let indices = self.eval_indices(indices)?;
                let base = self.scopes.lookup(*name).ok_or_else(|| self.undeclared(*name))?;
                descend(base, &indices, self.name(*name)).cloned()
            }
        }
    }

    fn store_target(&mut self, target: &'a Target<'a>, value: RuntimeValue) -> Result<(), String> {
        match target {
            Target::Name { name, .. } => {
                let cell = self.scopes.lookup_mut(*name).ok_or_else(|| self.undeclared(*name))?;
                *cell = value;
                Ok(())
            }
            Target::Index { name, indices, .. } => {
                let idx_vals = self.eval_indices(indices)?;
                let name_text = self.name(*name).to_string();
                let cell = self.scopes.lookup_mut(*name).ok_or_else(|| format!("Variable '{}' not declared.", name_text))?;
                let leaf = descend_mut(cell, &idx_vals, &name_text)?;
                *leaf = value;
                Ok(())
            }
        }
    }

    fn eval_expr(&mut self, expr: &'a Expr<'a>) -> Result<RuntimeValue, String> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Number(n) => RuntimeValue::Real(*n),
                Literal::Str(s) => RuntimeValue::String(s.clone()),
                Literal::Boolean(b) => RuntimeValue::Boolean(*b),
            }),
            Expr::Identifier { name, .. } => self.scopes.lookup(*name).cloned().ok_or_else(|| self.undeclared(*name)),
            Expr::ArrayAccess { name, indices, .. } => {
                let idx_vals = self.eval_indices(indices)?;
                let name_text = self.name(*name).to_string();
                let base = self.scopes.lookup(*name).ok_or_else(|| format!("Variable '{}' not declared.", name_text))?;
                descend(base, &idx_vals, &name_text).cloned()
            }
            Expr::Call { callee, args, .. } => {
                let name_text = self.name(*callee).to_string();
                match self.invoke_sync(*callee, args)? {
                    Some(v) => Ok(v),
                    None => Err(format!("'{}' is a procedure and cannot be used in an expression.", name_text)),
                }
            }
            Expr::BinaryOp { op, left, right, .. } => self.eval_binary(*op, *left, *right),
            Expr::UnaryOp { op, operand, .. } => self.eval_unary(*op, *operand),
        }
    }

    /// Evaluates a function or procedure call synchronously (§4.3 "Call
    /// semantics — expression mode"). No `Step`/`Output`/`Input` event is
    /// ever produced by this path or anything it calls, including nested
    /// statement-position calls inside the callee's own body — the
    /// silence is contagious, matching the documented expression-mode
    /// limitation. Returns `Some(value)` for a function, `None` for a
    /// procedure.
    fn invoke_sync(&mut self, callee: Symbol, args: &'a [&'a Expr<'a>]) -> Result<Option<RuntimeValue>, String> {
        let arg_values = self.eval_args(args)?;
        let callable = self
            .functions
            .lookup(callee, self.interner)
            .ok_or_else(|| format!("Unknown procedure/function '{}'.", self.name(callee)))?;
        let params = callable.params();
        if params.len() != arg_values.len() {
            return Err(format!("'{}' expects {} arguments, got {}.", self.name(callee), params.len(), arg_values.len()));
        }
        let scope = build_call_scope(params, callable.locals(), arg_values);
        self.scopes.push(scope);
        let result = match callable {
            Callable::Function(f) => {
                let flow = self.exec_block_sync(f.body, f.return_type)?;
                let value = match flow {
                    SyncFlow::Returned(v) => v,
                    SyncFlow::Normal => RuntimeValue::default_for(f.return_type),
                };
                Some(value)
            }
            Callable::Procedure(p) => {
                // Return type is unused for a procedure; a bare `Return` inside one
                // yields unit, which has no runtime representation and is discarded.
                self.exec_block_sync(p.body, BaseType::Boolean)?;
                None
            }
        };
        self.scopes.pop();
        Ok(result)
    }

    fn exec_block_sync(&mut self, stmts: &'a [Stmt<'a>], ret_type: BaseType) -> Result<SyncFlow, String> {
        for stmt in stmts {
            match self.exec_stmt_sync(stmt, ret_type)? {
                SyncFlow::Normal => {}
                returned => return Ok(returned),
            }
        }
        Ok(SyncFlow::Normal)
    }

    fn exec_stmt_sync(&mut self, stmt: &'a Stmt<'a>, ret_type: BaseType) -> Result<SyncFlow, String> {
        // See the comment in `dispatch_statement`: fields that are themselves
        // references (`&'a Expr<'a>`, `&'a [Stmt<'a>]`) arrive one layer too
        // deep through match ergonomics and are dereferenced once before use.
        match stmt {
            Stmt::Assignment { target, value, .. } => {
                let v = self.eval_expr(*value)?;
                self.store_target(target, v)?;
                Ok(SyncFlow::Normal)
            }
            Stmt::If { cond, then_block, else_block, .. } => {
                let v = self.eval_expr(*cond)?;
                let truth = v.as_bool().ok_or_else(|| type_error("If condition", &v))?;
                if truth {
                    self.exec_block_sync(*then_block, ret_type)
                } else if let Some(else_block) = else_block {
                    self.exec_block_sync(*else_block, ret_type)
                } else {
                    Ok(SyncFlow::Normal)
                }
            }
            Stmt::While { cond, body, .. } => {
                loop {
                    let v = self.eval_expr(*cond)?;
                    let truth = v.as_bool().ok_or_else(|| type_error("While condition", &v))?;
                    if !truth {
                        break;
                    }
                    match self.exec_block_sync(*body, ret_type)? {
                        SyncFlow::Normal => {}
                        returned => return Ok(returned),
                    }
                }
                Ok(SyncFlow::Normal)
            }
            Stmt::For { var, start, end, step, body, .. } => {
                let start_v = self.eval_expr(*start)?.as_number().ok_or_else(|| "'For' bounds must be numeric.".to_string())?;
                let end_v = self.eval_expr(*end)?.as_number().ok_or_else(|| "'For' bounds must be numeric.".to_string())?;
                let step_v = match step {
                    Some(e) => self.eval_expr(*e)?.as_number().ok_or_else(|| "'For' step must be numeric.".to_string())?,
                    None => 1.0,
                };
                match self.scopes.lookup_mut(*var) {
                    Some(cell) => *cell = RuntimeValue::Real(start_v),
                    None => self.scopes.declare_in_top(*var, RuntimeValue::Real(start_v)),
                }
                loop {
                    let current =
                        self.scopes.lookup(*var).and_then(RuntimeValue::as_number).ok_or_else(|| self.undeclared(*var))?;
                    let exhausted = if step_v >= 0.0 { current > end_v } else { current < end_v };
                    if exhausted {
                        break;
                    }
                    match self.exec_block_sync(*body, ret_type)? {
                        SyncFlow::Normal => {}
                        returned => return Ok(returned),
                    }
                    let cell = self.scopes.lookup_mut(*var).ok_or_else(|| self.undeclared(*var))?;
                    match cell {
                        RuntimeValue::Real(n) => *n += step_v,
                        other => return Err(format!("'{}' is not numeric.", other.type_name())),
                    }
                }
                Ok(SyncFlow::Normal)
            }
            // Expression-mode calls run silently: I/O from inside them is skipped
            // as if the statements were never there (§4.3, §9).
            Stmt::Io { .. } => Ok(SyncFlow::Normal),
            Stmt::Call { callee, args, .. } => {
                self.invoke_sync(*callee, args)?;
                Ok(SyncFlow::Normal)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(*e)?,
                    None => RuntimeValue::default_for(ret_type),
                };
                Ok(SyncFlow::Returned(v))
            }
        }
    }

    fn eval_binary(&mut self, op: BinOpKind, left: &'a Expr<'a>, right: &'a Expr<'a>) -> Result<RuntimeValue, String> {
        use BinOpKind::*;
        match op {
            And => {
                let l = self.eval_expr(left)?;
                let lb = l.as_bool().ok_or_else(|| type_error("And", &l))?;
                if !lb {
                    return Ok(RuntimeValue::Boolean(false));
                }
                let r = self.eval_expr(right)?;
                let rb = r.as_bool().ok_or_else(|| type_error("And", &r))?;
                Ok(RuntimeValue::Boolean(rb))
            }
            Or => {
                let l = self.eval_expr(left)?;
                let lb = l.as_bool().ok_or_else(|| type_error("Or", &l))?;
                if lb {
                    return Ok(RuntimeValue::Boolean(true));
                }
                let r = self.eval_expr(right)?;
                let rb = r.as_bool().ok_or_else(|| type_error("Or", &r))?;
                Ok(RuntimeValue::Boolean(rb))
            }
            Eq => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                Ok(RuntimeValue::Boolean(l == r))
            }
            NotEq => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                Ok(RuntimeValue::Boolean(l != r))
            }
            Lt | Le | Gt | Ge => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let ln = l.as_number().ok_or_else(|| type_error("comparison", &l))?;
                let rn = r.as_number().ok_or_else(|| type_error("comparison", &r))?;
                Ok(RuntimeValue::Boolean(match op {
                    Lt => ln < rn,
                    Le => ln <= rn,
                    Gt => ln > rn,
                    Ge => ln >= rn,
                    _ => unreachable!(),
                }))
            }
            Add => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                match (&l, &r) {
                    (RuntimeValue::Real(a), RuntimeValue::Real(b)) => Ok(RuntimeValue::Real(a + b)),
                    // `+` on strings is unspecified (§9); concatenation is the natural
                    // reading when both sides already happen to be strings.
                    (RuntimeValue::String(a), RuntimeValue::String(b)) => Ok(RuntimeValue::String(format!("{}{}", a, b))),
                    _ => Err(format!("Type error: cannot apply '+' to {} and {}.", l.type_name(), r.type_name())),
                }
            }
            Sub | Mul | Div => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let ln = l.as_number().ok_or_else(|| type_error("arithmetic", &l))?;
                let rn = r.as_number().ok_or_else(|| type_error("arithmetic", &r))?;
                // Division by zero propagates host NaN/infinity rather than trapping
                // (§4.3 "Error conditions").
                Ok(RuntimeValue::Real(match op {
                    Sub => ln - rn,
                    Mul => ln * rn,
                    Div => ln / rn,
                    _ => unreachable!(),
                }))
            }
            Mod => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let ln = l.as_number().ok_or_else(|| type_error("Mod", &l))?;
                let rn = r.as_number().ok_or_else(|| type_error("Mod", &r))?;
                Ok(RuntimeValue::Real(ln % rn))
            }
            IDiv => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let ln = l.as_number().ok_or_else(|| type_error("Div", &l))?;
                let rn = r.as_number().ok_or_else(|| type_error("Div", &r))?;
                Ok(RuntimeValue::Real((ln / rn).floor()))
            }
        }
    }

    fn eval_unary(&mut self, op: UnOpKind, operand: &'a Expr<'a>) -> Result<RuntimeValue, String> {
        let v = self.eval_expr(operand)?;
        match op {
            UnOpKind::Neg => v.as_number().map(|n| RuntimeValue::Real(-n)).ok_or_else(|| type_error("unary '-'", &v)),
            UnOpKind::Not => v.as_bool().map(|b| RuntimeValue::Boolean(!b)).ok_or_else(|| type_error("'Not'", &v)),
        }
    }
}

enum SyncFlow {
    Normal,
    Returned(RuntimeValue),
}

fn type_error(context: &str, value: &RuntimeValue) -> String {
    format!("Type error: {} cannot be applied to a {}.", context, value.type_name())
}

fn base_type_of(value: &RuntimeValue) -> BaseType {
    match value {
        RuntimeValue::Real(_) => BaseType::Real,
        RuntimeValue::Boolean(_) => BaseType::Boolean,
        RuntimeValue::String(_) => BaseType::String,
        RuntimeValue::Array(_) => BaseType::String,
    }
}

fn parse_reply(current: &RuntimeValue, reply: &str) -> Result<RuntimeValue, String> {
    match current {
        RuntimeValue::Real(_) => reply.trim().parse::<f64>().map(RuntimeValue::Real).map_err(|_| "Expected a number input.".to_string()),
        RuntimeValue::Boolean(_) => match reply.trim().to_lowercase().as_str() {
            "true" => Ok(RuntimeValue::Boolean(true)),
            "false" => Ok(RuntimeValue::Boolean(false)),
            _ => Err("Expected a boolean input.".to_string()),
        },
        RuntimeValue::String(_) => Ok(RuntimeValue::String(reply.trim_end_matches(['\n', '\r']).to_string())),
        RuntimeValue::Array(_) => Err("Cannot read directly into an array; index into it first.".to_string()),
    }
}

fn build_call_scope(params: &[Param], locals: &[VarDecl], args: Vec<RuntimeValue>) -> Scope {
    let mut scope = Scope::new();
    for (p, v) in params.iter().zip(args.into_iter()) {
        scope.declare(p.name, v);
    }
    for decl in locals {
        materialize_into(&mut scope, decl);
    }
    scope
}

fn materialize_into(scope: &mut Scope, decl: &VarDecl) {
    for &name in &decl.names {
        let value = if decl.is_array() {
            RuntimeValue::default_array(decl.base_type, &decl.dims)
        } else {
            RuntimeValue::default_for(decl.base_type)
        };
        scope.declare(name, value);
    }
}

/// Descends `value` through `indices`, bounds-checking at each level (§3
/// "Array accesses must satisfy 0 ≤ index < dim").
fn descend<'v>(value: &'v RuntimeValue, indices: &[i64], name: &str) -> Result<&'v RuntimeValue, String> {
    let mut cur = value;
    for &idx in indices {
        let items = match cur {
            RuntimeValue::Array(items) => items,
            _ => return Err(format!("'{}' is not an array.", name)),
        };
        if idx < 0 || idx as usize >= items.len() {
            return Err(format!("Index {} out of bounds.", idx));
        }
        cur = &items[idx as usize];
    }
    Ok(cur)
}

fn descend_mut<'v>(value: &'v mut RuntimeValue, indices: &[i64], name: &str) -> Result<&'v mut RuntimeValue, String> {
    let mut cur = value;
    for &idx in indices {
        let items = match cur {
            RuntimeValue::Array(items) => items,
            _ => return Err(format!("'{}' is not an array.", name)),
        };
        if idx < 0 || idx as usize >= items.len() {
            return Err(format!("Index {} out of bounds.", idx));
        }
        cur = &mut items[idx as usize];
    }
    Ok(cur)
}
