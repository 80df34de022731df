// ABOUTME: Tree-walk evaluator: scopes, closures, operator semantics, calls, and iteration

use crate::ast::{BinOp, Block, Expr, Literal, Program, Stmt, UnOp};
use crate::builtins;
use crate::env::Environment;
use crate::error::EvalError;
use crate::position::Position;
use crate::value::{Function, UserFunction, Value};
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Counters the CLI reports with `-stats`. Incremented once per
/// statement/expression evaluated and once per call site, per function kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub ops: u64,
    pub builtin_calls: u64,
    pub user_calls: u64,
}

/// How a block finished: either it ran off the end, or a `return` unwound
/// through it. Propagated manually since `return`'s `?`-free early exit
/// needs to distinguish "no value yet" from "errored".
enum Flow {
    Next,
    Return(Value, Position),
}

pub struct Interpreter {
    /// The topmost scope. Lookups walk its parent chain; assignment always
    /// targets this scope directly (see `Environment::assign`).
    scope: Rc<Environment>,
    program_args: Vec<String>,
    stdin_cache: Option<Rc<str>>,
    /// Host input for the `read()` built-in with no path. Injectable so
    /// embedders and tests never have to touch the process's real stdin.
    stdin: Box<dyn Read>,
    /// Host output for the `print` built-in. Injectable for the same reason.
    stdout: Box<dyn Write>,
    pub stats: Stats,
}

impl Interpreter {
    /// Wires the interpreter to the process's real stdin/stdout, as the CLI
    /// driver wants.
    pub fn new(program_args: Vec<String>) -> Self {
        Self::with_io(program_args, Box::new(io::stdin()), Box::new(io::stdout()))
    }

    /// Wires the interpreter to caller-supplied byte sinks/sources, for
    /// embedding or for tests that want to assert on `print` output or feed
    /// `read()` canned input.
    pub fn with_io(program_args: Vec<String>, stdin: Box<dyn Read>, stdout: Box<dyn Write>) -> Self {
        let global = Environment::new();
        builtins::register_all(&global);
        Interpreter {
            scope: global,
            program_args,
            stdin_cache: None,
            stdin,
            stdout,
            stats: Stats::default(),
        }
    }

    pub fn program_args(&self) -> &[String] {
        &self.program_args
    }

    /// Writes `s` followed by a newline to the interpreter's stdout sink;
    /// used by the `print` built-in.
    pub fn write_stdout_line(&mut self, s: &str) -> io::Result<()> {
        writeln!(self.stdout, "{s}")
    }

    /// Reads the interpreter's stdin source to completion, caching the
    /// result so a second call to `read()` with no path observes the same
    /// contents (the source is a single-use stream, not re-readable).
    pub fn read_stdin(&mut self) -> io::Result<Rc<str>> {
        if let Some(cached) = &self.stdin_cache {
            return Ok(Rc::clone(cached));
        }
        let mut buf = String::new();
        self.stdin.read_to_string(&mut buf)?;
        let rc: Rc<str> = buf.into();
        self.stdin_cache = Some(Rc::clone(&rc));
        Ok(rc)
    }

    /// Executes a parsed program in the global scope. `return` at the top
    /// level (not bounded by any function activation) is a runtime error.
    pub fn run(&mut self, program: &Program) -> Result<(), EvalError> {
        match self.exec_block(program)? {
            Flow::Next => Ok(()),
            Flow::Return(_, position) => Err(EvalError::runtime(position, "can't return at top level")),
        }
    }

    fn exec_block(&mut self, block: &Block) -> Result<Flow, EvalError> {
        for stmt in block {
            match self.exec_stmt(stmt)? {
                Flow::Next => continue,
                ret @ Flow::Return(..) => return Ok(ret),
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        self.stats.ops += 1;
        match stmt {
            Stmt::Assign { target, value, position } => {
                let v = self.eval_expr(value)?;
                self.exec_assign(target, v, *position)?;
                Ok(Flow::Next)
            }
            Stmt::If { cond, body, else_body, position: _ } => {
                let c = self.eval_expr(cond)?;
                if c.truthy_bool(cond.position(), "if condition")? {
                    self.exec_block(body)
                } else if let Some(else_body) = else_body {
                    self.exec_block(else_body)
                } else {
                    Ok(Flow::Next)
                }
            }
            Stmt::While { cond, body, position: _ } => {
                loop {
                    let c = self.eval_expr(cond)?;
                    if !c.truthy_bool(cond.position(), "while condition")? {
                        break;
                    }
                    match self.exec_block(body)? {
                        Flow::Next => continue,
                        ret @ Flow::Return(..) => return Ok(ret),
                    }
                }
                Ok(Flow::Next)
            }
            Stmt::For { name, iterable, body, position } => {
                let iterable_val = self.eval_expr(iterable)?;
                let iter = self.iterate(&iterable_val, *position)?;
                for item in iter {
                    self.scope.assign(name.clone(), item);
                    match self.exec_block(body)? {
                        Flow::Next => continue,
                        ret @ Flow::Return(..) => return Ok(ret),
                    }
                }
                Ok(Flow::Next)
            }
            Stmt::Return { result, position } => {
                let v = self.eval_expr(result)?;
                Ok(Flow::Return(v, *position))
            }
            Stmt::ExpressionStatement { expr, position: _ } => {
                self.eval_expr(expr)?;
                Ok(Flow::Next)
            }
            Stmt::FunctionDefinition { name, params, ellipsis, body, position: _ } => {
                let func = Value::Func(Function::User(Rc::new(UserFunction {
                    name: Some(name.clone()),
                    params: params.clone(),
                    ellipsis: *ellipsis,
                    body: body.clone(),
                    closure: Rc::clone(&self.scope),
                })));
                self.scope.assign(name.clone(), func);
                Ok(Flow::Next)
            }
        }
    }

    fn exec_assign(&mut self, target: &Expr, value: Value, position: Position) -> Result<(), EvalError> {
        match target {
            Expr::Variable { name, .. } => {
                self.scope.assign(name.clone(), value);
                Ok(())
            }
            Expr::Subscript { container, subscript, .. } => {
                let c = self.eval_expr(container)?;
                let s = self.eval_expr(subscript)?;
                match &c {
                    Value::List(items) => {
                        let idx = require_index(&s, position)?;
                        let mut items = items.borrow_mut();
                        if idx < 0 || idx as usize >= items.len() {
                            return Err(EvalError::value(position, format!("subscript {idx} out of range")));
                        }
                        items[idx as usize] = value;
                        Ok(())
                    }
                    Value::Map(map) => {
                        let Value::Str(key) = &s else {
                            return Err(EvalError::type_error(
                                position,
                                "can only assign to subscript of list or map",
                            ));
                        };
                        map.borrow_mut().insert(key.to_string(), value);
                        Ok(())
                    }
                    other => Err(EvalError::type_error(
                        position,
                        format!("can only assign to subscript of list or map, got {}", other.type_name()),
                    )),
                }
            }
            _ => unreachable!("parser only produces Variable/Subscript assign targets"),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.stats.ops += 1;
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::Variable { name, position } => self
                .scope
                .get(name)
                .ok_or_else(|| EvalError::name(*position, format!("undefined name: {name}"))),
            Expr::List { values, .. } => {
                let mut items = Vec::with_capacity(values.len());
                for v in values {
                    items.push(self.eval_expr(v)?);
                }
                Ok(Value::list(items))
            }
            Expr::Map { items, .. } => {
                let mut map = std::collections::BTreeMap::new();
                for (k, v) in items {
                    let key = self.eval_expr(k)?;
                    let Value::Str(key) = key else {
                        return Err(EvalError::type_error(k.position(), "map key must be a str"));
                    };
                    let value = self.eval_expr(v)?;
                    map.insert(key.to_string(), value);
                }
                Ok(Value::map(map))
            }
            Expr::FunctionExpression { params, ellipsis, body, .. } => {
                Ok(Value::Func(Function::User(Rc::new(UserFunction {
                    name: None,
                    params: params.clone(),
                    ellipsis: *ellipsis,
                    body: body.clone(),
                    closure: Rc::clone(&self.scope),
                }))))
            }
            Expr::Unary { op, operand, position } => self.eval_unary(*op, operand, *position),
            Expr::Binary { left, op, right, position } => self.eval_binary(*op, left, right, *position),
            Expr::Subscript { container, subscript, position } => {
                let c = self.eval_expr(container)?;
                let s = self.eval_expr(subscript)?;
                self.eval_subscript(&c, &s, *position)
            }
            Expr::Call { function, args, ellipsis, position } => {
                let func_val = self.eval_expr(function)?;
                let Value::Func(func) = func_val else {
                    return Err(EvalError::type_error(
                        *position,
                        format!("not callable: {}", func_val.type_name()),
                    ));
                };
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    arg_values.push(self.eval_expr(a)?);
                }
                if *ellipsis {
                    let tail = arg_values.pop().expect("parser guarantees at least one arg before ...");
                    let tail_iter = self.iterate(&tail, *position)?;
                    arg_values.extend(tail_iter);
                }
                self.call_function(&func, *position, arg_values)
            }
        }
    }

    fn eval_unary(&mut self, op: UnOp, operand: &Expr, position: Position) -> Result<Value, EvalError> {
        let v = self.eval_expr(operand)?;
        match op {
            UnOp::Neg => match v {
                Value::Int(n) => Ok(Value::Int(-n)),
                other => Err(EvalError::type_error(position, format!("unary - requires int, got {}", other.type_name()))),
            },
            UnOp::Not => match v {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(EvalError::type_error(position, format!("not requires bool, got {}", other.type_name()))),
            },
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, position: Position) -> Result<Value, EvalError> {
        if matches!(op, BinOp::Or | BinOp::And) {
            let l = self.eval_expr(left)?;
            let lb = l.truthy_bool(left.position(), "operand of and/or")?;
            if (op == BinOp::Or && lb) || (op == BinOp::And && !lb) {
                return Ok(Value::Bool(lb));
            }
            let r = self.eval_expr(right)?;
            let rb = r.truthy_bool(right.position(), "operand of and/or")?;
            return Ok(Value::Bool(rb));
        }

        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        match op {
            BinOp::Eq => Ok(Value::Bool(l.deep_eq(&r))),
            BinOp::NotEq => Ok(Value::Bool(!l.deep_eq(&r))),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ord = l.partial_cmp_value(&r).ok_or_else(|| {
                    EvalError::type_error(
                        position,
                        format!("cannot compare {} and {}", l.type_name(), r.type_name()),
                    )
                })?;
                use std::cmp::Ordering::*;
                let result = match op {
                    BinOp::Lt => ord == Less,
                    BinOp::Le => ord != Greater,
                    BinOp::Gt => ord == Greater,
                    BinOp::Ge => ord != Less,
                    _ => unreachable!(),
                };
                Ok(Value::Bool(result))
            }
            BinOp::In => self.eval_in(&l, &r, position),
            BinOp::Add => self.eval_add(l, r, position),
            BinOp::Sub => match (l, r) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
                (a, b) => Err(type_error_binop("-", &a, &b, position)),
            },
            BinOp::Mul => self.eval_mul(l, r, position),
            BinOp::Div => match (l, r) {
                (Value::Int(_), Value::Int(0)) => Err(EvalError::value(position, "can't divide by zero")),
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(b))),
                (a, b) => Err(type_error_binop("/", &a, &b, position)),
            },
            BinOp::Mod => match (l, r) {
                (Value::Int(_), Value::Int(0)) => Err(EvalError::value(position, "can't divide by zero")),
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(b))),
                (a, b) => Err(type_error_binop("%", &a, &b, position)),
            },
            BinOp::Or | BinOp::And => unreachable!("handled above"),
        }
    }

    fn eval_add(&self, l: Value, r: Value, position: Position) -> Result<Value, EvalError> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (Value::Map(a), Value::Map(b)) => {
                let mut result = a.borrow().clone();
                for (k, v) in b.borrow().iter() {
                    result.insert(k.clone(), v.clone());
                }
                Ok(Value::map(result))
            }
            (a, b) => Err(type_error_binop("+", &a, &b, position)),
        }
    }

    fn eval_mul(&self, l: Value, r: Value, position: Position) -> Result<Value, EvalError> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            (Value::Int(n), Value::Str(s)) | (Value::Str(s), Value::Int(n)) => {
                if n < 0 {
                    return Err(EvalError::value(position, "can't repeat a negative number of times"));
                }
                Ok(Value::str(s.repeat(n as usize)))
            }
            (Value::Int(n), Value::List(items)) | (Value::List(items), Value::Int(n)) => {
                if n < 0 {
                    return Err(EvalError::value(position, "can't repeat a negative number of times"));
                }
                let base = items.borrow();
                let mut out = Vec::with_capacity(base.len() * n as usize);
                for _ in 0..n {
                    out.extend(base.iter().cloned());
                }
                Ok(Value::list(out))
            }
            (a, b) => Err(type_error_binop("*", &a, &b, position)),
        }
    }

    fn eval_in(&self, needle: &Value, haystack: &Value, position: Position) -> Result<Value, EvalError> {
        match (needle, haystack) {
            (Value::Str(n), Value::Str(h)) => Ok(Value::Bool(h.contains(n.as_ref()))),
            (v, Value::List(items)) => Ok(Value::Bool(items.borrow().iter().any(|e| e.deep_eq(v)))),
            (Value::Str(k), Value::Map(m)) => Ok(Value::Bool(m.borrow().contains_key(k.as_ref()))),
            (n, h) => Err(EvalError::type_error(
                position,
                format!("can't use 'in' with {} and {}", n.type_name(), h.type_name()),
            )),
        }
    }

    fn eval_subscript(&self, container: &Value, subscript: &Value, position: Position) -> Result<Value, EvalError> {
        match container {
            Value::Str(s) => {
                let idx = require_index(subscript, position)?;
                let bytes = s.as_bytes();
                if idx < 0 || idx as usize >= bytes.len() {
                    return Err(EvalError::value(position, format!("subscript {idx} out of range")));
                }
                Ok(Value::str((bytes[idx as usize] as char).to_string()))
            }
            Value::List(items) => {
                let idx = require_index(subscript, position)?;
                let items = items.borrow();
                if idx < 0 || idx as usize >= items.len() {
                    return Err(EvalError::value(position, format!("subscript {idx} out of range")));
                }
                Ok(items[idx as usize].clone())
            }
            Value::Map(map) => {
                let Value::Str(key) = subscript else {
                    return Err(EvalError::type_error(position, "map subscript must be a str"));
                };
                map.borrow()
                    .get(key.as_ref())
                    .cloned()
                    .ok_or_else(|| EvalError::value(position, format!("key not found: {:?}", key.as_ref())))
            }
            other => Err(EvalError::type_error(
                position,
                format!("cannot subscript {}", other.type_name()),
            )),
        }
    }

    /// Invokes a function value. Stats: one `user_calls`/`builtin_calls`
    /// increment per call site, counted here rather than at each call
    /// expression so ellipsis-expanded calls still count once.
    pub fn call_function(&mut self, func: &Function, position: Position, args: Vec<Value>) -> Result<Value, EvalError> {
        match func {
            Function::Builtin { func, .. } => {
                self.stats.builtin_calls += 1;
                func(self, position, &args)
            }
            Function::User(user) => {
                self.stats.user_calls += 1;
                let k = user.params.len();
                let n = args.len();
                if user.ellipsis {
                    if n < k.saturating_sub(1) {
                        return Err(EvalError::type_error(
                            position,
                            format!(
                                "{}() requires at least {} arg(s), got {}",
                                user.name.as_deref().unwrap_or("<anonymous>"),
                                k.saturating_sub(1),
                                n
                            ),
                        ));
                    }
                } else if n != k {
                    return Err(EvalError::type_error(
                        position,
                        format!(
                            "{}() requires {} arg(s), got {}",
                            user.name.as_deref().unwrap_or("<anonymous>"),
                            k,
                            n
                        ),
                    ));
                }

                let call_scope = Environment::with_parent(Rc::clone(&user.closure));
                if user.ellipsis {
                    // `func(...) {}` has no named parameter to collect the
                    // trailing arguments into; its own arguments are simply
                    // discarded, matching the bare-ellipsis form spec.md §4.2
                    // says is legal.
                    if k > 0 {
                        let fixed = k - 1;
                        for (name, value) in user.params[..fixed].iter().zip(args.iter()) {
                            call_scope.assign(name.clone(), value.clone());
                        }
                        let rest: Vec<Value> = args[fixed..].to_vec();
                        call_scope.assign(user.params[fixed].clone(), Value::list(rest));
                    }
                } else {
                    for (name, value) in user.params.iter().zip(args.into_iter()) {
                        call_scope.assign(name.clone(), value);
                    }
                }

                let saved_scope = std::mem::replace(&mut self.scope, call_scope);
                let result = self.exec_block(&user.body);
                self.scope = saved_scope;

                match result? {
                    Flow::Next => Ok(Value::Nil),
                    Flow::Return(v, _) => Ok(v),
                }
            }
        }
    }

    /// Produces a finite, single-pass iterator per the contract in §4.3.6:
    /// strings yield one codepoint at a time, lists/maps see a snapshot
    /// taken when iteration begins.
    pub fn iterate(&self, v: &Value, position: Position) -> Result<ValueIter, EvalError> {
        match v {
            Value::Str(s) => Ok(ValueIter::Str(Rc::clone(s), 0)),
            Value::List(items) => Ok(ValueIter::List(items.borrow().clone().into_iter())),
            Value::Map(map) => Ok(ValueIter::Map(map.borrow().keys().cloned().collect::<Vec<_>>().into_iter())),
            other => Err(EvalError::type_error(position, format!("cannot iterate {}", other.type_name()))),
        }
    }
}

/// A finite, single-pass sequence produced by `Interpreter::iterate`.
///
/// `Str` decodes one codepoint at a time from a byte offset into the shared
/// `Rc<str>` rather than materializing a `Vec<char>` up front, bounding
/// memory use for long strings per spec.md §9.
pub enum ValueIter {
    Str(Rc<str>, usize),
    List(std::vec::IntoIter<Value>),
    Map(std::vec::IntoIter<String>),
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Str(s, offset) => {
                let rest = &s[*offset..];
                let c = rest.chars().next()?;
                *offset += c.len_utf8();
                Some(Value::str(c.to_string()))
            }
            ValueIter::List(it) => it.next(),
            ValueIter::Map(it) => it.next().map(Value::str),
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Str(s) => Value::str(s.clone()),
    }
}

fn require_index(v: &Value, position: Position) -> Result<i64, EvalError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(EvalError::type_error(position, format!("subscript must be int, got {}", other.type_name()))),
    }
}

fn type_error_binop(op: &str, l: &Value, r: &Value, position: Position) -> EvalError {
    EvalError::type_error(
        position,
        format!("unsupported operand types for {op}: {} and {}", l.type_name(), r.type_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn run_src(src: &str) -> Interpreter {
        let program = parse_program(src.as_bytes()).expect("parse");
        let mut interp = Interpreter::new(vec![]);
        interp.run(&program).expect("run");
        interp
    }

    #[test]
    fn test_closure_capture() {
        let src = "func make_adder(n){func a(x){return x+n} return a} add5=make_adder(5)";
        let mut interp = run_src(src);
        let add5 = interp.scope.get("add5").unwrap();
        let Value::Func(f) = add5 else { panic!() };
        let result = interp.call_function(&f, Position::start(), vec![Value::Int(3)]).unwrap();
        assert!(matches!(result, Value::Int(8)));
    }

    #[test]
    fn test_for_loop_variable_leaks_last_value() {
        let interp = run_src("for x in [1,2,3] { }");
        assert!(matches!(interp.scope.get("x"), Some(Value::Int(3))));
    }

    #[test]
    fn test_and_or_short_circuit_with_side_effects() {
        let interp = run_src("calls = 0\nfunc bump() { calls = calls + 1 return true } false and bump()");
        assert!(matches!(interp.scope.get("calls"), Some(Value::Int(0))));
    }

    #[test]
    fn test_scope_isolation_after_call() {
        let interp = run_src("func f(x) { y = x + 1 return y } z = f(1)");
        assert!(interp.scope.get("y").is_none());
        assert!(matches!(interp.scope.get("z"), Some(Value::Int(2))));
    }

    #[test]
    fn test_negative_list_index_is_value_error() {
        let program = parse_program(b"lst = [1,2,3]\nlst[0 - 1]").unwrap();
        let mut interp = Interpreter::new(vec![]);
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err.kind(), "value");
    }

    #[test]
    fn test_top_level_return_is_runtime_error() {
        let program = parse_program(b"return 1").unwrap();
        let mut interp = Interpreter::new(vec![]);
        let err = interp.run(&program).unwrap_err();
        assert_eq!(format!("{err}"), "runtime error at 1:1: can't return at top level");
    }

    #[test]
    fn test_variadic_forwarding() {
        let interp = run_src("func sum(xs...) { total = 0 for x in xs { total = total + x } return total } result = sum(1, 2, 3)");
        assert!(matches!(interp.scope.get("result"), Some(Value::Int(6))));
    }

    #[test]
    fn test_bare_ellipsis_function_with_no_named_params_does_not_panic() {
        let interp = run_src("f = func(...) { return 1 } result = f() result2 = f(1, 2, 3)");
        assert!(matches!(interp.scope.get("result"), Some(Value::Int(1))));
        assert!(matches!(interp.scope.get("result2"), Some(Value::Int(1))));
    }

    #[test]
    fn test_string_iteration_yields_codepoints_not_bytes() {
        let interp = run_src(r#"out = [] for c in "aé中" { append(out, c) } n = len(out)"#);
        assert!(matches!(interp.scope.get("n"), Some(Value::Int(3))));
    }
}
