// ABOUTME: The dynamic value model: Nil/Bool/Int/Str by value, List/Map/Func by reference

use crate::ast::Block;
use crate::env::Environment;
use crate::error::EvalError;
use crate::position::Position;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A host-implemented built-in. Takes the interpreter (for stats, stdin,
/// args, and recursive calls like `sort`'s `key` callback), the call-site
/// position, and the already-evaluated arguments.
pub type BuiltinFn = fn(&mut crate::interp::Interpreter, Position, &[Value]) -> Result<Value, EvalError>;

#[derive(Clone)]
pub enum Function {
    User(Rc<UserFunction>),
    Builtin { name: &'static str, func: BuiltinFn },
}

pub struct UserFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub ellipsis: bool,
    pub body: Block,
    pub closure: Rc<Environment>,
}

impl Function {
    pub fn name(&self) -> Option<&str> {
        match self {
            Function::User(f) => f.name.as_deref(),
            Function::Builtin { name, .. } => Some(name),
        }
    }

    /// Function equality is object identity, never structural.
    pub fn identity_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::User(a), Function::User(b)) => Rc::ptr_eq(a, b),
            (Function::Builtin { func: a, .. }, Function::Builtin { func: b, .. }) => {
                std::ptr::eq(*a as *const (), *b as *const ())
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::User(u) => write!(f, "UserFunction({:?})", u.name),
            Function::Builtin { name, .. } => write!(f, "Builtin({name})"),
        }
    }
}

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<BTreeMap<String, Value>>>;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    List(ListRef),
    Map(MapRef),
    Func(Function),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(items: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) => "func",
        }
    }

    pub fn truthy_bool(&self, position: Position, context: &str) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EvalError::type_error(
                position,
                format!("{context} must be bool, got {}", other.type_name()),
            )),
        }
    }

    /// Deep structural equality; distinct kinds never compare equal.
    /// Function equality is identity, per `Function::identity_eq`.
    pub fn deep_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|bv| v.deep_eq(bv)))
            }
            (Value::Func(a), Value::Func(b)) => a.identity_eq(b),
            _ => false,
        }
    }

    /// Total order within a kind; `None` for cross-kind or unorderable kinds.
    pub fn partial_cmp_value(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Value::List(a), Value::List(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.partial_cmp_value(y) {
                        Some(std::cmp::Ordering::Equal) => continue,
                        other => return other,
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// `str(v)` rendering, unquoted for the string itself.
    pub fn display_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => format!("{other}"),
        }
    }
}

/// Escapes `"`, `\`, and the C-style control escapes; non-ASCII bytes are
/// emitted as `\xHH` so the result round-trips through a byte-for-byte parse.
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match v {
                        Value::Str(s) => write!(f, "{}", quote_str(s))?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Map(items) => {
                write!(f, "{{")?;
                for (i, (k, v)) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match v {
                        Value::Str(s) => write!(f, "{}: {}", quote_str(k), quote_str(s))?,
                        other => write!(f, "{}: {other}", quote_str(k))?,
                    }
                }
                write!(f, "}}")
            }
            Value::Func(func) => match func {
                Function::Builtin { name, .. } => write!(f, "<builtin {name}>"),
                Function::User(u) => match &u.name {
                    Some(name) => write!(f, "<func {name}>"),
                    None => write!(f, "<func>"),
                },
            },
        }
    }
}
