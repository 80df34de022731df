//! Container built-ins: `append`, `find`, `join`, `len`, `range`, `slice`, `sort`, `split`.
//!
//! All raise `TypeError` on wrong arity or argument kind; none raise on
//! merely surprising (but well-typed) input.

use super::def;
use crate::env::Environment;
use crate::error::EvalError;
use crate::interp::Interpreter;
use crate::position::Position;
use crate::value::{Function, Value};
use std::rc::Rc;

fn type_err(position: Position, message: impl Into<String>) -> EvalError {
    EvalError::type_error(position, message.into())
}

/// `append(lst, vs...)`: mutates `lst` in place, returns `nil`.
fn append(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(type_err(position, "append() requires at least 1 arg(s), got 0"));
    };
    let Value::List(items) = first else {
        return Err(type_err(position, format!("append() requires list, got {}", first.type_name())));
    };
    items.borrow_mut().extend(rest.iter().cloned());
    Ok(Value::Nil)
}

/// `find(hay, needle)`: substring/element index, or `-1` when absent.
fn find(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [hay, needle] = args else {
        return Err(type_err(position, format!("find() requires 2 arg(s), got {}", args.len())));
    };
    match hay {
        Value::Str(s) => {
            let Value::Str(needle) = needle else {
                return Err(type_err(position, "find() on a str requires a str needle"));
            };
            match s.find(needle.as_ref()) {
                Some(i) => Ok(Value::Int(i as i64)),
                None => Ok(Value::Int(-1)),
            }
        }
        Value::List(items) => {
            let idx = items.borrow().iter().position(|e| e.deep_eq(needle));
            Ok(Value::Int(idx.map(|i| i as i64).unwrap_or(-1)))
        }
        other => Err(type_err(position, format!("find() requires str or list, got {}", other.type_name()))),
    }
}

/// `join(lst, sep)`: concatenates a list of strings with a separator.
fn join(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [lst, sep] = args else {
        return Err(type_err(position, format!("join() requires 2 arg(s), got {}", args.len())));
    };
    let Value::List(items) = lst else {
        return Err(type_err(position, format!("join() requires list, got {}", lst.type_name())));
    };
    let Value::Str(sep) = sep else {
        return Err(type_err(position, format!("join() requires str separator, got {}", sep.type_name())));
    };
    let mut parts = Vec::with_capacity(items.borrow().len());
    for item in items.borrow().iter() {
        match item {
            Value::Str(s) => parts.push(s.to_string()),
            other => return Err(type_err(position, format!("join() requires all elements to be str, got {}", other.type_name()))),
        }
    }
    Ok(Value::str(parts.join(&sep.to_string())))
}

/// `len(x)`: byte length of a str, element count of a list, pair count of a map.
fn len(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [x] = args else {
        return Err(type_err(position, format!("len() requires 1 arg(s), got {}", args.len())));
    };
    let n = match x {
        Value::Str(s) => s.len(),
        Value::List(items) => items.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        other => return Err(type_err(position, format!("len() requires str, list, or map, got {}", other.type_name()))),
    };
    Ok(Value::Int(n as i64))
}

/// `range(n)`: `[0, 1, ..., n-1]`. Negative `n` is a `ValueError`.
fn range(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [n] = args else {
        return Err(type_err(position, format!("range() requires 1 arg(s), got {}", args.len())));
    };
    let Value::Int(n) = n else {
        return Err(type_err(position, format!("range() requires int, got {}", n.type_name())));
    };
    if *n < 0 {
        return Err(EvalError::value(position, "range() argument must not be negative"));
    }
    Ok(Value::list((0..*n).map(Value::Int).collect()))
}

/// `slice(x, a, b)`: `0 <= a <= b <= len(x)`; list results are fresh copies.
fn slice(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [x, a, b] = args else {
        return Err(type_err(position, format!("slice() requires 3 arg(s), got {}", args.len())));
    };
    let (Value::Int(a), Value::Int(b)) = (a, b) else {
        return Err(type_err(position, "slice() bounds must be int"));
    };
    match x {
        Value::Str(s) => {
            let bytes = s.as_bytes();
            let (a, b) = check_bounds(*a, *b, bytes.len(), position)?;
            let slice = std::str::from_utf8(&bytes[a..b])
                .map_err(|_| EvalError::value(position, "slice() bounds split a multi-byte character"))?;
            Ok(Value::str(slice.to_string()))
        }
        Value::List(items) => {
            let items = items.borrow();
            let (a, b) = check_bounds(*a, *b, items.len(), position)?;
            Ok(Value::list(items[a..b].to_vec()))
        }
        other => Err(type_err(position, format!("slice() requires str or list, got {}", other.type_name()))),
    }
}

fn check_bounds(a: i64, b: i64, len: usize, position: Position) -> Result<(usize, usize), EvalError> {
    if a < 0 || b < a || b as usize > len {
        return Err(EvalError::value(position, format!("slice bounds [{a}:{b}] out of range for length {len}")));
    }
    Ok((a as usize, b as usize))
}

/// `sort(lst, key?)`: stable in-place sort, optionally by `key(elt)`.
fn sort(interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() || args.len() > 2 {
        return Err(type_err(position, format!("sort() requires 1 or 2 arg(s), got {}", args.len())));
    }
    let Value::List(items) = &args[0] else {
        return Err(type_err(position, format!("sort() requires list, got {}", args[0].type_name())));
    };

    if let Some(key_val) = args.get(1) {
        let Value::Func(key_func) = key_val else {
            return Err(type_err(position, "sort() key must be a func"));
        };
        let elements = items.borrow().clone();
        let mut decorated = Vec::with_capacity(elements.len());
        for elt in elements {
            let key = interp.call_function(key_func, position, vec![elt.clone()])?;
            decorated.push((key, elt));
        }
        sort_stable_by_value(&mut decorated, position)?;
        *items.borrow_mut() = decorated.into_iter().map(|(_, elt)| elt).collect();
    } else {
        let mut elements = items.borrow().clone();
        let mut err = None;
        elements.sort_by(|a, b| match a.partial_cmp_value(b) {
            Some(ord) => ord,
            None => {
                if err.is_none() {
                    err = Some(type_error_for_sort(a, b, position));
                }
                std::cmp::Ordering::Equal
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
        *items.borrow_mut() = elements;
    }
    Ok(Value::Nil)
}

fn sort_stable_by_value(decorated: &mut [(Value, Value)], position: Position) -> Result<(), EvalError> {
    let mut err = None;
    decorated.sort_by(|(ka, _), (kb, _)| match ka.partial_cmp_value(kb) {
        Some(ord) => ord,
        None => {
            if err.is_none() {
                err = Some(type_error_for_sort(ka, kb, position));
            }
            std::cmp::Ordering::Equal
        }
    });
    match err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn type_error_for_sort(a: &Value, b: &Value, position: Position) -> EvalError {
    type_err(position, format!("cannot compare {} and {}", a.type_name(), b.type_name()))
}

/// `split(s, sep?)`: whitespace-run split when `sep` is absent/`nil`,
/// exact-separator split otherwise.
fn split(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() || args.len() > 2 {
        return Err(type_err(position, format!("split() requires 1 or 2 arg(s), got {}", args.len())));
    }
    let Value::Str(s) = &args[0] else {
        return Err(type_err(position, format!("split() requires str, got {}", args[0].type_name())));
    };
    let sep = args.get(1);
    match sep {
        None | Some(Value::Nil) => {
            let parts: Vec<Value> = s.split_whitespace().map(Value::str).collect();
            Ok(Value::list(parts))
        }
        Some(Value::Str(sep)) => {
            if sep.is_empty() {
                return Err(EvalError::value(position, "split() separator must not be empty"));
            }
            let parts: Vec<Value> = s.split(sep.as_ref()).map(Value::str).collect();
            Ok(Value::list(parts))
        }
        Some(other) => Err(type_err(position, format!("split() separator must be str, got {}", other.type_name()))),
    }
}

pub fn register(env: &Rc<Environment>) {
    def(env, "append", append);
    def(env, "find", find);
    def(env, "join", join);
    def(env, "len", len);
    def(env, "range", range);
    def(env, "slice", slice);
    def(env, "sort", sort);
    def(env, "split", split);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let env = Environment::new();
        register(&env);
        let mut interp = Interpreter::new(vec![]);
        let Some(Value::Func(f)) = env.get(name) else { panic!("not registered") };
        interp.call_function(&f, Position::start(), args)
    }

    #[test]
    fn test_range_zero() {
        assert!(matches!(call("range", vec![Value::Int(0)]).unwrap(), Value::List(l) if l.borrow().is_empty()));
    }

    #[test]
    fn test_range_negative_is_value_error() {
        let err = call("range", vec![Value::Int(-1)]).unwrap_err();
        assert_eq!(err.kind(), "value");
    }

    #[test]
    fn test_slice_empty_bounds() {
        let v = call("slice", vec![Value::str("abc"), Value::Int(0), Value::Int(0)]).unwrap();
        assert!(matches!(v, Value::Str(s) if s.as_ref() == ""));
    }

    #[test]
    fn test_find_missing_returns_minus_one() {
        let v = call("find", vec![Value::str("abc"), Value::str("z")]).unwrap();
        assert!(matches!(v, Value::Int(-1)));
    }

    #[test]
    fn test_sort_stable_without_key() {
        let lst = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        call("sort", vec![lst.clone()]).unwrap();
        let Value::List(items) = lst else { panic!() };
        let nums: Vec<i64> = items.borrow().iter().map(|v| match v { Value::Int(n) => *n, _ => unreachable!() }).collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn test_split_on_whitespace_skips_empties() {
        let v = call("split", vec![Value::str("  a  b ")]).unwrap();
        let Value::List(items) = v else { panic!() };
        assert_eq!(items.borrow().len(), 2);
    }

    #[test]
    fn test_split_empty_separator_rejected() {
        let err = call("split", vec![Value::str("abc"), Value::str("")]).unwrap_err();
        assert_eq!(err.kind(), "value");
    }
}
