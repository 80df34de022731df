//! Host-interaction built-ins: `args`, `exit`, `print`, `read`.

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

/// `args()`: the program's extra CLI arguments, as strings.
fn args_builtin(interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(type_err(position, format!("args() requires 0 arg(s), got {}", args.len())));
    }
    Ok(Value::list(interp.program_args().iter().map(|s| Value::str(s.as_str())).collect()))
}

/// `exit(n?)`: unwinds evaluation via `EvalError::Exit`, default code `0`.
fn exit_builtin(_interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let code = match args {
        [] => 0,
        [Value::Int(n)] => *n as i32,
        [other] => return Err(type_err(position, format!("exit() requires int, got {}", other.type_name()))),
        _ => return Err(type_err(position, format!("exit() requires 0 or 1 arg(s), got {}", args.len()))),
    };
    Err(EvalError::Exit(code))
}

/// `print(vs...)`: writes `str(v)` for each value, space-separated, with a trailing newline.
fn print_builtin(interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    let rendered: Vec<String> = args.iter().map(Value::display_str).collect();
    interp
        .write_stdout_line(&rendered.join(" "))
        .map_err(|e| EvalError::runtime(position, format!("print(): {e}")))?;
    Ok(Value::Nil)
}

/// `read(path?)`: reads a file's contents, or all of host stdin when no path is given.
fn read_builtin(interp: &mut Interpreter, position: Position, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [] => {
            let contents = interp
                .read_stdin()
                .map_err(|e| EvalError::runtime(position, format!("read(): {e}")))?;
            Ok(Value::Str(contents))
        }
        [Value::Str(path)] => {
            let contents = std::fs::read_to_string(path.as_ref())
                .map_err(|e| EvalError::runtime(position, format!("read({path:?}): {e}")))?;
            Ok(Value::str(contents))
        }
        [other] => Err(type_err(position, format!("read() requires str, got {}", other.type_name()))),
        _ => Err(type_err(position, format!("read() requires 0 or 1 arg(s), got {}", args.len()))),
    }
}

pub fn register(env: &Rc<Environment>) {
    def(env, "args", args_builtin);
    def(env, "exit", exit_builtin);
    def(env, "print", print_builtin);
    def(env, "read", read_builtin);
}
