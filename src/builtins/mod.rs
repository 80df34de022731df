//! Built-in functions exposed in the global scope.
//!
//! Organized into three categories mirroring the contracts in the
//! evaluator's built-in table:
//!
//! - **[sequence]**: `append`, `find`, `join`, `len`, `range`, `slice`, `sort`, `split`
//! - **[strings]**: `char`, `int`, `lower`, `rune`, `str`, `type`, `upper`
//! - **[io]**: `args`, `exit`, `print`, `read`

pub mod io;
pub mod sequence;
pub mod strings;

use crate::env::Environment;
use crate::value::{BuiltinFn, Function, Value};
use std::rc::Rc;

fn def(env: &Rc<Environment>, name: &'static str, func: BuiltinFn) {
    env.assign(name.to_string(), Value::Func(Function::Builtin { name, func }));
}

pub fn register_all(env: &Rc<Environment>) {
    sequence::register(env);
    strings::register(env);
    io::register(env);
}
