// ABOUTME: End-to-end tests running whole littlelang programs through the library

use littlelang::interp::Interpreter;
use littlelang::parser::parse_program;
use littlelang::value::Value;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// A `Write` sink backed by a shared buffer, so a test can inspect captured
/// `print` output after the interpreter that wrote to it is done running.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn run_captured(src: &str) -> (Interpreter, String) {
    run_captured_with_args(src, vec![])
}

fn run_captured_with_args(src: &str, program_args: Vec<String>) -> (Interpreter, String) {
    let program = parse_program(src.as_bytes()).expect("parse");
    let out = SharedBuf::default();
    let mut interp = Interpreter::with_io(program_args, Box::new(std::io::empty()), Box::new(out.clone()));
    interp.run(&program).expect("run");
    (interp, out.text())
}

#[test]
fn closure_capture() {
    let (_, out) = run_captured(
        "func make_adder(n){func a(x){return x+n} return a} add5=make_adder(5) print(add5(3))",
    );
    assert_eq!(out, "8\n");
}

#[test]
fn pseudo_method_dispatch() {
    let src = r#"
        func make_person(name, age) {
            self = {}
            self["name"] = name
            self["age"] = age
            self["greet"] = func(s) { return s.name + ", aged " + str(s.age) }
            return self
        }
        bob = make_person("Bob", 42)
        print(bob.greet(bob))
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "Bob, aged 42\n");
}

#[test]
fn variadic_forwarding() {
    let src = "func add(ns...){s=0 for n in ns {s=s+n} return s} print(add(range(10)...))";
    let (_, out) = run_captured(src);
    assert_eq!(out, "45\n");
}

#[test]
fn short_circuit_semantics() {
    // The right side of `and` IS evaluated because the left conjunct is true.
    let src = r#"print(print("a")==nil and print("b")!=nil)"#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "a\nb\nfalse\n");
}

#[test]
fn map_ordering_in_display() {
    let (_, out) = run_captured(r#"print({"b":1,"a":2})"#);
    assert_eq!(out, "{\"a\": 2, \"b\": 1}\n");
}

#[test]
fn error_position_on_negative_subscript() {
    let program = parse_program(b"lst=[1,2,3]\nlst[-1]").unwrap();
    let mut interp = Interpreter::new(vec![]);
    let err = interp.run(&program).unwrap_err();
    assert_eq!(format!("{err}"), "value error at 2:4: subscript -1 out of range");
}

#[test]
fn for_loop_variable_leaks_last_value() {
    let src = "for x in [1,2,3] { }\nprint(x)";
    let (_, out) = run_captured(src);
    assert_eq!(out, "3\n");
}

#[test]
fn alias_semantics_for_lists_not_primitives() {
    let src = r#"
        x = [1]
        y = x
        append(x, 2)
        print(len(y))
        a = 1
        b = a
        a = 2
        print(b)
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "2\n1\n");
}

#[test]
fn stable_sort_preserves_relative_order_of_equal_keys() {
    let src = r#"
        pairs = [{"k": 1, "v": "a"}, {"k": 0, "v": "b"}, {"k": 1, "v": "c"}]
        sort(pairs, func(p) { return p.k })
        for p in pairs { print(p.v) }
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "b\na\nc\n");
}

#[test]
fn slice_boundary_empty_results() {
    let src = r#"
        s = "hello"
        print(slice(s, 0, 0))
        print(slice(s, len(s), len(s)))
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "\n\n");
}

#[test]
fn range_boundaries() {
    let (_, out) = run_captured("print(range(0))");
    assert_eq!(out, "[]\n");

    let program = parse_program(b"range(-1)").unwrap();
    let mut interp = Interpreter::new(vec![]);
    let err = interp.run(&program).unwrap_err();
    assert_eq!(err.kind(), "value");
}

#[test]
fn rune_boundaries() {
    let program = parse_program(br#"rune("")"#).unwrap();
    let mut interp = Interpreter::new(vec![]);
    assert_eq!(interp.run(&program).unwrap_err().kind(), "value");

    let program = parse_program(br#"rune("ab")"#).unwrap();
    let mut interp = Interpreter::new(vec![]);
    assert_eq!(interp.run(&program).unwrap_err().kind(), "value");
}

#[test]
fn int_parsing_boundaries() {
    let src = r#"
        print(int(""))
        print(int("-3"))
        print(int("3x"))
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "nil\n-3\nnil\n");
}

#[test]
fn empty_string_in_containment() {
    let src = r#"
        print("" in "foo")
        print("" in "")
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "true\ntrue\n");
}

#[test]
fn empty_map_vs_empty_block_distinguished_by_context() {
    let src = r#"
        m = {}
        print(type(m))
        if true {}
        print("ok")
    "#;
    let (_, out) = run_captured(src);
    assert_eq!(out, "map\nok\n");
}

#[test]
fn scope_isolation_after_function_call() {
    let src = r#"
        func f(x) { y = x + 1 return y }
        z = f(1)
        print(z)
    "#;
    let (mut interp, out) = run_captured(src);
    assert_eq!(out, "2\n");
    // `y` never leaked into the caller's top scope.
    let program = parse_program(b"y").unwrap();
    assert!(interp.run(&program).is_err());
}

#[test]
fn args_builtin_reflects_program_arguments() {
    let src = "print(args())";
    let (_, out) = run_captured_with_args(src, vec!["one".to_string(), "two".to_string()]);
    assert_eq!(out, "[\"one\", \"two\"]\n");
}

#[test]
fn read_builtin_consumes_injected_stdin() {
    let program = parse_program(b"x = read() print(x)").unwrap();
    let out = SharedBuf::default();
    let mut interp = Interpreter::with_io(vec![], Box::new("hello there".as_bytes()), Box::new(out.clone()));
    interp.run(&program).unwrap();
    assert_eq!(out.text(), "hello there\n");
}

#[test]
fn exit_builtin_unwinds_with_code() {
    let program = parse_program(b"print(1) exit(7) print(2)").unwrap();
    let out = SharedBuf::default();
    let mut interp = Interpreter::with_io(vec![], Box::new(std::io::empty()), Box::new(out.clone()));
    let err = interp.run(&program).unwrap_err();
    assert!(matches!(err, littlelang::error::EvalError::Exit(7)));
    assert_eq!(out.text(), "1\n");
}

#[test]
fn deep_equality_on_primitives_matches_str_comparison() {
    let values = [
        (Value::Nil, Value::Nil, true),
        (Value::Int(1), Value::Bool(true), false),
        (Value::Int(3), Value::Int(3), true),
    ];
    for (a, b, expect_eq) in values {
        assert_eq!(a.deep_eq(&b), expect_eq);
    }
}

#[test]
fn tokenizer_illegal_becomes_parse_error() {
    let err = parse_program(b"x = 1 ! 2").unwrap_err();
    assert!(err.message.contains("expected != instead of ! 2") || err.message.contains("expected != instead of !"));
}
