mod ast;
mod builtins;
mod env;
mod error;
mod interp;
mod lexer;
mod parser;
mod position;
mod token;
mod value;

use clap::Parser;
use error::{EvalError, ParseError};
use interp::Interpreter;
use position::Position;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

/// A tree-walk interpreter for littlelang scripts.
#[derive(Parser, Debug)]
#[command(name = "littlelang")]
#[command(version)]
#[command(about = "Runs a littlelang source file")]
struct CliArgs {
    /// Print elapsed time and op/call counters after a successful run
    #[arg(long = "stats")]
    stats: bool,

    /// Source file to execute
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Extra arguments made available to the program via args()
    #[arg(value_name = "ARG", allow_hyphen_values = true, trailing_var_arg = true)]
    program_args: Vec<String>,
}

/// littlelang's flags are conventionally single-dash (`-stats`); rewrite it
/// to the double-dash form clap's derive API expects before parsing. Per
/// the CLI grammar `-stats` can only appear once, immediately after the
/// program name and before the source path, so only that leading position
/// is rewritten — a later program argument that happens to read `-stats`
/// (passed through to `args()`) is left untouched.
fn normalize_argv(argv: impl Iterator<Item = String>) -> Vec<String> {
    let mut argv: Vec<String> = argv.collect();
    if let Some(first) = argv.get(1) {
        if first == "-stats" {
            argv[1] = "--stats".to_string();
        }
    }
    argv
}

fn main() -> ExitCode {
    let args = CliArgs::parse_from(normalize_argv(std::env::args()));

    let source = match std::fs::read(&args.source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("can't read {}: {e}", args.source.display());
            return ExitCode::from(1);
        }
    };

    let start = Instant::now();

    let program = match parser::parse_program(&source) {
        Ok(program) => program,
        Err(e) => {
            print_parse_diagnostic(&source, &e);
            return ExitCode::from(1);
        }
    };

    let mut interp = Interpreter::new(args.program_args);
    match interp.run(&program) {
        Ok(()) => {
            if args.stats {
                print_stats(&interp, start);
            }
            ExitCode::SUCCESS
        }
        Err(EvalError::Exit(code)) => ExitCode::from(code as u8),
        Err(e) => {
            print_eval_diagnostic(&source, &e);
            ExitCode::from(1)
        }
    }
}

fn print_stats(interp: &Interpreter, start: Instant) {
    let elapsed = start.elapsed();
    let stats = interp.stats;
    eprintln!(
        "elapsed: {:.3?}, ops: {}, builtin calls: {}, user calls: {}",
        elapsed, stats.ops, stats.builtin_calls, stats.user_calls
    );
}

fn print_parse_diagnostic(source: &[u8], err: &ParseError) {
    print_diagnostic(source, err.position, "parse", &err.message);
}

fn print_eval_diagnostic(source: &[u8], err: &EvalError) {
    let position = err.position().unwrap_or_default();
    print_diagnostic(source, position, err.kind(), err.message());
}

/// Prints `<kind> error at <line>:<col>: <message>`, with the offending
/// source line and a caret above it, bracketed by a dash rule the width of
/// the diagnostic line. Tabs in the source line render as four spaces,
/// with the caret column shifted to match.
fn print_diagnostic(source: &[u8], position: Position, kind: &str, message: &str) {
    let diagnostic = format!("{kind} error at {position}: {message}");
    let rule = "-".repeat(diagnostic.len());

    let text = String::from_utf8_lossy(source);
    let line_text = text.lines().nth((position.line.saturating_sub(1)) as usize).unwrap_or("");
    let display_line = line_text.replace('\t', "    ");

    let mut caret_column = 0usize;
    for (i, c) in line_text.chars().enumerate() {
        if i + 1 >= position.column as usize {
            break;
        }
        caret_column += if c == '\t' { 4 } else { 1 };
    }

    eprintln!("{rule}");
    eprintln!("{display_line}");
    eprintln!("{}^", " ".repeat(caret_column));
    eprintln!("{diagnostic}");
    eprintln!("{rule}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_argv_rewrites_single_dash_stats() {
        let argv = normalize_argv(vec!["prog".to_string(), "-stats".to_string(), "a.ll".to_string()].into_iter());
        assert_eq!(argv, vec!["prog", "--stats", "a.ll"]);
    }

    #[test]
    fn test_normalize_argv_leaves_other_args_alone() {
        let argv = normalize_argv(vec!["prog".to_string(), "a.ll".to_string(), "-x".to_string()].into_iter());
        assert_eq!(argv, vec!["prog", "a.ll", "-x"]);
    }

    #[test]
    fn test_normalize_argv_leaves_trailing_stats_lookalike_program_arg_alone() {
        let argv = normalize_argv(
            vec!["prog".to_string(), "a.ll".to_string(), "-stats".to_string()].into_iter(),
        );
        assert_eq!(argv, vec!["prog", "a.ll", "-stats"]);
    }
}
