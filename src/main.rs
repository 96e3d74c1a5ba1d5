//! Minimal demo binary: shells the pipeline for manual inspection of a
//! single source file. Not a feature surface — no flag parsing, matching
//! the teacher's `main.rs` (a single positional path argument).
//!
//! `.bas` files run the BASIC front end (lex, parse, analyze) and print any
//! diagnostics. `.il` files round-trip through the textual codec (parse,
//! then print) so `diff <(cat in.il) <(ilbc in.il)` demonstrates the
//! parse/print inverse of spec.md §6.

use std::env;
use std::fs;
use std::process::ExitCode;

use ilbc::basic::lexer::Lexer;
use ilbc::basic::parser::parse_program;
use ilbc::basic::sem::analyzer::SemanticAnalyzer;
use ilbc::diag::DiagnosticEmitter;
use ilbc::il;
use ilbc::source::{FileId, SourceMap};

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: ilbc <file.bas|file.il>");
        return ExitCode::FAILURE;
    }

    let path = &args[1];
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("failed to read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    if path.ends_with(".il") {
        run_il(&text)
    } else {
        run_basic(path, &text)
    }
}

fn run_basic(path: &str, text: &str) -> ExitCode {
    let mut map = SourceMap::new();
    let file = map.add_file(path, text);

    let mut diags = DiagnosticEmitter::new();
    let tokens = Lexer::new(text, FileId(0)).scan(&mut diags);
    log::debug!("lexed {} tokens from {path}", tokens.len());

    let program = parse_program(tokens, &mut diags);
    log::debug!("parsed {} procedures, {} main statements", program.procs.len(), program.main.len());

    SemanticAnalyzer::new(&mut diags).analyze(&program);

    for diag in diags.diagnostics() {
        println!("{}", diag.render(&map));
    }

    if diags.is_clean() {
        println!("{path}: {} warning(s), 0 errors", diags.warning_count());
        ExitCode::SUCCESS
    } else {
        println!("{path}: {} error(s), {} warning(s)", diags.error_count(), diags.warning_count());
        ExitCode::FAILURE
    }
}

fn run_il(text: &str) -> ExitCode {
    match il::parse_module(text) {
        Ok(module) => {
            print!("{}", il::print_module(&module));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
