//! The `algolang` command-line driver.
//!
//! This is the reference host for §6's host-facing surface: it reads a
//! `.algo` source file, drives a [`Handle`] to completion, and serves
//! `Input` events from stdin. It owns no language semantics of its own —
//! everything here is driving the library, not extending it.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::ast::AstContext;
use crate::intern::Interner;
use crate::interpreter::{interpret, Event};
use crate::lexer::{tokenize, LexError};
use crate::parser::{parse, ParseError};
use crate::style::Style;

/// Bounds how many `advance` calls a driver makes before yielding control
/// back to its own event loop (§5 "the observed driver uses a budget of 500
/// steps"). This is host policy, not a core requirement — `run_source`
/// simply loops past it since the CLI has no UI thread to yield to, but the
/// constant is kept here as the canonical default for embedders that do.
pub const DEFAULT_STEP_BUDGET: u32 = 500;

#[derive(Parser)]
#[command(name = "algolang")]
#[command(about = "An in-browser execution engine for AlgoLang teaching pseudocode, run from a terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tokenize, parse, and run a `.algo` source file to completion.
    Run {
        /// Path to the AlgoLang source file.
        path: PathBuf,
        /// Echo every `Event` to stderr as it is produced.
        #[arg(long)]
        trace: bool,
    },
    /// Tokenize a source file and print its token stream (debugging aid).
    Tokens {
        path: PathBuf,
    },
}

pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { path, trace } => cmd_run(&path, trace),
        Commands::Tokens { path } => cmd_tokens(&path),
    }
}

/// Exposed beyond `run_cli` (rather than kept file-private) so the CLI's
/// own integration test can drive a scratch `.algo` file without spawning a
/// subprocess, in the teacher's direct-function-call test style.
pub fn cmd_run(path: &PathBuf, trace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;

    let tokens = match tokenize(&source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", report_lex_error(&e, &source));
            std::process::exit(1);
        }
    };

    let ctx = AstContext::new();
    let mut interner = Interner::new();
    let program = match parse(&tokens, &ctx, &mut interner) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", report_parse_error(&e, &source));
            std::process::exit(1);
        }
    };

    let mut handle = interpret(&program, &interner);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut reply: Option<String> = None;

    loop {
        let event = handle.advance(reply.as_deref());
        reply = None;
        if trace {
            eprintln!("{} {:?}", Style::cyan("trace:"), event);
        }
        match event {
            Event::Step { .. } => {}
            Event::Output { text } => println!("{}", text),
            Event::Input { name, expected_type } => {
                print!("{} ({:?})? ", interner.resolve(name), expected_type);
                io::stdout().flush()?;
                reply = lines.next().transpose()?;
            }
            Event::Error { message } => {
                eprintln!("{}: {}", Style::bold_red("Runtime Error"), message);
                std::process::exit(1);
            }
            Event::Done => break,
        }
    }
    Ok(())
}

pub fn cmd_tokens(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    match tokenize(&source) {
        Ok(tokens) => {
            for tok in &tokens {
                println!("{:>4}  {:<20}  {:?}", tok.line, tok.lexeme, tok.kind);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", report_lex_error(&e, &source));
            std::process::exit(1);
        }
    }
}

/// Quotes the offending source line alongside a colorized error, in the
/// teacher crate's `display_with_source` register — but keyed only by line
/// number, since the tokenizer/parser here carry line provenance rather than
/// byte spans (§3, §4.1, §4.2).
fn report_source_line(line: u32, source: &str, label: &str, message: &str) -> String {
    let content = source.lines().nth((line.saturating_sub(1)) as usize).unwrap_or("");
    format!(
        "{}: {}\n\n{} {} {}",
        Style::bold_red(label),
        message,
        Style::blue(&format!("{:>4}", line)),
        Style::blue("|"),
        content
    )
}

fn report_lex_error(e: &LexError, source: &str) -> String {
    report_source_line(e.line, source, "Lex Error", &e.message)
}

fn report_parse_error(e: &ParseError, source: &str) -> String {
    report_source_line(e.line, source, "Parse Error", &e.message)
}
