//! `algolang` — a resumable tokenizer, parser, and interpreter for the
//! AlgoLang teaching pseudocode.
//!
//! The crate is the language pipeline described by the host-facing surface
//! in §6: `tokenize`, `parse`, `interpret`, and `Handle::advance`. It never
//! prints, never touches the filesystem, and owns no UI — those are left to
//! the `cli` binary (a terminal host driver) and, behind the `wasm` feature,
//! a `wasm-bindgen` boundary for an in-browser host. Both are thin; all
//! language semantics live here and are exercised directly by this crate's
//! tests.
//!
//! ```
//! use algolang::{interpret, lexer::tokenize, parser::parse, ast::AstContext, intern::Interner};
//! use algolang::interpreter::Event;
//!
//! let source = "Algorithm H\nBegin Write(\"Hello, World!\") End";
//! let tokens = tokenize(source).expect("lex");
//! let ctx = AstContext::new();
//! let mut interner = Interner::new();
//! let program = parse(&tokens, &ctx, &mut interner).expect("parse");
//! let mut handle = interpret(&program, &interner);
//!
//! loop {
//!     match handle.advance(None) {
//!         Event::Output { text } => println!("{}", text),
//!         Event::Done => break,
//!         Event::Error { message } => { eprintln!("{}", message); break; }
//!         _ => {}
//!     }
//! }
//! ```

pub mod arena;
pub mod ast;
pub mod intern;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod style;

#[cfg(feature = "wasm")]
pub mod wasm_bridge;

pub use interpreter::{interpret, Handle};
pub use lexer::{tokenize, LexError};
pub use parser::{parse, ParseError};
