//! `wasm-bindgen` boundary exposing the host-facing surface (§6) to an
//! in-browser host — the editor/terminal/file-tree UI that is explicitly
//! out of scope for this crate (§1).
//!
//! `Event`/`Snapshot`/`RuntimeValue` cross the boundary as JSON
//! (`serde_json`), the same approach the pack's lexer-for-the-web examples
//! use to hand token/diagnostic payloads to JavaScript.
//!
//! A parsed program's AST borrows from an [`AstContext`] and an
//! [`Interner`] that must outlive it; a `wasm_bindgen` struct cannot carry
//! that borrow across the JS boundary in the usual way, so `WasmSession`
//! leaks both onto a `'static` lifetime once at construction. This mirrors
//! §5's cancellation policy ("the host cancels by dropping the handle; no
//! teardown protocol is needed") — a browser tab reclaims the whole linear
//! memory on reload, so nothing here is ever freed early.

use wasm_bindgen::prelude::*;

use crate::ast::AstContext;
use crate::ast::Program;
use crate::intern::Interner;
use crate::interpreter::{interpret, Event, Handle};
use crate::lexer::tokenize;
use crate::parser::parse;

#[wasm_bindgen]
pub struct WasmSession {
    handle: Handle<'static>,
    interner: &'static Interner,
}

#[wasm_bindgen]
impl WasmSession {
    /// Tokenizes and parses `source`, returning a fresh, ready session, or
    /// throws a JS exception carrying the lex/parse error message on
    /// failure (§6 "errors... carry a line number and a human-readable
    /// message").
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str) -> Result<WasmSession, JsValue> {
        let tokens: &'static [crate::token::Token] =
            Box::leak(tokenize(source).map_err(|e| JsValue::from_str(&format!("Line {}: {}", e.line, e.message)))?.into_boxed_slice());

        let ctx: &'static AstContext<'static> = Box::leak(Box::new(AstContext::new()));
        let mut interner_owned = Interner::new();
        let program: &'static Program<'static> =
            Box::leak(Box::new(parse(tokens, ctx, &mut interner_owned).map_err(|e| JsValue::from_str(&e.message))?));
        let interner: &'static Interner = Box::leak(Box::new(interner_owned));

        let handle = interpret(program, interner);
        Ok(WasmSession { handle, interner })
    }

    /// Advances execution and returns the next [`Event`] as a JSON string
    /// (§6 `Handle.advance`). `reply` is ignored unless the previous event
    /// was `Input`.
    pub fn advance(&mut self, reply: Option<String>) -> String {
        let event = self.handle.advance(reply.as_deref());
        serde_json::to_string(&event).unwrap_or_else(|_| r#"{"type":"Error","message":"System Error: failed to serialize event"}"#.to_string())
    }

    pub fn is_done(&self) -> bool {
        self.handle.is_done()
    }

    /// Resolves an interned name back to its source text, for a host that
    /// received a `Symbol` index inside an `Input` event's JSON.
    pub fn resolve_name(&self, symbol_index: u32) -> String {
        self.interner.resolve(crate::intern::Symbol::from_index(symbol_index)).to_string()
    }
}

/// Pure tokenizer entry point (§6 `tokenize`), returning a JSON array of
/// tokens or throwing the lex error message.
#[wasm_bindgen]
pub fn tokenize_json(source: &str) -> Result<String, JsValue> {
    let tokens = tokenize(source).map_err(|e| JsValue::from_str(&format!("Line {}: {}", e.line, e.message)))?;
    #[derive(serde::Serialize)]
    struct TokenView {
        kind: String,
        lexeme: String,
        line: u32,
    }
    let views: Vec<TokenView> =
        tokens.iter().map(|t| TokenView { kind: format!("{:?}", t.kind), lexeme: t.lexeme.clone(), line: t.line }).collect();
    serde_json::to_string(&views).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Checks whichever of `Event`'s snapshot a JS host already deserialized
/// from JSON is a terminal event, convenience mirroring `Event::is_terminal`
/// without a round trip back into Rust types.
#[wasm_bindgen]
pub fn event_is_terminal(event_json: &str) -> bool {
    event_json.contains("\"type\":\"Error\"") || event_json.contains("\"type\":\"Done\"")
}
