//! Recursive-descent parser over the token stream (§4.2).
//!
//! One `Parser` per call to [`parse`]; it borrows the `AstContext` it
//! allocates into and the `Interner` it resolves/interns identifiers with.
//! Non-recovering: the first error terminates parsing (§4.2, §7).

use crate::ast::{
    stmt::{IoDirection, Target},
    AstContext, BaseType, BinOpKind, Expr, FunctionDecl, Literal, Param, Program, ProcedureDecl,
    Stmt, UnOpKind, VarDecl,
};
use serde::Serialize;

use crate::intern::{Interner, Symbol};
use crate::token::{Keyword, Punct, Token, TokenKind, TypeKeyword, WordOp};

/// §5: `Serialize` so a non-Rust host can receive a parse failure as JSON
/// across the `wasm` boundary without bespoke glue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub struct Parser<'a, 'i> {
    tokens: &'a [Token],
    pos: usize,
    ctx: &'a AstContext<'a>,
    interner: &'i mut Interner,
}

impl<'a, 'i> Parser<'a, 'i> {
    pub fn new(tokens: &'a [Token], ctx: &'a AstContext<'a>, interner: &'i mut Interner) -> Self {
        Parser { tokens, pos: 0, ctx, interner }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_line(&self) -> u32 {
        self.peek().line
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(&self.peek().kind, TokenKind::Punct(pp) if *pp == p)
    }

    fn check_word_op(&self, op: WordOp) -> bool {
        matches!(&self.peek().kind, TokenKind::WordOp(o) if *o == op)
    }

    fn err(&self, expectation: &str) -> ParseError {
        ParseError { message: format!("Line {}: {}", self.peek_line(), expectation), line: self.peek_line() }
    }

    fn expect_kw(&mut self, kw: Keyword, what: &str) -> Result<u32, ParseError> {
        if self.check_kw(kw) {
            let line = self.peek_line();
            self.advance();
            Ok(line)
        } else {
            Err(self.err(what))
        }
    }

    fn expect_punct(&mut self, p: Punct, what: &str) -> Result<u32, ParseError> {
        if self.check_punct(p) {
            let line = self.peek_line();
            self.advance();
            Ok(line)
        } else {
            Err(self.err(what))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<(Symbol, u32), ParseError> {
        if matches!(self.peek().kind, TokenKind::Identifier) {
            let tok = self.advance().clone();
            Ok((self.interner.intern(&tok.lexeme), tok.line))
        } else {
            Err(self.err(what))
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<(f64, u32), ParseError> {
        if let TokenKind::Number(n) = self.peek().kind {
            let line = self.peek_line();
            self.advance();
            Ok((n, line))
        } else {
            Err(self.err(what))
        }
    }

    fn expect_base_type(&mut self) -> Result<BaseType, ParseError> {
        if let TokenKind::Type(ty) = self.peek().kind {
            self.advance();
            Ok(match ty {
                TypeKeyword::Integer => BaseType::Integer,
                TypeKeyword::Real => BaseType::Real,
                TypeKeyword::Boolean => BaseType::Boolean,
                TypeKeyword::String => BaseType::String,
                TypeKeyword::Char => BaseType::Char,
            })
        } else {
            Err(self.err("expected a type name"))
        }
    }

    // program = "Algorithm" ident [ "Var" varDecls ] { funcDecl | procDecl }
    //           "Begin" block "End"
    pub fn parse_program(&mut self) -> Result<Program<'a>, ParseError> {
        let line = self.expect_kw(Keyword::Algorithm, "expected 'Algorithm'")?;
        let (name, _) = self.expect_identifier("expected a program name")?;

        let mut globals = Vec::new();
        if self.check_kw(Keyword::Var) {
            self.advance();
            globals = self.parse_var_decls()?;
        }

        let mut functions = Vec::new();
        let mut procedures = Vec::new();
        loop {
            if self.check_kw(Keyword::Function) {
                functions.push(self.parse_function_decl()?);
            } else if self.check_kw(Keyword::Procedure) {
                procedures.push(self.parse_procedure_decl()?);
            } else {
                break;
            }
        }

        self.expect_kw(Keyword::Begin, "expected 'Begin'")?;
        let body = self.parse_block(&[Keyword::End])?;
        self.expect_kw(Keyword::End, "expected 'End'")?;

        Ok(Program { name, globals, functions, procedures, body, line })
    }

    /// varDecls = { nameList ":" [ "array" dimList "of" ] baseType }
    ///
    /// `array`/`of` are not part of the published keyword table (§4.1); they
    /// are matched as plain identifiers whose lowercase form is the literal
    /// word, keeping the dimension-bearing declaration form without growing
    /// the keyword enumeration.
    fn parse_var_decls(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        let mut decls = Vec::new();
        loop {
            if !matches!(self.peek().kind, TokenKind::Identifier) {
                break;
            }
            let line = self.peek_line();
            let mut names = Vec::new();
            let (first, _) = self.expect_identifier("expected a variable name")?;
            names.push(first);
            while self.check_punct(Punct::Comma) {
                self.advance();
                let (n, _) = self.expect_identifier("expected a variable name")?;
                names.push(n);
            }
            self.expect_punct(Punct::Colon, "expected ':' after variable name list")?;

            let mut dims = Vec::new();
            if self.is_word("array") {
                self.advance();
                loop {
                    self.expect_punct(Punct::LBracket, "expected '[' in array dimension")?;
                    let (n, _) = self.expect_number("expected an array dimension")?;
                    self.expect_punct(Punct::RBracket, "expected ']' in array dimension")?;
                    dims.push(n as usize);
                    if !self.check_punct(Punct::LBracket) {
                        break;
                    }
                }
                if !self.is_word("of") {
                    return Err(self.err("expected 'of' after array dimensions"));
                }
                self.advance();
            }
            let base_type = self.expect_base_type()?;
            decls.push(VarDecl { names, base_type, dims, line });

            if self.check_kw(Keyword::Function) || self.check_kw(Keyword::Procedure) || self.check_kw(Keyword::Begin) {
                break;
            }
        }
        Ok(decls)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier if self.peek().lexeme.eq_ignore_ascii_case(word))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        self.expect_punct(Punct::LParen, "expected '('")?;
        if !self.check_punct(Punct::RParen) {
            loop {
                let (name, _) = self.expect_identifier("expected a parameter name")?;
                self.expect_punct(Punct::Colon, "expected ':' after parameter name")?;
                let base_type = self.expect_base_type()?;
                params.push(Param { name, base_type });
                if self.check_punct(Punct::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, "expected ')'")?;
        Ok(params)
    }

    fn parse_function_decl(&mut self) -> Result<FunctionDecl<'a>, ParseError> {
        let line = self.expect_kw(Keyword::Function, "expected 'Function'")?;
        let (name, _) = self.expect_identifier("expected a function name")?;
        let params = self.parse_params()?;
        self.expect_punct(Punct::Colon, "expected ':' before return type")?;
        let return_type = self.expect_base_type()?;

        let mut locals = Vec::new();
        if self.check_kw(Keyword::Var) {
            self.advance();
            locals = self.parse_var_decls()?;
        }
        self.expect_kw(Keyword::Begin, "expected 'Begin'")?;
        let body = self.parse_block(&[Keyword::EndFunction])?;
        self.expect_kw(Keyword::EndFunction, "expected 'EndFunction'")?;

        Ok(FunctionDecl { name, params, return_type, locals, body, line })
    }

    fn parse_procedure_decl(&mut self) -> Result<ProcedureDecl<'a>, ParseError> {
        let line = self.expect_kw(Keyword::Procedure, "expected 'Procedure'")?;
        let (name, _) = self.expect_identifier("expected a procedure name")?;
        let params = self.parse_params()?;

        let mut locals = Vec::new();
        if self.check_kw(Keyword::Var) {
            self.advance();
            locals = self.parse_var_decls()?;
        }
        self.expect_kw(Keyword::Begin, "expected 'Begin'")?;
        let body = self.parse_block(&[Keyword::EndProcedure])?;
        self.expect_kw(Keyword::EndProcedure, "expected 'EndProcedure'")?;

        Ok(ProcedureDecl { name, params, locals, body, line })
    }

    /// block = { statement }, stopping once the next token is one of
    /// `terminators` (the closing keyword the caller will itself consume).
    fn parse_block(&mut self, terminators: &[Keyword]) -> Result<&'a [Stmt<'a>], ParseError> {
        let mut stmts = Vec::new();
        loop {
            if let TokenKind::Keyword(k) = self.peek().kind {
                if terminators.contains(&k) {
                    break;
                }
            }
            if matches!(self.peek().kind, TokenKind::Eof) {
                return Err(self.err("unexpected end of input while parsing a block"));
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(self.ctx.stmt_arena.alloc_slice(stmts))
    }

    fn parse_statement(&mut self) -> Result<Stmt<'a>, ParseError> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Read) => self.parse_read(),
            TokenKind::Keyword(Keyword::Write) => self.parse_write(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Identifier => self.parse_call_or_assignment(),
            _ => Err(self.err("expected a statement")),
        }
    }

    fn parse_read(&mut self) -> Result<Stmt<'a>, ParseError> {
        let line = self.expect_kw(Keyword::Read, "expected 'Read'")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'Read'")?;
        let mut targets = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                targets.push(self.parse_ref()?);
                if self.check_punct(Punct::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, "expected ')' after Read arguments")?;
        Ok(Stmt::Io { direction: IoDirection::Read, write_args: Vec::new(), read_targets: targets, line })
    }

    fn parse_write(&mut self) -> Result<Stmt<'a>, ParseError> {
        let line = self.expect_kw(Keyword::Write, "expected 'Write'")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'Write'")?;
        let mut args = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check_punct(Punct::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, "expected ')' after Write arguments")?;
        Ok(Stmt::Io { direction: IoDirection::Write, write_args: args, read_targets: Vec::new(), line })
    }

    fn parse_if(&mut self) -> Result<Stmt<'a>, ParseError> {
        let line = self.expect_kw(Keyword::If, "expected 'If'")?;
        let cond = self.parse_expr()?;
        self.expect_kw(Keyword::Then, "expected 'Then'")?;
        let then_block = self.parse_block(&[Keyword::Else, Keyword::EndIf])?;
        let else_block = if self.check_kw(Keyword::Else) {
            self.advance();
            Some(self.parse_block(&[Keyword::EndIf])?)
        } else {
            None
        };
        self.expect_kw(Keyword::EndIf, "expected 'EndIf'")?;
        Ok(Stmt::If { cond, then_block, else_block, line })
    }

    fn parse_while(&mut self) -> Result<Stmt<'a>, ParseError> {
        let line = self.expect_kw(Keyword::While, "expected 'While'")?;
        let cond = self.parse_expr()?;
        self.expect_kw(Keyword::Do, "expected 'Do'")?;
        let body = self.parse_block(&[Keyword::EndWhile])?;
        self.expect_kw(Keyword::EndWhile, "expected 'EndWhile'")?;
        Ok(Stmt::While { cond, body, line })
    }

    fn parse_for(&mut self) -> Result<Stmt<'a>, ParseError> {
        let line = self.expect_kw(Keyword::For, "expected 'For'")?;
        let (var, _) = self.expect_identifier("expected a loop variable")?;
        if !self.check_punct(Punct::Assign) {
            return Err(self.err("expected ':=', '<-', or '←' after loop variable"));
        }
        self.advance();
        let start = self.parse_expr()?;
        self.expect_kw(Keyword::To, "expected 'To'")?;
        let end = self.parse_expr()?;
        let step = if self.check_kw(Keyword::Step) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_kw(Keyword::Do, "expected 'Do'")?;
        let body = self.parse_block(&[Keyword::EndFor])?;
        self.expect_kw(Keyword::EndFor, "expected 'EndFor'")?;
        Ok(Stmt::For { var, start, end, step, body, line })
    }

    fn parse_return(&mut self) -> Result<Stmt<'a>, ParseError> {
        let line = self.expect_kw(Keyword::Return, "expected 'Return'")?;
        let value = if self.starts_expr() { Some(self.parse_expr()?) } else { None };
        Ok(Stmt::Return { value, line })
    }

    fn starts_expr(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Identifier
                | TokenKind::Punct(Punct::LParen)
                | TokenKind::Punct(Punct::Minus)
                | TokenKind::WordOp(WordOp::Not)
        )
    }

    // ident "(" [exprList] ")"   -- procedure call
    // ref ASSIGN expr            -- assignment
    fn parse_call_or_assignment(&mut self) -> Result<Stmt<'a>, ParseError> {
        let (name, line) = self.expect_identifier("expected an identifier")?;
        if self.check_punct(Punct::LParen) {
            self.advance();
            let mut args = Vec::new();
            if !self.check_punct(Punct::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if self.check_punct(Punct::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect_punct(Punct::RParen, "expected ')' after call arguments")?;
            return Ok(Stmt::Call { callee: name, args, line });
        }

        let target = if self.check_punct(Punct::LBracket) {
            let mut indices = Vec::new();
            while self.check_punct(Punct::LBracket) {
                self.advance();
                indices.push(self.parse_expr()?);
                self.expect_punct(Punct::RBracket, "expected ']'")?;
            }
            Target::Index { name, indices, line }
        } else {
            Target::Name { name, line }
        };

        if !self.check_punct(Punct::Assign) {
            return Err(self.err("expected ':=', '<-', or '←'"));
        }
        self.advance();
        let value = self.parse_expr()?;
        Ok(Stmt::Assignment { target, value, line })
    }

    /// ref = ident { "[" expr "]" }, used by `Read`'s argument list.
    fn parse_ref(&mut self) -> Result<Target<'a>, ParseError> {
        let (name, line) = self.expect_identifier("expected a variable reference")?;
        if self.check_punct(Punct::LBracket) {
            let mut indices = Vec::new();
            while self.check_punct(Punct::LBracket) {
                self.advance();
                indices.push(self.parse_expr()?);
                self.expect_punct(Punct::RBracket, "expected ']'")?;
            }
            Ok(Target::Index { name, indices, line })
        } else {
            Ok(Target::Name { name, line })
        }
    }

    // Expression precedence (lowest to highest), §4.2:
    //   Or < And < (= <>) < (< <= > >=) < (+ -) < (* / Mod Div) < unary < primary
    fn parse_expr(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let mut left = self.parse_and()?;
        while self.check_word_op(WordOp::Or) {
            let line = self.peek_line();
            self.advance();
            let right = self.parse_and()?;
            left = self.ctx.expr_arena.alloc(Expr::BinaryOp { op: BinOpKind::Or, left, right, line });
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check_word_op(WordOp::And) {
            let line = self.peek_line();
            self.advance();
            let right = self.parse_equality()?;
            left = self.ctx.expr_arena.alloc(Expr::BinaryOp { op: BinOpKind::And, left, right, line });
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.check_punct(Punct::Eq) {
                BinOpKind::Eq
            } else if self.check_punct(Punct::NotEq) {
                BinOpKind::NotEq
            } else {
                break;
            };
            let line = self.peek_line();
            self.advance();
            let right = self.parse_comparison()?;
            left = self.ctx.expr_arena.alloc(Expr::BinaryOp { op, left, right, line });
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.check_punct(Punct::Lt) {
                BinOpKind::Lt
            } else if self.check_punct(Punct::Le) {
                BinOpKind::Le
            } else if self.check_punct(Punct::Gt) {
                BinOpKind::Gt
            } else if self.check_punct(Punct::Ge) {
                BinOpKind::Ge
            } else {
                break;
            };
            let line = self.peek_line();
            self.advance();
            let right = self.parse_additive()?;
            left = self.ctx.expr_arena.alloc(Expr::BinaryOp { op, left, right, line });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.check_punct(Punct::Plus) {
                BinOpKind::Add
            } else if self.check_punct(Punct::Minus) {
                BinOpKind::Sub
            } else {
                break;
            };
            let line = self.peek_line();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.ctx.expr_arena.alloc(Expr::BinaryOp { op, left, right, line });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.check_punct(Punct::Star) {
                BinOpKind::Mul
            } else if self.check_punct(Punct::Slash) {
                BinOpKind::Div
            } else if self.check_word_op(WordOp::Mod) {
                BinOpKind::Mod
            } else if self.check_word_op(WordOp::Div) {
                BinOpKind::IDiv
            } else {
                break;
            };
            let line = self.peek_line();
            self.advance();
            let right = self.parse_unary()?;
            left = self.ctx.expr_arena.alloc(Expr::BinaryOp { op, left, right, line });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        if self.check_punct(Punct::Minus) {
            let line = self.peek_line();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.ctx.expr_arena.alloc(Expr::UnaryOp { op: UnOpKind::Neg, operand, line }));
        }
        if self.check_word_op(WordOp::Not) {
            let line = self.peek_line();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.ctx.expr_arena.alloc(Expr::UnaryOp { op: UnOpKind::Not, operand, line }));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let line = self.peek_line();
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(self.ctx.expr_arena.alloc(Expr::Literal { value: Literal::Number(n), line }))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(self.ctx.expr_arena.alloc(Expr::Literal { value: Literal::Str(s), line }))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.ctx.expr_arena.alloc(Expr::Literal { value: Literal::Boolean(true), line }))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.ctx.expr_arena.alloc(Expr::Literal { value: Literal::Boolean(false), line }))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_punct(Punct::RParen, "expected ')'")?;
                Ok(inner)
            }
            TokenKind::Identifier => {
                let (name, _) = self.expect_identifier("expected an identifier")?;
                if self.check_punct(Punct::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check_punct(Punct::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.check_punct(Punct::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect_punct(Punct::RParen, "expected ')' after call arguments")?;
                    Ok(self.ctx.expr_arena.alloc(Expr::Call { callee: name, args, line }))
                } else if self.check_punct(Punct::LBracket) {
                    let mut indices = Vec::new();
                    while self.check_punct(Punct::LBracket) {
                        self.advance();
                        indices.push(self.parse_expr()?);
                        self.expect_punct(Punct::RBracket, "expected ']'")?;
                    }
                    Ok(self.ctx.expr_arena.alloc(Expr::ArrayAccess { name, indices, line }))
                } else {
                    Ok(self.ctx.expr_arena.alloc(Expr::Identifier { name, line }))
                }
            }
            _ => Err(self.err("expected an expression")),
        }
    }
}

pub fn parse<'a>(
    tokens: &'a [Token],
    ctx: &'a AstContext<'a>,
    interner: &mut Interner,
) -> Result<Program<'a>, ParseError> {
    let mut parser = Parser::new(tokens, ctx, interner);
    let program = parser.parse_program()?;
    if !matches!(parser.peek().kind, TokenKind::Eof) {
        return Err(parser.err("expected end of input after 'End'"));
    }
    Ok(program)
}
