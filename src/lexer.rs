//! Hand-written tokenizer for AlgoLang source text (§4.1).
//!
//! A single left-to-right scan over the source bytes. No lookahead beyond
//! what's needed to disambiguate `:=`/`<-`/`←`/`<>`/`<=`/`>=`, matching the
//! grammar's stated "recognised with lookahead" punctuation.

use serde::Serialize;

use crate::token::{Keyword, Punct, Token, TokenKind, TypeKeyword, WordOp};

/// §5: `Serialize` so a non-Rust host can receive a lex failure as JSON
/// across the `wasm` boundary without bespoke glue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { chars: source.chars().peekable(), line: 1 }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Skip whitespace and comments (`// ...` and balanced `{ ... }`).
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    if clone.peek() == Some(&'/') {
                        self.bump();
                        self.bump();
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    } else {
                        return;
                    }
                }
                Some('{') => {
                    self.bump();
                    while let Some(c) = self.peek() {
                        self.bump();
                        if c == '}' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", line));
                break;
            };

            if c.is_ascii_digit() {
                tokens.push(self.lex_number(line)?);
                continue;
            }
            if c == '"' || c == '\'' {
                tokens.push(self.lex_string(c, line)?);
                continue;
            }
            if c.is_alphabetic() || c == '_' {
                tokens.push(self.lex_identifier(line));
                continue;
            }

            tokens.push(self.lex_operator(line)?);
        }
        Ok(tokens)
    }

    fn lex_number(&mut self, line: u32) -> Result<Token, LexError> {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            let mut clone = self.chars.clone();
            clone.next();
            if clone.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                lexeme.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        lexeme.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        let value: f64 = lexeme.parse().map_err(|_| LexError {
            message: format!("Invalid number literal '{}' at line {}", lexeme, line),
            line,
        })?;
        Ok(Token::new(TokenKind::Number(value), lexeme, line))
    }

    fn lex_string(&mut self, quote: char, line: u32) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut content = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    return Ok(Token::new(TokenKind::Str(content.clone()), content, line));
                }
                Some(c) => content.push(c),
                None => {
                    return Err(LexError {
                        message: format!("Unterminated string literal starting at line {}", line),
                        line,
                    });
                }
            }
        }
    }

    fn lex_identifier(&mut self, line: u32) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let lower = lexeme.to_lowercase();
        if let Some(kw) = Keyword::from_lowercase(&lower) {
            return Token::new(TokenKind::Keyword(kw), lexeme, line);
        }
        if let Some(ty) = TypeKeyword::from_lowercase(&lower) {
            return Token::new(TokenKind::Type(ty), lexeme, line);
        }
        if let Some(op) = WordOp::from_lowercase(&lower) {
            return Token::new(TokenKind::WordOp(op), lexeme, line);
        }
        if lower == "true" {
            return Token::new(TokenKind::True, lexeme, line);
        }
        if lower == "false" {
            return Token::new(TokenKind::False, lexeme, line);
        }
        Token::new(TokenKind::Identifier, lexeme, line)
    }

    fn lex_operator(&mut self, line: u32) -> Result<Token, LexError> {
        let c = self.bump().expect("checked by caller");
        let (kind, lexeme): (TokenKind, String) = match c {
            '+' => (TokenKind::Punct(Punct::Plus), "+".into()),
            '-' => (TokenKind::Punct(Punct::Minus), "-".into()),
            '*' => (TokenKind::Punct(Punct::Star), "*".into()),
            '/' => (TokenKind::Punct(Punct::Slash), "/".into()),
            '(' => (TokenKind::Punct(Punct::LParen), "(".into()),
            ')' => (TokenKind::Punct(Punct::RParen), ")".into()),
            '[' => (TokenKind::Punct(Punct::LBracket), "[".into()),
            ']' => (TokenKind::Punct(Punct::RBracket), "]".into()),
            ',' => (TokenKind::Punct(Punct::Comma), ",".into()),
            ';' => (TokenKind::Punct(Punct::Semicolon), ";".into()),
            '←' => (TokenKind::Punct(Punct::Assign), "←".into()),
            '=' => (TokenKind::Punct(Punct::Eq), "=".into()),
            ':' => {
                if self.peek() == Some('=') {
                    self.bump();
                    (TokenKind::Punct(Punct::Assign), ":=".into())
                } else {
                    (TokenKind::Punct(Punct::Colon), ":".into())
                }
            }
            '<' => match self.peek() {
                Some('-') => {
                    self.bump();
                    (TokenKind::Punct(Punct::Assign), "<-".into())
                }
                Some('=') => {
                    self.bump();
                    (TokenKind::Punct(Punct::Le), "<=".into())
                }
                Some('>') => {
                    self.bump();
                    (TokenKind::Punct(Punct::NotEq), "<>".into())
                }
                _ => (TokenKind::Punct(Punct::Lt), "<".into()),
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    (TokenKind::Punct(Punct::Ge), ">=".into())
                } else {
                    (TokenKind::Punct(Punct::Gt), ">".into())
                }
            }
            other => {
                return Err(LexError {
                    message: format!("Unexpected character {} at line {}", other, line),
                    line,
                });
            }
        };
        Ok(Token::new(kind, lexeme, line))
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tracks_line_numbers_across_newlines() {
        let tokens = tokenize("Write(1)\nWrite(2)").unwrap();
        let write_lines: Vec<u32> =
            tokens.iter().filter(|t| matches!(t.kind, TokenKind::Keyword(Keyword::Write))).map(|t| t.line).collect();
        assert_eq!(write_lines, vec![1, 2]);
    }

    #[test]
    fn skips_line_comments() {
        let tokens = tokenize("// a comment\nWrite(1)").unwrap();
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Keyword(Keyword::Write))));
    }

    #[test]
    fn skips_brace_comments() {
        let tokens = tokenize("{ a block comment }\nWrite(1)").unwrap();
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Keyword(Keyword::Write))));
    }

    #[test]
    fn number_literal_with_decimal() {
        let ks = kinds("3.14");
        assert_eq!(ks[0], TokenKind::Number(3.14));
    }

    #[test]
    fn leading_zero_literal_is_accepted() {
        let ks = kinds("007");
        assert_eq!(ks[0], TokenKind::Number(7.0));
    }

    #[test]
    fn string_literal_single_and_double_quotes() {
        assert_eq!(kinds("\"hi\"")[0], TokenKind::Str("hi".into()));
        assert_eq!(kinds("'hi'")[0], TokenKind::Str("hi".into()));
    }

    #[test]
    fn unterminated_string_is_a_lex_error_reporting_the_opening_line() {
        let err = tokenize("Write(\"hi").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn unterminated_string_across_lines_reports_opening_line() {
        let err = tokenize("x\ny\nWrite(\"hi").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn unexpected_character_is_a_lex_error() {
        let err = tokenize("@").unwrap_err();
        assert!(err.message.contains("Unexpected character @ at line 1"));
    }

    #[test]
    fn assignment_forms_all_produce_the_same_kind() {
        assert_eq!(kinds(":=")[0], kinds("<-")[0]);
        assert_eq!(kinds("<-")[0], kinds("←")[0]);
    }

    #[test]
    fn not_equal_is_distinct_from_colon_and_less_than() {
        let ks = kinds("<>");
        assert_eq!(ks[0], TokenKind::Punct(Punct::NotEq));
    }

    #[test]
    fn bare_colon_stays_a_colon() {
        assert_eq!(kinds(":")[0], TokenKind::Punct(Punct::Colon));
    }

    #[test]
    fn keywords_are_recognised_case_insensitively() {
        let lower = kinds("algorithm");
        let upper = kinds("ALGORITHM");
        let mixed = kinds("AlGoRiThM");
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn identifiers_preserve_original_case() {
        let tokens = tokenize("MyVar").unwrap();
        assert_eq!(tokens[0].lexeme, "MyVar");
    }

    #[test]
    fn true_and_false_are_lexed_as_constants_not_identifiers() {
        assert_eq!(kinds("True")[0], TokenKind::True);
        assert_eq!(kinds("false")[0], TokenKind::False);
    }

    #[test]
    fn word_operators_case_insensitive() {
        assert_eq!(kinds("MOD")[0], kinds("mod")[0]);
        assert_eq!(kinds("And")[0], kinds("and")[0]);
    }

    #[test]
    fn every_stream_ends_in_eof() {
        let tokens = tokenize("Write(1)").unwrap();
        assert!(tokens.last().unwrap().is_eof());
    }
}
