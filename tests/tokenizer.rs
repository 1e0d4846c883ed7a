//! Cross-module tokenizer behavior (§4.1, §8).

use algolang::lexer::tokenize;
use algolang::token::{Keyword, Punct, TokenKind};

#[test]
fn keyword_case_permutation_yields_identical_kind_sequences() {
    let lower = "algorithm a var x : integer begin write(x) end";
    let upper = "ALGORITHM A VAR X : INTEGER BEGIN WRITE(X) END";
    let mixed = "AlGoRiThM A VaR X : InTeGeR BeGiN WrItE(X) EnD";

    let kinds = |src: &str| -> Vec<TokenKind> { tokenize(src).unwrap().into_iter().map(|t| t.kind).collect() };
    assert_eq!(kinds(lower), kinds(upper));
    assert_eq!(kinds(lower), kinds(mixed));
}

#[test]
fn identifier_lexemes_survive_case_permutation_verbatim() {
    let tokens = tokenize("MyCamelVar").unwrap();
    assert_eq!(tokens[0].lexeme, "MyCamelVar");
}

#[test]
fn every_token_carries_its_source_line() {
    let src = "Algorithm A\nVar x : Integer\nBegin\nWrite(x)\nEnd";
    let tokens = tokenize(src).unwrap();
    let write_tok = tokens.iter().find(|t| matches!(t.kind, TokenKind::Keyword(Keyword::Write))).unwrap();
    assert_eq!(write_tok.line, 4);
}

#[test]
fn assignment_forms_all_produce_the_same_token_kind() {
    let assign_kind = |src: &str| tokenize(src).unwrap()[0].kind.clone();
    assert_eq!(assign_kind(":="), assign_kind("<-"));
    assert_eq!(assign_kind("<-"), assign_kind("\u{2190}"));
}

#[test]
fn unrecognised_character_is_a_fatal_lexical_error_with_line() {
    let err = tokenize("Algorithm A\nBegin\n$\nEnd").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(err.message.contains("Unexpected character $ at line 3"));
}

#[test]
fn unterminated_string_reports_the_opening_quote_line() {
    let err = tokenize("Algorithm A\nBegin\nWrite(\"unterminated\nEnd").unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn zero_length_numeric_literal_is_never_produced() {
    // A bare '.' with no leading digit never starts a number literal; '.'
    // alone is not a recognised punctuation character either.
    let err = tokenize(".").unwrap_err();
    assert!(err.message.contains("Unexpected character"));
}

#[test]
fn leading_zero_literals_are_accepted() {
    let tokens = tokenize("007").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Number(7.0));
}

#[test]
fn line_comments_and_block_comments_are_both_skipped() {
    let src = "// leading comment\n{ a block comment }\nWrite(1)";
    let tokens = tokenize(src).unwrap();
    assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Keyword(Keyword::Write))));
}

#[test]
fn not_equal_and_bare_colon_are_distinct_punctuation() {
    assert_eq!(tokenize("<>").unwrap()[0].kind, TokenKind::Punct(Punct::NotEq));
    assert_eq!(tokenize(":").unwrap()[0].kind, TokenKind::Punct(Punct::Colon));
}
