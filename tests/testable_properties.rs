//! The six numbered invariants and the boundary behaviors from §8.

use algolang::ast::AstContext;
use algolang::intern::Interner;
use algolang::interpreter::{interpret, Event};
use algolang::lexer::tokenize;
use algolang::parser::parse;

fn run(src: &str) -> Vec<Event> {
    let tokens = tokenize(src).expect("lex");
    let ctx = AstContext::new();
    let mut interner = Interner::new();
    let program = parse(&tokens, &ctx, &mut interner).expect("parse");
    let mut handle = interpret(&program, &interner);
    let mut events = Vec::new();
    loop {
        let event = handle.advance(None);
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

/// 1. Source preservation of lines: every token and AST node's line equals
/// the 1-based line of its first character.
#[test]
fn source_preservation_of_lines() {
    let src = "Algorithm A\n\nVar x : Integer\n\nBegin\nx <- 1\nEnd";
    let tokens = tokenize(src).unwrap();
    let decl_tok = tokens.iter().find(|t| t.lexeme == "x").unwrap();
    assert_eq!(decl_tok.line, 3);

    let ctx = AstContext::new();
    let mut interner = Interner::new();
    let program = parse(&tokens, &ctx, &mut interner).unwrap();
    assert_eq!(program.globals[0].line, 3);
    assert_eq!(program.body[0].line(), 6);
}

/// 2. Step correspondence: one Step per statement execution, including
/// loop re-entry; a non-loop sequential program emits exactly one Step per
/// top-level statement.
#[test]
fn step_correspondence_for_a_straight_line_program() {
    let src = "Algorithm A\nVar x : Integer\nBegin\nx <- 1\nx <- 2\nx <- 3\nEnd";
    let events = run(src);
    let step_lines: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::Step { line, .. } => Some(*line),
            _ => None,
        })
        .collect();
    assert_eq!(step_lines, vec![4, 5, 6]);
}

/// 3. Scope freshness: after a call returns normally, the caller's visible
/// names are unchanged from just before the call.
#[test]
fn scope_freshness_after_a_procedure_call() {
    let src = "Algorithm A\n\
               Procedure Bump(n:Integer)\n\
               Begin\n\
               n <- n + 1\n\
               EndProcedure\n\
               Var x : Integer\n\
               Begin\n\
               x <- 5\n\
               Bump(x)\n\
               Write(x)\n\
               End";
    let events = run(src);
    let outputs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Output { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    // `n` inside Bump never aliases the caller's `x` (pass-by-value): the
    // caller's binding set and values are exactly as left before the call.
    assert_eq!(outputs, vec!["5"]);
}

/// 4. Snapshot immutability: a later mutation never retroactively alters an
/// already-delivered Step's snapshot.
#[test]
fn snapshot_immutability_across_subsequent_mutation() {
    let src = "Algorithm A\nVar x : Integer\nBegin\nx <- 1\nx <- 99\nEnd";
    let events = run(src);
    let first_snapshot = events
        .iter()
        .find_map(|e| match e {
            Event::Step { snapshot, .. } => Some(snapshot.clone()),
            _ => None,
        })
        .unwrap();
    // Snapshot taken before `x <- 1` runs: x still holds its declared
    // default, not the value assigned on later lines.
    for v in first_snapshot.values() {
        assert_eq!(*v, algolang::interpreter::RuntimeValue::Real(0.0));
    }
}

/// 5. Case-insensitive keywords, case-sensitive identifiers.
#[test]
fn case_insensitive_keywords_case_sensitive_identifiers() {
    let lower = "algorithm a begin write(1) end";
    let upper = "ALGORITHM A BEGIN WRITE(1) END";
    let kinds = |s: &str| -> Vec<_> { tokenize(s).unwrap().into_iter().map(|t| t.kind).collect::<Vec<_>>() };
    assert_eq!(kinds(lower), kinds(upper));

    let tokens = tokenize("MixedCaseName").unwrap();
    assert_eq!(tokens[0].lexeme, "MixedCaseName");
}

/// 6. Round trip of assignment forms: swapping `<-`, `←`, `:=` yields the
/// same AST shape.
#[test]
fn assignment_forms_round_trip_to_the_same_ast() {
    let shapes: Vec<_> = ["<-", "\u{2190}", ":="]
        .iter()
        .map(|form| {
            let src = format!("Algorithm A\nVar x : Integer\nBegin\nx {} 1 + 2\nEnd", form);
            let tokens = tokenize(&src).unwrap();
            let ctx = AstContext::new();
            let mut interner = Interner::new();
            let program = parse(&tokens, &ctx, &mut interner).unwrap();
            program.body[0].line()
        })
        .collect();
    assert!(shapes.iter().all(|&l| l == shapes[0]));
}

/// Boundary: array declared as `array [0]` is always out of bounds.
#[test]
fn zero_length_array_is_always_out_of_bounds() {
    let src = "Algorithm A\nVar v : array [0] of Integer\nBegin\nv[0] <- 1\nEnd";
    let events = run(src);
    assert_eq!(*events.last().unwrap(), Event::Error { message: "Index 0 out of bounds.".to_string() });
}

/// Boundary: `For` with start > end and a positive step runs zero times.
#[test]
fn for_loop_start_greater_than_end_runs_zero_times() {
    let src = "Algorithm A\nVar i : Integer\nBegin\nFor i := 5 To 1 Do\nWrite(i)\nEndFor\nEnd";
    let events = run(src);
    let output_count = events.iter().filter(|e| matches!(e, Event::Output { .. })).count();
    assert_eq!(output_count, 0);
}

/// Boundary: empty If/While/For/procedure bodies parse and run fine.
#[test]
fn empty_bodies_run_without_error() {
    let events = run("Algorithm A\nBegin\nIf True Then EndIf\nEnd");
    assert!(matches!(events.last().unwrap(), Event::Done));

    let events = run("Algorithm A\nVar i : Integer\nBegin\nWhile False Do\nEndWhile\nEnd");
    assert!(matches!(events.last().unwrap(), Event::Done));
}
