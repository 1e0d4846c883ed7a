//! The six end-to-end scenarios from §8, each run start to finish.

use algolang::ast::AstContext;
use algolang::intern::Interner;
use algolang::interpreter::{interpret, Event, RuntimeValue};
use algolang::lexer::tokenize;
use algolang::parser::parse;

fn run(src: &str, replies: &[&str]) -> Vec<Event> {
    let tokens = tokenize(src).expect("lex");
    let ctx = AstContext::new();
    let mut interner = Interner::new();
    let program = parse(&tokens, &ctx, &mut interner).expect("parse");
    let mut handle = interpret(&program, &interner);

    let mut events = Vec::new();
    let mut remaining = replies.iter();
    let mut reply: Option<&str> = None;
    loop {
        let event = handle.advance(reply);
        reply = None;
        let is_input = matches!(event, Event::Input { .. });
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
        if is_input {
            reply = remaining.next().copied();
        }
    }
    events
}

/// 1. Hello-World.
#[test]
fn hello_world() {
    let src = "Algorithm H\nBegin Write(\"Hello, World!\") End";
    let events = run(src, &[]);
    assert!(matches!(events[0], Event::Step { line: 2, .. }));
    assert_eq!(events[1], Event::Output { text: "Hello, World!".to_string() });
    assert!(matches!(events.last().unwrap(), Event::Done));
}

/// 2. Average of five grades with input.
#[test]
fn average_of_five_grades() {
    let src = "Algorithm Average_Note\n\
               Var g1,g2,g3,g4,g5 : Integer\n\
               Var avg : Real\n\
               Begin\n\
               Read(g1,g2,g3,g4,g5)\n\
               avg <- (g1+g2+g3+g4+g5)/5\n\
               Write(\"The average is: \", avg)\n\
               End";
    let events = run(src, &["15", "12", "18", "10", "10"]);
    let outputs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Output { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].contains("13"));

    // The penultimate event is the Step at the Write line.
    let penultimate = &events[events.len() - 2];
    assert!(matches!(penultimate, Event::Step { line: 7, .. }));
}

/// 3. Matrix indexing.
#[test]
fn matrix_indexing_nine_sequential_outputs() {
    let src = "Algorithm M\n\
               Var Grid : array [3][3] of Integer\n\
               Begin\n\
               For r := 0 To 2 Do\n\
               For c := 0 To 2 Do\n\
               Grid[r][c] <- r*3 + c + 1\n\
               Write(Grid[r][c])\n\
               EndFor\n\
               EndFor\n\
               End";
    let events = run(src, &[]);
    let outputs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Output { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(outputs, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9"]);
}

/// 4. Function call from an expression.
#[test]
fn function_call_from_expression_emits_one_output_no_inner_steps() {
    let src = "Algorithm F\n\
               Function Add(a:Integer,b:Integer):Integer Begin Return a+b EndFunction\n\
               Var result : Integer\n\
               Begin\n\
               result <- Add(10, 20)\n\
               Write(result)\n\
               End";
    let events = run(src, &[]);
    let outputs: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Output { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(outputs, vec!["30"]);
    // Two Steps total: the assignment and the Write. None from inside Add.
    let step_count = events.iter().filter(|e| matches!(e, Event::Step { .. })).count();
    assert_eq!(step_count, 2);
}

/// 5. Out-of-bounds.
#[test]
fn out_of_bounds_array_access() {
    let src = "Algorithm B\nVar v : array [3] of Integer\nBegin\nv[3] <- 1\nEnd";
    let events = run(src, &[]);
    assert_eq!(*events.last().unwrap(), Event::Error { message: "Index 3 out of bounds.".to_string() });
}

/// 6. Unterminated string.
#[test]
fn unterminated_string_reports_opening_line() {
    let src = "Algorithm U\nBegin\nWrite(\"hi\nEnd";
    let err = tokenize(src).unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn average_result_is_formatted_as_an_integral_real() {
    // avg == 13.0 exactly: Write formatting (§4.3) must print "13", not
    // "13.0000".
    assert_eq!(RuntimeValue::Real(13.0).format_for_write(), "13");
}
