//! The CLI's own integration test (§4): runs `algolang run <file>` against
//! a scratch `.algo` file, in the teacher's direct-function-call test style
//! (`tests/phase37_cli.rs` drives `project::build::build` against a
//! `tempfile::tempdir()` rather than spawning a subprocess).

#![cfg(feature = "cli")]

use std::fs;
use std::io::Write as _;
use tempfile::NamedTempFile;

use algolang::cli::{cmd_run, cmd_tokens};

#[test]
fn cmd_run_executes_a_scratch_source_file_to_completion() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Algorithm Scratch\nBegin\nWrite(\"from disk\")\nEnd").unwrap();
    let path = file.path().to_path_buf();

    // A well-formed program runs to `Done` and returns without exiting the
    // process; only a lex/parse/runtime error would call `process::exit`.
    let result = cmd_run(&path, false);
    assert!(result.is_ok());
}

#[test]
fn cmd_run_accepts_a_trace_flag_without_changing_program_outcome() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Algorithm Scratch\nVar x : Integer\nBegin\nx <- 1\nEnd").unwrap();
    let path = file.path().to_path_buf();

    assert!(cmd_run(&path, true).is_ok());
}

#[test]
fn cmd_tokens_reads_and_tokenizes_a_scratch_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Algorithm Scratch\nBegin\nWrite(1)\nEnd").unwrap();
    let path = file.path().to_path_buf();

    assert!(cmd_tokens(&path).is_ok());
}

#[test]
fn cmd_run_reads_source_from_an_arbitrary_path_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("program.algo");
    fs::write(&path, "Algorithm P\nBegin\nWrite(42)\nEnd").unwrap();

    assert!(cmd_run(&path, false).is_ok());
}
