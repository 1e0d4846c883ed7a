//! AlgoLang CLI — standalone binary.
//!
//! A thin wrapper around [`algolang::cli::run_cli`]; all command logic
//! lives in the library so it stays testable without a process boundary.

fn main() {
    if let Err(e) = algolang::cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
