//! # ArgCat CLI
//!
//! A thin binary for working with manifests outside of a program:
//!
//! - `argcat check <MANIFEST>`: validate and list the parsers
//! - `argcat run <MANIFEST> -- [ARGS]...`: parse `ARGS` with echo handlers and print what each
//!   handler received, as JSON
//! - `argcat recipe <RECIPE>...`: show the argument specs recipes expand to
//!
//! Everything lives in `cli/`; this file only runs it and turns errors into an exit code.
//! Logging goes to stderr, filtered by `ARGCAT_LOG` (`-v` defaults it to `info`).

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
