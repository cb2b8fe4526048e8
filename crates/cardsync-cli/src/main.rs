//! # Cardsync CLI
//!
//! A thin terminal client over the `cardsync` library. The binary only
//! invokes `cli::run()` and maps errors to exit codes:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | error |
//! | 2 | the change was applied locally only (not synced) |
//!
//! ## Workspace Structure
//!
//! - `crates/cardsync/`: the UI-agnostic core
//! - `crates/cardsync-cli/`: this client
//!
//! Everything inside the core takes and returns plain Rust values; all
//! terminal concerns (argument parsing, colors, exit codes, log output) live
//! in `src/cli/`.

use cardsync::CardError;

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        if let Some(CardError::NotSynced { .. }) = e.downcast_ref::<CardError>() {
            eprintln!("Warning: {}", e);
            std::process::exit(2);
        }
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
