//! Command Line Interface (CLI) layer for rflpack.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the `run` and `runconfig`
//! subcommands. It wires user-provided options to the library functionality
//! exposed via `rflpack::api`.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
