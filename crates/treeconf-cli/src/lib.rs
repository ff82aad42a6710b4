//! treeconf CLI library
//!
//! Exposes the CLI entry point so the binary stays a one-line wrapper.

mod cli;

pub use cli::run;
