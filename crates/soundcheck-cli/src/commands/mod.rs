//! CLI subcommands. Each `run` returns the process exit code; fatal
//! harness misuse is an `Err` and maps to exit code 4 in `main`.

pub mod engines;
pub mod sweep;
pub mod validate;
