//! CLI subcommand implementations for the `carteira` binary.

pub mod doctor;
pub mod run_cmd;
