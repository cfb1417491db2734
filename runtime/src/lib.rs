// Copyright 2026 Carteira Teorica Contributors
// SPDX-License-Identifier: MIT

//! Carteira runtime library: browser download, run control and publishing.
//!
//! The binary is a thin CLI over these modules; they are exposed for
//! integration testing.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod publish;
pub mod renderer;
pub mod run;
