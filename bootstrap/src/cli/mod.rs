// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration.
///
/// All arguments have passed security validation (no dangerous patterns,
/// existing config path canonicalized, numeric values range-checked).
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub max_concurrent: Option<usize>,
}

/// Validated command variants.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Serve,
    Sweep,
    Migrate,
    EnqueueRun { run_id: String },
}

/// Parse and validate CLI arguments.
///
/// # Errors
///
/// Returns `ParseError` if any validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    if let Some(n) = cli.max_concurrent {
        if n == 0 || n > 1024 {
            return Err(ParseError::InvalidValue {
                arg: "max-concurrent".to_string(),
                reason: "must be between 1 and 1024".to_string(),
            });
        }
    }

    let command = match cli.command {
        Commands::Serve => ValidatedCommand::Serve,
        Commands::Sweep => ValidatedCommand::Sweep,
        Commands::Migrate => ValidatedCommand::Migrate,
        Commands::EnqueueRun { run_id } => {
            SecureArgParser::validate_argument(&run_id)?;
            ValidatedCommand::EnqueueRun { run_id }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        max_concurrent: cli.max_concurrent,
    })
}
