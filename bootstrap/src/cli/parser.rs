// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "integration-pipeline")]
#[command(about = concat!("Integration execution pipeline v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of stream/data messages processed concurrently
    ///
    /// Sizes the semaphore gating the queue receiver loop. Default comes
    /// from configuration (`worker.max_concurrent_message_processing`).
    #[arg(long)]
    pub max_concurrent: Option<usize>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the queue receiver loop, dispatching run/stream/data messages
    /// to registered platform handlers until shut down.
    Serve,

    /// Run the delay/resume sweeper once and exit, promoting any
    /// `DELAYED` stream or data rows whose delay has elapsed back to
    /// `PENDING` and re-publishing their messages.
    Sweep,

    /// Apply embedded database migrations and exit.
    Migrate,

    /// Enqueue a `ProcessRun` message for an existing run, without
    /// starting the receiver loop. Useful for manual retries.
    EnqueueRun {
        /// Run id to enqueue
        #[arg(long)]
        run_id: String,
    },
}

/// Parse CLI arguments
///
/// This is the entry point for CLI parsing. It uses clap to parse
/// arguments and returns the parsed CLI structure.
///
/// # Panics
///
/// Clap will exit the process with appropriate error message if parsing fails
pub fn parse_cli() -> Cli {
    Cli::parse()
}
