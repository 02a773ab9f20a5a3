// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared execution-state lattice for runs, streams, and data.
//!
//! All three entities move through the same monotone lattice:
//! `PENDING < PROCESSING < {PROCESSED, ERROR, DELAYED}`. Two backwards edges
//! exist: `DELAYED -> PENDING`, the sweeper's resume edge for streams and
//! data; and `DELAYED -> PROCESSING`, a run's resume edge (a run has no
//! PENDING-dispatch state to return to — it was already PROCESSING when a
//! rate limit paused it). A third edge, `PROCESSING -> PENDING`, lets a
//! rate-limited stream or data item reset itself immediately without going
//! through DELAYED; the pause lives on the owning run instead.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionState {
    Pending,
    Processing,
    Processed,
    Error,
    Delayed,
}

impl ExecutionState {
    /// Whether moving from `self` to `next` is a legal edge in the lattice.
    ///
    /// `DELAYED -> PENDING` (stream/data resume), `DELAYED -> PROCESSING`
    /// (run resume), and `PROCESSING -> PENDING` (immediate rate-limit
    /// reset) are the only exceptions to monotonicity.
    pub fn can_transition_to(&self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        match (self, next) {
            (Pending, Processing) => true,
            (Processing, Processed) => true,
            (Processing, Error) => true,
            (Processing, Delayed) => true,
            (Processing, Pending) => true,
            (Delayed, Pending) => true,
            (Delayed, Processing) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Processed | ExecutionState::Error)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            ExecutionState::Pending => "PENDING",
            ExecutionState::Processing => "PROCESSING",
            ExecutionState::Processed => "PROCESSED",
            ExecutionState::Error => "ERROR",
            ExecutionState::Delayed => "DELAYED",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl std::str::FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ExecutionState::Pending),
            "PROCESSING" => Ok(ExecutionState::Processing),
            "PROCESSED" => Ok(ExecutionState::Processed),
            "ERROR" => Ok(ExecutionState::Error),
            "DELAYED" => Ok(ExecutionState::Delayed),
            other => Err(format!("unrecognized execution state {other}")),
        }
    }
}
