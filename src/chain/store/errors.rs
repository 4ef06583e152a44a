// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

use super::TipsetMetadata;
use crate::blocks::{self, TipsetKey};

/// Chain error
#[derive(Debug, Error)]
pub enum Error {
    /// Key or height was not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Two validations of the same tipset disagreed on its execution result.
    /// Never recovered locally.
    #[error(
        "Inconsistent state for tipset {key}: recorded {recorded:?}, proposed {proposed:?}"
    )]
    InconsistentState {
        key: TipsetKey,
        recorded: TipsetMetadata,
        proposed: TipsetMetadata,
    },
    /// Head update targeted a tipset without recorded metadata
    #[error("Unknown tipset {0}: no metadata recorded")]
    UnknownTipset(TipsetKey),
    /// Ancestry walk was cancelled or ran past its deadline
    #[error("Cancelled: {0}")]
    Cancelled(String),
    /// Error originating constructing blockchain structures
    #[error(transparent)]
    Blocks(#[from] blocks::Error),
    /// Other chain error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        // Keep typed block errors reachable through the `anyhow` collaborators.
        match e.downcast::<blocks::Error>() {
            Ok(e) => Error::Blocks(e),
            Err(e) => Error::Other(format!("{e:#}")),
        }
    }
}

impl From<fvm_ipld_encoding::Error> for Error {
    fn from(e: fvm_ipld_encoding::Error) -> Self {
        Error::Blocks(e.into())
    }
}
