// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

mod election_proof;
mod header;
mod ticket;
mod tipset;
mod vrf_proof;

pub use election_proof::ElectionProof;
pub use header::{BlockHeader, BlockHeaderBuilder, HEADER_ARITY, MAX_WEIGHT_BITS, RawBlockHeader};
pub use ticket::Ticket;
pub use tipset::{Tipset, TipsetKey};
pub use vrf_proof::VRFProof;

/// Chain height. Heights increase monotonically along a chain, but may skip
/// values where no block was produced (null rounds).
pub type ChainEpoch = u64;

/// Blockchain blocks error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Bytes could not be encoded to or decoded from the canonical form.
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Header field rejected while freezing a header.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Blocks of a tipset disagree on height or parents.
    #[error("Inconsistent tipset: {0}")]
    InconsistentTipset(String),
    /// The given tipset has no blocks
    #[error("No blocks for tipset")]
    NoBlocks,
}

impl From<fvm_ipld_encoding::Error> for Error {
    fn from(e: fvm_ipld_encoding::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}
