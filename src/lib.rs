// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Chain representation core: content-addressed block headers, tipsets, the
//! fork-choice rule and the persistent chain store that records validated
//! tipsets and tracks the node's head.

pub mod blocks;
pub mod chain;
pub mod cli_shared;
pub mod db;
#[cfg(test)]
mod test_utils;
mod tool;
pub mod utils;

pub use blocks::{BlockHeader, ChainEpoch, RawBlockHeader, Tipset, TipsetKey};
pub use chain::{
    ChainReader, ChainStore, ChainStoreConfig, HeadChange, TipsetMetadata, fork_choice,
};
pub use tool::main::main as forest_chain_tool_main;
