// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod chain_store;
mod config;
mod errors;
pub mod index;
mod tipset_metadata;

pub use self::{
    chain_store::*, config::ChainStoreConfig, errors::*, tipset_metadata::TipsetMetadata,
};
