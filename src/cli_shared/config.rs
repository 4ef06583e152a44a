// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::chain::ChainStoreConfig;
use crate::utils::misc::LoggingColor;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives, in `RUST_LOG` syntax. `RUST_LOG` takes precedence.
    pub filter: Option<String>,
    pub color: LoggingColor,
    /// Emit newline-delimited JSON records.
    pub json: bool,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub chain_store: ChainStoreConfig,
    pub log: LogConfig,
}
