// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod config;
pub mod logger;

pub use config::{Config, LogConfig};

use crate::utils::io::read_toml;
use anyhow::Context as _;
use std::path::Path;

/// Reads the configuration file at `config_path`, or returns the defaults if
/// no path is given.
pub fn read_config(config_path: Option<&Path>) -> anyhow::Result<Config> {
    match config_path {
        Some(path) => {
            // Read from config file
            let toml = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            // Parse and return the configuration file
            read_toml(&toml).with_context(|| format!("invalid config file {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}
