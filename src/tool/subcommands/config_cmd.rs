// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{io::Write, path::PathBuf};

use clap::Subcommand;

use crate::cli_shared::{Config, read_config};

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the default configuration
    Default,
    /// Print the effective configuration read from a TOML file
    Show {
        /// TOML file containing the chain store configuration
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl ConfigCommands {
    pub fn run(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let config = match self {
            Self::Default => Config::default(),
            Self::Show { config } => read_config(Some(config.as_path()))?,
        };
        write!(out, "{}", toml::to_string(&config)?)?;
        Ok(())
    }
}
