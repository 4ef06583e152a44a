// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod config_cmd;
mod header_cmd;
mod tipset_key_cmd;

use clap::Parser;

/// Command-line options for the `forest-chain-tool` binary
#[derive(Parser)]
#[command(name = "forest-chain-tool", author = env!("CARGO_PKG_AUTHORS"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Subcommand,
}

/// forest-chain-tool sub-commands
#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Inspect encoded block headers
    #[command(subcommand)]
    Header(header_cmd::HeaderCommands),

    /// Canonicalize a set of block identifiers into a tipset key
    #[command(name = "tipset-key")]
    TipsetKey(tipset_key_cmd::TipsetKeyCommand),

    /// Inspect configuration
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
