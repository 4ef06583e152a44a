// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ffi::OsString;

use super::subcommands::{Cli, Subcommand};
use crate::cli_shared::logger::setup_minimal_logger;
use clap::Parser as _;

pub fn main<ArgT>(args: impl IntoIterator<Item = ArgT>) -> anyhow::Result<()>
where
    ArgT: Into<OsString> + Clone,
{
    // Capture Cli inputs
    let Cli { cmd } = Cli::parse_from(args);
    setup_minimal_logger();

    let mut stdout = std::io::stdout().lock();
    // Run command
    match cmd {
        Subcommand::Header(cmd) => cmd.run(&mut stdout),
        Subcommand::TipsetKey(cmd) => cmd.run(&mut stdout),
        Subcommand::Config(cmd) => cmd.run(&mut stdout),
    }
}
