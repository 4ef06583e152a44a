// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::Write;

use anyhow::Context as _;
use clap::Subcommand;

use crate::blocks::BlockHeader;
use crate::utils::cid::cid_of;

#[derive(Debug, Subcommand)]
pub enum HeaderCommands {
    /// Strictly decode a hex-encoded block header and print its fields
    Decode {
        /// Canonical header bytes, hex-encoded, with or without a `0x` prefix
        hex: String,
    },
}

impl HeaderCommands {
    pub fn run(&self, out: &mut impl Write) -> anyhow::Result<()> {
        match self {
            Self::Decode { hex } => {
                let bytes = hex::decode(hex.trim().trim_start_matches("0x"))
                    .context("header is not valid hex")?;
                let header = BlockHeader::decode(&bytes)?;
                print_header(&header, out)
            }
        }
    }
}

fn print_header(header: &BlockHeader, out: &mut impl Write) -> anyhow::Result<()> {
    let optional = |cid: &Option<cid::Cid>| cid.map_or_else(|| "unset".into(), |c| c.to_string());
    writeln!(out, "cid:              {}", header.cid())?;
    writeln!(out, "miner:            {}", header.miner_address)?;
    writeln!(out, "epoch:            {}", header.epoch)?;
    writeln!(out, "weight:           {}", header.weight)?;
    writeln!(out, "parents:          {}", header.parents)?;
    writeln!(out, "state root:       {}", optional(&header.state_root))?;
    writeln!(out, "receipts root:    {}", optional(&header.message_receipts))?;
    writeln!(out, "messages:         {}", optional(&header.messages))?;
    writeln!(out, "timestamp:        {}", header.timestamp)?;
    writeln!(out, "fork signal:      {}", header.fork_signal)?;
    writeln!(out, "signed:           {}", header.signature.is_some())?;
    writeln!(
        out,
        "signing bytes id: {}",
        cid_of(&header.signing_bytes()?)
    )?;
    Ok(())
}
