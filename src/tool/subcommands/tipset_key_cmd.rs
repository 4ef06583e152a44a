// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::io::Write;

use cid::Cid;

use crate::blocks::TipsetKey;

#[derive(Debug, clap::Args)]
pub struct TipsetKeyCommand {
    /// Block identifiers, in any order. Duplicates are removed.
    #[arg(required = true)]
    cids: Vec<Cid>,
}

impl TipsetKeyCommand {
    pub fn run(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let key = TipsetKey::new(self.cids.iter().copied())?;
        for cid in key.cids() {
            writeln!(out, "{cid}")?;
        }
        writeln!(out, "canonical: {}", key.canonical_string())?;
        writeln!(out, "bytes:     {}", hex::encode(key.to_bytes()))?;
        Ok(())
    }
}
