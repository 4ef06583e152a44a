// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{ops::Deref, sync::Arc};

use super::{ChainEpoch, ElectionProof, Error, Ticket, TipsetKey};
use crate::utils::cid::cid_of;
use anyhow::Context as _;
use cid::Cid;
use derive_builder::Builder;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared4::{address::Address, bigint::MAX_BIGINT_SIZE, crypto::signature::Signature};
use num::{BigInt, Signed as _};
use serde::{Deserialize, Serialize};

mod encoding;

pub use encoding::HEADER_ARITY;

/// Block header fields in their wire order. The canonical encoding of this
/// struct is a fixed-arity tuple, see [`HEADER_ARITY`].
#[derive(Builder, Clone, Eq, PartialEq, Debug)]
#[builder(name = "BlockHeaderBuilder", setter(into))]
pub struct RawBlockHeader {
    /// The address of the miner actor that mined this block
    #[builder(default = "Address::new_id(0)")]
    pub miner_address: Address,
    #[builder(default)]
    pub ticket: Option<Ticket>,
    #[builder(default)]
    pub election_proof: Option<ElectionProof>,
    /// The set of parents this block was based on.
    /// Typically one, but can be several in the case where there were multiple
    /// winning ticket-holders for an epoch
    #[builder(default)]
    pub parents: TipsetKey,
    /// The aggregate chain weight of the parent set
    #[builder(default)]
    pub weight: BigInt,
    /// Chain height of this block
    #[builder(default)]
    pub epoch: ChainEpoch,
    /// The CID of the parent state root after calculating parent tipset.
    #[builder(default)]
    pub state_root: Option<Cid>,
    /// The CID of the root of an array of `MessageReceipts`
    #[builder(default)]
    pub message_receipts: Option<Cid>,
    /// The CID of the Merkle links for `bls_messages` and `secp_messages`
    #[builder(default)]
    pub messages: Option<Cid>,
    /// Aggregate signature of miner in block
    #[builder(default)]
    pub bls_aggregate: Option<Signature>,
    /// Block creation time, in seconds since the Unix epoch
    #[builder(default)]
    pub timestamp: u64,
    #[builder(default)]
    pub signature: Option<Signature>,
    #[builder(default)]
    pub fork_signal: u64,
}

impl RawBlockHeader {
    pub fn builder() -> BlockHeaderBuilder {
        BlockHeaderBuilder::default()
    }

    /// Canonical encoding of the header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(fvm_ipld_encoding::to_vec(self)?)
    }

    /// Serializes the header to bytes for signing purposes i.e. without the
    /// signature field
    pub fn signing_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut blk = self.clone();
        blk.signature = None;
        blk.to_bytes()
    }

    /// Attaches the block signature. This is the last step before a producer
    /// freezes the header with [`BlockHeader::new`].
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

impl BlockHeaderBuilder {
    /// Builds the raw header and freezes it.
    pub fn freeze(&self) -> Result<BlockHeader, Error> {
        let raw = self
            .build()
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        BlockHeader::new(raw)
    }
}

/// An immutable [`RawBlockHeader`] with its canonical bytes and identifier
/// computed at construction.
///
/// Two headers are equal iff their identifiers are equal.
#[derive(Clone, Debug)]
pub struct BlockHeader {
    raw: RawBlockHeader,
    cid: Cid,
    bytes: Arc<[u8]>,
}

/// Largest parent weight magnitude, in bits, that fits the encoding. The
/// wire form is a sign byte followed by the big-endian magnitude, at most
/// [`MAX_BIGINT_SIZE`] bytes in total.
pub const MAX_WEIGHT_BITS: u64 = (MAX_BIGINT_SIZE as u64 - 1) * 8;

impl BlockHeader {
    /// Fails with [`Error::InvalidHeader`] if the parent weight is negative
    /// or wider than [`MAX_WEIGHT_BITS`].
    pub fn new(raw: RawBlockHeader) -> Result<Self, Error> {
        if raw.weight.is_negative() {
            return Err(Error::InvalidHeader(format!(
                "negative parent weight {}",
                raw.weight
            )));
        }
        if raw.weight.bits() > MAX_WEIGHT_BITS {
            return Err(Error::InvalidHeader(format!(
                "parent weight of {} bits exceeds {MAX_WEIGHT_BITS}",
                raw.weight.bits()
            )));
        }
        let bytes = raw.to_bytes()?;
        Ok(Self {
            cid: cid_of(&bytes),
            bytes: bytes.into(),
            raw,
        })
    }

    /// Decodes a header received from the network or read from disk.
    ///
    /// Fails if the bytes are not exactly the canonical encoding of the
    /// decoded header, so that a logical block has a single identifier.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let raw = fvm_ipld_encoding::from_slice::<RawBlockHeader>(bytes)?;
        let header = Self::new(raw)?;
        if header.bytes() != bytes {
            return Err(Error::Encoding(format!(
                "non-canonical block header encoding for {}",
                header.cid
            )));
        }
        Ok(header)
    }

    /// Returns [`None`] if the blockstore doesn't contain the CID.
    pub fn load(store: &impl Blockstore, cid: Cid) -> anyhow::Result<Option<Self>> {
        let Some(bytes) = store.get(&cid)? else {
            return Ok(None);
        };
        let header = Self::decode(&bytes).with_context(|| format!("block header {cid}"))?;
        anyhow::ensure!(
            header.cid == cid,
            "block header stored under {cid} hashes to {}",
            header.cid
        );
        Ok(Some(header))
    }

    /// Writes the canonical bytes under the header's identifier.
    pub fn persist(&self, store: &impl Blockstore) -> anyhow::Result<()> {
        store.put_keyed(&self.cid, &self.bytes)
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The canonical encoding the identifier was derived from.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn raw(&self) -> &RawBlockHeader {
        &self.raw
    }

    pub fn into_raw(self) -> RawBlockHeader {
        self.raw
    }
}

impl Deref for BlockHeader {
    type Target = RawBlockHeader;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid
    }
}

impl Eq for BlockHeader {}

impl std::hash::Hash for BlockHeader {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.cid, state)
    }
}

impl TryFrom<RawBlockHeader> for BlockHeader {
    type Error = Error;

    fn try_from(raw: RawBlockHeader) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<BlockHeader> for RawBlockHeader {
    fn from(value: BlockHeader) -> Self {
        value.into_raw()
    }
}

impl Serialize for BlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawBlockHeader::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
