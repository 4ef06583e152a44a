// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{fmt, sync::Arc};

use super::{BlockHeader, ChainEpoch, Error};
use ahash::HashSet;
use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use itertools::Itertools as _;
use num::BigInt;
use serde::{Deserialize, Serialize};

/// A set of CIDs forming a unique key for a Tipset.
///
/// Members are unique and sorted by their byte representation, so equal sets
/// always produce equal keys and identical encodings. The empty key is the
/// "no tipset" sentinel, used as the parents of a genesis block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TipsetKey {
    cids: Vec<Cid>,
}

impl TipsetKey {
    /// Builds a key from block identifiers, removing duplicates.
    ///
    /// Fails on an empty input, use [`TipsetKey::empty`] for the sentinel.
    pub fn new(cids: impl IntoIterator<Item = Cid>) -> Result<Self, Error> {
        let key = Self::canonicalize(cids);
        if key.is_empty() {
            return Err(Error::NoBlocks);
        }
        Ok(key)
    }

    /// The "no tipset" key.
    pub fn empty() -> Self {
        Self::default()
    }

    fn canonicalize(cids: impl IntoIterator<Item = Cid>) -> Self {
        let mut cids = cids.into_iter().unique().collect_vec();
        cids.sort_by_cached_key(|cid| cid.to_bytes());
        Self { cids }
    }

    pub fn is_empty(&self) -> bool {
        self.cids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cids.len()
    }

    /// Members in canonical order.
    pub fn cids(&self) -> &[Cid] {
        &self.cids
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.cids.contains(cid)
    }

    /// Concatenation of the member identifiers' bytes in canonical order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cids.iter().flat_map(|cid| cid.to_bytes()).collect()
    }

    /// Concatenation of the member identifiers' textual forms in canonical
    /// order, suitable as a stable index key.
    pub fn canonical_string(&self) -> String {
        self.cids.iter().map(Cid::to_string).collect()
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.cids.iter().join(", "))
    }
}

impl Serialize for TipsetKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.cids.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TipsetKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<Cid>::deserialize(deserializer).map(Self::canonicalize)
    }
}

/// An immutable set of blocks at the same height with the same parent set.
/// Blocks in a tipset are canonically ordered by identifier.
#[derive(Clone, Debug)]
pub struct Tipset {
    headers: Arc<Vec<BlockHeader>>,
    key: TipsetKey,
}

impl From<BlockHeader> for Tipset {
    fn from(header: BlockHeader) -> Self {
        Self {
            key: TipsetKey {
                cids: vec![*header.cid()],
            },
            headers: Arc::new(vec![header]),
        }
    }
}

impl PartialEq for Tipset {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Tipset {}

impl std::hash::Hash for Tipset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl Tipset {
    /// Builds a new Tipset from a collection of headers.
    /// Duplicate headers are collapsed; the rest must share height, parent
    /// set and parent weight.
    pub fn new(headers: impl IntoIterator<Item = BlockHeader>) -> Result<Self, Error> {
        let mut seen = HashSet::default();
        let mut headers = headers
            .into_iter()
            .filter(|header| seen.insert(*header.cid()))
            .collect_vec();

        let first = headers.first().ok_or(Error::NoBlocks)?;
        for header in headers.iter().skip(1) {
            if header.epoch != first.epoch {
                return Err(Error::InconsistentTipset(format!(
                    "block {} has height {}, block {} has height {}",
                    header.cid(),
                    header.epoch,
                    first.cid(),
                    first.epoch
                )));
            }
            if header.parents != first.parents {
                return Err(Error::InconsistentTipset(format!(
                    "block {} has parents {}, block {} has parents {}",
                    header.cid(),
                    header.parents,
                    first.cid(),
                    first.parents
                )));
            }
            if header.weight != first.weight {
                return Err(Error::InconsistentTipset(format!(
                    "block {} has parent weight {}, block {} has parent weight {}",
                    header.cid(),
                    header.weight,
                    first.cid(),
                    first.weight
                )));
            }
        }

        headers.sort_by_cached_key(|header| header.cid().to_bytes());
        let key = TipsetKey {
            cids: headers.iter().map(|header| *header.cid()).collect(),
        };
        Ok(Self {
            headers: Arc::new(headers),
            key,
        })
    }

    /// Loads a tipset from its block headers. Returns [`None`] if any header is
    /// missing from the store, or if the key is the empty sentinel.
    pub fn load(store: &impl Blockstore, key: &TipsetKey) -> anyhow::Result<Option<Self>> {
        if key.is_empty() {
            return Ok(None);
        }
        let mut headers = Vec::with_capacity(key.len());
        for cid in key.cids() {
            match BlockHeader::load(store, *cid)? {
                Some(header) => headers.push(header),
                None => return Ok(None),
            }
        }
        Ok(Some(Self::new(headers)?))
    }

    /// Same as [`Tipset::load`], but errors if the tipset is missing.
    pub fn load_required(store: &impl Blockstore, key: &TipsetKey) -> anyhow::Result<Self> {
        Self::load(store, key)?.with_context(|| format!("Required tipset missing: key={key}"))
    }

    /// Writes every block header to the store.
    pub fn persist(&self, store: &impl Blockstore) -> anyhow::Result<()> {
        self.headers
            .iter()
            .try_for_each(|header| header.persist(store))
    }

    pub fn key(&self) -> &TipsetKey {
        &self.key
    }

    pub fn cids(&self) -> &[Cid] {
        self.key.cids()
    }

    /// Block headers in canonical key order.
    pub fn block_headers(&self) -> &[BlockHeader] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Always `false`, a tipset cannot be constructed without blocks.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    // construction guarantees at least one header
    #[allow(clippy::indexing_slicing)]
    fn first(&self) -> &BlockHeader {
        &self.headers[0]
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.first().epoch
    }

    pub fn parents(&self) -> &TipsetKey {
        &self.first().parents
    }

    /// The aggregate chain weight of the parent set.
    pub fn weight(&self) -> &BigInt {
        &self.first().weight
    }

    pub fn min_timestamp(&self) -> u64 {
        self.headers
            .iter()
            .map(|header| header.timestamp)
            .min()
            .unwrap_or_default()
    }

    pub fn max_timestamp(&self) -> u64 {
        self.headers
            .iter()
            .map(|header| header.timestamp)
            .max()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{RawBlockHeader, Ticket, VRFProof};
    use crate::utils::cid::cid_of;
    use fvm_shared4::address::Address;

    fn parents() -> TipsetKey {
        TipsetKey::new([cid_of(b"parent")]).unwrap()
    }

    fn header(miner: u64, epoch: ChainEpoch, timestamp: u64) -> BlockHeader {
        RawBlockHeader::builder()
            .miner_address(Address::new_id(miner))
            .ticket(Ticket::new(VRFProof::new(miner.to_be_bytes().to_vec())))
            .parents(parents())
            .weight(10u64)
            .epoch(epoch)
            .timestamp(timestamp)
            .freeze()
            .unwrap()
    }

    #[test]
    fn key_deduplicates_and_sorts() {
        let (a, b, c) = (cid_of(b"a"), cid_of(b"b"), cid_of(b"c"));
        let key = TipsetKey::new([c, a, b, a, c]).unwrap();
        assert_eq!(key.len(), 3);
        assert_eq!(key, TipsetKey::new([b, c, a]).unwrap());
        assert!(key.cids().windows(2).all(|w| w[0].to_bytes() < w[1].to_bytes()));
        assert_eq!(
            key.to_bytes(),
            key.cids().iter().flat_map(|c| c.to_bytes()).collect_vec()
        );
    }

    #[test]
    fn empty_key_is_explicit() {
        assert_eq!(TipsetKey::new([]), Err(Error::NoBlocks));
        let empty = TipsetKey::empty();
        assert!(empty.is_empty());
        assert_ne!(empty, TipsetKey::new([cid_of(b"a")]).unwrap());
        assert_eq!(empty.canonical_string(), "");
    }

    #[test]
    fn key_encoding_is_canonical() {
        let (a, b) = (cid_of(b"a"), cid_of(b"b"));
        let sorted = TipsetKey::new([a, b]).unwrap();
        // decoding a non-canonical list canonicalizes it
        let unsorted = fvm_ipld_encoding::to_vec(&vec![b, a, b]).unwrap();
        let decoded: TipsetKey = fvm_ipld_encoding::from_slice(&unsorted).unwrap();
        assert_eq!(decoded, sorted);
        assert_eq!(
            fvm_ipld_encoding::to_vec(&decoded).unwrap(),
            fvm_ipld_encoding::to_vec(&sorted.cids().to_vec()).unwrap()
        );
    }

    #[test]
    fn empty_tipset() {
        assert_eq!(Tipset::new([]), Err(Error::NoBlocks));
    }

    #[test]
    fn mismatched_heights() {
        let result = Tipset::new([header(1, 5, 0), header(2, 6, 0)]);
        assert!(matches!(result, Err(Error::InconsistentTipset(_))));
    }

    #[test]
    fn mismatched_parents() {
        let other = RawBlockHeader::builder()
            .miner_address(Address::new_id(2))
            .parents(TipsetKey::new([cid_of(b"elsewhere")]).unwrap())
            .epoch(5u64)
            .freeze()
            .unwrap();
        let result = Tipset::new([header(1, 5, 0), other]);
        assert!(matches!(result, Err(Error::InconsistentTipset(_))));
    }

    #[test]
    fn mismatched_weights() {
        let heavy = RawBlockHeader::builder()
            .miner_address(Address::new_id(2))
            .parents(parents())
            .weight(1_000_000u64)
            .epoch(5u64)
            .freeze()
            .unwrap();
        let result = Tipset::new([header(1, 5, 0), heavy]);
        assert!(matches!(result, Err(Error::InconsistentTipset(_))));
    }

    #[test]
    fn duplicates_collapse() {
        let h = header(1, 5, 0);
        let ts = Tipset::new([h.clone(), h.clone(), header(2, 5, 0)]).unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.key().len(), 2);
        assert_eq!(ts.epoch(), 5);
    }

    #[test]
    fn accessors() {
        let (h1, h2, h3) = (header(1, 5, 30), header(2, 5, 10), header(3, 5, 20));
        let ts = Tipset::new([h1.clone(), h2.clone(), h3.clone()]).unwrap();
        assert_eq!(ts.min_timestamp(), 10);
        assert_eq!(ts.max_timestamp(), 30);
        assert_eq!(ts.weight(), &BigInt::from(10));
        assert_eq!(ts.parents(), &parents());
        // canonical order regardless of input order
        let reversed = Tipset::new([h3, h2, h1]).unwrap();
        assert_eq!(ts.block_headers(), reversed.block_headers());
        assert_eq!(
            ts.block_headers().iter().map(|h| *h.cid()).collect_vec(),
            ts.key().cids()
        );
    }

    #[test]
    fn load_round_trip() {
        let db = crate::db::MemoryDB::default();
        let ts = Tipset::new([header(1, 5, 0), header(2, 5, 0)]).unwrap();
        assert!(Tipset::load(&db, ts.key()).unwrap().is_none());
        ts.persist(&db).unwrap();
        assert_eq!(Tipset::load_required(&db, ts.key()).unwrap(), ts);
        assert!(Tipset::load(&db, &TipsetKey::empty()).unwrap().is_none());
    }
}
