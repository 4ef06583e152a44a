// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::utils::cid::CidCborExt as _;
use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use serde::{Serialize, de::DeserializeOwned};

/// Generic object store over a [`Blockstore`]. Objects are stored as DAG-CBOR
/// under the identifier of their encoding, using the crate-wide hash function.
pub trait CborStoreExt: Blockstore {
    /// Encodes and stores `obj`, returning its identifier.
    fn put_cbor_default<S: Serialize>(&self, obj: &S) -> anyhow::Result<Cid> {
        let (cid, bytes) = Cid::from_cbor_blake2b256(obj)?;
        self.put_keyed(&cid, &bytes)?;
        Ok(cid)
    }

    /// Returns [`None`] if the store doesn't contain the CID.
    fn get_cbor_default<T: DeserializeOwned>(&self, cid: &Cid) -> anyhow::Result<Option<T>> {
        match self.get(cid)? {
            Some(bytes) => Ok(Some(fvm_ipld_encoding::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Same as [`CborStoreExt::get_cbor_default`], but errors on a missing entry.
    fn get_cbor_required<T: DeserializeOwned>(&self, cid: &Cid) -> anyhow::Result<T> {
        self.get_cbor_default(cid)?
            .with_context(|| format!("Entry not found in block store: cid={cid}"))
    }
}

impl<T: Blockstore> CborStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;

    #[test]
    fn put_get_object() {
        let db = MemoryDB::default();
        let cid = db.put_cbor_default(&(7u64, "state")).unwrap();
        let back: (u64, String) = db.get_cbor_required(&cid).unwrap();
        assert_eq!(back, (7, "state".to_owned()));
        // same object, same identifier
        assert_eq!(db.put_cbor_default(&(7u64, "state")).unwrap(), cid);
    }

    #[test]
    fn missing_object() {
        let db = MemoryDB::default();
        let cid = crate::utils::cid::cid_of(b"absent");
        assert!(db.get_cbor_default::<u64>(&cid).unwrap().is_none());
        assert!(db.get_cbor_required::<u64>(&cid).is_err());
    }
}
