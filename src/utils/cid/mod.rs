// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::DAG_CBOR;
use multihash_codetable::{Code, MultihashDigest as _};

/// Codec tag of every identifier derived by this crate.
pub const CID_CODEC: u64 = DAG_CBOR;

/// Hash function of every identifier derived by this crate. Changing it
/// changes every block identifier on the network.
pub const CID_HASH: Code = Code::Blake2b256;

/// Derives the content identifier of an already encoded payload.
///
/// This matches [`abi.CidBuilder`](https://github.com/filecoin-project/go-state-types/blob/master/abi/cid.go#L49) in go:
/// version 1, `dag-cbor` codec, 256 bit BLAKE2b.
pub fn cid_of(bytes: &[u8]) -> Cid {
    Cid::new_v1(CID_CODEC, CID_HASH.digest(bytes))
}

/// Extension methods for constructing `dag-cbor` [Cid]
pub trait CidCborExt {
    /// Encodes `obj` as DAG-CBOR and returns the identifier of the encoding
    /// together with the bytes it was derived from.
    fn from_cbor_blake2b256<S: serde::ser::Serialize>(
        obj: &S,
    ) -> Result<(Cid, Vec<u8>), fvm_ipld_encoding::Error> {
        let bytes = fvm_ipld_encoding::to_vec(obj)?;
        Ok((cid_of(&bytes), bytes))
    }
}

impl CidCborExt for Cid {}
