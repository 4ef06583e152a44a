// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks::VRFProof;
use fvm_ipld_encoding::tuple::*;

/// Proofs generated by a miner which determines the reward they earn.
/// This is generated from hashing a partial ticket and using the hash to
/// generate a value.
#[derive(
    Clone, Debug, PartialEq, Eq, Default, Serialize_tuple, Deserialize_tuple, Hash, PartialOrd, Ord,
)]
pub struct ElectionProof {
    /// Number of election wins the miner claims for this epoch.
    pub win_count: i64,
    pub vrfproof: VRFProof,
}

#[cfg(test)]
impl quickcheck::Arbitrary for ElectionProof {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self {
            win_count: quickcheck::Arbitrary::arbitrary(g),
            vrfproof: quickcheck::Arbitrary::arbitrary(g),
        }
    }
}
