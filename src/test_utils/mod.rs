// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::atomic::{AtomicU64, Ordering};

use crate::blocks::{ChainEpoch, RawBlockHeader, Ticket, Tipset, VRFProof};
use crate::utils::cid::cid_of;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_shared4::address::Address;
use num::BigInt;

pub fn genesis_tipset(db: &impl Blockstore) -> Tipset {
    let genesis = Tipset::from(
        RawBlockHeader::builder()
            .miner_address(Address::new_id(0))
            .freeze()
            .unwrap(),
    );
    genesis.persist(db).unwrap();
    genesis
}

/// Builds and persists a single-block child of `parent`, one unit heavier.
pub fn tipset_child(db: &impl Blockstore, parent: &Tipset, epoch: ChainEpoch) -> Tipset {
    tipset_with_weight(db, parent, epoch, parent.weight() + 1u32)
}

/// Builds and persists a single-block child of `parent`. Every call yields a
/// distinct block.
pub fn tipset_with_weight(
    db: &impl Blockstore,
    parent: &Tipset,
    epoch: ChainEpoch,
    weight: impl Into<BigInt>,
) -> Tipset {
    // Use a static counter to give all tipsets a unique timestamp
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tipset = Tipset::from(
        RawBlockHeader::builder()
            .miner_address(Address::new_id(1000 + n))
            .ticket(Ticket::new(VRFProof::new(n.to_be_bytes().to_vec())))
            .parents(parent.key().clone())
            .weight(weight.into())
            .epoch(epoch)
            .timestamp(n)
            .freeze()
            .unwrap(),
    );
    tipset.persist(db).unwrap();
    tipset
}

/// Deterministic state and receipts roots for a tipset.
pub fn roots(tipset: &Tipset) -> (Cid, Cid) {
    let key = tipset.key().to_bytes();
    (
        cid_of(&[b"state:".as_slice(), &key].concat()),
        cid_of(&[b"receipts:".as_slice(), &key].concat()),
    )
}

/// Returns `(smaller, larger)` by canonical key encoding.
pub fn by_key(a: Tipset, b: Tipset) -> (Tipset, Tipset) {
    match a.key().to_bytes() < b.key().to_bytes() {
        true => (a, b),
        false => (b, a),
    }
}
