// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use cid::Cid;
use forest_chainstore::{
    ChainReader as _, ChainStore, ChainStoreConfig, RawBlockHeader, Tipset, TipsetKey,
    chain::Error, db::MemoryDB, fork_choice, utils::cid::cid_of,
};
use fvm_shared4::address::Address;
use tokio_util::sync::CancellationToken;

fn block(miner: u64, parents: &TipsetKey, epoch: u64, weight: u64) -> Tipset {
    RawBlockHeader::builder()
        .miner_address(Address::new_id(miner))
        .parents(parents.clone())
        .epoch(epoch)
        .weight(weight)
        .timestamp(epoch * 30)
        .freeze()
        .unwrap()
        .into()
}

fn state_root(tipset: &Tipset) -> Cid {
    cid_of(&[b"state".as_slice(), &tipset.key().to_bytes()].concat())
}

fn receipts_root(tipset: &Tipset) -> Cid {
    cid_of(&[b"receipts".as_slice(), &tipset.key().to_bytes()].concat())
}

fn open() -> (ChainStore<MemoryDB>, Tipset) {
    let db = Arc::new(MemoryDB::default());
    let genesis = block(0, &TipsetKey::empty(), 0, 0);
    ChainStore::initialize_genesis(
        db.as_ref(),
        &genesis,
        state_root(&genesis),
        receipts_root(&genesis),
    )
    .unwrap();
    let cs = ChainStore::new(db, &ChainStoreConfig::default(), genesis.key()).unwrap();
    (cs, genesis)
}

fn put(cs: &ChainStore<MemoryDB>, tipset: &Tipset) {
    cs.put_tipset_metadata(tipset, state_root(tipset), receipts_root(tipset))
        .unwrap();
}

#[test]
fn competing_tipset_with_larger_key_does_not_replace_head() {
    let (cs, genesis) = open();
    assert_eq!(cs.head().as_ref(), &genesis);

    let mut candidates = [101, 102].map(|miner| block(miner, genesis.key(), 1, 10));
    candidates.sort_by_key(|ts| ts.key().to_bytes());
    let [m1, m2] = candidates;

    put(&cs, &m1);
    cs.set_head(Arc::new(m1.clone())).unwrap();
    assert_eq!(cs.head().as_ref(), &m1);

    put(&cs, &m2);
    assert!(!fork_choice::heavier(&m2, &cs.head()));
    assert!(!cs.update_heaviest(Arc::new(m2)).unwrap());
    assert_eq!(cs.head().as_ref(), &m1);
}

#[test]
fn ancestor_walk_to_genesis() {
    let (cs, genesis) = open();
    let m1 = block(101, genesis.key(), 1, 10);
    let m2 = block(102, m1.key(), 2, 20);
    put(&cs, &m1);
    put(&cs, &m2);
    let cancel = CancellationToken::new();

    let (ts, root) = cs.get_tipset_and_state(m2.key(), 0, &cancel).unwrap();
    assert_eq!(ts.as_ref(), &genesis);
    assert_eq!(root, state_root(&genesis));

    assert!(matches!(
        cs.get_tipset_and_state(m2.key(), 5, &cancel),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn metadata_is_write_once() {
    let (cs, genesis) = open();
    let m1 = block(101, genesis.key(), 1, 10);
    put(&cs, &m1);
    put(&cs, &m1);
    assert_eq!(cs.get_tipset_state_root(m1.key()).unwrap(), state_root(&m1));
    assert_eq!(
        cs.get_tipset_receipts_root(m1.key()).unwrap(),
        receipts_root(&m1)
    );

    let result = cs.put_tipset_metadata(&m1, cid_of(b"other"), receipts_root(&m1));
    assert!(matches!(result, Err(Error::InconsistentState { .. })));
    assert_eq!(cs.get_tipset_state_root(m1.key()).unwrap(), state_root(&m1));
}

#[test]
fn subscribers_see_head_changes() {
    let (cs, genesis) = open();
    let mut sub = cs.subscribe();
    let m1 = block(101, genesis.key(), 1, 10);

    assert!(matches!(
        cs.set_head(Arc::new(m1.clone())),
        Err(Error::UnknownTipset(_))
    ));
    put(&cs, &m1);
    cs.set_head(Arc::new(m1.clone())).unwrap();

    let change = sub.try_recv().unwrap();
    assert_eq!(change.new_head.as_ref(), &m1);
    assert_eq!(change.ancestor.as_ref(), &genesis);
    assert!(change.reverted.is_empty());
    assert_eq!(cs.get_tipset(m1.key()).unwrap().as_ref(), &m1);
}
