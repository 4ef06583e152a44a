// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::blocks::{ChainEpoch, Tipset, TipsetKey};
use fvm_ipld_blockstore::Blockstore;
use hashlink::LruCache;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::chain::Error;

type TipsetCache = Mutex<LruCache<TipsetKey, Arc<Tipset>>>;

/// Keeps recently loaded tipsets in cache and can be used to look back at the
/// chain to retrieve an old tipset.
pub struct ChainIndex<DB> {
    /// `Arc` reference tipset cache.
    ts_cache: TipsetCache,

    /// `Blockstore` pointer needed to load tipsets from cold storage.
    db: DB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Methods for resolving fetches of null tipsets.
/// Imagine epoch 10 is null but epoch 9 and 11 exist. If epoch we request epoch
/// 10, should 9 or 11 be returned?
pub enum ResolveNullTipset {
    TakeNewer,
    TakeOlder,
    /// Fail with [`Error::NotFound`].
    Fail,
}

/// Bounds an ancestry walk by a cancellation signal and an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct WalkLimit {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl WalkLimit {
    pub fn new(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
        }
    }

    /// Fails with [`Error::Cancelled`] once the token is cancelled or the
    /// deadline has passed.
    pub fn check(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled("ancestry walk cancelled".into()));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::Cancelled("ancestry walk deadline exceeded".into()));
        }
        Ok(())
    }
}

impl<DB: Blockstore> ChainIndex<DB> {
    pub fn new(db: DB, cache_size: NonZeroUsize) -> Self {
        let ts_cache = Mutex::new(LruCache::new(cache_size.get()));
        Self { ts_cache, db }
    }

    /// Loads a tipset from memory given the tipset keys and cache. Semantically
    /// identical to [`Tipset::load`] but the result is cached.
    pub fn load_tipset(&self, tsk: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        if let Some(ts) = self.ts_cache.lock().get(tsk) {
            trace!("tipset cache hit: {tsk}");
            return Ok(ts.clone());
        }

        let ts = Arc::new(
            Tipset::load(&self.db, tsk)?
                .ok_or_else(|| Error::NotFound(format!("tipset {tsk}")))?,
        );
        self.ts_cache.lock().insert(tsk.clone(), ts.clone());
        Ok(ts)
    }

    /// Find tipset at epoch `to` in the chain of ancestors starting at `from`.
    /// If the tipset is _not_ in the chain of ancestors (i.e., if the `to`
    /// epoch is higher than `from.epoch()`, or the chain ends first), an
    /// [`Error::NotFound`] will be returned.
    ///
    /// # Why pass in the `from` argument?
    ///
    /// Imagine the database contains five tipsets and a genesis block in this
    /// configuration:
    ///
    /// ```text
    ///           ┌───────┐  ┌────────┐  ┌────────┐
    /// Genesis◄──┤Epoch 1◄──┤Epoch 2A◄──┤Epoch 3A│
    ///           └───▲───┘  └────────┘  └────────┘
    ///               │      ┌────────┐  ┌────────┐
    ///               └──────┤Epoch 2B◄──┤Epoch 3B│
    ///                      └────────┘  └────────┘
    /// ```
    ///
    /// Here we have a fork in the chain and it is ambiguous which tipset to
    /// load when epoch 2 is requested. The ambiguity is solved by passing in a
    /// younger tipset (higher epoch) from which has the desired tipset as an
    /// ancestor.
    /// Calling `tipset_by_height(2, epoch_3a)` will return `Epoch 2A`.
    /// Calling `tipset_by_height(2, epoch_3b)` will return `Epoch 2B`.
    ///
    /// # What happens when a null tipset is requested?
    ///
    /// ```text
    ///           ┌───────┐          ┌───────┐  ┌───────┐
    /// Genesis◄──┤Epoch 1│   Null   │Epoch 3◄──┤Epoch 4│
    ///           └───▲───┘          └───┬───┘  └───────┘
    ///               │                  │
    ///               └──────────────────┘
    /// ```
    /// If the requested epoch points to a null tipset, there are three options:
    /// Pick the nearest older tipset, pick the nearest younger tipset, or fail.
    /// Requesting epoch 2 with [`ResolveNullTipset::TakeNewer`] will return
    /// epoch 3. Requesting with [`ResolveNullTipset::TakeOlder`] will return
    /// epoch 1. [`ResolveNullTipset::Fail`] returns [`Error::NotFound`].
    ///
    /// The walk checks `limit` before every step.
    pub fn tipset_by_height(
        &self,
        to: ChainEpoch,
        from: Arc<Tipset>,
        resolve: ResolveNullTipset,
        limit: &WalkLimit,
    ) -> Result<Arc<Tipset>, Error> {
        if to > from.epoch() {
            return Err(Error::NotFound(format!(
                "height {to} is above start point {} at height {}",
                from.key(),
                from.epoch()
            )));
        }

        let mut child = from;
        loop {
            limit.check()?;
            if to == child.epoch() {
                return Ok(child);
            }
            if child.parents().is_empty() {
                return Err(Error::NotFound(format!(
                    "chain ends at height {} before reaching height {to}",
                    child.epoch()
                )));
            }
            let parent = self.load_tipset(child.parents())?;
            if parent.epoch() >= child.epoch() {
                return Err(Error::Other(format!(
                    "parent {} at height {} is not below child {} at height {}",
                    parent.key(),
                    parent.epoch(),
                    child.key(),
                    child.epoch()
                )));
            }
            if to > parent.epoch() {
                // We're at a point where child.epoch() > x > parent.epoch().
                return match resolve {
                    ResolveNullTipset::TakeOlder => Ok(parent),
                    ResolveNullTipset::TakeNewer => Ok(child),
                    ResolveNullTipset::Fail => Err(Error::NotFound(format!(
                        "height {to} is a null round between {} and {}",
                        parent.epoch(),
                        child.epoch()
                    ))),
                };
            }
            child = parent;
        }
    }

    /// Iterate from the given tipset to genesis. Missing tipsets cut the chain
    /// short. Semantically identical to walking [`Tipset::parents`] but the
    /// results are cached.
    pub fn chain(&self, from: Arc<Tipset>) -> impl Iterator<Item = Arc<Tipset>> + '_ {
        std::iter::successors(Some(from), move |child| {
            self.load_tipset(child.parents()).ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDB;
    use crate::test_utils::{genesis_tipset, tipset_child};
    use itertools::Itertools as _;
    use nonzero_ext::nonzero;

    fn index(db: Arc<MemoryDB>) -> ChainIndex<Arc<MemoryDB>> {
        ChainIndex::new(db, nonzero!(16usize))
    }

    #[test]
    fn get_null_tipset() {
        let db = Arc::new(MemoryDB::default());
        let genesis = genesis_tipset(&db);
        let epoch1 = tipset_child(&db, &genesis, 1);
        let epoch3 = tipset_child(&db, &epoch1, 3);
        let epoch4 = tipset_child(&db, &epoch3, 4);

        let index = index(db);
        let limit = WalkLimit::default();
        // epoch 2 is null. ResolveNullTipset decided whether to return epoch 1 or epoch 3
        assert_eq!(
            index
                .tipset_by_height(
                    2,
                    Arc::new(epoch4.clone()),
                    ResolveNullTipset::TakeOlder,
                    &limit
                )
                .unwrap()
                .as_ref(),
            &epoch1
        );

        assert_eq!(
            index
                .tipset_by_height(
                    2,
                    Arc::new(epoch4.clone()),
                    ResolveNullTipset::TakeNewer,
                    &limit
                )
                .unwrap()
                .as_ref(),
            &epoch3
        );

        assert!(matches!(
            index.tipset_by_height(2, Arc::new(epoch4), ResolveNullTipset::Fail, &limit),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn get_different_branches() {
        let db = Arc::new(MemoryDB::default());
        let genesis = genesis_tipset(&db);
        let epoch1 = tipset_child(&db, &genesis, 1);

        let epoch2a = tipset_child(&db, &epoch1, 2);
        let epoch3a = tipset_child(&db, &epoch2a, 3);

        let epoch2b = tipset_child(&db, &epoch1, 2);
        let epoch3b = tipset_child(&db, &epoch2b, 3);

        let index = index(db);
        let limit = WalkLimit::default();
        // The chain as forked, epoch 2 and 3 are ambiguous
        assert_eq!(
            index
                .tipset_by_height(2, Arc::new(epoch3a), ResolveNullTipset::Fail, &limit)
                .unwrap()
                .as_ref(),
            &epoch2a
        );

        assert_eq!(
            index
                .tipset_by_height(2, Arc::new(epoch3b), ResolveNullTipset::Fail, &limit)
                .unwrap()
                .as_ref(),
            &epoch2b
        );
    }

    #[test]
    fn height_above_start_not_found() {
        let db = Arc::new(MemoryDB::default());
        let genesis = genesis_tipset(&db);
        let epoch1 = tipset_child(&db, &genesis, 1);
        let result = index(db).tipset_by_height(
            5,
            Arc::new(epoch1),
            ResolveNullTipset::TakeOlder,
            &WalkLimit::default(),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn missing_parent_not_found() {
        let db = Arc::new(MemoryDB::default());
        let orphan_parent = genesis_tipset(&MemoryDB::default());
        let orphan = tipset_child(&db, &orphan_parent, 1);
        let result = index(db).tipset_by_height(
            0,
            Arc::new(orphan),
            ResolveNullTipset::Fail,
            &WalkLimit::default(),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn cancelled_walk() {
        let db = Arc::new(MemoryDB::default());
        let genesis = genesis_tipset(&db);
        let epoch1 = tipset_child(&db, &genesis, 1);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = index(db.clone()).tipset_by_height(
            0,
            Arc::new(epoch1.clone()),
            ResolveNullTipset::Fail,
            &WalkLimit::new(cancel, None),
        );
        assert!(matches!(result, Err(Error::Cancelled(_))));

        let expired = WalkLimit::new(CancellationToken::new(), Some(Duration::ZERO));
        let result =
            index(db).tipset_by_height(0, Arc::new(epoch1), ResolveNullTipset::Fail, &expired);
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }

    #[test]
    fn chain_to_genesis() {
        let db = Arc::new(MemoryDB::default());
        let genesis = genesis_tipset(&db);
        let epoch1 = tipset_child(&db, &genesis, 1);
        let epoch2 = tipset_child(&db, &epoch1, 2);

        let index = index(db);
        let epochs = index
            .chain(Arc::new(epoch2))
            .map(|ts| ts.epoch())
            .collect_vec();
        assert_eq!(epochs, vec![2, 1, 0]);
        // second walk is served from the cache
        assert_eq!(index.load_tipset(epoch1.key()).unwrap().as_ref(), &epoch1);
    }
}
