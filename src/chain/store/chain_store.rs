// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{sync::Arc, time::Duration};

use crate::blocks::{ChainEpoch, Tipset, TipsetKey};
use crate::chain::fork_choice;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use hashlink::LruCache;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::{self, Receiver as Subscriber, Sender as Publisher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    ChainStoreConfig, Error, TipsetMetadata,
    index::{ChainIndex, ResolveNullTipset, WalkLimit},
};
use crate::db::setting_keys::{GENESIS_KEY, HEAD_KEY, TIPSET_METADATA_PREFIX};
use crate::db::{SettingsStore, SettingsStoreExt};

/// Head change notification. Sent every time the head pointer moves.
#[derive(Clone, Debug)]
pub struct HeadChange {
    pub new_head: Arc<Tipset>,
    /// Most recent tipset shared by the previous and the new head.
    pub ancestor: Arc<Tipset>,
    /// Tipsets leaving the canonical chain, newest first.
    pub reverted: Vec<Arc<Tipset>>,
    /// Tipsets joining the canonical chain, oldest first. Ends with `new_head`.
    pub applied: Vec<Arc<Tipset>>,
}

impl HeadChange {
    /// Returns `true` if the head moved off its previous chain.
    pub fn is_reorg(&self) -> bool {
        !self.reverted.is_empty()
    }
}

/// Read-only view of the chain, as consumed by services that never mutate it.
pub trait ChainReader {
    fn head(&self) -> Arc<Tipset>;
    fn genesis_key(&self) -> TipsetKey;
    fn get_tipset(&self, key: &TipsetKey) -> Result<Arc<Tipset>, Error>;
    fn get_tipset_state_root(&self, key: &TipsetKey) -> Result<Cid, Error>;
    fn get_tipset_receipts_root(&self, key: &TipsetKey) -> Result<Cid, Error>;
}

/// Stores validated tipset metadata and tracks the head tipset. This structure
/// is thread-safe: mutations are serialized through a single writer lock while
/// reads only take short-lived read locks, so a consistent `ChainStore` can be
/// shared across tasks.
pub struct ChainStore<DB> {
    /// Publisher for head change events
    publisher: Publisher<HeadChange>,

    /// key-value `datastore`.
    db: Arc<DB>,

    /// Used as a cache for tipset `lookbacks`.
    chain_index: Arc<ChainIndex<Arc<DB>>>,

    genesis: Arc<Tipset>,

    head: RwLock<Arc<Tipset>>,

    /// Bounded write-through cache of the metadata persisted in the settings
    /// store.
    metadata: Mutex<LruCache<TipsetKey, TipsetMetadata>>,

    /// Serializes every mutation.
    writer: Mutex<()>,

    walk_timeout: Option<Duration>,
}

impl<DB> ChainStore<DB>
where
    DB: Blockstore + SettingsStore,
{
    /// Records the genesis tipset headers and metadata. Must be called once
    /// on an empty database before [`ChainStore::new`].
    pub fn initialize_genesis(
        db: &DB,
        genesis: &Tipset,
        state_root: Cid,
        receipts_root: Cid,
    ) -> Result<(), Error> {
        if let Some(recorded) = db.read_obj::<TipsetKey>(GENESIS_KEY)?
            && &recorded != genesis.key()
        {
            return Err(Error::Other(format!(
                "database already initialized with genesis {recorded}"
            )));
        }
        genesis.persist(db)?;
        put_metadata(
            db,
            genesis.key(),
            TipsetMetadata {
                tipset_state_root: state_root,
                tipset_receipts_root: receipts_root,
            },
        )?;
        db.write_obj(GENESIS_KEY, genesis.key())?;
        info!(
            "Initialized genesis {} (EPOCH = {})",
            genesis.key(),
            genesis.epoch()
        );
        Ok(())
    }

    /// Opens the store. Genesis headers and metadata must already be recorded,
    /// see [`ChainStore::initialize_genesis`]. The head resumes from the
    /// settings store if it points to a recorded tipset, and falls back to
    /// genesis otherwise.
    pub fn new(
        db: Arc<DB>,
        config: &ChainStoreConfig,
        genesis_key: &TipsetKey,
    ) -> Result<Self, Error> {
        let (publisher, _) = broadcast::channel(config.head_change_capacity.get());
        let chain_index = Arc::new(ChainIndex::new(
            Arc::clone(&db),
            config.tipset_cache_size,
        ));

        let genesis = chain_index
            .load_tipset(genesis_key)
            .map_err(|e| Error::NotFound(format!("genesis tipset: {e}")))?;
        let Some(genesis_meta) = read_metadata(db.as_ref(), genesis_key)? else {
            return Err(Error::NotFound(format!(
                "no metadata recorded for genesis {genesis_key}"
            )));
        };
        if let Some(recorded) = db.read_obj::<TipsetKey>(GENESIS_KEY)?
            && &recorded != genesis_key
        {
            return Err(Error::Other(format!(
                "genesis mismatch: database has {recorded}, expected {genesis_key}"
            )));
        }

        let mut metadata = LruCache::new(config.tipset_cache_size.get());
        metadata.insert(genesis_key.clone(), genesis_meta);

        let head = match db.read_obj::<TipsetKey>(HEAD_KEY)? {
            Some(key) if read_metadata(db.as_ref(), &key)?.is_some() => {
                match chain_index.load_tipset(&key) {
                    Ok(head) => head,
                    Err(e) => {
                        warn!("failed to load persisted head {key}, falling back to genesis: {e}");
                        genesis.clone()
                    }
                }
            }
            _ => genesis.clone(),
        };
        if head.key() == genesis.key() {
            db.write_obj(HEAD_KEY, genesis.key())?;
        }
        info!("Chain head at {} (EPOCH = {})", head.key(), head.epoch());

        Ok(Self {
            publisher,
            db,
            chain_index,
            genesis,
            head: RwLock::new(head),
            metadata: Mutex::new(metadata),
            writer: Mutex::new(()),
            walk_timeout: config.ancestry_walk_timeout(),
        })
    }

    /// Records the execution result of a fully validated tipset, writing its
    /// headers to the blockstore.
    ///
    /// Recording identical roots twice is a no-op. Recording different roots
    /// for the same key fails with [`Error::InconsistentState`] and leaves the
    /// recorded value untouched.
    pub fn put_tipset_metadata(
        &self,
        tipset: &Tipset,
        state_root: Cid,
        receipts_root: Cid,
    ) -> Result<(), Error> {
        tipset.persist(self.db.as_ref())?;
        let proposed = TipsetMetadata {
            tipset_state_root: state_root,
            tipset_receipts_root: receipts_root,
        };

        let _writer = self.writer.lock();
        if let Some(recorded) = self.metadata(tipset.key())? {
            if recorded == proposed {
                debug!("metadata for tipset {} already recorded", tipset.key());
                return Ok(());
            }
            error!(
                "conflicting metadata for tipset {}: recorded {recorded:?}, proposed {proposed:?}",
                tipset.key()
            );
            return Err(Error::InconsistentState {
                key: tipset.key().clone(),
                recorded,
                proposed,
            });
        }
        put_metadata(self.db.as_ref(), tipset.key(), proposed)?;
        self.metadata.lock().insert(tipset.key().clone(), proposed);
        debug!(
            "recorded metadata for tipset {} (EPOCH = {})",
            tipset.key(),
            tipset.epoch()
        );
        Ok(())
    }

    /// Moves the head to `tipset`, persists its key under
    /// [`crate::db::setting_keys::HEAD_KEY`] and notifies subscribers.
    ///
    /// Fails with [`Error::UnknownTipset`] unless metadata for the tipset is
    /// recorded. Computing the reverted and applied segments loads every
    /// tipset back to the common ancestor, so a recorded tipset whose
    /// ancestors are missing from the blockstore fails with
    /// [`Error::NotFound`], and one that shares no ancestor with the head
    /// fails with [`Error::Other`]. The head is unchanged on failure.
    ///
    /// Fork choice is not consulted, see [`ChainStore::update_heaviest`].
    pub fn set_head(&self, tipset: Arc<Tipset>) -> Result<(), Error> {
        let _writer = self.writer.lock();
        self.set_head_locked(tipset)
    }

    /// Moves the head to `tipset` only if it is heavier than the current head.
    /// Returns whether the head moved.
    pub fn update_heaviest(&self, tipset: Arc<Tipset>) -> Result<bool, Error> {
        let _writer = self.writer.lock();
        let head = self.heaviest_tipset();
        if !fork_choice::heavier(&tipset, &head) {
            debug!(
                "tipset {} (EPOCH = {}) is not heavier than head {}",
                tipset.key(),
                tipset.epoch(),
                head.key()
            );
            return Ok(false);
        }
        self.set_head_locked(tipset)?;
        Ok(true)
    }

    // Caller holds the writer lock.
    fn set_head_locked(&self, tipset: Arc<Tipset>) -> Result<(), Error> {
        if !self.has_tipset_metadata(tipset.key())? {
            return Err(Error::UnknownTipset(tipset.key().clone()));
        }
        let old = self.heaviest_tipset();
        if old.key() == tipset.key() {
            debug!("tipset {} is already the head", tipset.key());
            return Ok(());
        }

        let change = self.head_change(&old, tipset)?;
        self.db.write_obj(HEAD_KEY, change.new_head.key())?;
        *self.head.write() = change.new_head.clone();

        if change.is_reorg() {
            warn!(
                "Reorg: reverted {} tipsets to common ancestor {} (EPOCH = {})",
                change.reverted.len(),
                change.ancestor.key(),
                change.ancestor.epoch()
            );
        }
        info!(
            "New head {} (EPOCH = {})",
            change.new_head.key(),
            change.new_head.epoch()
        );
        if self.publisher.send(change).is_err() {
            debug!("did not publish head change, no active receivers");
        }
        Ok(())
    }

    /// Computes the reverted and applied segments between two heads.
    fn head_change(&self, old: &Arc<Tipset>, new: Arc<Tipset>) -> Result<HeadChange, Error> {
        let limit = WalkLimit::new(CancellationToken::new(), self.walk_timeout);
        let mut reverted = Vec::new();
        let mut applied = Vec::new();
        let mut left = old.clone();
        let mut right = new.clone();
        while left.key() != right.key() {
            limit.check()?;
            if left.epoch() >= right.epoch() {
                let parent = self.parent_of(&left)?;
                reverted.push(std::mem::replace(&mut left, parent));
            } else {
                let parent = self.parent_of(&right)?;
                applied.push(std::mem::replace(&mut right, parent));
            }
        }
        applied.reverse();
        Ok(HeadChange {
            new_head: new,
            ancestor: left,
            reverted,
            applied,
        })
    }

    fn parent_of(&self, tipset: &Tipset) -> Result<Arc<Tipset>, Error> {
        if tipset.parents().is_empty() {
            return Err(Error::Other(format!(
                "tipset {} shares no ancestor with the current chain",
                tipset.key()
            )));
        }
        self.chain_index.load_tipset(tipset.parents())
    }

    /// Returns the genesis tipset.
    pub fn genesis(&self) -> &Arc<Tipset> {
        &self.genesis
    }

    /// Returns the current head tipset.
    pub fn heaviest_tipset(&self) -> Arc<Tipset> {
        self.head.read().clone()
    }

    /// Subscribes to head changes. Events sent before subscribing are not
    /// replayed.
    pub fn subscribe(&self) -> Subscriber<HeadChange> {
        self.publisher.subscribe()
    }

    /// Returns key-value store instance.
    pub fn blockstore(&self) -> &Arc<DB> {
        &self.db
    }

    pub fn chain_index(&self) -> &Arc<ChainIndex<Arc<DB>>> {
        &self.chain_index
    }

    /// Returns the tipset with the given key, loading its headers from the
    /// blockstore.
    #[tracing::instrument(skip_all)]
    pub fn load_tipset(&self, key: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        self.chain_index.load_tipset(key)
    }

    fn metadata(&self, key: &TipsetKey) -> Result<Option<TipsetMetadata>, Error> {
        if let Some(meta) = self.metadata.lock().get(key) {
            return Ok(Some(*meta));
        }
        let meta = read_metadata(self.db.as_ref(), key)?;
        if let Some(meta) = meta {
            // metadata is write-once, caching a persisted value is always safe
            self.metadata.lock().insert(key.clone(), meta);
        }
        Ok(meta)
    }

    fn require_metadata(&self, key: &TipsetKey) -> Result<TipsetMetadata, Error> {
        self.metadata(key)?
            .ok_or_else(|| Error::NotFound(format!("no metadata recorded for tipset {key}")))
    }

    /// Returns `true` if the tipset has been validated and its metadata
    /// recorded.
    pub fn has_tipset_metadata(&self, key: &TipsetKey) -> Result<bool, Error> {
        Ok(self.metadata(key)?.is_some())
    }

    /// Returns `true` if every header of the tipset is in the blockstore,
    /// whether or not the tipset has been validated.
    pub fn contains_tipset(&self, key: &TipsetKey) -> Result<bool, Error> {
        if key.is_empty() {
            return Ok(false);
        }
        for cid in key.cids() {
            if !self.db.has(cid)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn tipset_state_root(&self, key: &TipsetKey) -> Result<Cid, Error> {
        Ok(self.require_metadata(key)?.tipset_state_root)
    }

    pub fn tipset_receipts_root(&self, key: &TipsetKey) -> Result<Cid, Error> {
        Ok(self.require_metadata(key)?.tipset_receipts_root)
    }

    /// Walks back from `key` to the ancestor at `height` and returns it with
    /// its recorded state root.
    ///
    /// Fails with [`Error::NotFound`] if the chain ends, skips `height` (null
    /// round), or reaches an ancestor that has not been validated yet. Use
    /// [`ChainStore::has_tipset_metadata`] to tell the cases apart. Fails with
    /// [`Error::Cancelled`] once `cancel` fires or the configured deadline
    /// passes.
    pub fn get_tipset_and_state(
        &self,
        key: &TipsetKey,
        height: ChainEpoch,
        cancel: &CancellationToken,
    ) -> Result<(Arc<Tipset>, Cid), Error> {
        let from = self.load_tipset(key)?;
        let limit = WalkLimit::new(cancel.clone(), self.walk_timeout);
        let ancestor =
            self.chain_index
                .tipset_by_height(height, from, ResolveNullTipset::Fail, &limit)?;
        let state_root = self.tipset_state_root(ancestor.key())?;
        Ok((ancestor, state_root))
    }
}

impl<DB> ChainReader for ChainStore<DB>
where
    DB: Blockstore + SettingsStore,
{
    fn head(&self) -> Arc<Tipset> {
        self.heaviest_tipset()
    }

    fn genesis_key(&self) -> TipsetKey {
        self.genesis.key().clone()
    }

    fn get_tipset(&self, key: &TipsetKey) -> Result<Arc<Tipset>, Error> {
        self.load_tipset(key)
    }

    fn get_tipset_state_root(&self, key: &TipsetKey) -> Result<Cid, Error> {
        self.tipset_state_root(key)
    }

    fn get_tipset_receipts_root(&self, key: &TipsetKey) -> Result<Cid, Error> {
        self.tipset_receipts_root(key)
    }
}

fn metadata_key(key: &TipsetKey) -> String {
    format!("{TIPSET_METADATA_PREFIX}{}", key.canonical_string())
}

fn read_metadata(
    db: &impl SettingsStore,
    key: &TipsetKey,
) -> Result<Option<TipsetMetadata>, Error> {
    Ok(db.read_obj(&metadata_key(key))?)
}

/// Write-once insert shared by genesis initialization and the store.
fn put_metadata(
    db: &impl SettingsStore,
    key: &TipsetKey,
    proposed: TipsetMetadata,
) -> Result<(), Error> {
    match read_metadata(db, key)? {
        Some(recorded) if recorded == proposed => Ok(()),
        Some(recorded) => Err(Error::InconsistentState {
            key: key.clone(),
            recorded,
            proposed,
        }),
        None => Ok(db.write_obj(&metadata_key(key), &proposed)?),
    }
}
