// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::{num::NonZeroUsize, time::Duration};

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Tuning of the chain store. None of these settings affect consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct ChainStoreConfig {
    /// Capacity of the tipset cache backing ancestry walks, and of the
    /// tipset metadata cache.
    #[default(nonzero!(8192usize))]
    pub tipset_cache_size: NonZeroUsize,
    /// Head change events buffered per subscriber before the slowest one
    /// starts lagging.
    #[default(nonzero!(200usize))]
    pub head_change_capacity: NonZeroUsize,
    /// Deadline applied to every ancestry walk. Absent means unbounded.
    #[default(Some(30))]
    pub ancestry_walk_timeout_secs: Option<u64>,
}

impl ChainStoreConfig {
    pub fn ancestry_walk_timeout(&self) -> Option<Duration> {
        self.ancestry_walk_timeout_secs.map(Duration::from_secs)
    }
}
