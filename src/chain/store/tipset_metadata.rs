// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::tuple::*;

/// Execution result of a fully validated tipset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_tuple, Deserialize_tuple)]
pub struct TipsetMetadata {
    /// Root of the state tree after applying the tipset's messages.
    pub tipset_state_root: Cid,
    /// Root of the receipts produced applying the tipset's messages.
    pub tipset_receipts_root: Cid,
}
