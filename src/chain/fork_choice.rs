// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Head selection among competing tipsets.
//!
//! Tipsets are ranked by parent weight. Equal weights are broken by the
//! canonical key encoding, the lexicographically smaller key winning, so every
//! node ranks the same pair identically whatever the order it saw them in.
//! The chain store does not apply this rule on its own, callers pick the head.

use std::cmp::Ordering;

use crate::blocks::Tipset;

/// Total order over tipsets, [`Ordering::Greater`] meaning `a` is the better
/// head.
pub fn compare(a: &Tipset, b: &Tipset) -> Ordering {
    a.weight()
        .cmp(b.weight())
        .then_with(|| b.key().to_bytes().cmp(&a.key().to_bytes()))
}

/// Returns `true` if `candidate` should replace `current` as head.
pub fn heavier(candidate: &Tipset, current: &Tipset) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// The best head among `tipsets`, if any.
pub fn heaviest<'a>(tipsets: impl IntoIterator<Item = &'a Tipset>) -> Option<&'a Tipset> {
    tipsets.into_iter().max_by(|a, b| compare(a, b))
}
