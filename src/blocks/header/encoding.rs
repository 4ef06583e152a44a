// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use fvm_shared4::bigint::bigint_ser::{BigIntDe, BigIntSer};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, IgnoredAny, SeqAccess, Visitor},
};

use super::RawBlockHeader;

/// Number of positional fields in an encoded block header.
pub const HEADER_ARITY: usize = 13;

const EXPECTED: &str = "a block header tuple of 13 fields";

impl Serialize for RawBlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Order is part of the wire format.
        (
            &self.miner_address,
            &self.ticket,
            &self.election_proof,
            &self.parents,
            BigIntSer(&self.weight),
            &self.epoch,
            &self.state_root,
            &self.message_receipts,
            &self.messages,
            &self.bls_aggregate,
            &self.timestamp,
            &self.signature,
            &self.fork_signal,
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawBlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(HEADER_ARITY, HeaderVisitor)
    }
}

struct HeaderVisitor;

impl<'de> Visitor<'de> for HeaderVisitor {
    type Value = RawBlockHeader;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(EXPECTED)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut fields = Fields { seq: &mut seq, read: 0 };
        let header = RawBlockHeader {
            miner_address: fields.next()?,
            ticket: fields.next()?,
            election_proof: fields.next()?,
            parents: fields.next()?,
            weight: fields.next::<BigIntDe>()?.0,
            epoch: fields.next()?,
            state_root: fields.next()?,
            message_receipts: fields.next()?,
            messages: fields.next()?,
            bls_aggregate: fields.next()?,
            timestamp: fields.next()?,
            signature: fields.next()?,
            fork_signal: fields.next()?,
        };
        if fields.seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(HEADER_ARITY + 1, &EXPECTED));
        }
        Ok(header)
    }
}

/// Reads tuple elements in order, failing on a short tuple.
struct Fields<'a, A> {
    seq: &'a mut A,
    read: usize,
}

impl<'de, A: SeqAccess<'de>> Fields<'_, A> {
    fn next<T: Deserialize<'de>>(&mut self) -> Result<T, A::Error> {
        let value = self
            .seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(self.read, &EXPECTED))?;
        self.read += 1;
        Ok(value)
    }
}
