#![warn(missing_docs)]

//! This module defines the identifier space of the chord ring.
//!
//! Nodes and keys share one circular space `Z/(2^m)`, where `m` is fixed per ring and
//! never larger than 128 bits, so a [NodeId] is always backed by a `u128`.
//! All comparisons on the ring are clockwise and go through an [IdSpace], which knows
//! `m` and therefore where the wraparound happens.
//!
//! ## Intervals
//!
//! * [IdSpace::between] is the half-open interval `(lo, hi]`. When `lo == hi` it covers
//!   the whole ring.
//! * [IdSpace::strictly_between] is the open interval `(lo, hi)`. When `lo == hi` it
//!   covers every identifier except `lo`.

use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::DEFAULT_IDENTIFIER_BITS;
use crate::consts::MAX_IDENTIFIER_BITS;
use crate::error::Error;
use crate::error::Result;

/// A point on the ring. Rendered as lowercase hexadecimal without padding.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Default, Hash)]
pub struct NodeId(pub u128);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        u128::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| Error::InvalidNodeId(s.to_string()))
    }
}

impl From<u128> for NodeId {
    fn from(v: u128) -> Self {
        Self(v)
    }
}

impl From<NodeId> for u128 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        NodeId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Maps arbitrary bytes onto the ring.
pub trait KeyHasher: Send + Sync {
    /// Digest `key` into 128 bits. [IdSpace::hash] reduces the result to `m` bits.
    fn digest(&self, key: &[u8]) -> u128;
}

/// Default [KeyHasher]: the first 128 bits of the SHA-1 digest, big endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl KeyHasher for Sha1Hasher {
    fn digest(&self, key: &[u8]) -> u128 {
        let digest = Sha1::digest(key);
        let mut head = [0u8; 16];
        head.copy_from_slice(&digest[..16]);
        u128::from_be_bytes(head)
    }
}

/// The circular identifier space `Z/(2^m)`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct IdSpace {
    bits: u8,
}

impl Default for IdSpace {
    fn default() -> Self {
        Self {
            bits: DEFAULT_IDENTIFIER_BITS,
        }
    }
}

impl IdSpace {
    /// Create a space of `bits` bits, `1 <= bits <= 128`.
    pub fn new(bits: u8) -> Result<Self> {
        if bits == 0 || bits > MAX_IDENTIFIER_BITS {
            return Err(Error::InvalidIdentifierBits(bits));
        }
        Ok(Self { bits })
    }

    /// The width `m` of this space.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// `2^m - 1`.
    pub fn mask(&self) -> u128 {
        if self.bits >= 128 {
            u128::MAX
        } else {
            (1u128 << self.bits) - 1
        }
    }

    /// Reduce a raw value into the space.
    pub fn id(&self, raw: u128) -> NodeId {
        NodeId(raw & self.mask())
    }

    /// Whether `id` is a member of the space.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 & !self.mask() == 0
    }

    /// Hash `key` into the space.
    pub fn hash(&self, hasher: &dyn KeyHasher, key: &[u8]) -> NodeId {
        self.id(hasher.digest(key))
    }

    /// `(id + delta) mod 2^m`.
    pub fn add(&self, id: NodeId, delta: u128) -> NodeId {
        self.id(id.0.wrapping_add(delta))
    }

    /// Clockwise distance walking from `from` to `to`.
    pub fn distance(&self, from: NodeId, to: NodeId) -> u128 {
        to.0.wrapping_sub(from.0) & self.mask()
    }

    /// Start of finger `index`: `(id + 2^index) mod 2^m`.
    pub fn finger_start(&self, id: NodeId, index: u8) -> NodeId {
        debug_assert!(index < self.bits);
        self.add(id, 1u128 << index)
    }

    /// `id` in `(lo, hi]`. The whole ring when `lo == hi`.
    pub fn between(&self, id: NodeId, lo: NodeId, hi: NodeId) -> bool {
        if lo == hi {
            return true;
        }
        let offset = self.distance(lo, id);
        offset != 0 && offset <= self.distance(lo, hi)
    }

    /// `id` in `(lo, hi)`. Everything but `lo` when `lo == hi`.
    pub fn strictly_between(&self, id: NodeId, lo: NodeId, hi: NodeId) -> bool {
        if lo == hi {
            return id != lo;
        }
        let offset = self.distance(lo, id);
        offset != 0 && offset < self.distance(lo, hi)
    }
}
