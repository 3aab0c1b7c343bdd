// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use blake3::Hasher;

/// Canonical 256-bit hash used for addressing frames, groups, and jigsaws.
pub type Hash = [u8; 32];

/// Strongly typed identifier for a reference frame.
///
/// `FrameId` is an opaque 32-byte identifier derived from the frame's label
/// via [`make_frame_id`] (`blake3("frame:" || label)`). It names the frame in
/// diagnostics and telemetry; all engine wiring uses compact arena indices.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameId(pub Hash);

impl FrameId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Strongly typed identifier for a jigsaw.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JigsawId(pub Hash);

impl JigsawId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Strongly typed identifier for a group of jointly resolved frames.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupId(pub Hash);

impl GroupId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Produces a stable, domain-separated frame identifier (prefix `b"frame:"`) using BLAKE3.
pub fn make_frame_id(label: &str) -> FrameId {
    let mut hasher = Hasher::new();
    hasher.update(b"frame:");
    hasher.update(label.as_bytes());
    FrameId(hasher.finalize().into())
}

/// Produces a stable, domain-separated jigsaw identifier (prefix `b"jigsaw:"`) using BLAKE3.
pub fn make_jigsaw_id(label: &str) -> JigsawId {
    let mut hasher = Hasher::new();
    hasher.update(b"jigsaw:");
    hasher.update(label.as_bytes());
    JigsawId(hasher.finalize().into())
}

/// Produces a stable, domain-separated group identifier (prefix `b"group:"`) using BLAKE3.
pub fn make_group_id(label: &str) -> GroupId {
    let mut hasher = Hasher::new();
    hasher.update(b"group:");
    hasher.update(label.as_bytes());
    GroupId(hasher.finalize().into())
}

/// Compact arena index for a registered frame.
///
/// Canonical 256-bit ids are mapped to compact u32 handles at registration
/// time. The handles are never serialized; they are purely an in-process
/// acceleration and are only meaningful for the engine that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameIdx(pub(crate) u32);

impl FrameIdx {
    /// Returns the raw arena position.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Compact arena index for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupIdx(pub(crate) u32);

impl GroupIdx {
    /// Returns the raw arena position.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Compact arena index for a jigsaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JigsawIdx(pub(crate) u32);

impl JigsawIdx {
    /// Returns the raw arena position.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Compact arena index for a state in the event pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct StateIdx(pub(crate) u32);

impl StateIdx {
    /// Returns the raw arena position.
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
