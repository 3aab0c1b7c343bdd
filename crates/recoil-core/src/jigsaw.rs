// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Jigsaw records: the resolver units of the dependency graph.

use crate::frameset::FrameSet;
use crate::ident::{GroupIdx, JigsawId, JigsawIdx, StateIdx};
use crate::resolver::{AssignmentMetric, Resolver};

/// Closed set of jigsaw behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JigsawKind {
    /// Splits one known parent momentum into child momenta algebraically.
    Vanilla,
    /// Splits an invisible (solved-for) momentum among invisible frames.
    Invisible,
    /// Partitions a variable-size object set into its child buckets by
    /// searching for a metric-optimal valid assignment.
    Combinatoric,
}

/// Cardinality constraint on a combinatoric bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cardinality {
    /// The bucket takes at least this many objects.
    AtLeast(usize),
    /// The bucket takes exactly this many objects (exclusive slot).
    Exactly(usize),
}

impl Cardinality {
    /// Fewest objects that can satisfy the constraint.
    pub fn minimum(self) -> usize {
        match self {
            Self::AtLeast(n) | Self::Exactly(n) => n,
        }
    }

    /// True when a bucket holding `count` objects satisfies the constraint.
    pub fn admits(self, count: usize) -> bool {
        match self {
            Self::AtLeast(n) => count >= n,
            Self::Exactly(n) => count == n,
        }
    }
}

/// One output slot of a jigsaw.
#[derive(Debug)]
pub(crate) struct ChildSlot {
    /// Frames this slot's state represents.
    pub frames: FrameSet,
    /// Bucket cardinality; only consulted by combinatoric jigsaws.
    pub cardinality: Cardinality,
    /// Required aggregate charge of the bucket, if constrained.
    pub charge: Option<i64>,
    /// State bound during structural resolution.
    pub state: Option<StateIdx>,
}

impl ChildSlot {
    pub fn new() -> Self {
        Self {
            frames: FrameSet::new(),
            cardinality: Cardinality::AtLeast(1),
            charge: None,
            state: None,
        }
    }
}

/// One external-input slot of a jigsaw.
#[derive(Debug)]
pub(crate) struct DependencySlot {
    /// Frames whose states feed this slot.
    pub frames: FrameSet,
    /// Required aggregate charge of the objects behind this slot, checked
    /// after the dependent cluster has run for a candidate.
    pub charge: Option<i64>,
    /// States wired during structural resolution, covering `frames` exactly.
    pub states: Vec<StateIdx>,
}

impl DependencySlot {
    pub fn new() -> Self {
        Self {
            frames: FrameSet::new(),
            charge: None,
            states: Vec::new(),
        }
    }
}

/// A resolver unit: consumes one parent state, produces one state per child
/// slot, optionally reading dependency states from elsewhere in the event.
pub(crate) struct Jigsaw {
    pub id: JigsawId,
    pub label: String,
    pub kind: JigsawKind,
    pub group: GroupIdx,
    /// Parent state bound during structural resolution (§4.1 binding).
    pub parent_state: Option<StateIdx>,
    pub child_slots: Vec<ChildSlot>,
    pub dependency_slots: Vec<DependencySlot>,
    /// Physics callback for vanilla/invisible jigsaws.
    pub resolver: Option<Box<dyn Resolver>>,
    /// Scoring callback for combinatoric jigsaws.
    pub metric: Option<Box<dyn AssignmentMetric>>,
    /// Transitive must-run-before list, computed at initialization, sorted
    /// by handle.
    pub deps: Vec<JigsawIdx>,
    /// Co-executed cluster: mutual-dependency partners this jigsaw runs
    /// inline, computed at initialization.
    pub cluster: Vec<JigsawIdx>,
}

impl Jigsaw {
    /// The frame set a parent state must equal for this jigsaw to resolve it:
    /// the union of its child slots.
    pub fn parent_frames(&self) -> FrameSet {
        let mut union = FrameSet::new();
        for slot in &self.child_slots {
            union.union_with(&slot.frames);
        }
        union
    }

    /// True when this jigsaw has been bound to a parent state.
    pub fn is_bound(&self) -> bool {
        self.parent_state.is_some()
    }
}

impl core::fmt::Debug for Jigsaw {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Jigsaw")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
