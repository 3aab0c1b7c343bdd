// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pluggable resolver seams.
//!
//! A resolver owns the physics of one jigsaw: given the parent state and any
//! dependency states, it writes the child states' four-momenta. The engine
//! owns everything else (scheduling, candidate enumeration, commitment), so
//! resolvers observe through read views and mutate only through the child
//! slots of their own jigsaw.

use recoil_kinem::FourVec;
use thiserror::Error;

use crate::jigsaw::Jigsaw;
use crate::state::StatePool;

/// Failure modes a resolver may report.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// A required parent or dependency momentum was never written this event.
    #[error("required input momentum is missing")]
    MissingInput,
    /// A slot index outside the jigsaw's declared slots was addressed.
    #[error("slot index out of range")]
    InvalidSlot,
    /// The inputs admit no physical solution.
    #[error("no physical solution: {0}")]
    Unphysical(&'static str),
}

/// Resolution callback for vanilla and invisible jigsaws.
///
/// Implementations read the parent and dependency momenta and must write
/// every child slot on success. Returning an error marks the event invalid
/// for the owning group; it must not leave the process in a bad state.
pub trait Resolver: Send + Sync {
    /// Resolves the jigsaw's child momenta for the current event.
    fn resolve(&self, view: &mut ResolveView<'_>) -> Result<(), ResolveError>;
}

/// Scoring callback for combinatoric jigsaws.
///
/// `evaluate` is called once per candidate partition after the candidate's
/// bucket momenta are populated and the dependent cluster has run; smaller is
/// better. `None` marks the candidate invalid.
pub trait AssignmentMetric: Send + Sync {
    /// Scores the current candidate partition; `None` rejects it.
    fn evaluate(&self, view: &MetricView<'_>) -> Option<f64>;

    /// Opts in to the two-hemisphere seed-pair fast path. Only consulted
    /// when the jigsaw has exactly two unconstrained buckets.
    fn hemisphere_eligible(&self) -> bool {
        false
    }
}

/// Mutable view a [`Resolver`] works through.
pub struct ResolveView<'a> {
    pub(crate) pool: &'a mut StatePool,
    pub(crate) jigsaw: &'a Jigsaw,
}

impl ResolveView<'_> {
    /// Momentum of the parent state, if written this event.
    pub fn parent_p4(&self) -> Option<FourVec> {
        self.jigsaw.parent_state.and_then(|s| self.pool.p4(s))
    }

    /// Number of child slots on this jigsaw.
    pub fn child_count(&self) -> usize {
        self.jigsaw.child_slots.len()
    }

    /// Number of dependency slots on this jigsaw.
    pub fn dependency_count(&self) -> usize {
        self.jigsaw.dependency_slots.len()
    }

    /// Summed momentum of the states wired into dependency slot `slot`.
    ///
    /// `None` when the slot is out of range or any wired state is unwritten.
    pub fn dependency_p4(&self, slot: usize) -> Option<FourVec> {
        let dep = self.jigsaw.dependency_slots.get(slot)?;
        let mut total = FourVec::ZERO;
        for &state in &dep.states {
            total += self.pool.p4(state)?;
        }
        Some(total)
    }

    /// Writes the momentum of child slot `slot` for the current event.
    pub fn set_child_p4(&mut self, slot: usize, p4: FourVec) -> Result<(), ResolveError> {
        let child = self
            .jigsaw
            .child_slots
            .get(slot)
            .ok_or(ResolveError::InvalidSlot)?;
        let state = child.state.ok_or(ResolveError::InvalidSlot)?;
        self.pool.set_p4(state, p4);
        Ok(())
    }
}

/// Read-only view an [`AssignmentMetric`] works through.
pub struct MetricView<'a> {
    pub(crate) pool: &'a StatePool,
    pub(crate) jigsaw: &'a Jigsaw,
}

impl MetricView<'_> {
    /// Momentum of the parent state, if written this event.
    pub fn parent_p4(&self) -> Option<FourVec> {
        self.jigsaw.parent_state.and_then(|s| self.pool.p4(s))
    }

    /// Number of buckets (child slots) on this jigsaw.
    pub fn bucket_count(&self) -> usize {
        self.jigsaw.child_slots.len()
    }

    /// Momentum of bucket `slot` under the candidate being scored.
    pub fn bucket_p4(&self, slot: usize) -> Option<FourVec> {
        let child = self.jigsaw.child_slots.get(slot)?;
        self.pool.p4(child.state?)
    }

    /// Summed momentum of the states wired into dependency slot `slot`.
    pub fn dependency_p4(&self, slot: usize) -> Option<FourVec> {
        let dep = self.jigsaw.dependency_slots.get(slot)?;
        let mut total = FourVec::ZERO;
        for &state in &dep.states {
            total += self.pool.p4(state)?;
        }
        Some(total)
    }
}
