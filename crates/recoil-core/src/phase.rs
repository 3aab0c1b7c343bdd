// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lifecycle phases for the engine and its groups.

/// Lifecycle phase of the engine or of a single group.
///
/// Advanced only by the two entry points: structural initialization moves
/// `Unconfigured` to `StructurallyResolved`; each analyzed event moves a
/// structurally resolved object to `EventValid` or `EventInvalid`. Callers
/// query the phase instead of consulting mutable soundness flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Configuration surface is open; no structural graph exists yet.
    Unconfigured,
    /// Structural resolution succeeded; no event has been analyzed since.
    StructurallyResolved,
    /// The most recent event was analyzed successfully.
    EventValid,
    /// The most recent event failed analysis; the structure is still sound
    /// and the next event may succeed.
    EventInvalid,
}

impl Phase {
    /// True once structural resolution has completed.
    pub fn is_initialized(self) -> bool {
        !matches!(self, Self::Unconfigured)
    }
}
