// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Telemetry sink for assignment-search observability.

use crate::ident::JigsawId;

/// Observer for combinatoric search activity.
///
/// The engine calls the sink synchronously from the search loop, so
/// implementations should be cheap; anything expensive belongs behind a
/// channel owned by the implementation.
pub trait TelemetrySink: Send + Sync {
    /// A candidate partition passed every constraint and produced a metric.
    fn on_candidate_accepted(&self, _jigsaw: &JigsawId) {}

    /// A candidate partition was rejected by constraints, a failing
    /// dependent, or an invalid metric.
    fn on_candidate_rejected(&self, _jigsaw: &JigsawId) {}

    /// The search finished; `tried` counts enumerated candidates, `valid`
    /// the ones that survived to scoring.
    fn on_search_summary(&self, _jigsaw: &JigsawId, _tried: u64, _valid: u64) {}
}

/// Sink that drops every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {}
