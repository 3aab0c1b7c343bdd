// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Demo assignment metrics.

use crate::resolver::{AssignmentMetric, MetricView};

/// Minimizes the summed invariant masses of all buckets.
///
/// Opts in to the hemisphere fast path: for the unconstrained two-bucket
/// shape, maximizing back-to-back hemisphere momenta is the cheap proxy for
/// minimizing the summed masses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummedMassMetric;

impl AssignmentMetric for SummedMassMetric {
    fn evaluate(&self, view: &MetricView<'_>) -> Option<f64> {
        let mut total = 0.0;
        for bucket in 0..view.bucket_count() {
            total += view.bucket_p4(bucket)?.mass();
        }
        Some(total)
    }

    fn hemisphere_eligible(&self) -> bool {
        true
    }
}

/// Minimizes the invariant-mass difference of a two-bucket partition.
///
/// Stays on the general exhaustive path: the hemisphere proxy score does not
/// track mass balance.
#[derive(Debug, Default, Clone, Copy)]
pub struct MassDiffMetric;

impl AssignmentMetric for MassDiffMetric {
    fn evaluate(&self, view: &MetricView<'_>) -> Option<f64> {
        if view.bucket_count() != 2 {
            return None;
        }
        let a = view.bucket_p4(0)?.mass();
        let b = view.bucket_p4(1)?.mass();
        Some((a - b).abs())
    }
}
