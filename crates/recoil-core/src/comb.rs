// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Combinatorial assignment engine.
//!
//! Explores object-to-bucket partitions for a combinatoric jigsaw: a base-M
//! odometer over the `M^P` assignment space with cardinality and charge
//! pruning, dependent-cluster cascades per candidate, and a pluggable metric.
//! A two-hemisphere seed-pair heuristic replaces the exhaustive walk when the
//! jigsaw's shape permits it (two buckets, no constraints, metric opt-in).

use recoil_kinem::{FourVec, Vec3};
use tracing::{debug, warn};

use crate::engine::{run_jigsaw, EventCtx, EventError};
use crate::ident::JigsawIdx;
use crate::jigsaw::Cardinality;
use crate::resolver::{MetricView, ResolveError};

/// An observed object available to combinatoric assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisObject {
    /// Measured four-momentum.
    pub p4: FourVec,
    /// Electric charge in elementary-charge units.
    pub charge: i64,
}

impl VisObject {
    /// Constructs an object with the given momentum and charge.
    pub fn new(p4: FourVec, charge: i64) -> Self {
        Self { p4, charge }
    }

    /// Constructs a neutral object.
    pub fn neutral(p4: FourVec) -> Self {
        Self { p4, charge: 0 }
    }
}

/// Runs the assignment search for `jidx` and commits the winning partition.
pub(crate) fn run_assignment(ctx: &mut EventCtx<'_>, jidx: JigsawIdx) -> Result<(), EventError> {
    let jigsaws = ctx.jigsaws;
    let jig = &jigsaws[jidx.index()];
    let Some(parent) = jig.parent_state else {
        return Err(EventError::ResolverFailed {
            jigsaw: jig.label.clone(),
            source: ResolveError::MissingInput,
        });
    };
    let objects: Vec<VisObject> = ctx.objects.get(&parent).cloned().unwrap_or_default();

    let buckets = jig.child_slots.len();
    let supplied = objects.len();
    let required: usize = jig
        .child_slots
        .iter()
        .map(|slot| slot.cardinality.minimum())
        .sum();
    let all_exact = jig
        .child_slots
        .iter()
        .all(|slot| matches!(slot.cardinality, Cardinality::Exactly(_)));
    if supplied < required || (all_exact && supplied != required) {
        return Err(EventError::InsufficientInputs {
            jigsaw: jig.label.clone(),
            required,
            supplied,
        });
    }

    let Some(metric) = jig.metric.as_ref() else {
        return Err(EventError::ResolverFailed {
            jigsaw: jig.label.clone(),
            source: ResolveError::MissingInput,
        });
    };

    let unconstrained = jig
        .child_slots
        .iter()
        .all(|slot| slot.charge.is_none() && matches!(slot.cardinality, Cardinality::AtLeast(1)))
        && jig.dependency_slots.iter().all(|slot| slot.charge.is_none());

    if buckets == 2 && unconstrained && metric.hemisphere_eligible() {
        let assignment = hemisphere_split(&objects);
        debug!(jigsaw = %jig.label, objects = supplied, "hemisphere fast path");
        return commit(ctx, jidx, &objects, &assignment);
    }

    if buckets >= 2 && supplied > 20 {
        warn!(
            jigsaw = %jig.label,
            objects = supplied,
            "combinatoric search space is exponential in the object count"
        );
    }

    let mut assignment = vec![0_usize; supplied];
    let mut best: Option<(f64, Vec<usize>)> = None;
    let (mut tried, mut valid) = (0_u64, 0_u64);
    loop {
        tried += 1;
        if let Some(score) = try_candidate(ctx, jidx, &objects, &assignment) {
            valid += 1;
            ctx.telemetry.on_candidate_accepted(&jig.id);
            // Strict comparison: the first valid candidate is the incumbent
            // and ties are never re-examined.
            if best.as_ref().map_or(true, |(incumbent, _)| score < *incumbent) {
                best = Some((score, assignment.clone()));
            }
        } else {
            ctx.telemetry.on_candidate_rejected(&jig.id);
        }
        if !increment(&mut assignment, buckets) {
            break;
        }
    }
    ctx.telemetry.on_search_summary(&jig.id, tried, valid);

    let Some((score, winner)) = best else {
        return Err(EventError::NoValidAssignment {
            jigsaw: jig.label.clone(),
        });
    };
    debug!(jigsaw = %jig.label, score, tried, valid, "assignment search committed");
    commit(ctx, jidx, &objects, &winner)
}

/// Validates and scores one candidate. `None` rejects the candidate.
fn try_candidate(
    ctx: &mut EventCtx<'_>,
    jidx: JigsawIdx,
    objects: &[VisObject],
    assignment: &[usize],
) -> Option<f64> {
    let jigsaws = ctx.jigsaws;
    let jig = &jigsaws[jidx.index()];

    let mut counts = vec![0_usize; jig.child_slots.len()];
    let mut charges = vec![0_i64; jig.child_slots.len()];
    for (object, &bucket) in objects.iter().zip(assignment) {
        counts[bucket] += 1;
        charges[bucket] += object.charge;
    }
    for (bucket, slot) in jig.child_slots.iter().enumerate() {
        if !slot.cardinality.admits(counts[bucket]) {
            return None;
        }
        if let Some(required) = slot.charge {
            if charges[bucket] != required {
                return None;
            }
        }
    }

    populate(ctx, jidx, objects, assignment);

    // The co-executed cluster sees the candidate buckets; a failing dependent
    // invalidates the candidate, not the event.
    for &dependent in &jig.cluster {
        if run_jigsaw(ctx, dependent, false).is_err() {
            return None;
        }
    }

    for slot in &jig.dependency_slots {
        if let Some(required) = slot.charge {
            let mut total = 0_i64;
            let mut backed_by_objects = false;
            for state in &slot.states {
                if let Some(members) = ctx.objects.get(state) {
                    backed_by_objects = true;
                    total += members.iter().map(|o| o.charge).sum::<i64>();
                }
            }
            if !backed_by_objects || total != required {
                return None;
            }
        }
    }

    let metric = jig.metric.as_ref()?;
    let view = MetricView {
        pool: &*ctx.pool,
        jigsaw: jig,
    };
    let score = metric.evaluate(&view)?;
    (score.is_finite() && score >= 0.0).then_some(score)
}

/// Writes bucket momenta and object membership for `assignment`.
fn populate(ctx: &mut EventCtx<'_>, jidx: JigsawIdx, objects: &[VisObject], assignment: &[usize]) {
    let jigsaws = ctx.jigsaws;
    let jig = &jigsaws[jidx.index()];
    for (bucket, slot) in jig.child_slots.iter().enumerate() {
        let Some(state) = slot.state else { continue };
        let members: Vec<VisObject> = objects
            .iter()
            .zip(assignment)
            .filter(|&(_, &b)| b == bucket)
            .map(|(object, _)| *object)
            .collect();
        let total: FourVec = members.iter().map(|o| o.p4).sum();
        ctx.pool.set_p4(state, total);
        ctx.objects.insert(state, members);
    }
}

/// Re-applies the winning assignment and runs the dependent cluster once
/// more so downstream state reflects the committed choice.
fn commit(
    ctx: &mut EventCtx<'_>,
    jidx: JigsawIdx,
    objects: &[VisObject],
    assignment: &[usize],
) -> Result<(), EventError> {
    populate(ctx, jidx, objects, assignment);
    let jigsaws = ctx.jigsaws;
    let jig = &jigsaws[jidx.index()];
    for &dependent in &jig.cluster {
        run_jigsaw(ctx, dependent, true)?;
    }
    Ok(())
}

/// Base-M odometer step. Returns `false` once the space is exhausted.
fn increment(assignment: &mut [usize], buckets: usize) -> bool {
    for digit in assignment.iter_mut() {
        *digit += 1;
        if *digit < buckets {
            return true;
        }
        *digit = 0;
    }
    false
}

/// O(P³) two-hemisphere heuristic for the unconstrained two-bucket shape.
///
/// Every ordered pair of objects seeds a split: the plane normal to the cross
/// product of the seed momenta divides the remaining objects by the sign of
/// `normal · p`, the four seed placements are scored by the summed hemisphere
/// momentum magnitudes, and the best-scoring non-degenerate split wins. Not
/// guaranteed globally optimal; callers fall back to the exhaustive search
/// whenever the shape constraints do not hold.
fn hemisphere_split(objects: &[VisObject]) -> Vec<usize> {
    let count = objects.len();
    let mut best_score = f64::NEG_INFINITY;
    let mut best = vec![0_usize; count];

    for i in 0..count {
        for k in 0..count {
            if i == k {
                continue;
            }
            let axis = objects[i].p4.p3().cross(&objects[k].p4.p3());
            for &(seed_i, seed_k) in &[(0_usize, 0_usize), (0, 1), (1, 0), (1, 1)] {
                let mut assignment = vec![0_usize; count];
                let mut counts = [0_usize; 2];
                let mut sums = [Vec3::ZERO, Vec3::ZERO];
                for (o, slot) in assignment.iter_mut().enumerate() {
                    let side = if o == i {
                        seed_i
                    } else if o == k {
                        seed_k
                    } else if axis.dot(&objects[o].p4.p3()) > 0.0 {
                        0
                    } else {
                        1
                    };
                    *slot = side;
                    counts[side] += 1;
                    sums[side] += objects[o].p4.p3();
                }
                if counts[0] == 0 || counts[1] == 0 {
                    continue;
                }
                let score = sums[0].norm() + sums[1].norm();
                if score > best_score {
                    best_score = score;
                    best = assignment;
                }
            }
        }
    }
    best
}
