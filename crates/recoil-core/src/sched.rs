// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event-wide execution ordering.
//!
//! Ordering invariant:
//! - Every bound jigsaw appears in the final order exactly once.
//! - A jigsaw is preceded by all of its non-mutual prerequisites.
//! - Mutual dependencies (A needs B's output, B descends from A) become a
//!   cluster: the first-discovered jigsaw runs first and carries its partner
//!   in a co-executed list it invokes inline.
//!
//! Speculative admission of a mutual partner works on an immutable snapshot
//! of the plan extended with the in-flight jigsaw and its cluster so far; the
//! additions are absorbed into the cluster only on success, so a failed
//! attempt never needs to unwind shared state.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::engine::ConfigError;
use crate::ident::{JigsawIdx, StateIdx};
use crate::jigsaw::Jigsaw;
use crate::state::StatePool;

/// The committed event-wide execution order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecPlan {
    /// Jigsaws in run order.
    pub order: Vec<JigsawIdx>,
    /// Membership set, including speculative markers during admission.
    scheduled: FxHashSet<JigsawIdx>,
    /// Co-executed cluster per jigsaw.
    pub clusters: FxHashMap<JigsawIdx, Vec<JigsawIdx>>,
}

impl ExecPlan {
    fn contains(&self, j: JigsawIdx) -> bool {
        self.scheduled.contains(&j)
    }

    fn push(&mut self, j: JigsawIdx) {
        self.scheduled.insert(j);
        self.order.push(j);
    }

    /// Marks `j` as scheduled without placing it in the order. Used only on
    /// snapshots during speculative admission.
    fn mark_only(&mut self, j: JigsawIdx) {
        self.scheduled.insert(j);
    }
}

/// Chain of jigsaws that produced `j`'s parent state, nearest producer first.
fn ancestry_chain(j: JigsawIdx, jigsaws: &[Jigsaw], pool: &StatePool) -> Vec<JigsawIdx> {
    let mut chain = Vec::new();
    let mut cursor: Option<StateIdx> = jigsaws[j.index()].parent_state;
    while let Some(state) = cursor {
        match pool.get(state).producer {
            Some(producer) => {
                chain.push(producer);
                cursor = jigsaws[producer.index()].parent_state;
            }
            None => break,
        }
    }
    chain
}

/// Producers of the states wired into `j`'s dependency slots, first
/// occurrence order, deduplicated, excluding `j` itself.
fn direct_state_deps(j: JigsawIdx, jigsaws: &[Jigsaw], pool: &StatePool) -> Vec<JigsawIdx> {
    let mut deps = Vec::new();
    for slot in &jigsaws[j.index()].dependency_slots {
        for &state in &slot.states {
            if let Some(producer) = pool.get(state).producer {
                if producer != j && !deps.contains(&producer) {
                    deps.push(producer);
                }
            }
        }
    }
    deps
}

/// Transitive prerequisite closure per jigsaw, cycle-tolerant.
///
/// Indexed by arena position; unbound jigsaws get an empty set.
pub(crate) fn dependency_closures(
    bound: &[JigsawIdx],
    jigsaws: &[Jigsaw],
    pool: &StatePool,
) -> Vec<FxHashSet<JigsawIdx>> {
    let mut closures = vec![FxHashSet::default(); jigsaws.len()];
    for &j in bound {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<JigsawIdx> = Vec::new();
        stack.extend(ancestry_chain(j, jigsaws, pool));
        stack.extend(direct_state_deps(j, jigsaws, pool));
        while let Some(k) = stack.pop() {
            if !seen.insert(k) {
                continue;
            }
            stack.extend(ancestry_chain(k, jigsaws, pool));
            stack.extend(direct_state_deps(k, jigsaws, pool));
        }
        closures[j.index()] = seen;
    }
    closures
}

/// Computes the event-wide execution order over the bound jigsaws.
pub(crate) fn plan_execution(
    bound: &[JigsawIdx],
    jigsaws: &[Jigsaw],
    pool: &StatePool,
    closures: &[FxHashSet<JigsawIdx>],
) -> Result<ExecPlan, ConfigError> {
    let mut plan = ExecPlan::default();
    for &j in bound {
        admit(j, &mut plan, jigsaws, pool, closures)?;
    }
    debug_assert_eq!(plan.order.len(), bound.len(), "every bound jigsaw scheduled once");
    Ok(plan)
}

/// Schedules `j` (and everything it needs) into `plan`.
fn admit(
    j: JigsawIdx,
    plan: &mut ExecPlan,
    jigsaws: &[Jigsaw],
    pool: &StatePool,
    closures: &[FxHashSet<JigsawIdx>],
) -> Result<(), ConfigError> {
    if plan.contains(j) {
        return Ok(());
    }
    if !jigsaws[j.index()].is_bound() {
        return Err(ConfigError::UnboundJigsaw {
            jigsaw: jigsaws[j.index()].label.clone(),
        });
    }

    // Group/ancestry prerequisites first, rootmost inward.
    let ancestry = ancestry_chain(j, jigsaws, pool);
    for &a in ancestry.iter().rev() {
        admit(a, plan, jigsaws, pool, closures)?;
    }
    if plan.contains(j) {
        // Admitted as a mutual partner somewhere in the ancestry pass.
        return Ok(());
    }

    let mut cluster: Vec<JigsawIdx> = Vec::new();
    for k in direct_state_deps(j, jigsaws, pool) {
        if plan.contains(k) || cluster.contains(&k) {
            continue;
        }
        if closures[k.index()].contains(&j) {
            // Mutual dependency: admit K against a snapshot that pretends J
            // and its cluster already ran, then absorb the additions.
            let mut snapshot = plan.clone();
            snapshot.mark_only(j);
            for &c in &cluster {
                snapshot.mark_only(c);
            }
            let before = snapshot.order.len();
            admit(k, &mut snapshot, jigsaws, pool, closures)?;
            for &added in &snapshot.order[before..] {
                cluster.push(added);
                if let Some(sub) = snapshot.clusters.get(&added) {
                    plan.clusters.insert(added, sub.clone());
                }
            }
            debug!(
                jigsaw = %jigsaws[j.index()].label,
                partner = %jigsaws[k.index()].label,
                "mutual dependency absorbed into co-executed cluster"
            );
        } else {
            admit(k, plan, jigsaws, pool, closures)?;
        }
    }

    plan.clusters.insert(j, cluster.clone());
    plan.push(j);
    for c in cluster {
        // A cluster member can also be a prerequisite of a later non-mutual
        // dependency and already sit in the order; never list it twice.
        if !plan.contains(c) {
            plan.push(c);
        }
    }
    Ok(())
}
