// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Groups and structural dependency resolution.
//!
//! A group owns the frames that share unresolved degrees of freedom and the
//! candidate jigsaws that can split them. `resolve_unknowns` turns the group
//! into a wired state/jigsaw subgraph once, at initialization; events only
//! push momenta through the finished graph.

use std::collections::VecDeque;

use tracing::debug;

use crate::engine::ConfigError;
use crate::frame::FrameCatalog;
use crate::frameset::FrameSet;
use crate::ident::{JigsawIdx, StateIdx};
use crate::jigsaw::Jigsaw;
use crate::phase::Phase;
use crate::state::StatePool;

/// Closed set of group behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupKind {
    /// Top-level momentum supplied directly per event.
    Vanilla,
    /// Invisible-frame group: the top-level momentum is the event's missing
    /// momentum, split among invisible frames by the group's jigsaws.
    Invisible,
    /// Combinatoric group: the top-level state holds the event's observed
    /// objects, partitioned into buckets by a combinatoric jigsaw.
    Combinatoric,
}

/// Owner of a set of jointly resolved frames and its candidate jigsaw pool.
#[derive(Debug)]
pub(crate) struct Group {
    pub label: String,
    pub kind: GroupKind,
    /// Member frames.
    pub frames: FrameSet,
    /// Candidate jigsaws in insertion order. Order is the final tie-break.
    pub pool: Vec<JigsawIdx>,
    /// Top-level parent state covering every member frame.
    pub top_state: Option<StateIdx>,
    /// Every state created while resolving this group, top state included.
    pub states: Vec<StateIdx>,
    pub phase: Phase,
}

/// Builds the group's state/jigsaw subgraph (greedy, no backtracking).
///
/// Worklist resolution: each popped state is matched against the unused
/// candidates whose required parent frame set exactly equals the state's
/// frame set. Ties prefer the jigsaw with fewer child slots, then
/// fewer dependency slots, then earlier pool insertion. Single-frame child
/// states are terminal. A multi-frame state no candidate can resolve is a
/// configuration error naming the stuck frames.
pub(crate) fn resolve_unknowns(
    group: &mut Group,
    jigsaws: &mut [Jigsaw],
    pool: &mut StatePool,
    catalog: &FrameCatalog,
) -> Result<(), ConfigError> {
    let top = pool.alloc(group.frames.clone());
    group.top_state = Some(top);
    group.states.push(top);

    // The top state enters the worklist even when it covers a single frame:
    // a matching jigsaw may still refine it. Only child states are terminal
    // at one frame.
    let mut worklist: VecDeque<StateIdx> = VecDeque::new();
    worklist.push_back(top);

    while let Some(state_idx) = worklist.pop_front() {
        let winner = select_candidate(group, jigsaws, pool, state_idx);
        let Some(jidx) = winner else {
            let frames = pool.get(state_idx).frames.clone();
            if frames.len() > 1 {
                return Err(ConfigError::UnresolvedFrames {
                    group: group.label.clone(),
                    frames: catalog.describe(&frames),
                });
            }
            continue;
        };

        bind(group, jigsaws, pool, state_idx, jidx, &mut worklist);
    }

    Ok(())
}

/// Picks the eligible unused candidate for `state_idx`, if any.
fn select_candidate(
    group: &Group,
    jigsaws: &[Jigsaw],
    pool: &StatePool,
    state_idx: StateIdx,
) -> Option<JigsawIdx> {
    let frames = &pool.get(state_idx).frames;
    let mut best: Option<(usize, usize, JigsawIdx)> = None;
    for &jidx in &group.pool {
        let jig = &jigsaws[jidx.index()];
        if jig.is_bound() || jig.parent_frames() != *frames {
            continue;
        }
        let key = (jig.child_slots.len(), jig.dependency_slots.len());
        // Strict comparison keeps the earliest pool entry on a full tie.
        if best.map_or(true, |(c, d, _)| key < (c, d)) {
            best = Some((key.0, key.1, jidx));
        }
    }
    best.map(|(_, _, jidx)| jidx)
}

/// Binds `jidx` to `state_idx` and spawns its child states.
fn bind(
    group: &mut Group,
    jigsaws: &mut [Jigsaw],
    pool: &mut StatePool,
    state_idx: StateIdx,
    jidx: JigsawIdx,
    worklist: &mut VecDeque<StateIdx>,
) {
    let jig = &mut jigsaws[jidx.index()];
    jig.parent_state = Some(state_idx);
    pool.get_mut(state_idx).consumer = Some(jidx);

    debug!(
        group = %group.label,
        jigsaw = %jig.label,
        "bound jigsaw to parent state"
    );

    for slot in &mut jig.child_slots {
        let child = pool.alloc(slot.frames.clone());
        pool.get_mut(child).producer = Some(jidx);
        slot.state = Some(child);
        group.states.push(child);
        if slot.frames.len() > 1 {
            worklist.push_back(child);
        }
    }
}

/// Collects the deepest states under `group` whose frames lie inside
/// `remaining`. Dependency slots wire to the most-resolved representation of
/// their frames, so a consumed state is always descended through and only
/// leaves are taken. A leaf straddling the boundary of `remaining` covers
/// nothing.
pub(crate) fn leaf_states_within(
    group: &Group,
    jigsaws: &[Jigsaw],
    pool: &StatePool,
    remaining: &FrameSet,
    out: &mut Vec<StateIdx>,
) {
    let Some(top) = group.top_state else { return };
    let mut stack = vec![top];
    while let Some(idx) = stack.pop() {
        let state = pool.get(idx);
        if state.frames.is_disjoint_from(remaining) {
            continue;
        }
        match state.consumer {
            Some(consumer) => {
                let jig = &jigsaws[consumer.index()];
                // Children pushed in reverse slot order so slot 0 pops first.
                for slot in jig.child_slots.iter().rev() {
                    if let Some(child) = slot.state {
                        stack.push(child);
                    }
                }
            }
            None => {
                if state.frames.is_subset_of(remaining) {
                    out.push(idx);
                }
            }
        }
    }
}
