// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core resolution engine.
//!
//! The engine owns the frame catalog, the groups, the jigsaw arena, and the
//! state pool. Structural resolution (`initialize_analysis`) runs once and
//! freezes the wiring; `analyze_event` then pushes fresh momenta through the
//! finished graph, once per event, in the committed execution order.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, warn};

use recoil_kinem::FourVec;

use crate::comb::{self, VisObject};
use crate::frame::{FrameCatalog, FrameKind};
use crate::frameset::FrameSet;
use crate::group::{self, Group, GroupKind};
use crate::ident::{make_jigsaw_id, FrameIdx, GroupIdx, JigsawIdx, StateIdx};
use crate::jigsaw::{Cardinality, ChildSlot, DependencySlot, Jigsaw, JigsawKind};
use crate::phase::Phase;
use crate::resolver::{AssignmentMetric, ResolveError, Resolver, ResolveView};
use crate::sched;
use crate::state::StatePool;
use crate::telemetry::{NullTelemetrySink, TelemetrySink};

/// Structural (configuration-time) failures. Any of these blocks the run:
/// there is no safe way to analyze events against an unresolved structure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration surface is closed once `initialize_analysis` ran.
    #[error("analysis already initialized; configuration surface is closed")]
    AlreadyInitialized,
    /// A frame label was registered twice.
    #[error("duplicate frame label: {0}")]
    DuplicateFrameLabel(String),
    /// A group label was registered twice.
    #[error("duplicate group label: {0}")]
    DuplicateGroupLabel(String),
    /// A jigsaw label was registered twice.
    #[error("duplicate jigsaw label: {0}")]
    DuplicateJigsawLabel(String),
    /// A frame handle did not belong to this engine.
    #[error("unknown frame handle")]
    UnknownFrame,
    /// A group handle did not belong to this engine.
    #[error("unknown group handle")]
    UnknownGroup,
    /// A jigsaw handle did not belong to this engine.
    #[error("unknown jigsaw handle")]
    UnknownJigsaw,
    /// A slot index was outside the jigsaw's declared slots.
    #[error("jigsaw {jigsaw}: slot {slot} out of range")]
    UnknownSlot {
        /// Jigsaw label.
        jigsaw: String,
        /// Offending slot index.
        slot: usize,
    },
    /// A frame was assigned to a second group.
    #[error("frame {frame} already belongs to a group")]
    FrameAlreadyGrouped {
        /// Frame label.
        frame: String,
    },
    /// A frame's visibility kind does not match the group kind.
    #[error("frame {frame} has the wrong kind for group {group}")]
    FrameKindMismatch {
        /// Frame label.
        frame: String,
        /// Group label.
        group: String,
    },
    /// A group has no member frames.
    #[error("group {group} has no member frames")]
    EmptyGroup {
        /// Group label.
        group: String,
    },
    /// A jigsaw declared zero child slots.
    #[error("jigsaw {jigsaw} has no child slots")]
    NoChildSlots {
        /// Jigsaw label.
        jigsaw: String,
    },
    /// A child slot has no frames bound to it.
    #[error("jigsaw {jigsaw}: child slot {slot} has no frames")]
    EmptyChildSlot {
        /// Jigsaw label.
        jigsaw: String,
        /// Offending slot index.
        slot: usize,
    },
    /// A dependency slot has no frames bound to it.
    #[error("jigsaw {jigsaw}: dependency slot {slot} has no frames")]
    EmptyDependencySlot {
        /// Jigsaw label.
        jigsaw: String,
        /// Offending slot index.
        slot: usize,
    },
    /// Two child slots of one jigsaw claim the same frame.
    #[error("jigsaw {jigsaw}: child slots overlap")]
    OverlappingChildSlots {
        /// Jigsaw label.
        jigsaw: String,
    },
    /// A child-slot frame is not a member of the jigsaw's group.
    #[error("jigsaw {jigsaw}: frame {frame} is not a member of its group")]
    FrameNotInGroup {
        /// Jigsaw label.
        jigsaw: String,
        /// Frame label.
        frame: String,
    },
    /// A group's candidate pool cannot resolve all of its frames.
    #[error("group {group}: no candidate jigsaw resolves {frames}")]
    UnresolvedFrames {
        /// Group label.
        group: String,
        /// Description of the stuck frame set.
        frames: String,
    },
    /// A dependency slot names frames no state will ever cover.
    #[error("jigsaw {jigsaw}: no state produces dependency frame {frame}")]
    DependencyNotProducible {
        /// Jigsaw label.
        jigsaw: String,
        /// Frame label.
        frame: String,
    },
    /// A cardinality or charge setter was called on a non-combinatoric jigsaw.
    #[error("jigsaw {jigsaw} is not combinatoric")]
    NotCombinatoric {
        /// Jigsaw label.
        jigsaw: String,
    },
    /// The execution planner reached a jigsaw never bound to a parent state.
    #[error("jigsaw {jigsaw} was never bound to a group state")]
    UnboundJigsaw {
        /// Jigsaw label.
        jigsaw: String,
    },
}

/// Per-event failures. The event's result is invalid, the structure stays
/// sound, and the next event may succeed.
#[derive(Debug, Error)]
pub enum EventError {
    /// `analyze_event` was called before `initialize_analysis`.
    #[error("analysis is not initialized")]
    NotInitialized,
    /// A measured frame's momentum was not supplied by the event.
    #[error("no momentum supplied for measured frame {frame}")]
    MissingMomentum {
        /// Frame label.
        frame: String,
    },
    /// A non-combinatoric group's top-level momentum was not supplied.
    #[error("no momentum supplied for group {group}")]
    MissingGroupMomentum {
        /// Group label.
        group: String,
    },
    /// Too few objects to satisfy a combinatoric jigsaw's slot minima.
    #[error("jigsaw {jigsaw}: insufficient inputs ({supplied} supplied, {required} required)")]
    InsufficientInputs {
        /// Jigsaw label.
        jigsaw: String,
        /// Objects required by the slot constraints.
        required: usize,
        /// Objects supplied by the event.
        supplied: usize,
    },
    /// No candidate partition satisfied every constraint with a valid metric.
    #[error("jigsaw {jigsaw}: no valid combinatoric assignment")]
    NoValidAssignment {
        /// Jigsaw label.
        jigsaw: String,
    },
    /// A resolver reported failure for this event.
    #[error("jigsaw {jigsaw}: resolver failed")]
    ResolverFailed {
        /// Jigsaw label.
        jigsaw: String,
        /// Resolver-reported cause.
        #[source]
        source: ResolveError,
    },
    /// Consecutive invalid events exceeded the configured tolerance; this
    /// signals a likely configuration bug rather than a data problem.
    #[error("{consecutive} consecutive invalid events exceed the warning tolerance")]
    ToleranceExceeded {
        /// Invalid-event run length, this event included.
        consecutive: u32,
        /// The failure that tripped the tolerance.
        #[source]
        source: Box<EventError>,
    },
}

/// Per-event inputs: measured frame momenta, group-level momenta (e.g. the
/// event's missing momentum for an invisible group), and observed objects
/// for combinatoric groups.
#[derive(Debug, Clone, Default)]
pub struct EventInput {
    pub(crate) momenta: FxHashMap<FrameIdx, FourVec>,
    pub(crate) group_momenta: FxHashMap<GroupIdx, FourVec>,
    pub(crate) objects: FxHashMap<GroupIdx, Vec<VisObject>>,
}

impl EventInput {
    /// Creates an empty event record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the measured momentum of an ungrouped visible frame.
    pub fn set_frame_momentum(&mut self, frame: FrameIdx, p4: FourVec) -> &mut Self {
        self.momenta.insert(frame, p4);
        self
    }

    /// Supplies a group's top-level momentum (vanilla and invisible groups).
    pub fn set_group_momentum(&mut self, group: GroupIdx, p4: FourVec) -> &mut Self {
        self.group_momenta.insert(group, p4);
        self
    }

    /// Adds an observed object to a combinatoric group.
    pub fn add_object(&mut self, group: GroupIdx, object: VisObject) -> &mut Self {
        self.objects.entry(group).or_default().push(object);
        self
    }
}

/// Per-event execution context threaded through jigsaw dispatch.
///
/// Structural data (`jigsaws`) is immutable for the whole event; only the
/// pool, the object table, and the executed set mutate.
pub(crate) struct EventCtx<'a> {
    pub jigsaws: &'a [Jigsaw],
    pub pool: &'a mut StatePool,
    pub objects: &'a mut FxHashMap<StateIdx, Vec<VisObject>>,
    pub executed: &'a mut FxHashSet<JigsawIdx>,
    pub telemetry: &'a dyn TelemetrySink,
}

/// Runs one jigsaw. `mark` records it in the executed set; candidate-time
/// cascades pass `false` so dependents re-run for every candidate.
pub(crate) fn run_jigsaw(
    ctx: &mut EventCtx<'_>,
    j: JigsawIdx,
    mark: bool,
) -> Result<(), EventError> {
    let jigsaws = ctx.jigsaws;
    let jig = &jigsaws[j.index()];
    match jig.kind {
        JigsawKind::Vanilla | JigsawKind::Invisible => {
            let Some(resolver) = jig.resolver.as_ref() else {
                return Err(EventError::ResolverFailed {
                    jigsaw: jig.label.clone(),
                    source: ResolveError::MissingInput,
                });
            };
            let mut view = ResolveView {
                pool: &mut *ctx.pool,
                jigsaw: jig,
            };
            resolver
                .resolve(&mut view)
                .map_err(|source| EventError::ResolverFailed {
                    jigsaw: jig.label.clone(),
                    source,
                })?;
        }
        JigsawKind::Combinatoric => comb::run_assignment(ctx, j)?,
    }
    if mark {
        ctx.executed.insert(j);
    }
    Ok(())
}

fn run_ordered(
    exec: &[JigsawIdx],
    ctx: &mut EventCtx<'_>,
) -> Result<(), (Option<GroupIdx>, EventError)> {
    for &j in exec {
        if ctx.executed.contains(&j) {
            continue;
        }
        if let Err(err) = run_jigsaw(ctx, j, true) {
            return Err((Some(ctx.jigsaws[j.index()].group), err));
        }
    }
    Ok(())
}

/// The resolution engine.
pub struct Engine {
    catalog: FrameCatalog,
    groups: Vec<Group>,
    jigsaws: Vec<Jigsaw>,
    pool: StatePool,
    /// Measured states for ungrouped visible frames referenced by
    /// dependency slots, created lazily during wiring.
    measured: FxHashMap<FrameIdx, StateIdx>,
    /// Terminal single-frame state per frame.
    terminal: FxHashMap<FrameIdx, StateIdx>,
    exec: Vec<JigsawIdx>,
    phase: Phase,
    telemetry: Arc<dyn TelemetrySink>,
    tolerance: u32,
    consecutive_invalid: u32,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("frames", &self.catalog.len())
            .field("groups", &self.groups.len())
            .field("jigsaws", &self.jigsaws.len())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Constructs an engine with no telemetry.
    pub fn new() -> Self {
        Self::with_telemetry(Arc::new(NullTelemetrySink))
    }

    /// Constructs an engine that reports search activity to `telemetry`.
    pub fn with_telemetry(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            catalog: FrameCatalog::new(),
            groups: Vec::new(),
            jigsaws: Vec::new(),
            pool: StatePool::new(),
            measured: FxHashMap::default(),
            terminal: FxHashMap::default(),
            exec: Vec::new(),
            phase: Phase::Unconfigured,
            telemetry,
            tolerance: 100,
            consecutive_invalid: 0,
        }
    }

    /// Current engine lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Lifecycle phase of one group, if the handle is valid.
    pub fn group_phase(&self, group: GroupIdx) -> Option<Phase> {
        self.groups.get(group.index()).map(|g| g.phase)
    }

    /// Sets how many consecutive invalid events are tolerated before the
    /// failure escalates to [`EventError::ToleranceExceeded`].
    pub fn set_warning_tolerance(&mut self, tolerance: u32) {
        self.tolerance = tolerance;
    }

    // ------------------------------------------------------------------
    // Configuration surface (open until `initialize_analysis`)
    // ------------------------------------------------------------------

    fn ensure_configurable(&self) -> Result<(), ConfigError> {
        if self.phase.is_initialized() {
            return Err(ConfigError::AlreadyInitialized);
        }
        Ok(())
    }

    /// Registers a visible (measured) frame.
    pub fn add_visible_frame(&mut self, label: &str) -> Result<FrameIdx, ConfigError> {
        self.ensure_configurable()?;
        self.catalog.register(label, FrameKind::Visible)
    }

    /// Registers an invisible (solved-for) frame.
    pub fn add_invisible_frame(&mut self, label: &str) -> Result<FrameIdx, ConfigError> {
        self.ensure_configurable()?;
        self.catalog.register(label, FrameKind::Invisible)
    }

    /// Registers a group of jointly resolved frames.
    pub fn add_group(&mut self, label: &str, kind: GroupKind) -> Result<GroupIdx, ConfigError> {
        self.ensure_configurable()?;
        if self.groups.iter().any(|g| g.label == label) {
            return Err(ConfigError::DuplicateGroupLabel(label.to_owned()));
        }
        debug_assert!(self.groups.len() < u32::MAX as usize, "group arena overflow");
        #[allow(clippy::cast_possible_truncation)]
        let idx = GroupIdx(self.groups.len() as u32);
        self.groups.push(Group {
            label: label.to_owned(),
            kind,
            frames: FrameSet::new(),
            pool: Vec::new(),
            top_state: None,
            states: Vec::new(),
            phase: Phase::Unconfigured,
        });
        Ok(idx)
    }

    /// Adds a frame to a group. Invisible groups take invisible frames;
    /// vanilla and combinatoric groups take visible frames.
    pub fn add_frame_to_group(
        &mut self,
        group: GroupIdx,
        frame: FrameIdx,
    ) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        let record = self.catalog.get(frame).ok_or(ConfigError::UnknownFrame)?;
        let g = self
            .groups
            .get(group.index())
            .ok_or(ConfigError::UnknownGroup)?;
        let wanted = match g.kind {
            GroupKind::Invisible => FrameKind::Invisible,
            GroupKind::Vanilla | GroupKind::Combinatoric => FrameKind::Visible,
        };
        if record.kind != wanted {
            return Err(ConfigError::FrameKindMismatch {
                frame: record.label.clone(),
                group: g.label.clone(),
            });
        }
        self.catalog.set_group(frame, group)?;
        self.groups[group.index()].frames.insert(frame);
        Ok(())
    }

    fn add_jigsaw(
        &mut self,
        group: GroupIdx,
        label: &str,
        kind: JigsawKind,
        children: usize,
        dependencies: usize,
        resolver: Option<Box<dyn Resolver>>,
        metric: Option<Box<dyn AssignmentMetric>>,
    ) -> Result<JigsawIdx, ConfigError> {
        self.ensure_configurable()?;
        if self.groups.get(group.index()).is_none() {
            return Err(ConfigError::UnknownGroup);
        }
        if self.jigsaws.iter().any(|j| j.label == label) {
            return Err(ConfigError::DuplicateJigsawLabel(label.to_owned()));
        }
        if children == 0 {
            return Err(ConfigError::NoChildSlots {
                jigsaw: label.to_owned(),
            });
        }
        debug_assert!(self.jigsaws.len() < u32::MAX as usize, "jigsaw arena overflow");
        #[allow(clippy::cast_possible_truncation)]
        let idx = JigsawIdx(self.jigsaws.len() as u32);
        self.jigsaws.push(Jigsaw {
            id: make_jigsaw_id(label),
            label: label.to_owned(),
            kind,
            group,
            parent_state: None,
            child_slots: (0..children).map(|_| ChildSlot::new()).collect(),
            dependency_slots: (0..dependencies).map(|_| DependencySlot::new()).collect(),
            resolver,
            metric,
            deps: Vec::new(),
            cluster: Vec::new(),
        });
        self.groups[group.index()].pool.push(idx);
        Ok(idx)
    }

    /// Adds a vanilla jigsaw candidate to a group's pool.
    pub fn add_vanilla_jigsaw(
        &mut self,
        group: GroupIdx,
        label: &str,
        children: usize,
        dependencies: usize,
        resolver: Box<dyn Resolver>,
    ) -> Result<JigsawIdx, ConfigError> {
        self.add_jigsaw(
            group,
            label,
            JigsawKind::Vanilla,
            children,
            dependencies,
            Some(resolver),
            None,
        )
    }

    /// Adds an invisible jigsaw candidate to a group's pool.
    pub fn add_invisible_jigsaw(
        &mut self,
        group: GroupIdx,
        label: &str,
        children: usize,
        dependencies: usize,
        resolver: Box<dyn Resolver>,
    ) -> Result<JigsawIdx, ConfigError> {
        self.add_jigsaw(
            group,
            label,
            JigsawKind::Invisible,
            children,
            dependencies,
            Some(resolver),
            None,
        )
    }

    /// Adds a combinatoric jigsaw candidate to a group's pool.
    pub fn add_combinatoric_jigsaw(
        &mut self,
        group: GroupIdx,
        label: &str,
        buckets: usize,
        dependencies: usize,
        metric: Box<dyn AssignmentMetric>,
    ) -> Result<JigsawIdx, ConfigError> {
        self.add_jigsaw(
            group,
            label,
            JigsawKind::Combinatoric,
            buckets,
            dependencies,
            None,
            Some(metric),
        )
    }

    fn jigsaw_mut(&mut self, jigsaw: JigsawIdx) -> Result<&mut Jigsaw, ConfigError> {
        self.jigsaws
            .get_mut(jigsaw.index())
            .ok_or(ConfigError::UnknownJigsaw)
    }

    /// Binds `frame` to child slot `slot` of `jigsaw`.
    pub fn add_child_frame(
        &mut self,
        jigsaw: JigsawIdx,
        slot: usize,
        frame: FrameIdx,
    ) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        if self.catalog.get(frame).is_none() {
            return Err(ConfigError::UnknownFrame);
        }
        let jig = self.jigsaw_mut(jigsaw)?;
        let label = jig.label.clone();
        let child = jig
            .child_slots
            .get_mut(slot)
            .ok_or(ConfigError::UnknownSlot {
                jigsaw: label,
                slot,
            })?;
        child.frames.insert(frame);
        Ok(())
    }

    /// Binds `frame` to dependency slot `slot` of `jigsaw`.
    pub fn add_dependency_frame(
        &mut self,
        jigsaw: JigsawIdx,
        slot: usize,
        frame: FrameIdx,
    ) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        if self.catalog.get(frame).is_none() {
            return Err(ConfigError::UnknownFrame);
        }
        let jig = self.jigsaw_mut(jigsaw)?;
        let label = jig.label.clone();
        let dep = jig
            .dependency_slots
            .get_mut(slot)
            .ok_or(ConfigError::UnknownSlot {
                jigsaw: label,
                slot,
            })?;
        dep.frames.insert(frame);
        Ok(())
    }

    fn combinatoric_mut(&mut self, jigsaw: JigsawIdx) -> Result<&mut Jigsaw, ConfigError> {
        let jig = self
            .jigsaws
            .get_mut(jigsaw.index())
            .ok_or(ConfigError::UnknownJigsaw)?;
        if jig.kind != JigsawKind::Combinatoric {
            return Err(ConfigError::NotCombinatoric {
                jigsaw: jig.label.clone(),
            });
        }
        Ok(jig)
    }

    /// Sets the cardinality constraint of bucket `slot`.
    pub fn set_cardinality(
        &mut self,
        jigsaw: JigsawIdx,
        slot: usize,
        cardinality: Cardinality,
    ) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        let jig = self.combinatoric_mut(jigsaw)?;
        let label = jig.label.clone();
        let child = jig
            .child_slots
            .get_mut(slot)
            .ok_or(ConfigError::UnknownSlot {
                jigsaw: label,
                slot,
            })?;
        child.cardinality = cardinality;
        Ok(())
    }

    /// Requires bucket `slot` to carry an exact aggregate charge.
    pub fn set_bucket_charge(
        &mut self,
        jigsaw: JigsawIdx,
        slot: usize,
        charge: i64,
    ) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        let jig = self.combinatoric_mut(jigsaw)?;
        let label = jig.label.clone();
        let child = jig
            .child_slots
            .get_mut(slot)
            .ok_or(ConfigError::UnknownSlot {
                jigsaw: label,
                slot,
            })?;
        child.charge = Some(charge);
        Ok(())
    }

    /// Requires the objects behind dependency slot `slot` to carry an exact
    /// aggregate charge, checked after the dependent cluster runs.
    pub fn set_dependency_charge(
        &mut self,
        jigsaw: JigsawIdx,
        slot: usize,
        charge: i64,
    ) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        let jig = self.combinatoric_mut(jigsaw)?;
        let label = jig.label.clone();
        let dep = jig
            .dependency_slots
            .get_mut(slot)
            .ok_or(ConfigError::UnknownSlot {
                jigsaw: label,
                slot,
            })?;
        dep.charge = Some(charge);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural resolution
    // ------------------------------------------------------------------

    /// Performs structural resolution: validates the configuration, builds
    /// each group's state/jigsaw subgraph, wires dependency slots, and
    /// commits the event-wide execution order. Runs once; afterwards the
    /// configuration surface is closed.
    pub fn initialize_analysis(&mut self) -> Result<(), ConfigError> {
        self.ensure_configurable()?;
        self.validate_groups()?;
        self.validate_jigsaws()?;

        {
            let Self {
                groups,
                jigsaws,
                pool,
                catalog,
                ..
            } = self;
            for group in groups.iter_mut() {
                group::resolve_unknowns(group, jigsaws, pool, catalog)?;
            }
        }
        self.collect_terminals();
        self.wire_dependencies()?;

        let mut bound: Vec<JigsawIdx> = Vec::new();
        for (i, jig) in self.jigsaws.iter().enumerate() {
            if jig.is_bound() {
                #[allow(clippy::cast_possible_truncation)]
                let idx = JigsawIdx(i as u32);
                bound.push(idx);
            } else {
                debug!(jigsaw = %jig.label, "candidate jigsaw left unused by resolution");
            }
        }

        let closures = sched::dependency_closures(&bound, &self.jigsaws, &self.pool);
        for &j in &bound {
            let mut deps: Vec<JigsawIdx> = closures[j.index()].iter().copied().collect();
            deps.sort_unstable();
            self.jigsaws[j.index()].deps = deps;
        }
        let plan = sched::plan_execution(&bound, &self.jigsaws, &self.pool, &closures)?;
        self.exec = plan.order;
        for (j, cluster) in plan.clusters {
            self.jigsaws[j.index()].cluster = cluster;
        }

        self.phase = Phase::StructurallyResolved;
        for g in &mut self.groups {
            g.phase = Phase::StructurallyResolved;
        }
        debug!(
            jigsaws = self.exec.len(),
            states = self.pool.len(),
            "structural resolution complete"
        );
        Ok(())
    }

    fn validate_groups(&self) -> Result<(), ConfigError> {
        for g in &self.groups {
            if g.frames.is_empty() {
                return Err(ConfigError::EmptyGroup {
                    group: g.label.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_jigsaws(&self) -> Result<(), ConfigError> {
        for jig in &self.jigsaws {
            for (slot, child) in jig.child_slots.iter().enumerate() {
                if child.frames.is_empty() {
                    return Err(ConfigError::EmptyChildSlot {
                        jigsaw: jig.label.clone(),
                        slot,
                    });
                }
            }
            for (slot, dep) in jig.dependency_slots.iter().enumerate() {
                if dep.frames.is_empty() {
                    return Err(ConfigError::EmptyDependencySlot {
                        jigsaw: jig.label.clone(),
                        slot,
                    });
                }
            }
            for (i, a) in jig.child_slots.iter().enumerate() {
                for b in jig.child_slots.iter().skip(i + 1) {
                    if !a.frames.is_disjoint_from(&b.frames) {
                        return Err(ConfigError::OverlappingChildSlots {
                            jigsaw: jig.label.clone(),
                        });
                    }
                }
            }
            let group_frames = &self.groups[jig.group.index()].frames;
            for child in &jig.child_slots {
                for frame in child.frames.iter() {
                    if !group_frames.contains(frame) {
                        return Err(ConfigError::FrameNotInGroup {
                            jigsaw: jig.label.clone(),
                            frame: self.catalog.label(frame).to_owned(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_terminals(&mut self) {
        for g in &self.groups {
            for &state in &g.states {
                let record = self.pool.get(state);
                // Terminal: single frame and nothing consumes it further.
                if record.frames.len() == 1 && record.consumer.is_none() {
                    if let Some(frame) = record.frames.first() {
                        let prior = self.terminal.insert(frame, state);
                        debug_assert!(prior.is_none(), "one terminal state per frame");
                    }
                }
            }
        }
    }

    fn measured_state_for(&mut self, frame: FrameIdx) -> Option<StateIdx> {
        if let Some(&state) = self.measured.get(&frame) {
            return Some(state);
        }
        let record = self.catalog.get(frame)?;
        if record.kind != FrameKind::Visible || record.group.is_some() {
            return None;
        }
        let state = self.pool.alloc(FrameSet::single(frame));
        self.measured.insert(frame, state);
        self.terminal.insert(frame, state);
        Some(state)
    }

    fn cover_frames(
        &mut self,
        frames: &FrameSet,
        jigsaw_label: &str,
    ) -> Result<Vec<StateIdx>, ConfigError> {
        let mut remaining = frames.clone();
        let mut states = Vec::new();
        while let Some(frame) = remaining.first() {
            let mut found: Vec<StateIdx> = Vec::new();
            match self.catalog.group(frame) {
                Some(g) => group::leaf_states_within(
                    &self.groups[g.index()],
                    &self.jigsaws,
                    &self.pool,
                    &remaining,
                    &mut found,
                ),
                None => found.extend(self.measured_state_for(frame)),
            }
            let mut frame_covered = false;
            for &state in &found {
                let covered = self.pool.get(state).frames.clone();
                for f in covered.iter() {
                    if f == frame {
                        frame_covered = true;
                    }
                    remaining.remove(f);
                }
                states.push(state);
            }
            if !frame_covered {
                return Err(ConfigError::DependencyNotProducible {
                    jigsaw: jigsaw_label.to_owned(),
                    frame: self.catalog.label(frame).to_owned(),
                });
            }
        }
        Ok(states)
    }

    fn wire_dependencies(&mut self) -> Result<(), ConfigError> {
        let mut slots: Vec<(usize, usize, FrameSet, String)> = Vec::new();
        for (jidx, jig) in self.jigsaws.iter().enumerate() {
            if !jig.is_bound() {
                continue;
            }
            for (sidx, dep) in jig.dependency_slots.iter().enumerate() {
                slots.push((jidx, sidx, dep.frames.clone(), jig.label.clone()));
            }
        }
        for (jidx, sidx, frames, label) in slots {
            let states = self.cover_frames(&frames, &label)?;
            self.jigsaws[jidx].dependency_slots[sidx].states = states;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Per-event analysis
    // ------------------------------------------------------------------

    /// Analyzes one event: loads measured and group-level inputs, then runs
    /// every jigsaw in the committed execution order. Failure marks the
    /// event invalid for the offending group; the structure stays sound.
    pub fn analyze_event(&mut self, event: &EventInput) -> Result<(), EventError> {
        if !self.phase.is_initialized() {
            return Err(EventError::NotInitialized);
        }
        self.pool.begin_event();
        for g in &mut self.groups {
            g.phase = Phase::StructurallyResolved;
        }

        let mut objects: FxHashMap<StateIdx, Vec<VisObject>> = FxHashMap::default();

        let mut failure: Option<(Option<GroupIdx>, EventError)> = None;
        for (&frame, &state) in &self.measured {
            if let Some(&p4) = event.momenta.get(&frame) {
                self.pool.set_p4(state, p4);
            } else {
                failure = Some((
                    None,
                    EventError::MissingMomentum {
                        frame: self.catalog.label(frame).to_owned(),
                    },
                ));
                break;
            }
        }
        if let Some((g, err)) = failure {
            return self.fail_event(g, err);
        }

        for (gidx, g) in self.groups.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let handle = GroupIdx(gidx as u32);
            let Some(top) = g.top_state else { continue };
            match g.kind {
                GroupKind::Vanilla | GroupKind::Invisible => {
                    if let Some(&p4) = event.group_momenta.get(&handle) {
                        self.pool.set_p4(top, p4);
                    } else {
                        failure = Some((
                            Some(handle),
                            EventError::MissingGroupMomentum {
                                group: g.label.clone(),
                            },
                        ));
                        break;
                    }
                }
                GroupKind::Combinatoric => {
                    let objs = event.objects.get(&handle).cloned().unwrap_or_default();
                    let total: FourVec = objs.iter().map(|o| o.p4).sum();
                    self.pool.set_p4(top, total);
                    objects.insert(top, objs);
                }
            }
        }
        if let Some((g, err)) = failure {
            return self.fail_event(g, err);
        }

        let result = {
            let mut executed: FxHashSet<JigsawIdx> = FxHashSet::default();
            let mut ctx = EventCtx {
                jigsaws: &self.jigsaws,
                pool: &mut self.pool,
                objects: &mut objects,
                executed: &mut executed,
                telemetry: self.telemetry.as_ref(),
            };
            run_ordered(&self.exec, &mut ctx)
        };

        match result {
            Ok(()) => {
                self.phase = Phase::EventValid;
                for g in &mut self.groups {
                    g.phase = Phase::EventValid;
                }
                self.consecutive_invalid = 0;
                Ok(())
            }
            Err((g, err)) => self.fail_event(g, err),
        }
    }

    fn fail_event(
        &mut self,
        group: Option<GroupIdx>,
        err: EventError,
    ) -> Result<(), EventError> {
        self.phase = Phase::EventInvalid;
        if let Some(g) = group {
            if let Some(record) = self.groups.get_mut(g.index()) {
                record.phase = Phase::EventInvalid;
            }
        }
        self.consecutive_invalid += 1;
        warn!(
            error = %err,
            consecutive = self.consecutive_invalid,
            "event analysis failed"
        );
        if self.consecutive_invalid > self.tolerance {
            return Err(EventError::ToleranceExceeded {
                consecutive: self.consecutive_invalid,
                source: Box::new(err),
            });
        }
        Err(err)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The committed event-wide execution order.
    pub fn execution_order(&self) -> &[JigsawIdx] {
        &self.exec
    }

    /// The co-executed cluster of `jigsaw` (empty for most jigsaws).
    pub fn cluster_of(&self, jigsaw: JigsawIdx) -> &[JigsawIdx] {
        self.jigsaws
            .get(jigsaw.index())
            .map_or(&[], |j| j.cluster.as_slice())
    }

    /// Every jigsaw that must run before `jigsaw` (transitive; mutual
    /// partners list each other). Sorted by handle.
    pub fn dependencies_of(&self, jigsaw: JigsawIdx) -> &[JigsawIdx] {
        self.jigsaws
            .get(jigsaw.index())
            .map_or(&[], |j| j.deps.as_slice())
    }

    /// Label of a jigsaw handle, for diagnostics.
    pub fn jigsaw_label(&self, jigsaw: JigsawIdx) -> &str {
        self.jigsaws
            .get(jigsaw.index())
            .map_or("<unknown jigsaw>", |j| j.label.as_str())
    }

    /// Label of a frame handle, for diagnostics.
    pub fn frame_label(&self, frame: FrameIdx) -> &str {
        self.catalog.label(frame)
    }

    /// The momentum resolved for `frame` during the current event, if the
    /// event reached it.
    pub fn frame_momentum(&self, frame: FrameIdx) -> Option<FourVec> {
        let state = self.terminal.get(&frame)?;
        self.pool.p4(*state)
    }
}
