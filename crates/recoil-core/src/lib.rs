// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! recoil-core: jigsaw dependency resolution and combinatorial assignment.
//!
//! The engine decomposes a user-declared set of reference frames into a
//! dependency graph of small resolver units ("jigsaws"). Structural
//! resolution wires each group's frames into a state/jigsaw subgraph once;
//! an event-wide execution order is committed at the same time, including
//! co-executed clusters for mutually dependent jigsaws. Per event, momenta
//! flow through the finished graph, with combinatoric jigsaws searching the
//! object-to-bucket assignment space under pluggable metrics.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::option_if_let_else,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::cast_precision_loss
)]

mod comb;
/// Demo resolvers and a prewired hemisphere-reconstruction engine.
pub mod demo;
mod engine;
mod frame;
mod frameset;
mod group;
mod ident;
mod jigsaw;
mod phase;
mod resolver;
mod sched;
mod state;
mod telemetry;

/// Observed objects fed to combinatoric assignment.
pub use comb::VisObject;
/// The engine, its per-event input record, and the error taxonomies.
pub use engine::{ConfigError, Engine, EventError, EventInput};
/// Frame visibility kinds.
pub use frame::FrameKind;
/// Group behavior kinds.
pub use group::GroupKind;
/// Canonical content ids and compact arena handles.
pub use ident::{
    make_frame_id, make_group_id, make_jigsaw_id, FrameId, FrameIdx, GroupId, GroupIdx, Hash,
    JigsawId, JigsawIdx,
};
/// Jigsaw behavior kinds and bucket cardinality constraints.
pub use jigsaw::{Cardinality, JigsawKind};
/// Lifecycle phases advanced by the two entry points.
pub use phase::Phase;
/// Pluggable resolver and metric seams with their view types.
pub use resolver::{AssignmentMetric, MetricView, ResolveError, Resolver, ResolveView};
/// Telemetry sink for assignment-search observability.
pub use telemetry::{NullTelemetrySink, TelemetrySink};
