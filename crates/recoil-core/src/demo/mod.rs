// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Demo resolvers and metrics showcasing engine capabilities.
//!
//! Nothing here carries real physics: the resolvers split momenta in the
//! simplest way that exercises the scheduling and assignment machinery, and
//! the builder wires the canonical two-hemisphere reconstruction used by the
//! integration tests and docs.

mod metrics;
mod resolvers;

pub use metrics::{MassDiffMetric, SummedMassMetric};
pub use resolvers::{EvenSplitResolver, PassThroughResolver};

use crate::engine::{ConfigError, Engine};
use crate::group::GroupKind;
use crate::ident::{FrameIdx, GroupIdx, JigsawIdx};

/// Handles into the engine built by [`build_hemisphere_demo_engine`].
#[derive(Debug, Clone, Copy)]
pub struct HemisphereDemo {
    /// The combinatoric group holding both hemisphere frames.
    pub group: GroupIdx,
    /// The hemisphere-partitioning jigsaw.
    pub jigsaw: JigsawIdx,
    /// Frame receiving bucket 0.
    pub bucket_a: FrameIdx,
    /// Frame receiving bucket 1.
    pub bucket_b: FrameIdx,
}

/// Builds an initialized engine that partitions an event's objects into two
/// hemispheres with the summed-mass metric (fast path eligible).
pub fn build_hemisphere_demo_engine() -> Result<(Engine, HemisphereDemo), ConfigError> {
    let mut engine = Engine::new();
    let bucket_a = engine.add_visible_frame("hemi_a")?;
    let bucket_b = engine.add_visible_frame("hemi_b")?;
    let group = engine.add_group("hemispheres", GroupKind::Combinatoric)?;
    engine.add_frame_to_group(group, bucket_a)?;
    engine.add_frame_to_group(group, bucket_b)?;
    let jigsaw =
        engine.add_combinatoric_jigsaw(group, "comb/hemispheres", 2, 0, Box::new(SummedMassMetric))?;
    engine.add_child_frame(jigsaw, 0, bucket_a)?;
    engine.add_child_frame(jigsaw, 1, bucket_b)?;
    engine.initialize_analysis()?;
    Ok((
        engine,
        HemisphereDemo {
            group,
            jigsaw,
            bucket_a,
            bucket_b,
        },
    ))
}
