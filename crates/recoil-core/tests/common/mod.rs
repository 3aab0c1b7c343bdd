// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use recoil_core::demo::EvenSplitResolver;
use recoil_core::{ConfigError, Engine, FrameIdx, GroupIdx, GroupKind, JigsawIdx, VisObject};
use recoil_kinem::{FourVec, Vec3};

/// A neutral observed object from spatial momentum and mass.
pub fn obj(px: f64, py: f64, pz: f64, mass: f64) -> VisObject {
    VisObject::neutral(FourVec::from_p3_m(Vec3::new(px, py, pz), mass))
}

/// A charged observed object from spatial momentum and mass.
pub fn charged(px: f64, py: f64, pz: f64, mass: f64, charge: i64) -> VisObject {
    VisObject::new(FourVec::from_p3_m(Vec3::new(px, py, pz), mass), charge)
}

/// Three visible frames in one vanilla group, resolved by a two-level
/// jigsaw chain: `split/abc` peels `{c}` off the top, `split/ab` finishes.
pub struct ThreeFrameSetup {
    pub engine: Engine,
    pub a: FrameIdx,
    pub b: FrameIdx,
    pub c: FrameIdx,
    pub group: GroupIdx,
    pub top: JigsawIdx,
    pub ab: JigsawIdx,
}

/// Builds the three-frame chain without initializing, so tests can keep
/// configuring before `initialize_analysis`.
pub fn three_frame_setup() -> Result<ThreeFrameSetup, ConfigError> {
    let mut engine = Engine::new();
    let a = engine.add_visible_frame("vis_a")?;
    let b = engine.add_visible_frame("vis_b")?;
    let c = engine.add_visible_frame("vis_c")?;
    let group = engine.add_group("vis", GroupKind::Vanilla)?;
    engine.add_frame_to_group(group, a)?;
    engine.add_frame_to_group(group, b)?;
    engine.add_frame_to_group(group, c)?;

    let top = engine.add_vanilla_jigsaw(group, "split/abc", 2, 0, Box::new(EvenSplitResolver))?;
    engine.add_child_frame(top, 0, a)?;
    engine.add_child_frame(top, 0, b)?;
    engine.add_child_frame(top, 1, c)?;

    let ab = engine.add_vanilla_jigsaw(group, "split/ab", 2, 0, Box::new(EvenSplitResolver))?;
    engine.add_child_frame(ab, 0, a)?;
    engine.add_child_frame(ab, 1, b)?;

    Ok(ThreeFrameSetup {
        engine,
        a,
        b,
        c,
        group,
        top,
        ab,
    })
}

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new PRNG with the given seed (zero seeds are bumped to 1).
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Returns the next pseudo-random `u64` in the xorshift64* sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Returns a pseudo-random value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    /// Returns a pseudo-random value in `[-1, 1)`.
    pub fn next_signed(&mut self) -> f64 {
        self.next_unit() * 2.0 - 1.0
    }
}
