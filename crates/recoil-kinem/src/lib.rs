// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! recoil-kinem: kinematics primitives for the recoil engine.
//!
//! Value types only: three-vectors, four-vectors, and the invariant-mass
//! algebra the resolution core needs. Boosts are deliberately absent — the
//! frame tree that owns boost bookkeeping lives outside the core.
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
    clippy::suboptimal_flops,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::float_cmp
)]

mod lorentz;
mod vec3;

/// Four-momentum value type and summation helpers.
pub use lorentz::FourVec;
/// Spatial three-vector with the dot/cross algebra used by hemisphere splits.
pub use vec3::Vec3;
