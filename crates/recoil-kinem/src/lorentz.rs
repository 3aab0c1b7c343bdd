// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Four-momentum value type.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use crate::vec3::Vec3;

/// A four-momentum in `(E, px, py, pz)` components, metric `(+,-,-,-)`.
///
/// Invariant masses are clamped at zero: measured inputs routinely sit a
/// rounding error below the light cone and a NaN mass would poison every
/// downstream metric.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FourVec {
    /// Energy component.
    pub e: f64,
    /// Momentum x component.
    pub px: f64,
    /// Momentum y component.
    pub py: f64,
    /// Momentum z component.
    pub pz: f64,
}

impl FourVec {
    /// The zero four-vector.
    pub const ZERO: Self = Self {
        e: 0.0,
        px: 0.0,
        py: 0.0,
        pz: 0.0,
    };

    /// Constructs a four-vector from energy and momentum components.
    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Constructs a four-vector from a spatial momentum and an invariant mass.
    pub fn from_p3_m(p: Vec3, mass: f64) -> Self {
        let e = libm::sqrt(p.norm2() + mass * mass);
        Self {
            e,
            px: p.x,
            py: p.y,
            pz: p.z,
        }
    }

    /// The spatial momentum three-vector.
    pub fn p3(&self) -> Vec3 {
        Vec3::new(self.px, self.py, self.pz)
    }

    /// Magnitude of the spatial momentum.
    pub fn p(&self) -> f64 {
        self.p3().norm()
    }

    /// Squared invariant mass, `E² − |p|²`. May be slightly negative for
    /// measured inputs.
    pub fn mass2(&self) -> f64 {
        self.e * self.e - self.p3().norm2()
    }

    /// Invariant mass, clamped at zero.
    pub fn mass(&self) -> f64 {
        libm::sqrt(self.mass2().max(0.0))
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.e.is_finite() && self.px.is_finite() && self.py.is_finite() && self.pz.is_finite()
    }
}

impl Add for FourVec {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            e: self.e + rhs.e,
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
        }
    }
}

impl AddAssign for FourVec {
    fn add_assign(&mut self, rhs: Self) {
        self.e += rhs.e;
        self.px += rhs.px;
        self.py += rhs.py;
        self.pz += rhs.pz;
    }
}

impl Sub for FourVec {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            e: self.e - rhs.e,
            px: self.px - rhs.px,
            py: self.py - rhs.py,
            pz: self.pz - rhs.pz,
        }
    }
}

impl Sum for FourVec {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a FourVec> for FourVec {
    fn sum<I: Iterator<Item = &'a FourVec>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + *v)
    }
}
