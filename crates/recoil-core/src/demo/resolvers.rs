// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Physics-free demo resolvers.

use recoil_kinem::FourVec;

use crate::resolver::{ResolveError, Resolver, ResolveView};

/// Splits the parent momentum evenly across all child slots.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvenSplitResolver;

impl Resolver for EvenSplitResolver {
    fn resolve(&self, view: &mut ResolveView<'_>) -> Result<(), ResolveError> {
        let parent = view.parent_p4().ok_or(ResolveError::MissingInput)?;
        let n = view.child_count();
        if n == 0 {
            return Err(ResolveError::InvalidSlot);
        }
        let share = {
            let d = n as f64;
            FourVec::new(parent.e / d, parent.px / d, parent.py / d, parent.pz / d)
        };
        for slot in 0..n {
            view.set_child_p4(slot, share)?;
        }
        Ok(())
    }
}

/// Copies the parent momentum into a single child slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughResolver;

impl Resolver for PassThroughResolver {
    fn resolve(&self, view: &mut ResolveView<'_>) -> Result<(), ResolveError> {
        if view.child_count() != 1 {
            return Err(ResolveError::Unphysical(
                "pass-through requires exactly one child slot",
            ));
        }
        let parent = view.parent_p4().ok_or(ResolveError::MissingInput)?;
        view.set_child_p4(0, parent)
    }
}
