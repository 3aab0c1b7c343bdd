// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frame catalog: the engine-side registry of reference frames.
//!
//! The catalog is the minimal stand-in for the frame tree collaborator: it
//! records which frames exist, whether each is visible (measured) or
//! invisible (to be solved for), and which group owns it. Boosts and
//! parent/child bookkeeping stay outside the core.

use rustc_hash::FxHashMap;

use crate::engine::ConfigError;
use crate::frameset::FrameSet;
use crate::ident::{make_frame_id, FrameId, FrameIdx, GroupIdx};

/// Whether a frame's four-momentum is measured or must be solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameKind {
    /// Momentum is supplied by the event record.
    Visible,
    /// Momentum is an unknown that resolution must determine.
    Invisible,
}

#[derive(Debug)]
pub(crate) struct FrameRecord {
    pub label: String,
    pub kind: FrameKind,
    pub group: Option<GroupIdx>,
}

/// Registry of frames known to an engine.
#[derive(Debug, Default)]
pub(crate) struct FrameCatalog {
    records: Vec<FrameRecord>,
    by_id: FxHashMap<FrameId, FrameIdx>,
}

impl FrameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a frame under `label`. Labels must be unique.
    pub fn register(&mut self, label: &str, kind: FrameKind) -> Result<FrameIdx, ConfigError> {
        let id = make_frame_id(label);
        if self.by_id.contains_key(&id) {
            return Err(ConfigError::DuplicateFrameLabel(label.to_owned()));
        }
        debug_assert!(self.records.len() < u32::MAX as usize, "frame arena overflow");
        #[allow(clippy::cast_possible_truncation)]
        let idx = FrameIdx(self.records.len() as u32);
        self.records.push(FrameRecord {
            label: label.to_owned(),
            kind,
            group: None,
        });
        self.by_id.insert(id, idx);
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, frame: FrameIdx) -> Option<&FrameRecord> {
        self.records.get(frame.index())
    }

    pub fn label(&self, frame: FrameIdx) -> &str {
        self.get(frame).map_or("<unknown frame>", |r| r.label.as_str())
    }

    pub fn group(&self, frame: FrameIdx) -> Option<GroupIdx> {
        self.get(frame).and_then(|r| r.group)
    }

    /// Assigns `frame` to `group`; a frame may belong to at most one group.
    pub fn set_group(&mut self, frame: FrameIdx, group: GroupIdx) -> Result<(), ConfigError> {
        let record = self
            .records
            .get_mut(frame.index())
            .ok_or(ConfigError::UnknownFrame)?;
        if record.group.is_some() {
            return Err(ConfigError::FrameAlreadyGrouped {
                frame: record.label.clone(),
            });
        }
        record.group = Some(group);
        Ok(())
    }

    /// Renders a frame set as `{a, b, c}` for diagnostics.
    pub fn describe(&self, frames: &FrameSet) -> String {
        let labels: Vec<&str> = frames.iter().map(|f| self.label(f)).collect();
        format!("{{{}}}", labels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::GroupIdx;

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut catalog = FrameCatalog::new();
        assert!(catalog.register("jet_a", FrameKind::Visible).is_ok());
        let err = catalog.register("jet_a", FrameKind::Invisible);
        assert!(matches!(err, Err(ConfigError::DuplicateFrameLabel(_))));
    }

    #[test]
    fn a_frame_joins_at_most_one_group() {
        let mut catalog = FrameCatalog::new();
        let f = catalog
            .register("nu", FrameKind::Invisible)
            .map_or_else(|_| unreachable!("fresh label"), |f| f);
        assert!(catalog.set_group(f, GroupIdx(0)).is_ok());
        let err = catalog.set_group(f, GroupIdx(1));
        assert!(matches!(err, Err(ConfigError::FrameAlreadyGrouped { .. })));
        assert_eq!(catalog.group(f), Some(GroupIdx(0)));
    }

    #[test]
    fn describe_lists_labels_in_index_order() {
        let mut catalog = FrameCatalog::new();
        let a = catalog
            .register("a", FrameKind::Visible)
            .map_or_else(|_| unreachable!("fresh label"), |f| f);
        let b = catalog
            .register("b", FrameKind::Visible)
            .map_or_else(|_| unreachable!("fresh label"), |f| f);
        let set: FrameSet = [b, a].into_iter().collect();
        assert_eq!(catalog.describe(&set), "{a, b}");
    }
}
