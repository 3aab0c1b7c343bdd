// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::three_frame_setup;
use recoil_core::demo::EvenSplitResolver;
use recoil_core::{ConfigError, Engine, EventInput, GroupKind, Phase};
use recoil_kinem::FourVec;

#[test]
fn resolution_resolves_every_member_frame() {
    let mut setup = three_frame_setup().expect("valid configuration");
    setup
        .engine
        .initialize_analysis()
        .expect("pool can resolve all frames");
    assert_eq!(setup.engine.phase(), Phase::StructurallyResolved);

    // Push an event through; every member frame must come out with a momentum.
    let mut event = EventInput::new();
    event.set_group_momentum(setup.group, FourVec::new(8.0, 0.0, 0.0, 4.0));
    setup.engine.analyze_event(&event).expect("valid event");

    // split/abc halves the top into {a,b} and {c}; split/ab halves again.
    assert_eq!(
        setup.engine.frame_momentum(setup.c),
        Some(FourVec::new(4.0, 0.0, 0.0, 2.0))
    );
    assert_eq!(
        setup.engine.frame_momentum(setup.a),
        Some(FourVec::new(2.0, 0.0, 0.0, 1.0))
    );
    assert_eq!(
        setup.engine.frame_momentum(setup.b),
        Some(FourVec::new(2.0, 0.0, 0.0, 1.0))
    );
}

#[test]
fn resolution_wiring_is_deterministic_across_builds() {
    let order_labels = || -> Vec<String> {
        let mut setup = three_frame_setup().expect("valid configuration");
        setup.engine.initialize_analysis().expect("resolvable");
        setup
            .engine
            .execution_order()
            .iter()
            .map(|&j| setup.engine.jigsaw_label(j).to_owned())
            .collect()
    };

    let baseline = order_labels();
    assert_eq!(baseline, vec!["split/abc".to_owned(), "split/ab".to_owned()]);
    for run in 0..5 {
        assert_eq!(order_labels(), baseline, "run {run} wired differently");
    }
}

#[test]
fn tie_break_prefers_fewest_child_slots() {
    let mut setup = three_frame_setup().expect("valid configuration");
    // A three-way split of the same top frame set; the two-way `split/abc`
    // must still win the top state.
    let fine = setup
        .engine
        .add_vanilla_jigsaw(setup.group, "split/fine", 3, 0, Box::new(EvenSplitResolver))
        .expect("open configuration");
    setup.engine.add_child_frame(fine, 0, setup.a).expect("bind a");
    setup.engine.add_child_frame(fine, 1, setup.b).expect("bind b");
    setup.engine.add_child_frame(fine, 2, setup.c).expect("bind c");

    setup.engine.initialize_analysis().expect("resolvable");
    let labels: Vec<&str> = setup
        .engine
        .execution_order()
        .iter()
        .map(|&j| setup.engine.jigsaw_label(j))
        .collect();
    assert_eq!(labels, vec!["split/abc", "split/ab"]);
}

#[test]
fn tie_break_prefers_fewest_dependency_slots() {
    let mut engine = Engine::new();
    let a = engine.add_visible_frame("vis_a").expect("register");
    let b = engine.add_visible_frame("vis_b").expect("register");
    let probe = engine.add_visible_frame("probe").expect("register");
    let group = engine.add_group("vis", GroupKind::Vanilla).expect("group");
    engine.add_frame_to_group(group, a).expect("member a");
    engine.add_frame_to_group(group, b).expect("member b");

    // Same shape, but one candidate drags in an external dependency.
    let needy = engine
        .add_vanilla_jigsaw(group, "split/needy", 2, 1, Box::new(EvenSplitResolver))
        .expect("jigsaw");
    engine.add_child_frame(needy, 0, a).expect("bind");
    engine.add_child_frame(needy, 1, b).expect("bind");
    engine.add_dependency_frame(needy, 0, probe).expect("bind dep");

    let lean = engine
        .add_vanilla_jigsaw(group, "split/lean", 2, 0, Box::new(EvenSplitResolver))
        .expect("jigsaw");
    engine.add_child_frame(lean, 0, a).expect("bind");
    engine.add_child_frame(lean, 1, b).expect("bind");

    engine.initialize_analysis().expect("resolvable");
    let labels: Vec<&str> = engine
        .execution_order()
        .iter()
        .map(|&j| engine.jigsaw_label(j))
        .collect();
    assert_eq!(labels, vec!["split/lean"], "fewest dependencies wins the tie");
}

#[test]
fn unresolvable_group_names_the_stuck_frames() {
    let mut engine = Engine::new();
    let a = engine.add_visible_frame("vis_a").expect("register");
    let b = engine.add_visible_frame("vis_b").expect("register");
    let c = engine.add_visible_frame("vis_c").expect("register");
    let group = engine.add_group("vis", GroupKind::Vanilla).expect("group");
    for f in [a, b, c] {
        engine.add_frame_to_group(group, f).expect("member");
    }
    // Only an {a|b} splitter: nothing can take the three-frame top state.
    let ab = engine
        .add_vanilla_jigsaw(group, "split/ab", 2, 0, Box::new(EvenSplitResolver))
        .expect("jigsaw");
    engine.add_child_frame(ab, 0, a).expect("bind");
    engine.add_child_frame(ab, 1, b).expect("bind");

    let err = engine.initialize_analysis().expect_err("must be stuck");
    match err {
        ConfigError::UnresolvedFrames { group, frames } => {
            assert_eq!(group, "vis");
            assert!(frames.contains("vis_a") && frames.contains("vis_c"));
        }
        other => unreachable!("unexpected error: {other}"),
    }
}

#[test]
fn overlapping_child_slots_are_rejected() {
    let mut setup = three_frame_setup().expect("valid configuration");
    // Claim vis_b from two slots of one jigsaw.
    setup.engine.add_child_frame(setup.top, 1, setup.b).expect("bind");
    let err = setup.engine.initialize_analysis().expect_err("overlap");
    assert!(matches!(err, ConfigError::OverlappingChildSlots { .. }));
}

#[test]
fn a_frame_cannot_join_two_groups() {
    let mut setup = three_frame_setup().expect("valid configuration");
    let second = setup
        .engine
        .add_group("vis2", GroupKind::Vanilla)
        .expect("group");
    let err = setup
        .engine
        .add_frame_to_group(second, setup.a)
        .expect_err("already grouped");
    assert!(matches!(err, ConfigError::FrameAlreadyGrouped { .. }));
}

#[test]
fn configuration_surface_closes_after_initialization() {
    let mut setup = three_frame_setup().expect("valid configuration");
    setup.engine.initialize_analysis().expect("resolvable");
    let err = setup.engine.add_visible_frame("late").expect_err("closed");
    assert!(matches!(err, ConfigError::AlreadyInitialized));
}

#[test]
fn empty_group_is_a_configuration_error() {
    let mut engine = Engine::new();
    engine.add_group("empty", GroupKind::Vanilla).expect("group");
    let err = engine.initialize_analysis().expect_err("empty group");
    assert!(matches!(err, ConfigError::EmptyGroup { .. }));
}
