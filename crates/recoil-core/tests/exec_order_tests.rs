// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use recoil_core::demo::EvenSplitResolver;
use recoil_core::{Engine, EventInput, GroupIdx, GroupKind, JigsawIdx, Phase};
use recoil_kinem::FourVec;

/// Builds a vanilla group over `{x, y, z}` where `split/top` peels `{z}` off
/// and `split/xy` finishes. `split/top` optionally takes a dependency on the
/// `{x}` state, which `split/xy` produces — the canonical mutual shape:
/// `split/top` lists `split/xy` as a state dependency while `split/xy` lists
/// `split/top` as an ancestry dependency.
fn chain_engine(
    create_xy_first: bool,
    top_depends_on_x: bool,
) -> (Engine, GroupIdx, JigsawIdx, JigsawIdx) {
    let mut engine = Engine::new();
    let x = engine.add_visible_frame("vis_x").expect("register");
    let y = engine.add_visible_frame("vis_y").expect("register");
    let z = engine.add_visible_frame("vis_z").expect("register");
    let group = engine.add_group("vis", GroupKind::Vanilla).expect("group");
    for f in [x, y, z] {
        engine.add_frame_to_group(group, f).expect("member");
    }

    let deps = usize::from(top_depends_on_x);
    let add_top = |engine: &mut Engine| {
        let top = engine
            .add_vanilla_jigsaw(group, "split/top", 2, deps, Box::new(EvenSplitResolver))
            .expect("jigsaw");
        engine.add_child_frame(top, 0, x).expect("bind");
        engine.add_child_frame(top, 0, y).expect("bind");
        engine.add_child_frame(top, 1, z).expect("bind");
        if top_depends_on_x {
            engine.add_dependency_frame(top, 0, x).expect("bind dep");
        }
        top
    };
    let add_xy = |engine: &mut Engine| {
        let xy = engine
            .add_vanilla_jigsaw(group, "split/xy", 2, 0, Box::new(EvenSplitResolver))
            .expect("jigsaw");
        engine.add_child_frame(xy, 0, x).expect("bind");
        engine.add_child_frame(xy, 1, y).expect("bind");
        xy
    };

    let (top, xy) = if create_xy_first {
        let xy = add_xy(&mut engine);
        let top = add_top(&mut engine);
        (top, xy)
    } else {
        let top = add_top(&mut engine);
        let xy = add_xy(&mut engine);
        (top, xy)
    };
    engine.initialize_analysis().expect("resolvable");
    (engine, group, top, xy)
}

#[test]
fn ancestry_precedes_descendant_regardless_of_creation_order() {
    for create_xy_first in [false, true] {
        let (engine, _, top, xy) = chain_engine(create_xy_first, false);
        assert_eq!(
            engine.execution_order(),
            &[top, xy],
            "creation order {create_xy_first} must not leak into run order"
        );
    }
}

#[test]
fn every_jigsaw_appears_exactly_once() {
    let (engine, _, _, _) = chain_engine(true, true);
    let order = engine.execution_order();
    assert_eq!(order.len(), 2);
    let mut seen = order.to_vec();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), order.len(), "no jigsaw listed twice");
}

#[test]
fn mutual_dependency_forms_a_co_executed_cluster() {
    let (engine, _, top, xy) = chain_engine(false, true);
    // The outer jigsaw runs first and carries its mutual partner inline.
    assert_eq!(engine.execution_order(), &[top, xy]);
    assert_eq!(engine.cluster_of(top), &[xy]);
    assert!(engine.cluster_of(xy).is_empty());
}

#[test]
fn mutual_pair_still_analyzes_events() {
    let (mut engine, group, _, _) = chain_engine(false, true);
    let mut event = EventInput::new();
    event.set_group_momentum(group, FourVec::new(8.0, 0.0, 0.0, 0.0));
    engine.analyze_event(&event).expect("valid event");
    assert_eq!(engine.phase(), Phase::EventValid);
}

#[test]
fn cross_group_state_dependency_runs_producer_first() {
    let mut engine = Engine::new();
    let a = engine.add_visible_frame("vis_a").expect("register");
    let b = engine.add_visible_frame("vis_b").expect("register");
    let ia = engine.add_invisible_frame("inv_a").expect("register");
    let ib = engine.add_invisible_frame("inv_b").expect("register");

    // Consumer group created (and registered) before its producer.
    let inv = engine
        .add_group("invisible", GroupKind::Invisible)
        .expect("group");
    engine.add_frame_to_group(inv, ia).expect("member");
    engine.add_frame_to_group(inv, ib).expect("member");
    let splitter = engine
        .add_invisible_jigsaw(inv, "inv/split", 2, 1, Box::new(EvenSplitResolver))
        .expect("jigsaw");
    engine.add_child_frame(splitter, 0, ia).expect("bind");
    engine.add_child_frame(splitter, 1, ib).expect("bind");
    engine.add_dependency_frame(splitter, 0, a).expect("bind dep");

    let vis = engine.add_group("vis", GroupKind::Vanilla).expect("group");
    engine.add_frame_to_group(vis, a).expect("member");
    engine.add_frame_to_group(vis, b).expect("member");
    let producer = engine
        .add_vanilla_jigsaw(vis, "vis/split", 2, 0, Box::new(EvenSplitResolver))
        .expect("jigsaw");
    engine.add_child_frame(producer, 0, a).expect("bind");
    engine.add_child_frame(producer, 1, b).expect("bind");

    engine.initialize_analysis().expect("resolvable");
    assert_eq!(
        engine.execution_order(),
        &[producer, splitter],
        "the producer of a dependency state precedes its consumer"
    );
    assert!(engine.cluster_of(splitter).is_empty(), "no mutual cycle here");
    assert!(
        engine.dependencies_of(splitter).contains(&producer),
        "the computed must-run-before list names the producer"
    );
    assert!(engine.dependencies_of(producer).is_empty());
}
