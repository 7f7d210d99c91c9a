mod support;

use formation::{NodeBuffer, float_types::Real};

use crate::support::{camera_at, init_logging, small_config, sphere_buffer};

fn leaves_below_equator(buffer: &NodeBuffer) -> usize {
    buffer.leaves().filter(|leaf| leaf.center.z < 0.0).count()
}

#[test]
fn one_tick_with_a_single_quaterna_expands_the_root() {
    init_logging();
    let (mut buffer, root, shader) = sphere_buffer(&small_config(1));
    assert!(buffer.is_growing());

    let stats = buffer.tick(&camera_at(0.0, 0.0, 2.0), &shader);

    assert_eq!(stats.expansions, 1);
    assert_eq!(buffer.num_quaterna_used(), 1);
    assert!(!buffer.is_growing());
    assert!(buffer.node(root).is_expanded());
    assert_eq!(buffer.leaves().count(), 4);
    buffer.verify().unwrap();
}

#[test]
fn second_tick_with_the_same_camera_does_nothing() {
    init_logging();
    let (mut buffer, _, shader) = sphere_buffer(&small_config(64));
    let camera = camera_at(0.0, 0.0, 2.0);

    let first = buffer.tick(&camera, &shader);
    assert!(first.rescored);
    assert_eq!(buffer.num_quaterna_used(), 64);

    let second = buffer.tick(&camera, &shader);
    assert!(!second.rescored);
    assert_eq!(second.expansions, 0);
    assert_eq!(second.passes, 1);
    buffer.verify().unwrap();
}

#[test]
fn invariants_hold_while_the_camera_orbits() {
    init_logging();
    let (mut buffer, _, shader) = sphere_buffer(&small_config(48));

    for step in 0..24 {
        let angle = step as Real * 0.5;
        let camera = camera_at(1.5 * angle.cos(), 1.5 * angle.sin(), 0.4);
        buffer.tick(&camera, &shader);
        buffer.verify().unwrap();

        // Sorted best first after each pass.
        buffer.update_quaterna();
        assert_eq!(buffer.num_quaterna_sorted(), buffer.num_quaterna_used());
        for pair in buffer.used_quaterna().windows(2) {
            assert!(pair[0].parent_score >= pair[1].parent_score);
        }
        assert_eq!(buffer.num_nodes_used(), buffer.num_quaterna_used() * 4 + 1);
    }
}

#[test]
fn detail_follows_the_camera_at_a_fixed_budget() {
    init_logging();
    let (mut buffer, _, shader) = sphere_buffer(&small_config(24));

    buffer.tick(&camera_at(0.0, 0.0, 1.5), &shader);
    let before = leaves_below_equator(&buffer);
    assert_eq!(buffer.num_quaterna_used(), 24);

    let stats = buffer.tick(&camera_at(0.0, 0.0, -1.5), &shader);
    assert!(stats.rescored);
    assert!(stats.expansions > 0);
    assert_eq!(buffer.num_quaterna_used(), 24);
    assert!(leaves_below_equator(&buffer) > before);
    buffer.verify().unwrap();
}

#[test]
fn growing_stops_at_the_target() {
    let (mut buffer, _, shader) = sphere_buffer(&small_config(64));
    buffer.set_num_quaterna_used_target(10);
    assert_eq!(buffer.worse_replaceable_quaterna_score(), Real::NEG_INFINITY);

    buffer.tick(&camera_at(0.0, 2.0, 0.0), &shader);
    assert_eq!(buffer.num_quaterna_used(), 10);
    assert!(!buffer.is_growing());

    buffer.set_num_quaterna_used_target(20);
    assert!(buffer.is_growing());
    buffer.tick(&camera_at(0.0, 2.0, 0.0), &shader);
    assert_eq!(buffer.num_quaterna_used(), 20);
    buffer.verify().unwrap();
}

#[test]
fn reducing_the_target_to_zero_releases_every_quaterna() {
    init_logging();
    let (mut buffer, root, shader) = sphere_buffer(&small_config(40));
    buffer.tick(&camera_at(0.0, 0.0, 2.0), &shader);
    assert_eq!(buffer.num_quaterna_used(), 40);

    buffer.set_num_quaterna_used_target(0);

    assert!(!buffer.is_growing());
    assert_eq!(buffer.num_quaterna_used(), 0);
    assert_eq!(buffer.num_quaterna_used_target(), 0);
    // Only the root's own tetrahedron remains.
    assert_eq!(buffer.points().len(), 4);
    assert!(buffer.node(root).is_expandable());
    buffer.verify().unwrap();

    // Nothing to expand into.
    let stats = buffer.tick(&camera_at(0.0, 0.0, 2.0), &shader);
    assert_eq!(stats.expansions, 0);
}

#[test]
fn partial_reduction_keeps_the_best_quaterna() {
    let (mut buffer, root, shader) = sphere_buffer(&small_config(32));
    buffer.tick(&camera_at(2.0, 0.0, 0.0), &shader);

    buffer.set_num_quaterna_used_target(8);
    assert_eq!(buffer.num_quaterna_used(), 8);
    // The root's quaterna outscores everything and is never the one released.
    assert!(buffer.node(root).is_expanded());
    buffer.verify().unwrap();
}

#[test]
fn collapse_returns_points_and_regrowth_reuses_them() {
    init_logging();
    let (mut buffer, root, shader) = sphere_buffer(&small_config(64));
    // Off-axis, so no two candidates tie and regrowth takes the same path.
    let camera = camera_at(0.3, 0.7, 1.9);

    buffer.tick(&camera, &shader);
    let grown = buffer.points().len();
    assert!(grown > 4);

    buffer.collapse_nodes(root);
    assert_eq!(buffer.num_quaterna_used(), 0);
    assert_eq!(buffer.points().len(), 4);
    buffer.verify().unwrap();
    let high_water = buffer.points().high_water_mark();

    buffer.tick(&camera, &shader);
    assert_eq!(buffer.points().len(), grown);
    buffer.collapse_nodes(root);
    assert_eq!(buffer.points().high_water_mark(), high_water);
    buffer.verify().unwrap();
}

#[test]
fn fixed_target_ignores_requests() {
    let config = small_config(32).with_fixed_quaterna(8);
    let (mut buffer, _, shader) = sphere_buffer(&config);
    assert_eq!(buffer.num_quaterna_used_target(), 8);

    buffer.set_num_quaterna_used_target(30);
    assert_eq!(buffer.num_quaterna_used_target(), 8);

    buffer.tick(&camera_at(0.0, 0.0, 2.0), &shader);
    buffer.set_num_quaterna_used_target(0);
    assert_eq!(buffer.num_quaterna_used(), 8);
}

#[test]
fn rescoring_waits_for_the_camera_to_move_far_enough() {
    let config = small_config(16).with_rescore_distance(0.5);
    let (mut buffer, _, shader) = sphere_buffer(&config);

    assert!(buffer.tick(&camera_at(0.0, 0.0, 2.0), &shader).rescored);
    assert!(!buffer.tick(&camera_at(0.0, 0.1, 2.0), &shader).rescored);
    assert!(buffer.tick(&camera_at(0.0, 1.0, 2.0), &shader).rescored);

    buffer.invalidate_scores();
    assert!(buffer.tick(&camera_at(0.0, 1.0, 2.0), &shader).rescored);
}

#[test]
fn destroying_the_root_empties_the_buffer() {
    let (mut buffer, root, shader) = sphere_buffer(&small_config(16));
    buffer.tick(&camera_at(0.0, 0.0, 2.0), &shader);

    buffer.destroy_root(root);
    assert_eq!(buffer.num_roots(), 0);
    assert_eq!(buffer.num_quaterna_used(), 0);
    assert!(buffer.points().is_empty());
    assert_eq!(buffer.leaves().count(), 0);
    buffer.verify().unwrap();
}
