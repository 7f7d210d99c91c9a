mod support;

use formation::{FormationConfig, FormationWorker, Mesh, scene::FormationId};
use nalgebra::Point3;
use std::time::{Duration, Instant};

use crate::support::{init_logging, sphere_formation, universal_camera_at};

fn worker_config() -> FormationConfig {
    FormationConfig::default()
        .with_max_formations(2)
        .with_max_quaterna(64)
        .with_initial_quaterna(64)
        .with_idle_wait(Duration::from_millis(1))
}

/// Waits for a mesh satisfying `accept`, handing every other mesh straight back.
fn wait_for_mesh(worker: &FormationWorker, accept: impl Fn(&Mesh) -> bool) -> Mesh {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(mesh) = worker.wait_mesh(Duration::from_millis(50)) {
            if accept(&mesh) {
                return mesh;
            }
            worker.return_mesh(mesh).unwrap();
        }
    }
    panic!("no matching mesh within the deadline");
}

#[test]
fn worker_tessellates_added_formations() {
    init_logging();
    let worker = FormationWorker::spawn(worker_config()).unwrap();
    worker.set_camera_ray(universal_camera_at(0.0, 0.0, 2.0)).unwrap();
    worker
        .add_formation(sphere_formation(1, Point3::origin(), 1.0))
        .unwrap();

    let mesh = wait_for_mesh(&worker, |mesh| mesh.num_faces() > 3 * 64);
    assert_eq!(mesh.properties().origin, nalgebra::Vector3::zeros());
    worker.return_mesh(mesh).unwrap();

    {
        let scene = worker.read_lock_tree();
        assert!(scene.polyhedron(FormationId(1)).is_some());
        scene.verify().unwrap();
    }

    worker.remove_formation(FormationId(1)).unwrap();
    wait_for_mesh(&worker, Mesh::is_empty);

    worker.quit().unwrap();
}

#[test]
fn worker_resets_the_origin_on_request() {
    init_logging();
    let worker = FormationWorker::spawn(worker_config()).unwrap();
    worker.set_camera_ray(universal_camera_at(5.0, 0.0, 2.0)).unwrap();
    worker
        .add_formation(sphere_formation(1, Point3::new(5.0, 0.0, 0.0), 1.0))
        .unwrap();
    worker.reset_origin().unwrap();

    let mesh = wait_for_mesh(&worker, |mesh| mesh.properties().origin.x == 5.0 && !mesh.is_empty());
    assert_eq!(mesh.properties().origin, nalgebra::Vector3::new(5.0, 0.0, 2.0));
    worker.quit().unwrap();
}

#[test]
fn flat_shading_toggles_across_the_thread() {
    let worker = FormationWorker::spawn(worker_config()).unwrap();
    worker
        .add_formation(sphere_formation(1, Point3::origin(), 1.0))
        .unwrap();
    worker.toggle_flat_shaded().unwrap();

    let mesh = wait_for_mesh(&worker, |mesh| mesh.properties().flat_shaded);
    assert!(mesh.properties().flat_shaded);
}

#[test]
fn dropping_the_worker_stops_the_thread() {
    let worker = FormationWorker::spawn(worker_config()).unwrap();
    worker.sample_frame_ratio(1.0).unwrap();
    drop(worker);
}
