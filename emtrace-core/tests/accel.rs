//! Cross-checks of the accelerated traversals against the brute-force
//! oracle on randomised scenes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use emtrace_core::accel::{Accelerator, Grid, KdTree, Linear, RayIntersection, RxCrossing};
use emtrace_core::ray::Ray;
use emtrace_core::scene::Scene;
use emtrace_core::{Point3, Vector3};

fn random_scene(rng: &mut StdRng, triangles: usize, receivers: usize) -> Scene {
    let mut scene = Scene::new();
    for _ in 0..triangles {
        let a = Point3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        let b = a + Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let c = a + Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        scene.add_triangle(a, b, c);
    }
    let points: Vec<Point3> = (0..receivers)
        .map(|_| {
            Point3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            )
        })
        .collect();
    scene.attach_receivers(&points, 0.8);
    scene
}

fn random_ray(rng: &mut StdRng) -> Ray {
    let o = Point3::new(
        rng.gen_range(-15.0..15.0),
        rng.gen_range(-15.0..15.0),
        rng.gen_range(-15.0..15.0),
    );
    let d = Vector3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    );
    if d.length() < 1e-3 {
        return Ray::launch(o, Vector3::new(1.0, 0.0, 0.0), 0.0);
    }
    Ray::launch(o, d.normalize(), 0.0)
}

fn sorted_crossings(mut crossings: Vec<RxCrossing>) -> Vec<RxCrossing> {
    crossings.sort_by_key(|c| c.receiver);
    crossings
}

fn assert_same(ray: &Ray, got: RayIntersection, want: RayIntersection) {
    match (&got.occluder, &want.occluder) {
        (Some(g), Some(w)) => {
            assert_eq!(g.triangle, w.triangle, "occluder mismatch for {}", ray);
            assert!((g.distance - w.distance).abs() < 1e-9);
        }
        (None, None) => {}
        _ => panic!(
            "hit/miss disagreement for {}: {:?} vs {:?}",
            ray, got.occluder, want.occluder
        ),
    }
    let got = sorted_crossings(got.crossings);
    let want = sorted_crossings(want.crossings);
    assert_eq!(got.len(), want.len(), "crossing count mismatch for {}", ray);
    for (g, w) in got.iter().zip(&want) {
        assert_eq!(g.receiver, w.receiver);
        assert!((g.distance - w.distance).abs() < 1e-9);
        assert!((g.offset - w.offset).abs() < 1e-9);
    }
}

#[test]
fn kdtree_matches_linear_oracle() {
    let mut rng = StdRng::seed_from_u64(7);
    let scene = random_scene(&mut rng, 300, 20);
    let tree = KdTree::build(&scene);
    for _ in 0..2000 {
        let ray = random_ray(&mut rng);
        assert_same(
            &ray,
            tree.intersect(&scene, &ray),
            Linear.intersect(&scene, &ray),
        );
    }
}

#[test]
fn grid_matches_linear_oracle() {
    let mut rng = StdRng::seed_from_u64(11);
    let scene = random_scene(&mut rng, 300, 20);
    let grid = Grid::build(&scene);
    for _ in 0..2000 {
        let ray = random_ray(&mut rng);
        assert_same(
            &ray,
            grid.intersect(&scene, &ray),
            Linear.intersect(&scene, &ray),
        );
    }
}

#[test]
fn reported_crossings_precede_the_occluder() {
    let mut rng = StdRng::seed_from_u64(23);
    let scene = random_scene(&mut rng, 150, 30);
    let tree = KdTree::build(&scene);
    for _ in 0..2000 {
        let ray = random_ray(&mut rng);
        let result = tree.intersect(&scene, &ray);
        if let Some(hit) = &result.occluder {
            for crossing in &result.crossings {
                assert!(crossing.distance < hit.distance);
            }
        }
    }
}
