use log::{debug, info};

use crate::accel::{Accelerator, CrossingSet, OccluderHit, RayIntersection};
use crate::bounds::Bounds3;
use crate::geometry::{Axis, Point3};
use crate::ray::Ray;
use crate::scene::{Geometry, Scene};

const MAX_DEPTH: usize = 18;
const MAX_LEAF_SIZE: usize = 8;
/// SAH node-traversal cost.
const KT: f64 = 1.0;
/// SAH per-geometry intersection cost; `KI·|list|` is also the no-split
/// cost floor.
const KI: f64 = 1.5;
/// Tolerance band around a leaf's parameter range; accepts hits on
/// geometry straddling the leaf boundary without reporting it twice.
const LEAF_GUARD: f64 = 1e-3;
/// Two entries per level plus the initial pair; 50 covers depth 18 with
/// room to spare.
const STACK_SIZE: usize = 50;

#[derive(Debug)]
pub enum KdNode {
    Interior {
        axis: Axis,
        split: f64,
        bounds: Bounds3,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
    Leaf {
        bounds: Bounds3,
        items: Vec<u32>,
    },
}

impl KdNode {
    pub fn bounds(&self) -> &Bounds3 {
        match self {
            KdNode::Interior { bounds, .. } | KdNode::Leaf { bounds, .. } => bounds,
        }
    }
}

/// SAH-split k-d tree over the scene's triangles and receiver spheres.
/// Leaves hold indices into the scene's geometry store; straddling
/// geometry is duplicated by index into both subtrees.
#[derive(Debug)]
pub struct KdTree {
    root: Box<KdNode>,
    bounds: Bounds3,
}

#[derive(Debug, Default)]
struct BuildStats {
    interior: usize,
    leaves: usize,
    max_depth: usize,
}

/// Sweep events along one axis. A degenerate (flat) extent yields one
/// `Planar` event, anything else a `Start`/`End` pair. The declaration
/// order is the tie-break order at equal positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    Planar,
    Start,
}

#[derive(Debug, Copy, Clone)]
struct Event {
    position: f64,
    kind: EventKind,
}

impl KdTree {
    pub fn build(scene: &Scene) -> KdTree {
        let n = scene.geometries().len();
        info!("building k-d tree over {} geometries", n);
        let bounds = scene.bounds();
        let items: Vec<u32> = (0..n as u32).collect();
        let mut stats = BuildStats::default();
        let root = Box::new(Self::build_node(scene, items, bounds, 0, &mut stats));
        info!(
            "k-d tree: {} interior nodes, {} leaves, max depth {}",
            stats.interior, stats.leaves, stats.max_depth
        );
        KdTree { root, bounds }
    }

    pub fn root(&self) -> &KdNode {
        &self.root
    }

    fn build_node(
        scene: &Scene,
        items: Vec<u32>,
        bounds: Bounds3,
        depth: usize,
        stats: &mut BuildStats,
    ) -> KdNode {
        stats.max_depth = stats.max_depth.max(depth);
        if items.len() <= MAX_LEAF_SIZE || depth >= MAX_DEPTH {
            stats.leaves += 1;
            return KdNode::Leaf { bounds, items };
        }

        let best = Self::select_split(scene, &items, &bounds);
        let (cost, axis, split) = match best {
            Some(found) => found,
            // no candidate plane was ever evaluated: leaf unconditionally
            None => {
                stats.leaves += 1;
                return KdNode::Leaf { bounds, items };
            }
        };
        if cost > KI * items.len() as f64 {
            debug!(
                "SAH floor at depth {}: keeping {} geometries in one leaf",
                depth,
                items.len()
            );
            stats.leaves += 1;
            return KdNode::Leaf { bounds, items };
        }

        // clipping rule: a straddler goes to both children, by index
        let left_items: Vec<u32> = items
            .iter()
            .copied()
            .filter(|&i| scene.geometries()[i as usize].bounding_box().p_min[axis] < split)
            .collect();
        let right_items: Vec<u32> = items
            .iter()
            .copied()
            .filter(|&i| scene.geometries()[i as usize].bounding_box().p_max[axis] >= split)
            .collect();

        stats.interior += 1;
        let left_bounds = bounds.clipped_above(axis, split);
        let right_bounds = bounds.clipped_below(axis, split);
        KdNode::Interior {
            axis,
            split,
            bounds,
            left: Box::new(Self::build_node(
                scene,
                left_items,
                left_bounds,
                depth + 1,
                stats,
            )),
            right: Box::new(Self::build_node(
                scene,
                right_items,
                right_bounds,
                depth + 1,
                stats,
            )),
        }
    }

    /// Event-sweep SAH over all three axes. Returns the cheapest
    /// `(cost, axis, position)`, or `None` when no plane was evaluated.
    fn select_split(scene: &Scene, items: &[u32], bounds: &Bounds3) -> Option<(f64, Axis, f64)> {
        let sa = bounds.surface_area();
        if sa == 0.0 {
            return None;
        }
        let mut best: Option<(f64, Axis, f64)> = None;

        for &axis in &Axis::ALL {
            let mut events = Vec::with_capacity(2 * items.len());
            for &i in items {
                let b = scene.geometries()[i as usize].bounding_box();
                let (min_ax, max_ax) = (b.p_min[axis], b.p_max[axis]);
                if min_ax == max_ax {
                    events.push(Event {
                        position: min_ax,
                        kind: EventKind::Planar,
                    });
                } else {
                    events.push(Event {
                        position: min_ax,
                        kind: EventKind::Start,
                    });
                    events.push(Event {
                        position: max_ax,
                        kind: EventKind::End,
                    });
                }
            }
            events.sort_unstable_by(|a, b| {
                a.position
                    .partial_cmp(&b.position)
                    .unwrap()
                    .then(a.kind.cmp(&b.kind))
            });

            let mut n_left = 0usize;
            let mut n_right = items.len();
            let mut i = 0;
            while i < events.len() {
                let position = events[i].position;
                let (mut ends, mut planars, mut starts) = (0usize, 0usize, 0usize);
                while i < events.len() && events[i].position == position {
                    match events[i].kind {
                        EventKind::End => ends += 1,
                        EventKind::Planar => planars += 1,
                        EventKind::Start => starts += 1,
                    }
                    i += 1;
                }
                // on-plane geometry leaves the right count and is charged
                // to the left side of the cost; distribution still sends
                // it right
                n_right -= ends + planars;
                let n_planar = planars;

                let sal = bounds.clipped_above(axis, position).surface_area();
                let sar = bounds.clipped_below(axis, position).surface_area();
                let cost = KT
                    + KI * ((sal / sa) * (n_left + n_planar) as f64
                        + (sar / sa) * n_right as f64);
                if best.map_or(true, |(c, _, _)| cost < c) {
                    best = Some((cost, axis, position));
                }

                n_left += starts + planars;
            }
        }
        best
    }
}

#[derive(Copy, Clone)]
struct StackEntry<'a> {
    t: f64,
    point: Point3,
    node: Option<&'a KdNode>,
    prev: usize,
}

impl StackEntry<'_> {
    const EMPTY: StackEntry<'static> = StackEntry {
        t: 0.0,
        point: Point3 {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        node: None,
        prev: 0,
    };
}

impl Accelerator for KdTree {
    /// Stackful Havran-style recursive traversal. Leaves are visited in
    /// strictly increasing ray-parameter order, so the first accepted
    /// occluder terminates the walk.
    fn intersect(&self, scene: &Scene, ray: &Ray) -> RayIntersection {
        let mut best: Option<OccluderHit> = None;
        let mut crossings = CrossingSet::default();

        let (enter, exit) = match self.bounds.clip_ray(ray) {
            Some(range) => range,
            None => return RayIntersection::default(),
        };

        let mut stack = [StackEntry::EMPTY; STACK_SIZE];
        stack[0] = StackEntry {
            t: enter,
            point: if enter >= 0.0 { ray.at(enter) } else { ray.o },
            node: None,
            prev: 0,
        };
        stack[1] = StackEntry {
            t: exit,
            point: ray.at(exit),
            node: None,
            prev: 0,
        };
        let mut en = 0usize;
        let mut ex = 1usize;
        let mut current: Option<&KdNode> = Some(&self.root);

        while let Some(top) = current {
            let mut node = top;
            let items = loop {
                let (axis, split, left, right) = match node {
                    KdNode::Interior {
                        axis,
                        split,
                        left,
                        right,
                        ..
                    } => (*axis, *split, &**left, &**right),
                    KdNode::Leaf { items, .. } => break items,
                };
                let far;
                if stack[en].point[axis] <= split {
                    if stack[ex].point[axis] <= split {
                        node = left;
                        continue;
                    }
                    far = right;
                    node = left;
                } else {
                    if stack[ex].point[axis] > split {
                        node = right;
                        continue;
                    }
                    far = left;
                    node = right;
                }
                // the ray crosses the plane inside this node: push the far
                // side, skipping over the entry slot if it is in the way
                let t = (split - ray.o[axis]) / ray.d[axis];
                let prev = ex;
                ex += 1;
                if ex == en {
                    ex += 1;
                }
                assert!(ex < STACK_SIZE);
                let mut point = ray.at(t);
                point[axis] = split;
                stack[ex] = StackEntry {
                    t,
                    point,
                    node: Some(far),
                    prev,
                };
            };

            let lo = stack[en].t - LEAF_GUARD;
            let hi = stack[ex].t + LEAF_GUARD;
            for &gi in items {
                let geometry = &scene.geometries()[gi as usize];
                let isect = match geometry.intersect(ray) {
                    Some(i) if i.distance >= lo && i.distance <= hi => i,
                    _ => continue,
                };
                match geometry {
                    Geometry::Triangle(_) => {
                        if best.map_or(true, |b| isect.distance < b.distance) {
                            best = Some(OccluderHit {
                                triangle: gi,
                                distance: isect.distance,
                                position: isect.position,
                                normal: isect.normal,
                            });
                        }
                    }
                    Geometry::Receiver(s) => {
                        let offset = ray.distance_to_line(s.center);
                        crossings.note(s.index, isect.distance, offset, s.radius);
                    }
                }
            }
            if best.is_some() {
                // ordered traversal: the nearest accepted hit is final
                return RayIntersection {
                    crossings: crossings.finish(&best),
                    occluder: best,
                };
            }

            en = ex;
            current = stack[ex].node;
            ex = stack[en].prev;
        }

        RayIntersection {
            crossings: crossings.finish(&best),
            occluder: best,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;

    fn clustered_scene(n: usize) -> Scene {
        let mut scene = Scene::new();
        // tightly clustered triangles around the origin
        for i in 0..n {
            let s = 0.01 * (1.0 + (i % 7) as f64);
            let o = 0.001 * i as f64;
            scene.add_triangle(
                Point3::new(o, 0.0, 0.0),
                Point3::new(o + s, 0.0, 0.0),
                Point3::new(o, s, s),
            );
        }
        scene
    }

    fn walk(node: &KdNode, depth: usize, leaves: &mut Vec<(usize, Vec<u32>, Bounds3)>) {
        match node {
            KdNode::Interior { left, right, .. } => {
                walk(left, depth + 1, leaves);
                walk(right, depth + 1, leaves);
            }
            KdNode::Leaf { items, bounds } => leaves.push((depth, items.clone(), *bounds)),
        }
    }

    #[test]
    fn test_build_invariants_on_cluster() {
        let scene = clustered_scene(1000);
        let tree = KdTree::build(&scene);
        let mut leaves = Vec::new();
        walk(tree.root(), 0, &mut leaves);

        let mut membership = 0usize;
        for (depth, items, _) in &leaves {
            assert!(*depth <= MAX_DEPTH);
            membership += items.len();
        }
        // duplication across subtrees is allowed, loss is not
        assert!(membership >= 1000);

        // every triangle appears in at least one leaf whose box overlaps it
        for (i, g) in scene.geometries().iter().enumerate() {
            let b = g.bounding_box();
            let found = leaves
                .iter()
                .any(|(_, items, lb)| items.contains(&(i as u32)) && lb.overlaps(&b));
            assert!(found, "triangle {} not reachable", i);
        }
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let scene = clustered_scene(300);
        let collect = |tree: &KdTree| {
            let mut leaves = Vec::new();
            walk(tree.root(), 0, &mut leaves);
            let mut sets: Vec<Vec<u32>> = leaves
                .into_iter()
                .map(|(_, mut items, _)| {
                    items.sort_unstable();
                    items
                })
                .collect();
            sets.sort();
            sets
        };
        let a = collect(&KdTree::build(&scene));
        let b = collect(&KdTree::build(&scene));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_scene_is_a_miss() {
        let scene = Scene::new();
        let tree = KdTree::build(&scene);
        let ray = Ray::launch(Point3::origin(), Vector3::new(0.0, 0.0, 1.0), 0.0);
        let r = tree.intersect(&scene, &ray);
        assert!(r.occluder.is_none());
        assert!(r.crossings.is_empty());
    }

    #[test]
    fn test_shared_edge_reports_single_hit() {
        // two coplanar triangles whose shared edge lies on a natural split
        let mut scene = Scene::new();
        scene.add_triangle(
            Point3::new(-10.0, -10.0, 0.0),
            Point3::new(10.0, -10.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        );
        scene.add_triangle(
            Point3::new(-10.0, -10.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(-10.0, 10.0, 0.0),
        );
        let tree = KdTree::build(&scene);
        // rays crossing the diagonal edge region
        for i in 0..50 {
            let x = -5.0 + 0.2 * i as f64;
            let ray = Ray::launch(Point3::new(x, x, 5.0), Vector3::new(0.0, 0.0, -1.0), 0.0);
            let r = tree.intersect(&scene, &ray);
            let hit = r.occluder.expect("plane must occlude");
            assert!((hit.distance - 5.0).abs() < 1e-9);
        }
    }
}
