use glam::Vec3;

use crate::mesh::PolyMesh;

const MAX_LEAF_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceHit {
    pub face: u32,
    pub point: Vec3,
    pub distance_squared: f32,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Vec3,
    max: Vec3,
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &point in points {
            bounds.min = bounds.min.min(point);
            bounds.max = bounds.max.max(point);
        }
        bounds
    }

    fn expand(&mut self, other: &Bounds) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    fn distance_squared(&self, point: Vec3) -> f32 {
        let clamped = point.clamp(self.min, self.max);
        point.distance_squared(clamped)
    }
}

#[derive(Debug)]
enum BvhNode {
    Leaf {
        bounds: Bounds,
        items: Vec<u32>,
    },
    Internal {
        bounds: Bounds,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bounds(&self) -> &Bounds {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Default)]
struct Bvh {
    root: Option<BvhNode>,
}

impl Bvh {
    fn build(items: &[Bounds]) -> Self {
        if items.is_empty() {
            return Self { root: None };
        }
        let indices: Vec<u32> = (0..items.len() as u32).collect();
        Self {
            root: Some(Self::build_recursive(items, indices)),
        }
    }

    fn build_recursive(items: &[Bounds], mut indices: Vec<u32>) -> BvhNode {
        let mut bounds = Bounds::empty();
        for &index in &indices {
            bounds.expand(&items[index as usize]);
        }

        if indices.len() <= MAX_LEAF_SIZE {
            return BvhNode::Leaf {
                bounds,
                items: indices,
            };
        }

        let axis = bounds.longest_axis();
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            let ca = items[a as usize].center()[axis];
            let cb = items[b as usize].center()[axis];
            ca.total_cmp(&cb)
        });
        let right_indices = indices.split_off(mid);

        BvhNode::Internal {
            bounds,
            left: Box::new(Self::build_recursive(items, indices)),
            right: Box::new(Self::build_recursive(items, right_indices)),
        }
    }

    /// Closest item to `point` with squared distance at most `limit`.
    /// Equal distances keep the item visited first.
    fn nearest(
        &self,
        point: Vec3,
        limit: f32,
        mut distance_squared: impl FnMut(u32) -> f32,
    ) -> Option<(u32, f32)> {
        let root = self.root.as_ref()?;
        let mut best: Option<(u32, f32)> = None;
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            let bound = best.map_or(limit, |(_, dist)| dist);
            if node.bounds().distance_squared(point) > bound {
                continue;
            }
            match node {
                BvhNode::Leaf { items, .. } => {
                    for &item in items {
                        let dist = distance_squared(item);
                        let better = match best {
                            Some((_, best_dist)) => dist < best_dist,
                            None => dist <= limit,
                        };
                        if better {
                            best = Some((item, dist));
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let left_dist = left.bounds().distance_squared(point);
                    let right_dist = right.bounds().distance_squared(point);
                    // nearer child popped first
                    if left_dist <= right_dist {
                        stack.push(&**right);
                        stack.push(&**left);
                    } else {
                        stack.push(&**left);
                        stack.push(&**right);
                    }
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy)]
struct FaceTriangle {
    face: u32,
    corners: [Vec3; 3],
}

/// Nearest-vertex and nearest-face queries against one source mesh.
///
/// Built at the start of a transfer call and dropped when the call returns.
/// Faces are fan-triangulated from their first corner.
#[derive(Debug)]
pub struct SpatialIndex {
    positions: Vec<Vec3>,
    vertex_tree: Bvh,
    triangles: Vec<FaceTriangle>,
    face_tree: Bvh,
    limit: f32,
}

impl SpatialIndex {
    /// `max_distance` bounds every query; `None` searches without a range limit.
    pub fn build(mesh: &PolyMesh, max_distance: Option<f32>) -> Self {
        let positions: Vec<Vec3> = mesh.positions.iter().copied().map(Vec3::from).collect();
        let vertex_bounds: Vec<Bounds> = positions
            .iter()
            .map(|&point| Bounds {
                min: point,
                max: point,
            })
            .collect();

        let mut triangles = Vec::with_capacity(mesh.corner_count());
        for face in 0..mesh.face_count() {
            let verts = mesh.face_vertices(face);
            let first = positions[verts[0] as usize];
            for pair in verts[1..].windows(2) {
                triangles.push(FaceTriangle {
                    face: face as u32,
                    corners: [
                        first,
                        positions[pair[0] as usize],
                        positions[pair[1] as usize],
                    ],
                });
            }
        }
        let triangle_bounds: Vec<Bounds> = triangles
            .iter()
            .map(|tri| Bounds::from_points(&tri.corners))
            .collect();

        let limit = max_distance.map_or(f32::INFINITY, |dist| dist * dist);

        Self {
            vertex_tree: Bvh::build(&vertex_bounds),
            face_tree: Bvh::build(&triangle_bounds),
            positions,
            triangles,
            limit,
        }
    }

    pub fn nearest_vertex(&self, point: Vec3) -> Option<u32> {
        self.vertex_tree
            .nearest(point, self.limit, |item| {
                point.distance_squared(self.positions[item as usize])
            })
            .map(|(vertex, _)| vertex)
    }

    pub fn nearest_point_on_face(&self, point: Vec3) -> Option<FaceHit> {
        let (item, distance_squared) = self.face_tree.nearest(point, self.limit, |item| {
            let [a, b, c] = self.triangles[item as usize].corners;
            point.distance_squared(closest_point_on_triangle(point, a, b, c))
        })?;
        let triangle = &self.triangles[item as usize];
        let [a, b, c] = triangle.corners;
        Some(FaceHit {
            face: triangle.face,
            point: closest_point_on_triangle(point, a, b, c),
            distance_squared,
        })
    }
}

fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let area = ab.cross(ac).length_squared();
    if area <= 1.0e-12 {
        let mut best = a;
        let mut best_dist = (p - a).length_squared();
        for candidate in [b, c] {
            let dist = (p - candidate).length_squared();
            if dist < best_dist {
                best = candidate;
                best_dist = dist;
            }
        }
        return best;
    }
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
