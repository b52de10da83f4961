use glam::Vec3;

const POINT_EPSILON: f32 = 1.0e-5;

/// Mean value weights of `query` against the polygon `positions`.
///
/// Weights always sum to one. A query on a polygon vertex or boundary edge gets
/// exact vertex or linear edge weights; a fully degenerate polygon falls back to
/// uniform weights. Callers must pass at least three positions.
pub fn interp_weights_poly(positions: &[Vec3], query: Vec3) -> Vec<f32> {
    let mut weights = vec![0.0; positions.len()];
    interp_weights_poly_into(&mut weights, positions, query);
    weights
}

pub fn interp_weights_poly_into(weights: &mut [f32], positions: &[Vec3], query: Vec3) {
    let n = positions.len();
    debug_assert!(n >= 3, "polygon interpolation needs at least 3 positions, got {n}");
    debug_assert_eq!(weights.len(), n);
    if n == 0 {
        return;
    }

    let eps_sq = POINT_EPSILON * POINT_EPSILON;
    let dirs: Vec<Vec3> = positions.iter().map(|&p| p - query).collect();
    let lens: Vec<f32> = dirs.iter().map(|d| d.length()).collect();

    for i in 0..n {
        if lens[i] < POINT_EPSILON {
            weights.fill(0.0);
            weights[i] = 1.0;
            return;
        }
    }

    for i in 0..n {
        let next = (i + 1) % n;
        if distance_squared_to_segment(query, positions[i], positions[next]) < eps_sq {
            let fac = segment_factor(query, positions[i], positions[next]).clamp(0.0, 1.0);
            weights.fill(0.0);
            weights[i] = 1.0 - fac;
            weights[next] += fac;
            return;
        }
    }

    let mut total = 0.0;
    for i in 0..n {
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        let ht_prev = half_tangent(dirs[prev], lens[prev], dirs[i], lens[i]);
        let ht = half_tangent(dirs[i], lens[i], dirs[next], lens[next]);
        weights[i] = (ht_prev + ht) / lens[i];
        total += weights[i];
    }

    if total != 0.0 && total.is_finite() {
        for weight in weights.iter_mut() {
            *weight /= total;
        }
    } else {
        weights.fill(1.0 / n as f32);
    }
}

// tan(angle / 2) between two query-relative directions
fn half_tangent(d_curr: Vec3, len_curr: f32, d_next: Vec3, len_next: f32) -> f32 {
    let area = d_curr.cross(d_next).length();
    if area > f32::EPSILON {
        let dot = d_curr.dot(d_next);
        let result = (len_curr * len_next - dot) / area;
        if result.is_finite() {
            return result;
        }
    }
    0.0
}

fn segment_factor(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 0.0 {
        return 0.0;
    }
    (p - a).dot(ab) / len_sq
}

fn distance_squared_to_segment(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let fac = segment_factor(p, a, b).clamp(0.0, 1.0);
    p.distance_squared(a + (b - a) * fac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    fn reconstruct(positions: &[Vec3], weights: &[f32]) -> Vec3 {
        positions
            .iter()
            .zip(weights)
            .map(|(&p, &w)| p * w)
            .sum()
    }

    fn assert_sums_to_one(weights: &[f32]) {
        let total: f32 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1.0e-5, "weights sum to {total}");
    }

    #[test]
    fn weights_sum_to_one() {
        let polygons = vec![
            square(),
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(1.0, 1.5, 0.0),
            ],
            // concave L shape
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(1.0, 2.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            ],
            // non-planar quad
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.3),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.4),
            ],
        ];
        let queries = [
            Vec3::new(0.3, 0.4, 0.0),
            Vec3::new(0.5, 0.5, 0.2),
            Vec3::new(0.9, 0.1, -0.1),
            Vec3::new(0.25, 0.7, 0.05),
        ];
        for polygon in &polygons {
            for &query in &queries {
                let weights = interp_weights_poly(polygon, query);
                assert_eq!(weights.len(), polygon.len());
                assert_sums_to_one(&weights);
            }
        }
    }

    #[test]
    fn vertex_query_gets_full_weight() {
        let polygon = square();
        for (i, &corner) in polygon.iter().enumerate() {
            let weights = interp_weights_poly(&polygon, corner);
            for (j, weight) in weights.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((weight - expected).abs() < 1.0e-6);
            }
        }
    }

    #[test]
    fn edge_query_splits_linearly() {
        let polygon = square();
        let weights = interp_weights_poly(&polygon, Vec3::new(1.0, 0.25, 0.0));
        assert!((weights[1] - 0.75).abs() < 1.0e-6);
        assert!((weights[2] - 0.25).abs() < 1.0e-6);
        assert!(weights[0].abs() < 1.0e-6);
        assert!(weights[3].abs() < 1.0e-6);
    }

    #[test]
    fn interior_query_is_reconstructed() {
        let polygon = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.5, 1.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(-0.5, 1.0, 0.0),
        ];
        let query = Vec3::new(0.8, 0.9, 0.0);
        let weights = interp_weights_poly(&polygon, query);
        assert_sums_to_one(&weights);
        assert!(weights.iter().all(|&w| w > 0.0));
        let rebuilt = reconstruct(&polygon, &weights);
        assert!((rebuilt - query).length() < 1.0e-4);
    }

    #[test]
    fn center_of_square_is_uniform() {
        let weights = interp_weights_poly(&square(), Vec3::new(0.5, 0.5, 0.0));
        for weight in weights {
            assert!((weight - 0.25).abs() < 1.0e-5);
        }
    }

    #[test]
    fn degenerate_polygon_falls_back_to_uniform() {
        let polygon = vec![Vec3::new(1.0, 0.0, 0.0); 3];
        let weights = interp_weights_poly(&polygon, Vec3::new(5.0, 5.0, 5.0));
        assert_sums_to_one(&weights);
        for weight in weights {
            assert!((weight - 1.0 / 3.0).abs() < 1.0e-6);
        }
    }
}
