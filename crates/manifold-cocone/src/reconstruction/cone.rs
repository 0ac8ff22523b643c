//! The cocone of a sample point and its intersection with Voronoi edges.
//!
//! The cocone of `p` is the set of directions making an angle of at least
//! `3π/8` with the pole line through `p`, i.e. `|cos| <= cos(3π/8)` against
//! the positive pole. Its complement is a double cone around the pole line.

use crate::linalg::dot;

/// `cos(3π/8)`.
pub(crate) const COS_OF_COCONE_ANGLE: f64 = 0.382_683_432_365_089_8;

const T_EPSILON: f64 = 1e-9;

#[inline]
pub(crate) fn cocone_inside_or_equal(cos_n: f64) -> bool {
    cos_n.abs() <= COS_OF_COCONE_ANGLE
}

#[inline]
pub(crate) fn cocone_inside_or_equal2(cos_n_a: f64, cos_n_b: f64) -> bool {
    cocone_inside_or_equal(cos_n_a) && cocone_inside_or_equal(cos_n_b)
}

/// Whether the Voronoi edge from `a` to `b` meets the cocone, given the
/// cosines of `pa` and `pb` against the pole.
///
/// The two halves of the complementary double cone are convex and touch only
/// at `p`, so an edge misses the cocone exactly when both ends lie in the same
/// half.
#[inline]
pub(crate) fn voronoi_edge_intersects_cocone(cos_n_a: f64, cos_n_b: f64) -> bool {
    if cocone_inside_or_equal(cos_n_a) || cocone_inside_or_equal(cos_n_b) {
        return true;
    }
    (cos_n_a > 0.0) != (cos_n_b > 0.0)
}

/// Largest distance from `p` of a point `pa + t·ab` on the cocone boundary,
/// for `t` in `[0, 1]` or, for a ray, `t >= 0`.
pub(crate) fn intersect_cocone<const N: usize>(
    pole: &[f64; N],
    pa: &[f64; N],
    ab: &[f64; N],
    ray: bool,
) -> Option<f64> {
    let c2 = COS_OF_COCONE_ANGLE * COS_OF_COCONE_ANGLE;

    // (pole·x)^2 = c^2 |x|^2 with x = pa + t·ab
    let alpha = dot(pole, pa);
    let beta = dot(pole, ab);
    let aa = dot(pa, pa);
    let ab_dot = dot(pa, ab);
    let bb = dot(ab, ab);

    let qa = beta * beta - c2 * bb;
    let qb = 2.0 * (alpha * beta - c2 * ab_dot);
    let qc = alpha * alpha - c2 * aa;

    let mut roots = [f64::NAN; 2];
    if bb == 0.0 || !(qa.is_finite() && qb.is_finite() && qc.is_finite()) {
        return None;
    }
    // qa is a difference of two terms bounded by |ab|^2; |pa| must not enter
    // the degeneracy test, the grid puts it around 1e7.
    if qa.abs() <= 1e-12 * bb {
        if qb == 0.0 {
            return None;
        }
        roots[0] = -qc / qb;
    } else {
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return None;
        }
        let s = disc.sqrt();
        let q = -0.5 * (qb + qb.signum() * s);
        roots[0] = q / qa;
        roots[1] = if q != 0.0 { qc / q } else { roots[0] };
    }

    let t_max = if ray { f64::INFINITY } else { 1.0 };
    let mut best: Option<f64> = None;
    for t in roots {
        if !(t >= -T_EPSILON && t <= t_max + T_EPSILON) {
            continue;
        }
        let t = t.clamp(0.0, t_max);
        let x: [f64; N] = std::array::from_fn(|i| pa[i] + t * ab[i]);
        let d = dot(&x, &x).sqrt();
        best = Some(best.map_or(d, |b: f64| b.max(d)));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        assert!((COS_OF_COCONE_ANGLE - (3.0 * std::f64::consts::PI / 8.0).cos()).abs() < 1e-16);
    }

    #[test]
    fn test_edge_classification() {
        // both ends near the pole line on the same side
        assert!(!voronoi_edge_intersects_cocone(0.9, 0.95));
        assert!(!voronoi_edge_intersects_cocone(-0.9, -0.5));
        // opposite halves
        assert!(voronoi_edge_intersects_cocone(0.9, -0.9));
        // one end inside
        assert!(voronoi_edge_intersects_cocone(0.1, 0.9));
        assert!(voronoi_edge_intersects_cocone(COS_OF_COCONE_ANGLE, 0.9));
    }

    #[test]
    fn test_segment_crossing_boundary() {
        // pole along y; segment from inside the cocone (x axis) to the pole line
        let pole = [0.0, 1.0];
        let pa = [2.0, 0.0];
        let ab = [-2.0, 2.0];
        let d = intersect_cocone(&pole, &pa, &ab, false).expect("crossing");
        // the boundary point has |cos| = c against the pole
        let t = {
            // solve numerically along the segment
            let mut lo = 0.0;
            let mut hi = 1.0;
            for _ in 0..100 {
                let mid = 0.5 * (lo + hi);
                let x = [pa[0] + mid * ab[0], pa[1] + mid * ab[1]];
                let cos = x[1] / (x[0] * x[0] + x[1] * x[1]).sqrt();
                if cos < COS_OF_COCONE_ANGLE {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            lo
        };
        let x = [pa[0] + t * ab[0], pa[1] + t * ab[1]];
        let expected = (x[0] * x[0] + x[1] * x[1]).sqrt();
        assert!((d - expected).abs() < 1e-9, "{} vs {}", d, expected);
    }

    #[test]
    fn test_segment_inside_cone_misses() {
        let pole = [0.0, 0.0, 1.0];
        let pa = [0.0, 0.1, 1.0];
        let ab = [0.1, 0.0, 0.5];
        assert!(intersect_cocone(&pole, &pa, &ab, false).is_none());
    }

    /// Distance of the first cocone boundary point on the ray `pa + t·ab`,
    /// for rays whose cosine against the pole grows with `t`.
    fn bisect_ray<const N: usize>(pole: &[f64; N], pa: &[f64; N], ab: &[f64; N]) -> f64 {
        let point = |t: f64| -> [f64; N] { std::array::from_fn(|i| pa[i] + t * ab[i]) };
        let outside = |t: f64| {
            let x = point(t);
            dot(pole, &x).abs() > COS_OF_COCONE_ANGLE * dot(&x, &x).sqrt()
        };
        let mut lo = 0.0;
        let mut hi = 1.0;
        while !outside(hi) {
            hi *= 2.0;
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if outside(mid) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let x = point(lo);
        dot(&x, &x).sqrt()
    }

    #[test]
    fn test_ray_at_grid_scale() {
        // Grid coordinates are around 2^23 while hull normals have unit length.
        let pole = [0.0, 1.0];
        let pa = [1e7, 0.0];
        let ab = [0.0, 1.0];
        let d = intersect_cocone(&pole, &pa, &ab, true).expect("ray crosses");
        let y = COS_OF_COCONE_ANGLE / (1.0 - COS_OF_COCONE_ANGLE * COS_OF_COCONE_ANGLE).sqrt();
        let expected = 1e7 * (1.0 + y * y).sqrt();
        assert!((d - expected).abs() <= 1e-9 * expected, "{} vs {}", d, expected);
    }

    #[test]
    fn test_tilted_ray_at_grid_scale() {
        let pole = [0.0, 0.6, 0.8];
        // perpendicular to the pole, so pa starts inside the cocone
        let pa = [1e7, 3e6 * 0.8, -3e6 * 0.6];
        let len = 1.09f64.sqrt();
        let ab = [0.3 / len, 0.6 / len, 0.8 / len];
        let d = intersect_cocone(&pole, &pa, &ab, true).expect("ray crosses");
        let expected = bisect_ray(&pole, &pa, &ab);
        assert!((d - expected).abs() <= 1e-6 * expected, "{} vs {}", d, expected);
        // |pa| is about 1.04e7; the boundary is crossed near t = 5.1e6.
        assert!(d > 1.2e7 && d < 1.4e7, "{}", d);
    }

    #[test]
    fn test_ray_reaches_far_boundary() {
        // Starts inside the cocone, heads into the upper half.
        let pole = [0.0, 1.0];
        let pa = [1.0, 0.0];
        let ab = [0.0, 1.0];
        let d = intersect_cocone(&pole, &pa, &ab, true).expect("ray crosses");
        // boundary at angle 3π/8 from the pole: y / |x| = c
        let y = COS_OF_COCONE_ANGLE / (1.0 - COS_OF_COCONE_ANGLE * COS_OF_COCONE_ANGLE).sqrt();
        assert!((d - (1.0 + y * y).sqrt()).abs() < 1e-9);
    }
}
