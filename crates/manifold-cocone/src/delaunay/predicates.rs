//! Orientation predicates in the lifted space.
//!
//! Coordinates are integers below 2^53, so their `f64` copies are exact and
//! only the arithmetic on them can round. Each predicate is answered by a
//! floating-point filter first and falls back to exact big-integer
//! determinants when the filter cannot certify the sign.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::linalg::cofactors;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Neg,
    Zero,
    Pos,
}

impl Sign {
    #[inline]
    pub fn negate(self) -> Self {
        match self {
            Sign::Neg => Sign::Pos,
            Sign::Zero => Sign::Zero,
            Sign::Pos => Sign::Neg,
        }
    }

    fn of_bigint(value: &BigInt) -> Self {
        match value.sign() {
            num_bigint::Sign::Minus => Sign::Neg,
            num_bigint::Sign::NoSign => Sign::Zero,
            num_bigint::Sign::Plus => Sign::Pos,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredResult {
    Certain(Sign),
    Uncertain,
}

/// Lifted points `(x, |x|^2)` kept both as integers and as `f64`.
pub(crate) struct LiftedPoints<const D: usize> {
    exact: Vec<[i64; D]>,
    approx: Vec<[f64; D]>,
}

impl<const D: usize> LiftedPoints<D> {
    /// Lift `N = D - 1` dimensional grid points onto the paraboloid.
    pub(crate) fn lift<const N: usize>(points: &[[i64; N]]) -> Self {
        assert_eq!(N + 1, D, "lifted dimension must be N + 1");
        let exact: Vec<[i64; D]> = points
            .iter()
            .map(|p| {
                let mut lifted = [0i64; D];
                lifted[..N].copy_from_slice(p);
                lifted[N] = p.iter().map(|&x| x * x).sum();
                lifted
            })
            .collect();
        let approx = exact
            .iter()
            .map(|p| std::array::from_fn(|i| p[i] as f64))
            .collect();
        Self { exact, approx }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.exact.len()
    }

    #[inline]
    pub(crate) fn exact(&self, index: u32) -> &[i64; D] {
        &self.exact[index as usize]
    }

    #[inline]
    pub(crate) fn approx(&self, index: u32) -> &[f64; D] {
        &self.approx[index as usize]
    }
}

/// Oriented hyperplane through the `D` vertices of a hull facet.
///
/// `ortho` is the cofactor normal of the edge vectors from the first vertex,
/// negated when the facet had to be flipped to face outwards. `perm` holds the
/// permanent of each cofactor, used to bound the rounding error of `ortho`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FacetPlane<const D: usize> {
    pub(crate) ortho: [f64; D],
    perm: [f64; D],
    negated: bool,
}

impl<const D: usize> FacetPlane<D> {
    pub(crate) fn through(points: &LiftedPoints<D>, vertices: &[u32; D]) -> Self {
        let v0 = points.approx(vertices[0]);
        let mut rows = [[0.0; D]; D];
        for j in 1..D {
            let v = points.approx(vertices[j]);
            rows[j - 1] = std::array::from_fn(|i| v[i] - v0[i]);
        }
        let (ortho, perm) = cofactors(&rows[..D - 1]);
        Self {
            ortho,
            perm,
            negated: false,
        }
    }

    pub(crate) fn negate(&mut self) {
        for o in self.ortho.iter_mut() {
            *o = -*o;
        }
        self.negated = !self.negated;
    }
}

/// Predicate evaluation strategy.
pub(crate) trait PredKernel<const D: usize> {
    /// Side of `plane` (through `vertices`) on which point `p` lies.
    fn orient(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
        p: u32,
    ) -> PredResult;

    /// Sign of the last coordinate of the plane normal.
    fn last_axis(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
    ) -> PredResult;
}

#[inline]
fn filter_scale<const D: usize>() -> f64 {
    // Generous for the Laplace expansion depth used here (D <= 5).
    (1u64 << (D + 3)) as f64 * f64::EPSILON
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct F64FilteredKernel;

impl<const D: usize> PredKernel<D> for F64FilteredKernel {
    #[inline]
    fn orient(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
        p: u32,
    ) -> PredResult {
        let v0 = points.approx(vertices[0]);
        let pp = points.approx(p);
        let mut d = 0.0;
        let mut m = 0.0;
        for i in 0..D {
            let q = pp[i] - v0[i];
            d += plane.ortho[i] * q;
            m += (plane.perm[i] + plane.ortho[i].abs()) * q.abs();
        }
        if !d.is_finite() {
            return PredResult::Uncertain;
        }
        if m == 0.0 {
            return PredResult::Certain(Sign::Zero);
        }

        let bound = filter_scale::<D>() * m;
        if d > bound {
            PredResult::Certain(Sign::Pos)
        } else if d < -bound {
            PredResult::Certain(Sign::Neg)
        } else {
            PredResult::Uncertain
        }
    }

    #[inline]
    fn last_axis(
        &self,
        _points: &LiftedPoints<D>,
        _vertices: &[u32; D],
        plane: &FacetPlane<D>,
    ) -> PredResult {
        let o = plane.ortho[D - 1];
        let p = plane.perm[D - 1];
        if p == 0.0 {
            return PredResult::Certain(Sign::Zero);
        }
        let bound = filter_scale::<D>() * p;
        if o > bound {
            PredResult::Certain(Sign::Pos)
        } else if o < -bound {
            PredResult::Certain(Sign::Neg)
        } else {
            PredResult::Uncertain
        }
    }
}

/// Exact big-integer evaluation; never uncertain.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ExactKernel;

impl ExactKernel {
    fn orient_sign<const D: usize>(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
        p: u32,
    ) -> Sign {
        let v0 = points.exact(vertices[0]);
        let mut rows: Vec<Vec<BigInt>> = Vec::with_capacity(D);
        for &v in vertices.iter().skip(1).chain(std::iter::once(&p)) {
            let v = points.exact(v);
            rows.push((0..D).map(|i| BigInt::from(v[i] - v0[i])).collect());
        }
        let sign = det_sign(rows);
        if plane.negated {
            sign.negate()
        } else {
            sign
        }
    }

    fn last_axis_sign<const D: usize>(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
    ) -> Sign {
        // The last cofactor is the minor of the first D - 1 coordinates.
        let v0 = points.exact(vertices[0]);
        let rows: Vec<Vec<BigInt>> = vertices[1..]
            .iter()
            .map(|&v| {
                let v = points.exact(v);
                (0..D - 1).map(|i| BigInt::from(v[i] - v0[i])).collect()
            })
            .collect();
        let sign = det_sign(rows);
        if plane.negated {
            sign.negate()
        } else {
            sign
        }
    }
}

impl<const D: usize> PredKernel<D> for ExactKernel {
    fn orient(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
        p: u32,
    ) -> PredResult {
        PredResult::Certain(self.orient_sign(points, vertices, plane, p))
    }

    fn last_axis(
        &self,
        points: &LiftedPoints<D>,
        vertices: &[u32; D],
        plane: &FacetPlane<D>,
    ) -> PredResult {
        PredResult::Certain(self.last_axis_sign(points, vertices, plane))
    }
}

/// Side of the facet plane on which `p` lies: positive is outside.
#[inline]
pub(crate) fn orient<const D: usize>(
    points: &LiftedPoints<D>,
    vertices: &[u32; D],
    plane: &FacetPlane<D>,
    p: u32,
) -> Sign {
    match F64FilteredKernel.orient(points, vertices, plane, p) {
        PredResult::Certain(s) => s,
        PredResult::Uncertain => ExactKernel.orient_sign(points, vertices, plane, p),
    }
}

/// Sign of the last normal coordinate. Negative means a lower-hull facet.
#[inline]
pub(crate) fn last_axis_sign<const D: usize>(
    points: &LiftedPoints<D>,
    vertices: &[u32; D],
    plane: &FacetPlane<D>,
) -> Sign {
    match F64FilteredKernel.last_axis(points, vertices, plane) {
        PredResult::Certain(s) => s,
        PredResult::Uncertain => ExactKernel.last_axis_sign(points, vertices, plane),
    }
}

/// Determinant sign by fraction-free Gaussian elimination (Bareiss).
fn det_sign(mut a: Vec<Vec<BigInt>>) -> Sign {
    let n = a.len();
    if n == 0 {
        return Sign::Pos;
    }
    let mut negative = false;
    let mut prev = BigInt::one();
    for k in 0..n - 1 {
        if a[k][k].is_zero() {
            match (k + 1..n).find(|&i| !a[i][k].is_zero()) {
                Some(i) => {
                    a.swap(k, i);
                    negative = !negative;
                }
                None => return Sign::Zero,
            }
        }
        let (top, bottom) = a.split_at_mut(k + 1);
        let pivot = &top[k];
        for row in bottom.iter_mut() {
            for j in k + 1..n {
                row[j] = (&row[j] * &pivot[k] - &row[k] * &pivot[j]) / &prev;
            }
            row[k] = BigInt::zero();
        }
        prev = top[k][k].clone();
    }
    let sign = Sign::of_bigint(&a[n - 1][n - 1]);
    if negative {
        sign.negate()
    } else {
        sign
    }
}

/// Rank of a set of integer row vectors, exactly.
pub(crate) fn exact_rank<const D: usize>(rows: &[[i64; D]]) -> usize {
    let mut a: Vec<Vec<BigInt>> = rows
        .iter()
        .map(|r| r.iter().map(|&x| BigInt::from(x)).collect())
        .collect();
    let mut rank = 0;
    for col in 0..D {
        if rank == a.len() {
            break;
        }
        let Some(p) = (rank..a.len()).find(|&i| !a[i][col].is_zero()) else {
            continue;
        };
        a.swap(rank, p);
        let (top, bottom) = a.split_at_mut(rank + 1);
        let pivot = &top[rank];
        for row in bottom.iter_mut() {
            if row[col].is_zero() {
                continue;
            }
            for j in col + 1..D {
                row[j] = &row[j] * &pivot[col] - &row[col] * &pivot[j];
            }
            row[col] = BigInt::zero();
        }
        rank += 1;
    }
    rank
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(rows: &[&[i64]]) -> Vec<Vec<BigInt>> {
        rows.iter()
            .map(|r| r.iter().map(|&x| BigInt::from(x)).collect())
            .collect()
    }

    #[test]
    fn test_det_sign_small() {
        assert_eq!(det_sign(big(&[&[1, 0], &[0, 1]])), Sign::Pos);
        assert_eq!(det_sign(big(&[&[0, 1], &[1, 0]])), Sign::Neg);
        assert_eq!(det_sign(big(&[&[1, 2], &[2, 4]])), Sign::Zero);
        assert_eq!(
            det_sign(big(&[&[0, 0, 1], &[0, 1, 0], &[1, 0, 0]])),
            Sign::Neg
        );
    }

    #[test]
    fn test_det_sign_large_entries() {
        // Entries near 2^50: the f64 product rounds, the exact sign does not.
        let big_entry = 1i64 << 50;
        let rows = big(&[&[big_entry, big_entry - 1], &[big_entry + 1, big_entry]]);
        // det = b^2 - (b^2 - 1) = 1
        assert_eq!(det_sign(rows), Sign::Pos);
    }

    #[test]
    fn test_exact_rank() {
        assert_eq!(exact_rank(&[[1i64, 2, 3], [2, 4, 6]]), 1);
        assert_eq!(exact_rank(&[[1i64, 2, 3], [0, 0, 1]]), 2);
        assert_eq!(exact_rank(&[[0i64, 0, 0]]), 0);
        assert_eq!(exact_rank::<3>(&[]), 0);
        assert_eq!(exact_rank(&[[0i64, 1, 0], [0, 0, 1], [0, 1, 1]]), 2);
    }

    #[test]
    fn test_filtered_orient_agrees_with_exact() {
        // Points of the paraboloid z = x^2 + y^2 over a large integer grid.
        let grid: Vec<[i64; 2]> = vec![
            [0, 0],
            [1 << 23, 0],
            [0, 1 << 23],
            [(1 << 23) - 1, (1 << 23) - 1],
            [1, 1],
        ];
        let points = LiftedPoints::<3>::lift(&grid);
        let vertices = [0u32, 1, 2];
        let plane = FacetPlane::through(&points, &vertices);
        for p in 3..points.len() as u32 {
            let exact = ExactKernel.orient(&points, &vertices, &plane, p);
            assert_eq!(PredResult::Certain(orient(&points, &vertices, &plane, p)), exact);
        }
    }

    #[test]
    fn test_negated_plane_flips_both_kernels() {
        let grid: Vec<[i64; 2]> = vec![[0, 0], [4, 0], [0, 4], [1, 1]];
        let points = LiftedPoints::<3>::lift(&grid);
        let vertices = [0u32, 1, 2];
        let mut plane = FacetPlane::through(&points, &vertices);
        let before = orient(&points, &vertices, &plane, 3);
        let before_last = last_axis_sign(&points, &vertices, &plane);
        plane.negate();
        assert_eq!(orient(&points, &vertices, &plane, 3), before.negate());
        assert_eq!(
            ExactKernel.orient(&points, &vertices, &plane, 3),
            PredResult::Certain(before.negate())
        );
        assert_eq!(last_axis_sign(&points, &vertices, &plane), before_last.negate());
        assert_ne!(before, Sign::Zero);
    }
}
