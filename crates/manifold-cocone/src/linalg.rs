//! Small fixed-size vector and matrix helpers on `[f64; N]`.

/// Largest dimension handled by the helpers (lifted 4D points).
pub(crate) const MAX_DIM: usize = 5;

#[inline]
pub(crate) fn dot<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    let mut s = 0.0;
    for i in 0..N {
        s += a[i] * b[i];
    }
    s
}

#[inline]
pub(crate) fn sub<const N: usize>(a: &[f64; N], b: &[f64; N]) -> [f64; N] {
    std::array::from_fn(|i| a[i] - b[i])
}

#[inline]
pub(crate) fn add<const N: usize>(a: &[f64; N], b: &[f64; N]) -> [f64; N] {
    std::array::from_fn(|i| a[i] + b[i])
}

#[inline]
pub(crate) fn scale<const N: usize>(a: &[f64; N], k: f64) -> [f64; N] {
    std::array::from_fn(|i| a[i] * k)
}

#[inline]
pub(crate) fn norm<const N: usize>(a: &[f64; N]) -> f64 {
    dot(a, a).sqrt()
}

/// Unit vector in the direction of `a`. Not finite for a zero vector.
#[inline]
pub(crate) fn normalized<const N: usize>(a: &[f64; N]) -> [f64; N] {
    scale(a, 1.0 / norm(a))
}

#[inline]
pub(crate) fn is_finite<const N: usize>(a: &[f64; N]) -> bool {
    a.iter().all(|x| x.is_finite())
}

/// Determinant of the square submatrix formed by `rows` and the columns in
/// `cols`, together with the permanent of its absolute values.
///
/// Laplace expansion along the first row. The permanent bounds the magnitude
/// of every partial product, which is what the predicate filters need.
pub(crate) fn minor<const D: usize>(rows: &[[f64; D]], cols: &[usize]) -> (f64, f64) {
    let n = cols.len();
    debug_assert_eq!(rows.len(), n);
    match n {
        0 => (1.0, 1.0),
        1 => {
            let a = rows[0][cols[0]];
            (a, a.abs())
        }
        2 => {
            let (a, b) = (rows[0][cols[0]], rows[0][cols[1]]);
            let (c, d) = (rows[1][cols[0]], rows[1][cols[1]]);
            (a * d - b * c, (a * d).abs() + (b * c).abs())
        }
        _ => {
            let mut det = 0.0;
            let mut perm = 0.0;
            let mut rest = [0usize; MAX_DIM];
            for j in 0..n {
                let mut k = 0;
                for (jj, &c) in cols.iter().enumerate() {
                    if jj != j {
                        rest[k] = c;
                        k += 1;
                    }
                }
                let a = rows[0][cols[j]];
                let (d, p) = minor(&rows[1..], &rest[..n - 1]);
                if j % 2 == 0 {
                    det += a * d;
                } else {
                    det -= a * d;
                }
                perm += a.abs() * p;
            }
            (det, perm)
        }
    }
}

/// Cofactor vector of `N - 1` row vectors in `N` dimensions, with the
/// absolute-value permanent of each cofactor.
///
/// For any `q`, `dot(result, q)` equals `det[rows; q]`.
pub(crate) fn cofactors<const N: usize>(rows: &[[f64; N]]) -> ([f64; N], [f64; N]) {
    debug_assert_eq!(rows.len() + 1, N);
    let mut ortho = [0.0; N];
    let mut perm = [0.0; N];
    let mut cols = [0usize; MAX_DIM];
    for i in 0..N {
        let mut k = 0;
        for c in (0..N).filter(|&c| c != i) {
            cols[k] = c;
            k += 1;
        }
        let (d, p) = minor(rows, &cols[..N - 1]);
        ortho[i] = if (N - 1 + i) % 2 == 0 { d } else { -d };
        perm[i] = p;
    }
    (ortho, perm)
}

/// Vector orthogonal to the `N - 1` given vectors (not normalized).
#[inline]
pub(crate) fn orthogonal_complement<const N: usize>(vectors: &[[f64; N]]) -> [f64; N] {
    cofactors(vectors).0
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
pub(crate) fn solve<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col] == 0.0 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..N {
            let k = a[row][col] / a[col][col];
            if k == 0.0 {
                continue;
            }
            for c in col..N {
                a[row][c] -= k * a[col][c];
            }
            b[row] -= k * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let mut s = b[row];
        for c in row + 1..N {
            s -= a[row][c] * x[c];
        }
        x[row] = s / a[row][row];
    }
    is_finite(&x).then_some(x)
}
