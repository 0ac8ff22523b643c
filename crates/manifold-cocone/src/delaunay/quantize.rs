//! Integer grid used by the exact predicates.

use crate::ReconstructionError;

/// Bits per coordinate. Keeps lifted coordinates `|x|^2` of 4D points below 2^53.
pub(crate) const GRID_BITS: u32 = 24;

/// Shift input points to the origin and scale them onto a `2^GRID_BITS` grid.
///
/// Fails on non-finite coordinates and on points that land on the same grid node.
pub(crate) fn quantize<const N: usize>(
    points: &[[f32; N]],
) -> Result<Vec<[i64; N]>, ReconstructionError> {
    if let Some(i) = points
        .iter()
        .position(|p| p.iter().any(|x| !x.is_finite()))
    {
        return Err(ReconstructionError::NonFinitePoint(i));
    }

    let mut min = [f64::INFINITY; N];
    let mut max = [f64::NEG_INFINITY; N];
    for p in points {
        for i in 0..N {
            min[i] = min[i].min(p[i] as f64);
            max[i] = max[i].max(p[i] as f64);
        }
    }
    let extent = (0..N).map(|i| max[i] - min[i]).fold(0.0, f64::max);
    if extent <= 0.0 {
        return Err(ReconstructionError::DuplicatePoint {
            first: 0,
            second: 1,
        });
    }

    let scale = ((1u64 << GRID_BITS) - 1) as f64 / extent;
    let grid: Vec<[i64; N]> = points
        .iter()
        .map(|p| std::array::from_fn(|i| ((p[i] as f64 - min[i]) * scale).round() as i64))
        .collect();

    check_distinct(&grid)?;

    log::trace!(
        "quantized {} points, extent {:.6e}, scale {:.6e}",
        points.len(),
        extent,
        scale
    );

    Ok(grid)
}

fn check_distinct<const N: usize>(grid: &[[i64; N]]) -> Result<(), ReconstructionError> {
    let mut order: Vec<u32> = (0..grid.len() as u32).collect();
    order.sort_unstable_by(|&a, &b| grid[a as usize].cmp(&grid[b as usize]).then(a.cmp(&b)));
    for w in order.windows(2) {
        if grid[w[0] as usize] == grid[w[1] as usize] {
            return Err(ReconstructionError::DuplicatePoint {
                first: w[0] as usize,
                second: w[1] as usize,
            });
        }
    }
    Ok(())
}
