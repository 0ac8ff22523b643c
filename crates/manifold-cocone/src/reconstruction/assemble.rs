//! Output facets and per-point normals.
//!
//! Facets are oriented consistently within each connected component (through
//! ridges shared by exactly two facets). Normals average the pole directions
//! of a point and its surface neighbors and are then flipped to the side the
//! oriented facets face.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use super::prune::{ridge_key, RidgeKey};
use super::structure::ManifoldVertex;
use crate::delaunay::DelaunayFacet;
use crate::linalg::{add, dot, is_finite, normalized, orthogonal_complement, scale, sub};
use crate::progress::{check_cancelled, Progress};
use crate::ReconstructionError;

const CANCEL_INTERVAL: usize = 1 << 14;

/// Unit vector orthogonal to a facet, oriented by the vertex order.
fn facet_normal<const N: usize>(points: &[[f64; N]], vertices: &[u32; N]) -> [f64; N] {
    let origin = &points[vertices[0] as usize];
    let rows: Vec<[f64; N]> = vertices[1..]
        .iter()
        .map(|&v| sub(&points[v as usize], origin))
        .collect();
    normalized(&orthogonal_complement(&rows))
}

/// Selected facets in array order, without repeated vertex sets.
fn unique_facets<const N: usize>(facets: &[DelaunayFacet<N>], selected: &[bool]) -> Vec<[u32; N]> {
    let mut seen: FxHashSet<[u32; N]> = FxHashSet::default();
    facets
        .iter()
        .zip(selected)
        .filter(|(_, s)| **s)
        .map(|(f, _)| *f.vertices())
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Pole-averaged normal of every point on the surface; zero elsewhere.
///
/// Pole directions carry no consistent sign, so the neighborhood votes on
/// the side of the point's own pole and minority vectors are flipped.
fn average_normals<const N: usize>(
    point_count: usize,
    facets: &[[u32; N]],
    vertex_data: &[ManifoldVertex<N>],
) -> Vec<[f64; N]> {
    let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); point_count];
    for facet in facets {
        for &v in facet {
            neighbors[v as usize].extend(facet.iter().copied());
        }
    }

    neighbors
        .into_iter()
        .enumerate()
        .map(|(p, mut around)| {
            if around.is_empty() {
                return [0.0; N];
            }
            around.sort_unstable();
            around.dedup();

            let target = &vertex_data[p].positive_norm;
            let (positive, negative) = around.iter().fold((0usize, 0usize), |(pos, neg), &q| {
                if dot(&vertex_data[q as usize].positive_norm, target) >= 0.0 {
                    (pos + 1, neg)
                } else {
                    (pos, neg + 1)
                }
            });
            let majority = if negative > positive { -1.0 } else { 1.0 };

            let mut sum = [0.0; N];
            for &q in &around {
                let pole = &vertex_data[q as usize].positive_norm;
                let side = if dot(pole, target) >= 0.0 { 1.0 } else { -1.0 };
                sum = add(&sum, &scale(pole, side * majority));
            }

            let normal = normalized(&sum);
            if is_finite(&normal) {
                normal
            } else {
                scale(target, majority)
            }
        })
        .collect()
}

/// Orientation sign of every facet relative to its sorted vertex order.
fn orient_facets<const N: usize>(
    points: &[[f64; N]],
    facets: &[[u32; N]],
    normals: &[[f64; N]],
    progress: &dyn Progress,
) -> Result<Vec<i8>, ReconstructionError> {
    let mut ridges: FxHashMap<RidgeKey<N>, Vec<(u32, u8)>> = FxHashMap::default();
    for (f, facet) in facets.iter().enumerate() {
        for r in 0..N {
            ridges
                .entry(ridge_key(facet, r))
                .or_default()
                .push((f as u32, r as u8));
        }
    }

    let mut sign = vec![0i8; facets.len()];
    let mut queue = VecDeque::new();
    let mut components = 0usize;

    for seed in 0..facets.len() {
        if sign[seed] != 0 {
            continue;
        }
        components += 1;

        let vertex_normals = facets[seed]
            .iter()
            .fold([0.0; N], |sum, &v| add(&sum, &normals[v as usize]));
        sign[seed] = if dot(&facet_normal(points, &facets[seed]), &vertex_normals) < 0.0 {
            -1
        } else {
            1
        };
        queue.push_back(seed as u32);

        while let Some(f) = queue.pop_front() {
            let facet = &facets[f as usize];
            for i in 0..N {
                let Some(shared) = ridges.get(&ridge_key(facet, i)) else {
                    continue;
                };
                if shared.len() != 2 {
                    continue;
                }
                for &(g, j) in shared {
                    if g == f || sign[g as usize] != 0 {
                        continue;
                    }
                    // Opposite orientations induced on the shared ridge.
                    let parity = if (i + j as usize) % 2 == 0 { 1 } else { -1 };
                    sign[g as usize] = -sign[f as usize] * parity;
                    queue.push_back(g);
                }
            }
        }

        if components % CANCEL_INTERVAL == 0 {
            check_cancelled(progress)?;
        }
    }

    log::debug!("{} facets in {} components", facets.len(), components);
    Ok(sign)
}

/// Final facets (oriented vertex order) and normals (one per input point).
pub(crate) fn create_normals_and_facets<const N: usize>(
    points: &[[f64; N]],
    delaunay_facets: &[DelaunayFacet<N>],
    selected: &[bool],
    vertex_data: &[ManifoldVertex<N>],
    progress: &dyn Progress,
) -> Result<(Vec<[f64; N]>, Vec<[usize; N]>), ReconstructionError> {
    let facets = unique_facets(delaunay_facets, selected);
    let mut normals = average_normals(points.len(), &facets, vertex_data);
    check_cancelled(progress)?;

    let sign = orient_facets(points, &facets, &normals, progress)?;

    let mut facet_sums = vec![[0.0; N]; points.len()];
    let mut oriented = Vec::with_capacity(facets.len());
    for (facet, &s) in facets.iter().zip(&sign) {
        let mut vertices = *facet;
        if s < 0 {
            vertices.swap(0, 1);
        }
        let normal = facet_normal(points, &vertices);
        if is_finite(&normal) {
            for &v in &vertices {
                facet_sums[v as usize] = add(&facet_sums[v as usize], &normal);
            }
        }
        oriented.push(vertices.map(|v| v as usize));
    }

    for (normal, sum) in normals.iter_mut().zip(&facet_sums) {
        if dot(normal, sum) < 0.0 {
            *normal = scale(normal, -1.0);
        }
    }

    Ok((normals, oriented))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    fn square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    fn pole(v: [f64; 2]) -> ManifoldVertex<2> {
        ManifoldVertex {
            positive_norm: normalized(&v),
            height: 1.0,
            radius: 0.0,
            cocone_neighbors: Vec::new(),
        }
    }

    #[test]
    fn test_closed_polygon_is_oriented_consistently() {
        let points = square();
        // Sorted keys as produced by the triangulation.
        let facets = vec![[0u32, 1], [1, 2], [2, 3], [0, 3]];
        // Poles point outwards except for one inverted sign.
        let vertex_data = vec![
            pole([-1.0, -1.0]),
            pole([1.0, -1.0]),
            pole([-1.0, -1.0]),
            pole([-1.0, 1.0]),
        ];
        let normals = average_normals(4, &facets, &vertex_data);
        let sign = orient_facets(&points, &facets, &normals, &NoProgress).unwrap();

        // Every vertex is the head of exactly one oriented edge.
        let mut heads = [0; 4];
        let mut tails = [0; 4];
        for (f, &s) in facets.iter().zip(&sign) {
            let (a, b) = if s > 0 { (f[0], f[1]) } else { (f[1], f[0]) };
            tails[a as usize] += 1;
            heads[b as usize] += 1;
        }
        assert_eq!(heads, [1; 4]);
        assert_eq!(tails, [1; 4]);
    }

    #[test]
    fn test_normals_follow_neighborhood_majority() {
        let facets = vec![[0u32, 1], [1, 2]];
        let vertex_data = vec![pole([0.0, 1.0]), pole([0.0, -1.0]), pole([0.0, 1.0]), pole([1.0, 0.0])];
        let normals = average_normals(4, &facets, &vertex_data);
        // Point 1 is outvoted by both neighbors.
        assert!((normals[1][1] - 1.0).abs() < 1e-12);
        assert!(dot(&normals[0], &normals[1]) > 0.999);
        assert_eq!(normals[3], [0.0, 0.0]);
    }

    #[test]
    fn test_output_normals_face_like_facets() {
        let points = square();
        let facets = [[0u32, 1], [1, 2], [2, 3], [0, 3]]
            .iter()
            .map(|&v| DelaunayFacet::with_vertices(v))
            .collect::<Vec<_>>();
        let selected = vec![true; 4];
        let vertex_data = vec![
            pole([-1.0, -1.0]),
            pole([1.0, -1.0]),
            pole([1.0, 1.0]),
            pole([-1.0, 1.0]),
        ];
        let (normals, oriented) =
            create_normals_and_facets(&points, &facets, &selected, &vertex_data, &NoProgress).unwrap();
        assert_eq!(oriented.len(), 4);
        for facet in &oriented {
            let vertices = facet.map(|v| v as u32);
            let n = facet_normal(&points, &vertices);
            for &v in facet {
                assert!(dot(&n, &normals[v]) > 0.0);
            }
        }
    }
}
