//! Removal of candidate facets incident to sharp ridges.
//!
//! A ridge is a facet minus one vertex. On a sampled manifold every interior
//! ridge has candidate facets on both sides at a wide dihedral angle; facets
//! at a ridge with a single facet or with two narrow angles are artifacts of
//! flat tetrahedra and are removed, which may expose further sharp ridges.

use rustc_hash::FxHashMap;

use crate::delaunay::DelaunayFacet;
use crate::linalg::{dot, is_finite, normalized, orthogonal_complement, sub};
use crate::progress::{check_cancelled, Progress};
use crate::ReconstructionError;

/// Ridge vertices in ascending order; the last slot is unused.
pub(crate) type RidgeKey<const N: usize> = [u32; N];

const PAD: u32 = u32::MAX;

/// Facet index and the facet vertex not on the ridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RidgeFacet {
    facet: u32,
    point: u32,
}

/// Ridge of `vertices` opposite local vertex `skip`.
#[inline]
pub(crate) fn ridge_key<const N: usize>(vertices: &[u32; N], skip: usize) -> RidgeKey<N> {
    let mut key = [PAD; N];
    let mut k = 0;
    for (i, &v) in vertices.iter().enumerate() {
        if i != skip {
            key[k] = v;
            k += 1;
        }
    }
    key
}

#[inline]
fn ridge_vertices<const N: usize>(key: &RidgeKey<N>) -> &[u32] {
    &key[..N - 1]
}

/// Orthonormal basis of the 2D orthogonal complement of a ridge.
struct RidgeComplement<const N: usize> {
    e0: [f64; N],
    e1: [f64; N],
}

impl<const N: usize> RidgeComplement<N> {
    fn new(points: &[[f64; N]], ridge: &[u32], point: u32) -> Self {
        let origin = &points[ridge[0] as usize];
        let mut vectors: Vec<[f64; N]> = ridge[1..]
            .iter()
            .map(|&v| sub(&points[v as usize], origin))
            .collect();
        vectors.push(sub(&points[point as usize], origin));
        let e0 = normalized(&orthogonal_complement(&vectors));

        let last = vectors.len() - 1;
        vectors[last] = e0;
        let e1 = normalized(&orthogonal_complement(&vectors));

        Self { e0, e1 }
    }

    /// Normalized 2D coordinates of the projection of `v`.
    fn coordinates(&self, v: &[f64; N]) -> [f64; 2] {
        normalized(&[dot(&self.e0, v), dot(&self.e1, v)])
    }
}

/// Smallest angle to the first facet on either side of it, as cosine and sine.
struct Angles {
    cos_plus: f64,
    cos_minus: f64,
    sin_plus: f64,
    sin_minus: f64,
}

fn compute_angles<const N: usize>(
    points: &[[f64; N]],
    ridge: &[u32],
    facets: &[RidgeFacet],
) -> Angles {
    let origin = &points[ridge[0] as usize];
    let basis = RidgeComplement::new(points, ridge, facets[0].point);
    let base = basis.coordinates(&sub(&points[facets[0].point as usize], origin));
    debug_assert!(is_finite(&base));

    let mut angles = Angles {
        cos_plus: 1.0,
        cos_minus: 1.0,
        sin_plus: 0.0,
        sin_minus: 0.0,
    };

    for facet in &facets[1..] {
        let v = basis.coordinates(&sub(&points[facet.point as usize], origin));
        debug_assert!(is_finite(&v));

        let sine = base[0] * v[1] - base[1] * v[0];
        let cosine = dot(&base, &v);

        if sine >= 0.0 {
            if cosine < angles.cos_plus {
                angles.cos_plus = cosine;
                angles.sin_plus = sine;
            }
        } else if cosine < angles.cos_minus {
            angles.cos_minus = cosine;
            angles.sin_minus = sine;
        }
    }

    angles
}

fn sharp_ridge<const N: usize>(
    points: &[[f64; N]],
    interior: &[bool],
    ridge: &[u32],
    facets: &[RidgeFacet],
) -> bool {
    debug_assert!(!facets.is_empty());

    if ridge.iter().any(|&v| !interior[v as usize]) {
        return false;
    }

    if facets.len() == 1 {
        return true;
    }

    let angles = compute_angles(points, ridge, facets);

    // a right or obtuse angle on either side
    if angles.cos_plus <= 0.0 || angles.cos_minus <= 0.0 {
        return false;
    }

    // cos(a + b) = cos(a)cos(b) - sin(a)sin(b), with sin_minus <= 0
    let cos_sum = angles.cos_plus * angles.cos_minus - (angles.sin_plus * angles.sin_minus).abs();
    cos_sum > 0.0
}

struct RidgeMap<const N: usize> {
    ridges: FxHashMap<RidgeKey<N>, Vec<RidgeFacet>>,
}

impl<const N: usize> RidgeMap<N> {
    fn new(facets: &[DelaunayFacet<N>], selected: &[bool]) -> Self {
        let mut ridges: FxHashMap<RidgeKey<N>, Vec<RidgeFacet>> = FxHashMap::default();
        for (f, facet) in facets.iter().enumerate() {
            if !selected[f] {
                continue;
            }
            for r in 0..N {
                ridges
                    .entry(ridge_key(facet.vertices(), r))
                    .or_default()
                    .push(RidgeFacet {
                        facet: f as u32,
                        point: facet.vertices()[r],
                    });
            }
        }
        Self { ridges }
    }

    fn remove_facet(&mut self, facet: u32, vertices: &[u32; N]) {
        for r in 0..N {
            let key = ridge_key(vertices, r);
            if let Some(list) = self.ridges.get_mut(&key) {
                list.retain(|rf| rf.facet != facet);
                if list.is_empty() {
                    self.ridges.remove(&key);
                }
            }
        }
    }

    fn sorted_keys(&self) -> Vec<RidgeKey<N>> {
        let mut keys: Vec<RidgeKey<N>> = self.ridges.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

/// Clears `selected` for facets incident to sharp ridges until none remain.
///
/// Ridges are visited in sorted order in each round, so the result does not
/// depend on hash order.
pub(crate) fn prune_facets_incident_to_sharp_ridges<const N: usize>(
    points: &[[f64; N]],
    facets: &[DelaunayFacet<N>],
    interior: &[bool],
    selected: &mut [bool],
    progress: &dyn Progress,
) -> Result<(), ReconstructionError> {
    debug_assert_eq!(facets.len(), selected.len());
    debug_assert_eq!(points.len(), interior.len());

    let mut map = RidgeMap::new(facets, selected);
    let mut suspicious = map.sorted_keys();
    let mut removed = 0usize;
    let mut rounds = 0usize;

    while !suspicious.is_empty() {
        check_cancelled(progress)?;
        rounds += 1;

        let mut next = Vec::new();
        for key in &suspicious {
            let Some(ridge_facets) = map.ridges.get(key) else {
                continue;
            };
            if !sharp_ridge(points, interior, ridge_vertices(key), ridge_facets) {
                continue;
            }

            let to_remove: Vec<RidgeFacet> = ridge_facets.clone();
            for rf in to_remove {
                let vertices = facets[rf.facet as usize].vertices();
                for r in 0..N {
                    let other = ridge_key(vertices, r);
                    if other != *key {
                        next.push(other);
                    }
                }
                selected[rf.facet as usize] = false;
                map.remove_facet(rf.facet, vertices);
                removed += 1;
            }
        }

        next.sort_unstable();
        next.dedup();
        suspicious = next;
    }

    log::debug!("pruned {} facets in {} rounds", removed, rounds);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ridge_key_skips_one_vertex() {
        assert_eq!(ridge_key(&[1, 4, 7], 1), [1, 7, PAD]);
        assert_eq!(ridge_key(&[1, 4, 7], 0), [4, 7, PAD]);
        assert_eq!(ridge_key(&[2, 5], 1), [2, PAD]);
    }

    #[test]
    fn test_single_facet_ridge_is_sharp_only_when_interior() {
        let points = [[0.0, 0.0], [1.0, 0.0]];
        let facets = [RidgeFacet { facet: 0, point: 1 }];
        assert!(sharp_ridge(&points, &[true, true], &[0], &facets));
        assert!(!sharp_ridge(&points, &[false, true], &[0], &facets));
    }

    #[test]
    fn test_narrow_wedge_is_sharp() {
        // Ridge at the origin with facets towards 1, 2 and 3. Point 2 is 10°
        // above the first facet and point 3 is 10° below it.
        let a = 10f64.to_radians();
        let points = [
            [0.0, 0.0],
            [1.0, 0.0],
            [a.cos(), a.sin()],
            [a.cos(), -a.sin()],
        ];
        let facets = [
            RidgeFacet { facet: 0, point: 1 },
            RidgeFacet { facet: 1, point: 2 },
            RidgeFacet { facet: 2, point: 3 },
        ];
        assert!(sharp_ridge(&points, &[true; 4], &[0], &facets));
    }

    #[test]
    fn test_straight_continuation_is_not_sharp() {
        let points = [[0.0, 0.0], [1.0, 0.0], [-1.0, 0.1]];
        let facets = [
            RidgeFacet { facet: 0, point: 1 },
            RidgeFacet { facet: 1, point: 2 },
        ];
        assert!(!sharp_ridge(&points, &[true; 3], &[0], &facets));
    }

    #[test]
    fn test_dihedral_angle_in_3d() {
        // Ridge along the z axis. Two half-planes 20° apart are sharp, a
        // nearly flat pair is not.
        let a = 20f64.to_radians();
        let points = vec![
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.5],
            [a.cos(), a.sin(), 0.5],
            [-1.0, 0.05, 0.5],
        ];
        let ridge = [0u32, 1];
        let narrow = [
            RidgeFacet { facet: 0, point: 2 },
            RidgeFacet { facet: 1, point: 3 },
        ];
        let flat = [
            RidgeFacet { facet: 0, point: 2 },
            RidgeFacet { facet: 1, point: 4 },
        ];
        let interior = [true; 5];
        assert!(sharp_ridge(&points, &interior, &ridge, &narrow));
        assert!(!sharp_ridge(&points, &interior, &ridge, &flat));
    }
}
