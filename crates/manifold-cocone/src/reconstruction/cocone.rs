//! Candidate facet selection for Cocone and BoundCocone.

use std::f64::consts::FRAC_PI_2;

use super::structure::{ManifoldFacet, ManifoldVertex};
use crate::delaunay::DelaunayFacet;
use crate::linalg::dot;
use crate::ReconstructionError;

const RHO_MIN: f64 = 0.0;
const RHO_MAX: f64 = 1.0;
const ALPHA_MIN: f64 = 0.0;
const ALPHA_MAX: f64 = FRAC_PI_2;

pub(crate) fn check_rho_and_alpha(rho: f64, alpha: f64) -> Result<(), ReconstructionError> {
    if !(rho > RHO_MIN && rho < RHO_MAX) {
        return Err(ReconstructionError::InvalidParameter {
            name: "rho",
            value: rho,
            min: RHO_MIN,
            max: RHO_MAX,
        });
    }
    if !(alpha > ALPHA_MIN && alpha < ALPHA_MAX) {
        return Err(ReconstructionError::InvalidParameter {
            name: "alpha",
            value: alpha,
            min: ALPHA_MIN,
            max: ALPHA_MAX,
        });
    }
    Ok(())
}

/// Facets whose dual Voronoi edge meets the cocone of every facet vertex.
pub(crate) fn find_cocone_facets<const N: usize>(facet_data: &[ManifoldFacet<N>]) -> Vec<bool> {
    facet_data
        .iter()
        .map(|f| f.cocone_vertex.iter().all(|&c| c))
        .collect()
}

/// The Voronoi cell is long and thin along the pole.
#[inline]
fn ratio_condition<const N: usize>(vertex: &ManifoldVertex<N>, rho: f64) -> bool {
    vertex.radius <= rho * vertex.height
}

/// Pole lines of neighboring cells are nearly parallel. The sign of a pole
/// is arbitrary, so only the angle between lines counts.
#[inline]
fn normal_condition<const N: usize>(
    a: &ManifoldVertex<N>,
    b: &ManifoldVertex<N>,
    cos_of_alpha: f64,
) -> bool {
    dot(&a.positive_norm, &b.positive_norm).abs() >= cos_of_alpha
}

/// Points classified as interior of the manifold.
///
/// Seeds are points whose cell is thin and whose pole agrees with every
/// cocone neighbor. The set then grows by points agreeing with at least one
/// interior neighbor until nothing changes.
pub(crate) fn find_interior_points<const N: usize>(
    rho: f64,
    cos_of_alpha: f64,
    vertex_data: &[ManifoldVertex<N>],
) -> Vec<bool> {
    let mut interior = vec![false; vertex_data.len()];
    let mut interior_count = 0;

    for (v, vertex) in vertex_data.iter().enumerate() {
        if !ratio_condition(vertex, rho) {
            continue;
        }
        let flat = vertex
            .cocone_neighbors
            .iter()
            .all(|&n| normal_condition(vertex, &vertex_data[n as usize], cos_of_alpha));
        if flat {
            interior[v] = true;
            interior_count += 1;
        }
    }

    log::debug!(
        "interior points after initial phase: {} of {}",
        interior_count,
        vertex_data.len()
    );

    if interior_count == 0 {
        return interior;
    }

    loop {
        let mut found = false;
        for (v, vertex) in vertex_data.iter().enumerate() {
            if interior[v] || !ratio_condition(vertex, rho) {
                continue;
            }
            let joins = vertex.cocone_neighbors.iter().any(|&n| {
                interior[n as usize]
                    && normal_condition(vertex, &vertex_data[n as usize], cos_of_alpha)
            });
            if joins {
                interior[v] = true;
                interior_count += 1;
                found = true;
            }
        }
        if !found {
            break;
        }
    }

    log::debug!(
        "interior points after expansion phase: {} of {}",
        interior_count,
        vertex_data.len()
    );

    interior
}

/// Every vertex is either interior with the facet in its cocone, or a
/// boundary point; at least one vertex must be of the first kind.
fn cocone_interior_facet<const N: usize>(
    facet: &DelaunayFacet<N>,
    data: &ManifoldFacet<N>,
    interior: &[bool],
) -> bool {
    let mut found = false;
    for (local, &v) in facet.vertices().iter().enumerate() {
        let is_interior = interior[v as usize];
        let interior_cocone = is_interior && data.cocone_vertex[local];
        if is_interior && !interior_cocone {
            return false;
        }
        found |= interior_cocone;
    }
    found
}

pub(crate) fn find_cocone_interior_facets<const N: usize>(
    facets: &[DelaunayFacet<N>],
    facet_data: &[ManifoldFacet<N>],
    interior: &[bool],
) -> Vec<bool> {
    facets
        .iter()
        .zip(facet_data)
        .map(|(facet, data)| cocone_interior_facet(facet, data, interior))
        .collect()
}

/// Some vertex is interior and has the facet in its cocone.
fn touches_interior_cocone<const N: usize>(
    facet: &DelaunayFacet<N>,
    data: &ManifoldFacet<N>,
    interior: &[bool],
) -> bool {
    facet
        .vertices()
        .iter()
        .zip(&data.cocone_vertex)
        .any(|(&v, &in_cocone)| in_cocone && interior[v as usize])
}

/// Drops selected facets without an interior-cocone vertex. Returns the
/// number of facets still selected.
///
/// Shrinking `interior` can only drop more facets.
pub(crate) fn restrict_to_interior<const N: usize>(
    facets: &[DelaunayFacet<N>],
    facet_data: &[ManifoldFacet<N>],
    interior: &[bool],
    selected: &mut [bool],
) -> usize {
    let mut kept = 0;
    for ((facet, data), s) in facets.iter().zip(facet_data).zip(selected.iter_mut()) {
        *s = *s && touches_interior_cocone(facet, data, interior);
        kept += *s as usize;
    }
    kept
}
