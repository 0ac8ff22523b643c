//! Per-vertex Voronoi cell data and per-facet cocone membership.
//!
//! For every sample point this computes the positive pole direction, the cell
//! height (distance to the negative pole) and the cell radius within the
//! cocone, and marks for every incident Delaunay facet whether its dual
//! Voronoi edge meets the point's cocone. Points are processed in parallel;
//! each point only produces its own flags, which are merged afterwards in
//! index order.

use rayon::prelude::*;

use super::cone::{
    cocone_inside_or_equal, cocone_inside_or_equal2, intersect_cocone,
    voronoi_edge_intersects_cocone,
};
use crate::delaunay::{Delaunay, DelaunayFacet};
use crate::linalg::{add, dot, is_finite, norm, normalized, sub};
use crate::progress::{check_cancelled, Progress};
use crate::ReconstructionError;

// A Voronoi edge may touch the cocone only at the sample point itself when the
// vector to its first vertex is nearly the pole and the edge runs back along it.
const LIMIT_COSINE_FOR_INTERSECTION_PA_POLE: f64 = 0.99;
const LIMIT_COSINE_FOR_INTERSECTION_PA_AB: f64 = -0.9999;

/// Points processed between cancellation polls.
const CANCEL_INTERVAL: usize = 1024;

#[derive(Debug, Clone)]
pub(crate) struct ManifoldVertex<const N: usize> {
    /// Unit vector towards the positive pole.
    pub(crate) positive_norm: [f64; N],
    /// Distance to the negative pole.
    pub(crate) height: f64,
    /// Largest distance to the cell boundary inside the cocone.
    pub(crate) radius: f64,
    /// Sorted neighbors whose cocone contains a shared facet.
    pub(crate) cocone_neighbors: Vec<u32>,
}

impl<const N: usize> ManifoldVertex<N> {
    fn zero() -> Self {
        Self {
            positive_norm: [0.0; N],
            height: 0.0,
            radius: 0.0,
            cocone_neighbors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ManifoldFacet<const N: usize> {
    /// Dual Voronoi edge meets the cocone of each facet vertex.
    pub(crate) cocone_vertex: [bool; N],
}

/// Points whose cell data could not be computed normally.
#[derive(Debug, Clone, Default)]
pub(crate) struct StructureIssues {
    /// Not a vertex of any Delaunay object.
    pub(crate) isolated: Vec<usize>,
    pub(crate) non_finite_poles: Vec<usize>,
    pub(crate) missing_negative_poles: Vec<usize>,
    pub(crate) missing_cocone_intersections: usize,
}

pub(crate) struct Structure<const N: usize> {
    pub(crate) vertices: Vec<ManifoldVertex<N>>,
    pub(crate) facets: Vec<ManifoldFacet<N>>,
    pub(crate) issues: StructureIssues,
}

#[derive(Default)]
struct VertexConnections {
    objects: Vec<u32>,
    /// Facet index and the local index of this vertex in it.
    facets: Vec<(u32, u8)>,
}

#[derive(Default, Clone, Copy)]
struct VertexIssue {
    isolated: bool,
    non_finite_pole: bool,
    missing_negative_pole: bool,
    missing_intersections: u32,
}

struct VertexResult<const N: usize> {
    vertex: ManifoldVertex<N>,
    cocone: Vec<(u32, u8)>,
    issue: VertexIssue,
}

fn vertex_connections<const N: usize>(delaunay: &Delaunay<N>) -> Vec<VertexConnections> {
    let mut connections: Vec<VertexConnections> = (0..delaunay.points.len())
        .map(|_| VertexConnections::default())
        .collect();
    for (f, facet) in delaunay.facets.iter().enumerate() {
        for (local, &v) in facet.vertices().iter().enumerate() {
            connections[v as usize].facets.push((f as u32, local as u8));
        }
    }
    for object in 0..delaunay.object_count() as u32 {
        for &v in delaunay.object_vertices(object) {
            connections[v as usize].objects.push(object);
        }
    }
    connections
}

/// Direction of the positive pole.
///
/// A point on the convex hull has an unbounded cell; its pole direction is
/// the sum of the outward normals of its hull facets. Otherwise it is the
/// direction to the farthest Voronoi vertex of its cell.
fn voronoi_positive_norm<const N: usize>(
    vertex: &[f64; N],
    delaunay: &Delaunay<N>,
    connections: &VertexConnections,
) -> Option<[f64; N]> {
    let mut sum = [0.0; N];
    let mut unbounded = false;
    for &(f, _) in &connections.facets {
        let facet = &delaunay.facets[f as usize];
        if facet.one_sided() {
            unbounded = true;
            sum = add(&sum, facet.ortho());
        }
    }

    let positive_norm = if unbounded {
        normalized(&sum)
    } else {
        let mut max_distance = f64::MIN;
        let mut max_vector = [0.0; N];
        for &object in &connections.objects {
            let vp = sub(delaunay.voronoi_vertex(object), vertex);
            let distance = dot(&vp, &vp);
            if distance > max_distance {
                max_distance = distance;
                max_vector = vp;
            }
        }
        normalized(&max_vector)
    };

    is_finite(&positive_norm).then_some(positive_norm)
}

/// Distance to the negative pole: the farthest Voronoi vertex on the side
/// opposite the positive pole.
fn voronoi_height<const N: usize>(
    vertex: &[f64; N],
    delaunay: &Delaunay<N>,
    positive_norm: &[f64; N],
    objects: &[u32],
) -> Option<f64> {
    let mut max_distance: Option<f64> = None;
    for &object in objects {
        let vp = sub(delaunay.voronoi_vertex(object), vertex);
        if dot(&vp, positive_norm) >= 0.0 {
            continue;
        }
        let distance = dot(&vp, &vp);
        if max_distance.map_or(true, |m| distance > m) {
            max_distance = Some(distance);
        }
    }
    max_distance.map(f64::sqrt).filter(|h| h.is_finite())
}

/// Farthest point of a Voronoi edge inside the cocone. The second value is
/// false when the expected boundary crossing was not found numerically.
#[allow(clippy::too_many_arguments)]
fn voronoi_edge_radius<const N: usize>(
    delaunay: &Delaunay<N>,
    facet: &DelaunayFacet<N>,
    positive_norm: &[f64; N],
    pa: &[f64; N],
    pa_length: f64,
    pb_length: f64,
    cos_n_a: f64,
    cos_n_b: f64,
) -> (f64, bool) {
    if facet.one_sided() && cocone_inside_or_equal(cos_n_b) {
        return (f64::INFINITY, true);
    }
    if !facet.one_sided() && cocone_inside_or_equal2(cos_n_a, cos_n_b) {
        return (pa_length.max(pb_length), true);
    }

    let a_to_b = if facet.one_sided() {
        *facet.ortho()
    } else {
        sub(
            delaunay.voronoi_vertex(facet.delaunay(1)),
            delaunay.voronoi_vertex(facet.delaunay(0)),
        )
    };

    let mut radius = if cocone_inside_or_equal(cos_n_a) {
        pa_length
    } else {
        0.0
    };
    if !facet.one_sided() && cocone_inside_or_equal(cos_n_b) {
        radius = radius.max(pb_length);
    }

    match intersect_cocone(positive_norm, pa, &a_to_b, facet.one_sided()) {
        Some(distance) => (radius.max(distance), true),
        None => {
            let a_to_b_length = if facet.one_sided() {
                1.0
            } else {
                norm(&a_to_b)
            };
            let cos_pa_ab = dot(pa, &a_to_b) / (pa_length * a_to_b_length);
            let at_vertex = cos_n_a.abs() > LIMIT_COSINE_FOR_INTERSECTION_PA_POLE
                && cos_pa_ab < LIMIT_COSINE_FOR_INTERSECTION_PA_AB;
            (radius, at_vertex)
        }
    }
}

fn compute_vertex<const N: usize>(
    index: usize,
    find_radius: bool,
    delaunay: &Delaunay<N>,
    connections: &VertexConnections,
) -> VertexResult<N> {
    let mut issue = VertexIssue::default();

    if connections.objects.is_empty() && connections.facets.is_empty() {
        // Points inside or on a flat part of the lifted hull are not vertices.
        issue.isolated = true;
        return VertexResult {
            vertex: ManifoldVertex::zero(),
            cocone: Vec::new(),
            issue,
        };
    }

    let vertex = &delaunay.points[index];

    let Some(positive_norm) = voronoi_positive_norm(vertex, delaunay, connections) else {
        issue.non_finite_pole = true;
        return VertexResult {
            vertex: ManifoldVertex::zero(),
            cocone: Vec::new(),
            issue,
        };
    };

    let height = match voronoi_height(vertex, delaunay, &positive_norm, &connections.objects) {
        Some(h) => h,
        None => {
            issue.missing_negative_pole = true;
            0.0
        }
    };

    let mut cocone = Vec::new();
    let mut radius: f64 = 0.0;
    for &(f, local) in &connections.facets {
        let facet = &delaunay.facets[f as usize];

        let pa = sub(delaunay.voronoi_vertex(facet.delaunay(0)), vertex);
        let pa_length = norm(&pa);
        let cos_n_a = dot(&positive_norm, &pa) / pa_length;

        let (pb_length, cos_n_b) = if facet.one_sided() {
            (0.0, dot(&positive_norm, facet.ortho()))
        } else {
            let pb = sub(delaunay.voronoi_vertex(facet.delaunay(1)), vertex);
            let pb_length = norm(&pb);
            (pb_length, dot(&positive_norm, &pb) / pb_length)
        };

        if !voronoi_edge_intersects_cocone(cos_n_a, cos_n_b) {
            continue;
        }

        cocone.push((f, local));

        if find_radius && radius != f64::INFINITY {
            let (edge_radius, found) = voronoi_edge_radius(
                delaunay,
                facet,
                &positive_norm,
                &pa,
                pa_length,
                pb_length,
                cos_n_a,
                cos_n_b,
            );
            if !found {
                issue.missing_intersections += 1;
            }
            radius = radius.max(edge_radius);
        }
    }

    VertexResult {
        vertex: ManifoldVertex {
            positive_norm,
            height,
            radius,
            cocone_neighbors: Vec::new(),
        },
        cocone,
        issue,
    }
}

/// Neighbors of `v` across incident facets whose dual edge meets the
/// neighbor's cocone.
fn cocone_neighbors<const N: usize>(
    v: u32,
    delaunay: &Delaunay<N>,
    facet_data: &[ManifoldFacet<N>],
    connections: &VertexConnections,
) -> Vec<u32> {
    let mut neighbors = Vec::new();
    for &(f, local) in &connections.facets {
        let facet = &delaunay.facets[f as usize];
        debug_assert_eq!(facet.vertices()[local as usize], v);
        for k in (0..N).filter(|&k| k != local as usize) {
            if facet_data[f as usize].cocone_vertex[k] {
                neighbors.push(facet.vertices()[k]);
            }
        }
    }
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
}

/// Vertex and facet data for the reconstruction passes.
///
/// `find_radius` is only needed by BoundCocone.
pub(crate) fn vertex_and_facet_data<const N: usize>(
    find_radius: bool,
    delaunay: &Delaunay<N>,
    progress: &dyn Progress,
) -> Result<Structure<N>, ReconstructionError> {
    let connections = vertex_connections(delaunay);
    let point_count = delaunay.points.len();

    let results: Vec<VertexResult<N>> = (0..point_count)
        .into_par_iter()
        .with_min_len(64)
        .map(|v| {
            if v % CANCEL_INTERVAL == 0 {
                check_cancelled(progress)?;
            }
            Ok(compute_vertex(v, find_radius, delaunay, &connections[v]))
        })
        .collect::<Result<_, ReconstructionError>>()?;

    let mut facet_data = vec![
        ManifoldFacet {
            cocone_vertex: [false; N],
        };
        delaunay.facets.len()
    ];
    let mut issues = StructureIssues::default();
    let mut vertices = Vec::with_capacity(point_count);
    for (v, result) in results.into_iter().enumerate() {
        for (f, local) in result.cocone {
            facet_data[f as usize].cocone_vertex[local as usize] = true;
        }
        let issue = result.issue;
        if issue.isolated {
            issues.isolated.push(v);
        }
        if issue.non_finite_pole {
            issues.non_finite_poles.push(v);
        }
        if issue.missing_negative_pole {
            issues.missing_negative_poles.push(v);
        }
        issues.missing_cocone_intersections += issue.missing_intersections as usize;
        vertices.push(result.vertex);
    }

    check_cancelled(progress)?;

    vertices
        .par_iter_mut()
        .zip(connections.par_iter())
        .enumerate()
        .for_each(|(v, (vertex, conn))| {
            vertex.cocone_neighbors = cocone_neighbors(v as u32, delaunay, &facet_data, conn);
        });

    if !issues.isolated.is_empty() {
        log::debug!("{} points are not Delaunay vertices", issues.isolated.len());
    }
    if !issues.non_finite_poles.is_empty() || !issues.missing_negative_poles.is_empty() {
        log::debug!(
            "poles: {} not finite, {} without negative pole",
            issues.non_finite_poles.len(),
            issues.missing_negative_poles.len()
        );
    }
    if issues.missing_cocone_intersections > 0 {
        log::debug!(
            "{} cocone intersections not found",
            issues.missing_cocone_intersections
        );
    }

    Ok(Structure {
        vertices,
        facets: facet_data,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn ellipse_points(n: usize, seed: u64) -> Vec<[f32; 2]> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let t: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                [t.cos() as f32, (0.6 * t.sin()) as f32]
            })
            .collect()
    }

    #[test]
    fn test_poles_follow_curve_normals() {
        let points = ellipse_points(200, 5);
        let delaunay = Delaunay::<2>::build(&points, &NoProgress).unwrap();
        let structure = vertex_and_facet_data(true, &delaunay, &NoProgress).unwrap();

        let mut aligned = 0;
        for (p, vertex) in points.iter().zip(&structure.vertices) {
            let normal = normalized(&[p[0] as f64, p[1] as f64 / 0.36]);
            if dot(&normal, &vertex.positive_norm).abs() > 0.95 {
                aligned += 1;
            }
            assert!(vertex.height >= 0.0);
            assert!(vertex.radius >= 0.0);
        }
        assert!(aligned > 190, "only {} of 200 poles follow the normal", aligned);
    }

    #[test]
    fn test_cocone_neighbors_are_sorted_and_exclude_self() {
        let points = ellipse_points(100, 6);
        let delaunay = Delaunay::<2>::build(&points, &NoProgress).unwrap();
        let structure = vertex_and_facet_data(false, &delaunay, &NoProgress).unwrap();
        for (v, vertex) in structure.vertices.iter().enumerate() {
            assert!(vertex.cocone_neighbors.windows(2).all(|w| w[0] < w[1]));
            assert!(!vertex.cocone_neighbors.contains(&(v as u32)));
            assert_eq!(vertex.radius, 0.0);
        }
        assert!(structure.issues.isolated.is_empty());
    }
}
