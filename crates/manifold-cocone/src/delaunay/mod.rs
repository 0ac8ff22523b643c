//! Delaunay triangulation via the lower convex hull of lifted points.
//!
//! Input points are snapped to an integer grid first. The triangulation,
//! circumcenters and every later computation use the grid coordinates.

pub(crate) mod hull;
pub(crate) mod predicates;
mod quantize;

use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

use crate::dimension::{Dim, SupportedDimension};
use crate::linalg::{add, dot, normalized, orthogonal_complement, scale, solve, sub};
use crate::progress::{check_cancelled, Progress};
use crate::util::Timed;
use crate::ReconstructionError;

pub(crate) const NONE: u32 = u32::MAX;

/// An (N-1)-face of the triangulation with the simplices on either side.
#[derive(Debug, Clone)]
pub(crate) struct DelaunayFacet<const N: usize> {
    vertices: [u32; N],
    delaunay: [u32; 2],
    /// Outward unit normal; only set for one-sided facets.
    ortho: [f64; N],
}

impl<const N: usize> DelaunayFacet<N> {
    #[inline]
    pub(crate) fn vertices(&self) -> &[u32; N] {
        &self.vertices
    }

    #[inline]
    pub(crate) fn delaunay(&self, side: usize) -> u32 {
        self.delaunay[side]
    }

    /// Facet on the convex hull of the points: only one simplex.
    #[inline]
    pub(crate) fn one_sided(&self) -> bool {
        self.delaunay[1] == NONE
    }

    #[inline]
    pub(crate) fn ortho(&self) -> &[f64; N] {
        &self.ortho
    }
}

#[cfg(test)]
impl<const N: usize> DelaunayFacet<N> {
    pub(crate) fn with_vertices(vertices: [u32; N]) -> Self {
        Self {
            vertices,
            delaunay: [0, NONE],
            ortho: [0.0; N],
        }
    }
}

/// Delaunay simplices (objects) with their circumcenters and facets.
pub(crate) struct Delaunay<const N: usize> {
    /// Grid coordinates of the input points.
    pub(crate) points: Vec<[f64; N]>,
    /// Sorted vertex indices, N + 1 per object.
    objects: Vec<u32>,
    voronoi_vertices: Vec<[f64; N]>,
    /// Facet opposite each local vertex, N + 1 per object.
    object_facets: Vec<u32>,
    pub(crate) facets: Vec<DelaunayFacet<N>>,
    /// Objects whose circumcenter could not be solved for.
    pub(crate) degenerate_objects: usize,
}

impl<const N: usize> Delaunay<N>
where
    Dim<N>: SupportedDimension<N>,
{
    pub(crate) fn build(
        source: &[[f32; N]],
        progress: &dyn Progress,
    ) -> Result<Self, ReconstructionError> {
        let grid = {
            let _t = Timed::debug("Quantize points");
            quantize::quantize(source)?
        };

        let objects = {
            let _t = Timed::info("Delaunay triangulation");
            <Dim<N> as SupportedDimension<N>>::lower_hull(&grid, progress)?
        };
        check_cancelled(progress)?;

        let points: Vec<[f64; N]> = grid
            .iter()
            .map(|p| std::array::from_fn(|i| p[i] as f64))
            .collect();

        let _t = Timed::debug("Delaunay objects and facets");
        let mut delaunay = Self {
            points,
            objects,
            voronoi_vertices: Vec::new(),
            object_facets: Vec::new(),
            facets: Vec::new(),
            degenerate_objects: 0,
        };
        delaunay.create_voronoi_vertices();
        delaunay.create_facets();

        log::info!(
            "Delaunay: {} points, {} objects, {} facets",
            delaunay.points.len(),
            delaunay.object_count(),
            delaunay.facets.len()
        );
        Ok(delaunay)
    }
}

impl<const N: usize> Delaunay<N> {
    #[inline]
    pub(crate) fn object_count(&self) -> usize {
        self.objects.len() / (N + 1)
    }

    #[inline]
    pub(crate) fn object_vertices(&self, object: u32) -> &[u32] {
        let start = object as usize * (N + 1);
        &self.objects[start..start + N + 1]
    }

    #[inline]
    pub(crate) fn object_facets(&self, object: u32) -> &[u32] {
        let start = object as usize * (N + 1);
        &self.object_facets[start..start + N + 1]
    }

    #[inline]
    pub(crate) fn voronoi_vertex(&self, object: u32) -> &[f64; N] {
        &self.voronoi_vertices[object as usize]
    }

    fn create_voronoi_vertices(&mut self) {
        let count = self.object_count();
        let mut vertices = Vec::with_capacity(count);
        let mut degenerate = 0;
        for object in 0..count as u32 {
            let simplex = self.object_vertices(object);
            match circumcenter(&self.points, simplex) {
                Some(c) => vertices.push(c),
                None => {
                    degenerate += 1;
                    vertices.push(centroid(&self.points, simplex));
                }
            }
        }
        if degenerate > 0 {
            log::warn!("{} Delaunay objects without a circumcenter", degenerate);
        }
        self.voronoi_vertices = vertices;
        self.degenerate_objects = degenerate;
    }

    fn create_facets(&mut self) {
        let count = self.object_count();
        let mut index: FxHashMap<[u32; N], u32> = FxHashMap::default();
        index.reserve(count * (N + 1) / 2 + N);
        let mut facets: Vec<DelaunayFacet<N>> = Vec::new();
        let mut opposite: Vec<u32> = Vec::new();
        let mut object_facets = vec![NONE; count * (N + 1)];

        for object in 0..count as u32 {
            let simplex = self.object_vertices(object);
            for r in 0..=N {
                let mut key = [0u32; N];
                let mut k = 0;
                for (i, &v) in simplex.iter().enumerate() {
                    if i != r {
                        key[k] = v;
                        k += 1;
                    }
                }
                let facet = match index.entry(key) {
                    Entry::Occupied(e) => {
                        let f = *e.get();
                        debug_assert!(facets[f as usize].one_sided(), "facet shared by 3 objects");
                        facets[f as usize].delaunay[1] = object;
                        f
                    }
                    Entry::Vacant(e) => {
                        let f = facets.len() as u32;
                        e.insert(f);
                        facets.push(DelaunayFacet {
                            vertices: key,
                            delaunay: [object, NONE],
                            ortho: [0.0; N],
                        });
                        opposite.push(simplex[r]);
                        f
                    }
                };
                object_facets[object as usize * (N + 1) + r] = facet;
            }
        }

        for (facet, &o) in facets.iter_mut().zip(&opposite) {
            if facet.one_sided() {
                facet.ortho = outward_normal(&self.points, &facet.vertices, o);
            }
        }

        self.facets = facets;
        self.object_facets = object_facets;
    }
}

/// Center of the sphere through the N + 1 simplex vertices.
fn circumcenter<const N: usize>(points: &[[f64; N]], simplex: &[u32]) -> Option<[f64; N]> {
    let p0 = points[simplex[0] as usize];
    let mut a = [[0.0; N]; N];
    let mut b = [0.0; N];
    for i in 0..N {
        let d = sub(&points[simplex[i + 1] as usize], &p0);
        a[i] = scale(&d, 2.0);
        b[i] = dot(&d, &d);
    }
    solve(a, b).map(|y| add(&p0, &y))
}

fn centroid<const N: usize>(points: &[[f64; N]], simplex: &[u32]) -> [f64; N] {
    let mut sum = [0.0; N];
    for &v in simplex {
        sum = add(&sum, &points[v as usize]);
    }
    scale(&sum, 1.0 / simplex.len() as f64)
}

/// Unit normal of a facet pointing away from the `opposite` vertex.
fn outward_normal<const N: usize>(points: &[[f64; N]], facet: &[u32; N], opposite: u32) -> [f64; N] {
    let p0 = points[facet[0] as usize];
    let rows: Vec<[f64; N]> = facet[1..]
        .iter()
        .map(|&v| sub(&points[v as usize], &p0))
        .collect();
    let ortho = orthogonal_complement(&rows);
    let to_opposite = sub(&points[opposite as usize], &p0);
    if dot(&ortho, &to_opposite) > 0.0 {
        normalized(&scale(&ortho, -1.0))
    } else {
        normalized(&ortho)
    }
}
