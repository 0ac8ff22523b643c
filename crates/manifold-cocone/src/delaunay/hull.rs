//! Incremental convex hull with conflict lists.
//!
//! Each facet keeps the points that see it, and each point keeps the facets it
//! sees, so inserting a point touches only its visible region. The horizon is
//! found from the visible set directly and new facets are linked to each other
//! through their shared ridges; nothing recurses.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use super::predicates::{exact_rank, last_axis_sign, orient, FacetPlane, LiftedPoints, Sign};
use crate::linalg::dot;
use crate::progress::{check_cancelled, Progress};
use crate::ReconstructionError;

const NONE: u32 = u32::MAX;

/// Points inserted between progress reports and cancellation polls.
const PROGRESS_INTERVAL: usize = 256;

struct HullFacet<const D: usize> {
    /// Sorted vertex indices.
    vertices: [u32; D],
    /// `links[i]` is the facet across the ridge opposite `vertices[i]`.
    links: [u32; D],
    plane: FacetPlane<D>,
    /// Points strictly outside this facet.
    conflicts: Vec<u32>,
    alive: bool,
    visible: bool,
}

struct ConvexHull<'a, const D: usize> {
    points: &'a LiftedPoints<D>,
    facets: Vec<HullFacet<D>>,
    free: Vec<u32>,
    alive: usize,
    /// Facets seen by each point not yet inserted.
    point_conflicts: Vec<Vec<u32>>,
    mark: Vec<u32>,
    stamp: u32,
    ridges: FxHashMap<[u32; D], (u32, usize)>,
}

/// Ridge (facet minus one vertex) as a sorted key padded with `NONE`.
#[inline]
fn ridge_key<const D: usize>(vertices: &[u32; D], skip: usize) -> [u32; D] {
    let mut key = [NONE; D];
    let mut k = 0;
    for (i, &v) in vertices.iter().enumerate() {
        if i != skip {
            key[k] = v;
            k += 1;
        }
    }
    key
}

impl<'a, const D: usize> ConvexHull<'a, D> {
    fn new(points: &'a LiftedPoints<D>) -> Self {
        Self {
            points,
            facets: Vec::new(),
            free: Vec::new(),
            alive: 0,
            point_conflicts: vec![Vec::new(); points.len()],
            mark: vec![0; points.len()],
            stamp: 0,
            ridges: FxHashMap::default(),
        }
    }

    fn alloc(&mut self, vertices: [u32; D], plane: FacetPlane<D>) -> u32 {
        let facet = HullFacet {
            vertices,
            links: [NONE; D],
            plane,
            conflicts: Vec::new(),
            alive: true,
            visible: false,
        };
        self.alive += 1;
        match self.free.pop() {
            Some(id) => {
                self.facets[id as usize] = facet;
                id
            }
            None => {
                self.facets.push(facet);
                (self.facets.len() - 1) as u32
            }
        }
    }

    fn kill(&mut self, id: u32) {
        let facet = &mut self.facets[id as usize];
        let conflicts = std::mem::take(&mut facet.conflicts);
        facet.alive = false;
        facet.visible = false;
        for q in conflicts {
            let list = &mut self.point_conflicts[q as usize];
            if let Some(pos) = list.iter().position(|&f| f == id) {
                list.swap_remove(pos);
            }
        }
        self.free.push(id);
        self.alive -= 1;
    }

    /// First D + 1 affinely independent points in insertion order.
    fn initial_simplex(&self, order: &[u32]) -> Option<Vec<u32>> {
        let first = *order.first()?;
        let base = self.points.exact(first);
        let mut simplex = vec![first];
        let mut rows: Vec<[i64; D]> = Vec::with_capacity(D);
        for &p in &order[1..] {
            let v = self.points.exact(p);
            rows.push(std::array::from_fn(|i| v[i] - base[i]));
            if exact_rank(&rows) == rows.len() {
                simplex.push(p);
                if simplex.len() == D + 1 {
                    return Some(simplex);
                }
            } else {
                rows.pop();
            }
        }
        None
    }

    fn create_simplex(&mut self, simplex: &[u32], order: &[u32]) {
        debug_assert_eq!(simplex.len(), D + 1);
        // Facet i omits simplex[i]; ids are 0..=D on an empty hull.
        for i in 0..=D {
            let mut vertices = [0u32; D];
            let mut k = 0;
            for (j, &v) in simplex.iter().enumerate() {
                if j != i {
                    vertices[k] = v;
                    k += 1;
                }
            }
            vertices.sort_unstable();
            let mut plane = FacetPlane::through(self.points, &vertices);
            let inner = orient(self.points, &vertices, &plane, simplex[i]);
            debug_assert_ne!(inner, Sign::Zero);
            if inner == Sign::Pos {
                plane.negate();
            }
            let id = self.alloc(vertices, plane);
            debug_assert_eq!(id as usize, i);
        }
        for i in 0..=D {
            let vertices = self.facets[i].vertices;
            for (k, v) in vertices.iter().enumerate() {
                let j = simplex.iter().position(|s| s == v).unwrap_or(i);
                self.facets[i].links[k] = j as u32;
            }
        }

        for &p in order {
            if simplex.contains(&p) {
                continue;
            }
            for f in 0..=D {
                let facet = &self.facets[f];
                if orient(self.points, &facet.vertices, &facet.plane, p) == Sign::Pos {
                    self.facets[f].conflicts.push(p);
                    self.point_conflicts[p as usize].push(f as u32);
                }
            }
        }
    }

    /// New facet from horizon ridge `f` minus `vertices[r]` and point `p`.
    /// `link` is the invisible facet across that ridge.
    fn create_facet(&mut self, f: u32, r: usize, link: u32, p: u32) -> u32 {
        let mut vertices = self.facets[f as usize].vertices;
        vertices[r] = p;
        vertices.sort_unstable();

        let link_facet = &self.facets[link as usize];
        let k = link_facet
            .links
            .iter()
            .position(|&x| x == f)
            .expect("hull links are symmetric");
        let inner = link_facet.vertices[k];

        let mut plane = FacetPlane::through(self.points, &vertices);
        match orient(self.points, &vertices, &plane, inner) {
            Sign::Neg => {}
            Sign::Pos => plane.negate(),
            Sign::Zero => {
                // p is coplanar with the link; keep both facing the same way.
                if dot(&plane.ortho, &link_facet.plane.ortho) < 0.0 {
                    plane.negate();
                }
            }
        }

        let id = self.alloc(vertices, plane);
        let p_index = vertices.iter().position(|&v| v == p).unwrap_or(0);
        self.facets[id as usize].links[p_index] = link;
        self.facets[link as usize].links[k] = id;

        self.stamp = self.stamp.wrapping_add(1);
        let stamp = self.stamp;
        let mut conflicts = Vec::new();
        let candidates = self.facets[f as usize]
            .conflicts
            .iter()
            .chain(self.facets[link as usize].conflicts.iter());
        for &q in candidates {
            if q == p || self.mark[q as usize] == stamp {
                continue;
            }
            self.mark[q as usize] = stamp;
            if orient(self.points, &vertices, &plane, q) == Sign::Pos {
                conflicts.push(q);
                self.point_conflicts[q as usize].push(id);
            }
        }
        self.facets[id as usize].conflicts = conflicts;
        id
    }

    /// Link the new facets around `p` to each other.
    fn connect(&mut self, created: &[u32], p: u32) {
        self.ridges.clear();
        for &id in created {
            let vertices = self.facets[id as usize].vertices;
            for r in 0..D {
                if vertices[r] == p {
                    continue;
                }
                let key = ridge_key(&vertices, r);
                match self.ridges.remove(&key) {
                    Some((other, other_r)) => {
                        self.facets[id as usize].links[r] = other;
                        self.facets[other as usize].links[other_r] = id;
                    }
                    None => {
                        self.ridges.insert(key, (id, r));
                    }
                }
            }
        }
        debug_assert!(self.ridges.is_empty(), "horizon is not closed");
    }

    fn insert(&mut self, p: u32) -> Result<(), ReconstructionError> {
        let visible = std::mem::take(&mut self.point_conflicts[p as usize]);
        if visible.is_empty() {
            return Ok(());
        }
        if visible.len() == self.alive {
            return Err(ReconstructionError::DegenerateInput);
        }

        for &f in &visible {
            self.facets[f as usize].visible = true;
        }

        let mut created = Vec::new();
        for &f in &visible {
            for r in 0..D {
                let link = self.facets[f as usize].links[r];
                if self.facets[link as usize].visible {
                    continue;
                }
                created.push(self.create_facet(f, r, link, p));
            }
        }

        self.connect(&created, p);

        for &f in &visible {
            self.kill(f);
        }
        Ok(())
    }

    fn build(&mut self, order: &[u32], progress: &dyn Progress) -> Result<(), ReconstructionError> {
        let simplex = self
            .initial_simplex(order)
            .ok_or(ReconstructionError::DegenerateInput)?;
        self.create_simplex(&simplex, order);

        let total = order.len() as u64;
        for (i, &p) in order.iter().enumerate() {
            if i % PROGRESS_INTERVAL == 0 {
                check_cancelled(progress)?;
                progress.set(i as u64, total);
            }
            if simplex.contains(&p) {
                continue;
            }
            self.insert(p)?;
        }
        progress.set(total, total);
        Ok(())
    }

    /// Vertices of facets whose outward normal points down the last axis.
    fn lower_facets(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for facet in self.facets.iter().filter(|f| f.alive) {
            if last_axis_sign(self.points, &facet.vertices, &facet.plane) == Sign::Neg {
                out.extend_from_slice(&facet.vertices);
            }
        }
        out
    }
}

/// Lower convex hull of the points lifted onto the paraboloid, as a flat list
/// of `D = N + 1` sorted vertex indices per facet.
///
/// Insertion order is shuffled with a generator seeded by the point count,
/// so the result depends only on the input.
pub(crate) fn lower_hull<const N: usize, const D: usize>(
    points: &[[i64; N]],
    progress: &dyn Progress,
) -> Result<Vec<u32>, ReconstructionError> {
    if points.len() < D + 1 {
        return Err(ReconstructionError::DegenerateInput);
    }
    let lifted = LiftedPoints::<D>::lift(points);

    let mut order: Vec<u32> = (0..points.len() as u32).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(points.len() as u64);
    order.shuffle(&mut rng);

    let mut hull = ConvexHull::new(&lifted);
    hull.build(&order, progress)?;

    let lower = hull.lower_facets();
    log::debug!(
        "convex hull: {} facets, {} lower ({} allocated)",
        hull.alive,
        lower.len() / D,
        hull.facets.len()
    );
    Ok(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use rand::{Rng, SeedableRng};

    fn random_grid<const N: usize>(n: usize, seed: u64) -> Vec<[i64; N]> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut points: Vec<[i64; N]> = Vec::new();
        while points.len() < n {
            let p: [i64; N] = std::array::from_fn(|_| rng.gen_range(0..1 << 20));
            if !points.contains(&p) {
                points.push(p);
            }
        }
        points
    }

    fn cross(o: [i64; 2], a: [i64; 2], b: [i64; 2]) -> i128 {
        (a[0] - o[0]) as i128 * (b[1] - o[1]) as i128 - (a[1] - o[1]) as i128 * (b[0] - o[0]) as i128
    }

    /// Number of strict convex hull vertices (monotone chain).
    fn hull_vertex_count(points: &[[i64; 2]]) -> usize {
        let mut p = points.to_vec();
        p.sort();
        let mut lower: Vec<[i64; 2]> = Vec::new();
        for &q in &p {
            while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], q) <= 0 {
                lower.pop();
            }
            lower.push(q);
        }
        let mut upper: Vec<[i64; 2]> = Vec::new();
        for &q in p.iter().rev() {
            while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], q) <= 0 {
                upper.pop();
            }
            upper.push(q);
        }
        lower.len() + upper.len() - 2
    }

    #[test]
    fn test_two_triangles() {
        let points = [[0i64, 0], [10, 0], [0, 10], [11, 12]];
        let lower = lower_hull::<2, 3>(&points, &NoProgress).unwrap();
        assert_eq!(lower.len() / 3, 2);
    }

    #[test]
    fn test_planar_triangle_count_matches_euler() {
        for seed in [1u64, 2, 3] {
            let points = random_grid::<2>(300, seed);
            let lower = lower_hull::<2, 3>(&points, &NoProgress).unwrap();
            let h = hull_vertex_count(&points);
            assert_eq!(
                lower.len() / 3,
                2 * points.len() - h - 2,
                "seed {}: triangle count does not match 2n - h - 2",
                seed
            );
        }
    }

    #[test]
    fn test_hull_is_convex_and_linked() {
        let points = random_grid::<3>(400, 7);
        let lifted = LiftedPoints::<4>::lift(&points);
        let mut order: Vec<u32> = (0..points.len() as u32).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(7));
        let mut hull = ConvexHull::new(&lifted);
        hull.build(&order, &NoProgress).unwrap();

        for (id, facet) in hull.facets.iter().enumerate().filter(|(_, f)| f.alive) {
            for p in 0..points.len() as u32 {
                assert_ne!(
                    orient(&lifted, &facet.vertices, &facet.plane, p),
                    Sign::Pos,
                    "point {} outside facet {}",
                    p,
                    id
                );
            }
            for (r, &link) in facet.links.iter().enumerate() {
                let other = &hull.facets[link as usize];
                assert!(other.alive, "facet {} links to a dead facet", id);
                assert!(other.links.contains(&(id as u32)));
                assert_eq!(
                    ridge_key(&facet.vertices, r),
                    ridge_key(&other.vertices, other.links.iter().position(|&x| x == id as u32).unwrap())
                );
            }
        }
    }

    #[test]
    fn test_collinear_input_is_degenerate() {
        let points: Vec<[i64; 2]> = (0..20).map(|i| [i, 2 * i]).collect();
        assert_eq!(
            lower_hull::<2, 3>(&points, &NoProgress),
            Err(ReconstructionError::DegenerateInput)
        );
    }

    #[test]
    fn test_square_grid_ties_are_reproducible() {
        // Every grid cell has four cocircular corners.
        let points: Vec<[i64; 2]> = (0..36).map(|i| [(i % 6) * 1000, (i / 6) * 1000]).collect();
        let lower = lower_hull::<2, 3>(&points, &NoProgress).unwrap();
        // 2n - 2 - b triangles with all 20 boundary points as vertices.
        assert_eq!(lower.len() / 3, 50);
        for _ in 0..3 {
            assert_eq!(lower_hull::<2, 3>(&points, &NoProgress).unwrap(), lower);
        }
        for triangle in lower.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| points[triangle[i] as usize]);
            assert_eq!(cross(a, b, c).abs(), 1_000_000, "{:?} is not half a cell", triangle);
        }
    }

    #[test]
    fn test_cocircular_input_is_degenerate() {
        let points = [[0i64, 5], [5, 0], [0, -5], [-5, 0], [3, 4], [4, -3]];
        assert_eq!(
            lower_hull::<2, 3>(&points, &NoProgress),
            Err(ReconstructionError::DegenerateInput)
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let progress = crate::progress::ProgressRatio::new();
        progress.cancel();
        let points = random_grid::<2>(50, 3);
        assert_eq!(
            lower_hull::<2, 3>(&points, &progress),
            Err(ReconstructionError::Cancelled)
        );
    }
}
