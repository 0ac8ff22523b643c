//! Euclidean minimum spanning tree restricted to Delaunay edges.

use crate::delaunay::Delaunay;
use crate::linalg::{dot, sub};
use crate::progress::{check_cancelled, Progress};
use crate::util::Timed;
use crate::{ReconstructionError, Stage};

const CANCEL_INTERVAL: usize = 1 << 16;

/// Disjoint-set forest, union by size with path halving.
struct Dsu {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl Dsu {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    /// False if `a` and `b` were already connected.
    fn union(&mut self, a: u32, b: u32) -> bool {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return false;
        }
        if self.size[ra as usize] < self.size[rb as usize] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb as usize] = ra;
        self.size[ra as usize] += self.size[rb as usize];
        true
    }
}

/// Unique vertex pairs of all Delaunay objects, smaller index first.
fn delaunay_edges<const N: usize>(delaunay: &Delaunay<N>) -> Vec<[u32; 2]> {
    let mut edges = Vec::with_capacity(delaunay.object_count() * N * (N + 1) / 2);
    for object in 0..delaunay.object_count() as u32 {
        let vertices = delaunay.object_vertices(object);
        for (i, &a) in vertices.iter().enumerate() {
            for &b in &vertices[i + 1..] {
                edges.push([a.min(b), a.max(b)]);
            }
        }
    }
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Kruskal over the Delaunay edges. Ties in length are broken by the
/// vertex indices, so the tree is unique.
pub(crate) fn minimum_spanning_tree<const N: usize>(
    delaunay: &Delaunay<N>,
    progress: &dyn Progress,
) -> Result<Vec<[usize; 2]>, ReconstructionError> {
    let _t = Timed::info("Minimum spanning tree");

    let edges = delaunay_edges(delaunay);
    check_cancelled(progress)?;

    let mut weighted: Vec<(f64, [u32; 2])> = edges
        .into_iter()
        .map(|[a, b]| {
            let d = sub(&delaunay.points[a as usize], &delaunay.points[b as usize]);
            (dot(&d, &d), [a, b])
        })
        .collect();
    weighted.sort_unstable_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));
    check_cancelled(progress)?;

    let mut used = vec![false; delaunay.points.len()];
    for object in 0..delaunay.object_count() as u32 {
        for &v in delaunay.object_vertices(object) {
            used[v as usize] = true;
        }
    }
    let used_count = used.iter().filter(|&&u| u).count();

    let mut dsu = Dsu::new(delaunay.points.len());
    let mut tree = Vec::with_capacity(used_count.saturating_sub(1));
    for (i, &(_, [a, b])) in weighted.iter().enumerate() {
        if i % CANCEL_INTERVAL == 0 {
            check_cancelled(progress)?;
        }
        if dsu.union(a, b) {
            tree.push([a as usize, b as usize]);
            if tree.len() + 1 == used_count {
                break;
            }
        }
    }

    if tree.len() + 1 != used_count {
        return Err(ReconstructionError::NotReconstructable(Stage::SpanningTree));
    }

    log::debug!("spanning tree: {} edges over {} points", tree.len(), used_count);
    Ok(tree)
}
