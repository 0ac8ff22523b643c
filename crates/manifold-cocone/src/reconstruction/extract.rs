//! Selection of the outer surface among the candidate facets.
//!
//! Delaunay objects are walked from the convex hull inwards. Crossing a facet
//! that is not a candidate enters the object behind it; reaching a candidate
//! facet keeps the facet and stops the walk there. Candidates that can only
//! be reached through other candidates (pockets inside the surface) are
//! dropped.

use crate::delaunay::Delaunay;
use crate::progress::{check_cancelled, Progress};
use crate::ReconstructionError;

const CANCEL_INTERVAL: usize = 1 << 16;

/// Candidates reachable from the outside without crossing another candidate.
pub(crate) fn extract_manifold<const N: usize>(
    delaunay: &Delaunay<N>,
    selected: &[bool],
    progress: &dyn Progress,
) -> Result<Vec<bool>, ReconstructionError> {
    debug_assert_eq!(selected.len(), delaunay.facets.len());

    let mut visited_objects = vec![false; delaunay.object_count()];
    let mut visited_facets = vec![false; selected.len()];

    let mut next: Vec<u32> = delaunay
        .facets
        .iter()
        .enumerate()
        .filter(|(_, facet)| facet.one_sided())
        .map(|(f, _)| f as u32)
        .collect();

    let mut steps = 0usize;
    while let Some(f) = next.pop() {
        steps += 1;
        if steps % CANCEL_INTERVAL == 0 {
            check_cancelled(progress)?;
        }

        if selected[f as usize] {
            visited_facets[f as usize] = true;
            continue;
        }

        let facet = &delaunay.facets[f as usize];
        let object = if facet.one_sided() {
            let d = facet.delaunay(0);
            if visited_objects[d as usize] {
                continue;
            }
            d
        } else {
            let (d0, d1) = (facet.delaunay(0), facet.delaunay(1));
            match (visited_objects[d0 as usize], visited_objects[d1 as usize]) {
                (true, true) => continue,
                (true, false) => d1,
                (false, true) => d0,
                (false, false) => {
                    debug_assert!(false, "facet {} reached from an unvisited object", f);
                    continue;
                }
            }
        };

        visited_objects[object as usize] = true;
        next.extend(delaunay.object_facets(object).iter().copied().filter(|&g| g != f));
    }

    let visited = visited_objects.iter().filter(|&&v| v).count();
    log::debug!(
        "extraction visited {} of {} objects",
        visited,
        visited_objects.len()
    );

    Ok(visited_facets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    #[test]
    fn test_inner_facets_are_dropped() {
        // A square with an interior point; the four hull edges are reached
        // first and stop the walk, so the interior spokes stay unvisited.
        let points = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.1], [0.4, 0.45]];
        let delaunay = Delaunay::<2>::build(&points, &NoProgress).unwrap();
        let selected: Vec<bool> = vec![true; delaunay.facets.len()];
        let extracted = extract_manifold(&delaunay, &selected, &NoProgress).unwrap();
        for (facet, &kept) in delaunay.facets.iter().zip(&extracted) {
            assert_eq!(kept, facet.one_sided());
        }
    }

    #[test]
    fn test_walk_passes_through_unselected_facets() {
        // Only the spokes to the interior point are candidates.
        let points = [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.1], [0.4, 0.45]];
        let delaunay = Delaunay::<2>::build(&points, &NoProgress).unwrap();
        let selected: Vec<bool> = delaunay.facets.iter().map(|f| !f.one_sided()).collect();
        let extracted = extract_manifold(&delaunay, &selected, &NoProgress).unwrap();
        assert_eq!(extracted, selected);
    }
}
