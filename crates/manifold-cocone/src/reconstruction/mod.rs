//! Cocone and BoundCocone surface reconstruction over a Delaunay triangulation.
//!
//! Tamal K. Dey, *Curve and Surface Reconstruction: Algorithms with
//! Mathematical Analysis*, Cambridge University Press, 2007.

mod assemble;
mod cocone;
mod cone;
mod extract;
mod prune;
pub(crate) mod structure;

pub(crate) use cocone::check_rho_and_alpha;

use crate::delaunay::Delaunay;
use crate::progress::{check_cancelled, Progress};
use crate::timing::{ReconstructionTimings, Timer};
use crate::util::Timed;
use crate::{ReconstructionError, Stage};

use structure::Structure;

/// Normals (one per input point) and oriented facets.
pub(crate) type Surface<const N: usize> = (Vec<[f64; N]>, Vec<[usize; N]>);

fn count(flags: &[bool]) -> usize {
    flags.iter().filter(|&&f| f).count()
}

/// Sharp-ridge pruning and manifold extraction of the selected facets.
fn prune_and_extract<const N: usize>(
    delaunay: &Delaunay<N>,
    interior: &[bool],
    mut selected: Vec<bool>,
    progress: &dyn Progress,
    timings: &mut ReconstructionTimings,
) -> Result<Vec<bool>, ReconstructionError> {
    progress.set(1, 4);
    check_cancelled(progress)?;
    let t = Timer::start();
    {
        let _t = Timed::debug("Prune facets");
        prune::prune_facets_incident_to_sharp_ridges(
            &delaunay.points,
            &delaunay.facets,
            interior,
            &mut selected,
            progress,
        )?;
    }
    timings.set_prune(t.elapsed());
    let pruned = count(&selected);
    if pruned == 0 {
        return Err(ReconstructionError::NotReconstructable(Stage::Prune));
    }
    log::debug!("facets after pruning: {}", pruned);

    progress.set(2, 4);
    check_cancelled(progress)?;
    let t = Timer::start();
    let extracted = {
        let _t = Timed::debug("Extract manifold");
        extract::extract_manifold(delaunay, &selected, progress)?
    };
    timings.set_extract(t.elapsed());
    let extracted_count = count(&extracted);
    if extracted_count == 0 {
        return Err(ReconstructionError::NotReconstructable(Stage::Extract));
    }
    log::debug!("facets after extraction: {}", extracted_count);
    Ok(extracted)
}

fn assemble_surface<const N: usize>(
    delaunay: &Delaunay<N>,
    structure: &Structure<N>,
    extracted: &[bool],
    progress: &dyn Progress,
    timings: &mut ReconstructionTimings,
) -> Result<Surface<N>, ReconstructionError> {
    progress.set(3, 4);
    check_cancelled(progress)?;
    let t = Timer::start();
    let surface = {
        let _t = Timed::debug("Normals and facets");
        assemble::create_normals_and_facets(
            &delaunay.points,
            &delaunay.facets,
            extracted,
            &structure.vertices,
            progress,
        )?
    };
    timings.set_assemble(t.elapsed());

    debug_assert_eq!(surface.0.len(), delaunay.points.len());
    Ok(surface)
}

/// Facets in the cocone of all their vertices, cleaned up into a manifold.
pub(crate) fn cocone<const N: usize>(
    delaunay: &Delaunay<N>,
    structure: &Structure<N>,
    progress: &dyn Progress,
) -> Result<Surface<N>, ReconstructionError> {
    let _t = Timed::info("Cocone reconstruction");
    let mut timings = ReconstructionTimings::default();

    progress.set(0, 4);
    check_cancelled(progress)?;
    let t = Timer::start();
    let selected = cocone::find_cocone_facets(&structure.facets);
    timings.set_select(t.elapsed());
    let candidates = count(&selected);
    if candidates == 0 {
        return Err(ReconstructionError::NotReconstructable(Stage::Cocone));
    }
    log::debug!("cocone facets: {}", candidates);

    let interior = vec![true; structure.vertices.len()];
    let extracted = prune_and_extract(delaunay, &interior, selected, progress, &mut timings)?;
    let surface = assemble_surface(delaunay, structure, &extracted, progress, &mut timings)?;

    timings.report(surface.1.len());
    Ok(surface)
}

/// Cocone restricted to points classified as interior by the ρ/α test,
/// which keeps boundaries and undersampled regions open.
///
/// The surface is first reconstructed with the `reference` parameters. The
/// requested (`rho`, `alpha`) then keep the facets of that surface with at
/// least one vertex that is interior and has the facet in its cocone. The
/// interior set only shrinks as either parameter decreases, so stricter
/// parameters never yield more facets. Requests looser than the reference
/// return the reference surface.
pub(crate) fn bound_cocone<const N: usize>(
    delaunay: &Delaunay<N>,
    structure: &Structure<N>,
    rho: f64,
    alpha: f64,
    reference: (f64, f64),
    progress: &dyn Progress,
) -> Result<Surface<N>, ReconstructionError> {
    cocone::check_rho_and_alpha(rho, alpha)?;
    let (reference_rho, reference_alpha) = reference;
    cocone::check_rho_and_alpha(reference_rho, reference_alpha)?;

    let _t = Timed::info("BoundCocone reconstruction");
    let mut timings = ReconstructionTimings::default();

    progress.set(0, 4);
    check_cancelled(progress)?;
    let t = Timer::start();
    let interior = cocone::find_interior_points(rho, alpha.cos(), &structure.vertices);
    if !interior.contains(&true) {
        return Err(ReconstructionError::NotReconstructable(Stage::InteriorPoints));
    }
    let reference_interior = if reference == (rho, alpha) {
        interior.clone()
    } else {
        cocone::find_interior_points(reference_rho, reference_alpha.cos(), &structure.vertices)
    };
    if !reference_interior.contains(&true) {
        return Err(ReconstructionError::NotReconstructable(Stage::InteriorPoints));
    }

    let selected = cocone::find_cocone_interior_facets(
        &delaunay.facets,
        &structure.facets,
        &reference_interior,
    );
    timings.set_select(t.elapsed());
    let candidates = count(&selected);
    if candidates == 0 {
        return Err(ReconstructionError::NotReconstructable(Stage::Cocone));
    }
    log::debug!("cocone interior facets: {}", candidates);

    let mut extracted =
        prune_and_extract(delaunay, &reference_interior, selected, progress, &mut timings)?;

    let kept = cocone::restrict_to_interior(
        &delaunay.facets,
        &structure.facets,
        &interior,
        &mut extracted,
    );
    if kept == 0 {
        return Err(ReconstructionError::NotReconstructable(Stage::InteriorPoints));
    }
    log::debug!("facets with an interior cocone vertex: {}", kept);

    let surface = assemble_surface(delaunay, structure, &extracted, progress, &mut timings)?;

    timings.report(surface.1.len());
    Ok(surface)
}
