//! Public entry point: a constructor holding the Delaunay triangulation and
//! per-point Voronoi data, shared by all reconstructions of one point set.

use crate::delaunay::Delaunay;
use crate::dimension::{Dim, SupportedDimension};
use crate::progress::Progress;
use crate::reconstruction::{self, structure};
use crate::timing::{ConstructionTimings, Timer};
use crate::util::Timed;
use crate::{mst, ReconstructionError};

/// Default reference ratio parameter of BoundCocone.
pub const DEFAULT_REFERENCE_RHO: f64 = 0.3;
/// Default reference normal angle of BoundCocone, in radians.
pub const DEFAULT_REFERENCE_ALPHA: f64 = 0.14;

/// Options fixed at constructor creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructorConfig {
    /// Skip the cocone radius needed only by BoundCocone.
    /// `bound_cocone` then fails with [`ReconstructionError::CoconeOnly`].
    pub cocone_only: bool,
    /// Parameters of the surface every `bound_cocone` call restricts.
    /// Calls with these exact parameters return that surface unchanged.
    pub reference_rho: f64,
    pub reference_alpha: f64,
}

impl Default for ConstructorConfig {
    fn default() -> Self {
        Self {
            cocone_only: false,
            reference_rho: DEFAULT_REFERENCE_RHO,
            reference_alpha: DEFAULT_REFERENCE_ALPHA,
        }
    }
}

/// Numeric edge cases resolved locally during construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructionDiagnostics {
    /// Points that are not a vertex of any Delaunay object.
    pub skipped_points: Vec<usize>,
    /// Points whose pole direction could not be normalized.
    pub non_finite_poles: Vec<usize>,
    /// Points without a Voronoi vertex opposite the positive pole.
    pub missing_negative_poles: Vec<usize>,
    /// Voronoi edges expected to cross the cocone boundary where no
    /// crossing was found.
    pub missing_cocone_intersections: usize,
    /// Delaunay objects whose circumcenter was replaced by the centroid.
    pub degenerate_objects: usize,
}

impl ReconstructionDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.skipped_points.is_empty()
            && self.non_finite_poles.is_empty()
            && self.missing_negative_poles.is_empty()
            && self.missing_cocone_intersections == 0
            && self.degenerate_objects == 0
    }
}

/// Reconstructs an (N-1)-manifold from points sampled on it.
///
/// Construction computes the Delaunay triangulation and Voronoi data once;
/// the reconstruction methods only read it and may run concurrently.
pub struct ManifoldConstructor<const N: usize> {
    source_points: Vec<[f32; N]>,
    delaunay: Delaunay<N>,
    structure: structure::Structure<N>,
    config: ConstructorConfig,
    diagnostics: ReconstructionDiagnostics,
}

/// Constructor with the default configuration.
pub fn create_manifold_constructor<const N: usize>(
    points: &[[f32; N]],
    progress: &dyn Progress,
) -> Result<ManifoldConstructor<N>, ReconstructionError>
where
    Dim<N>: SupportedDimension<N>,
{
    create_manifold_constructor_with(points, ConstructorConfig::default(), progress)
}

pub fn create_manifold_constructor_with<const N: usize>(
    points: &[[f32; N]],
    config: ConstructorConfig,
    progress: &dyn Progress,
) -> Result<ManifoldConstructor<N>, ReconstructionError>
where
    Dim<N>: SupportedDimension<N>,
{
    ManifoldConstructor::new(points, config, progress)
}

impl<const N: usize> ManifoldConstructor<N>
where
    Dim<N>: SupportedDimension<N>,
{
    fn new(
        points: &[[f32; N]],
        config: ConstructorConfig,
        progress: &dyn Progress,
    ) -> Result<Self, ReconstructionError> {
        reconstruction::check_rho_and_alpha(config.reference_rho, config.reference_alpha)?;
        if points.len() <= N {
            return Err(ReconstructionError::InsufficientPoints {
                count: points.len(),
                required: N + 1,
            });
        }

        let _t = Timed::info("Manifold constructor");
        let mut timings = ConstructionTimings::default();

        let t = Timer::start();
        let delaunay = Delaunay::build(points, progress)?;
        timings.set_delaunay(t.elapsed());

        let t = Timer::start();
        let structure = {
            let _t = Timed::info("Vertex and facet data");
            structure::vertex_and_facet_data(!config.cocone_only, &delaunay, progress)?
        };
        timings.set_structure(t.elapsed());
        timings.report(points.len(), N);

        let diagnostics = ReconstructionDiagnostics {
            skipped_points: structure.issues.isolated.clone(),
            non_finite_poles: structure.issues.non_finite_poles.clone(),
            missing_negative_poles: structure.issues.missing_negative_poles.clone(),
            missing_cocone_intersections: structure.issues.missing_cocone_intersections,
            degenerate_objects: delaunay.degenerate_objects,
        };
        if !diagnostics.is_clean() {
            log::info!(
                "construction diagnostics: {} skipped points, {} non-finite poles, \
                 {} missing negative poles, {} missing intersections, {} degenerate objects",
                diagnostics.skipped_points.len(),
                diagnostics.non_finite_poles.len(),
                diagnostics.missing_negative_poles.len(),
                diagnostics.missing_cocone_intersections,
                diagnostics.degenerate_objects
            );
        }

        Ok(Self {
            source_points: points.to_vec(),
            delaunay,
            structure,
            config,
            diagnostics,
        })
    }
}

/// Replaces the buffer contents only when the reconstruction succeeded.
fn write_surface<const N: usize>(
    surface: Result<reconstruction::Surface<N>, ReconstructionError>,
    normals: &mut Vec<[f64; N]>,
    facets: &mut Vec<[usize; N]>,
) -> Result<(), ReconstructionError> {
    match surface {
        Ok((n, f)) => {
            log::info!("reconstructed {} facets", f.len());
            *normals = n;
            *facets = f;
            Ok(())
        }
        Err(e) => {
            if e.is_cancelled() {
                log::debug!("reconstruction cancelled");
            }
            Err(e)
        }
    }
}

impl<const N: usize> ManifoldConstructor<N> {
    /// Cocone reconstruction.
    ///
    /// On success `normals` holds one entry per input point (zero for points
    /// not on the surface) and `facets` the oriented facets. On error both
    /// buffers are left as they were.
    pub fn cocone(
        &self,
        normals: &mut Vec<[f64; N]>,
        facets: &mut Vec<[usize; N]>,
        progress: &dyn Progress,
    ) -> Result<(), ReconstructionError> {
        let surface = reconstruction::cocone(&self.delaunay, &self.structure, progress);
        write_surface(surface, normals, facets)
    }

    /// BoundCocone reconstruction with `rho` in (0, 1) and `alpha` in
    /// (0, π/2) radians.
    ///
    /// Facets are taken from the surface reconstructed with the configured
    /// reference parameters, so decreasing `rho` or `alpha` never increases
    /// the facet count.
    pub fn bound_cocone(
        &self,
        rho: f64,
        alpha: f64,
        normals: &mut Vec<[f64; N]>,
        facets: &mut Vec<[usize; N]>,
        progress: &dyn Progress,
    ) -> Result<(), ReconstructionError> {
        if self.config.cocone_only {
            return Err(ReconstructionError::CoconeOnly);
        }
        let reference = (self.config.reference_rho, self.config.reference_alpha);
        let surface = reconstruction::bound_cocone(
            &self.delaunay,
            &self.structure,
            rho,
            alpha,
            reference,
            progress,
        );
        write_surface(surface, normals, facets)
    }

    /// Edges of the Euclidean minimum spanning tree.
    pub fn minimum_spanning_tree(
        &self,
        progress: &dyn Progress,
    ) -> Result<Vec<[usize; 2]>, ReconstructionError> {
        mst::minimum_spanning_tree(&self.delaunay, progress)
    }

    /// Input points as given.
    pub fn points(&self) -> &[[f32; N]] {
        &self.source_points
    }

    /// Vertex indices (N + 1 each) of the Delaunay simplices.
    pub fn delaunay_objects(&self) -> Vec<Vec<usize>> {
        (0..self.delaunay.object_count() as u32)
            .map(|o| {
                self.delaunay
                    .object_vertices(o)
                    .iter()
                    .map(|&v| v as usize)
                    .collect()
            })
            .collect()
    }

    pub fn diagnostics(&self) -> &ReconstructionDiagnostics {
        &self.diagnostics
    }

    pub fn config(&self) -> ConstructorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_constructor_is_send_and_sync() {
        assert_send_sync::<ManifoldConstructor<2>>();
        assert_send_sync::<ManifoldConstructor<3>>();
        assert_send_sync::<ManifoldConstructor<4>>();
    }

    #[test]
    fn test_default_config_supports_bound_cocone() {
        let config = ConstructorConfig::default();
        assert!(!config.cocone_only);
        assert_eq!(config.reference_rho, DEFAULT_REFERENCE_RHO);
        assert_eq!(config.reference_alpha, DEFAULT_REFERENCE_ALPHA);
        assert!(ReconstructionDiagnostics::default().is_clean());
    }

    #[test]
    fn test_invalid_reference_rejected() {
        let points: Vec<[f32; 2]> = (0..8)
            .map(|i| {
                let t = i as f32 * std::f32::consts::TAU / 8.0;
                [t.cos(), t.sin()]
            })
            .collect();
        let config = ConstructorConfig {
            reference_rho: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            create_manifold_constructor_with(&points, config, &crate::NoProgress),
            Err(ReconstructionError::InvalidParameter { name: "rho", .. })
        ));
    }
}
