//! Manifold reconstruction from point samples in 2, 3 and 4 dimensions.
//!
//! Given points sampled on an (N-1)-dimensional manifold in N-space, the
//! Cocone algorithm selects Delaunay facets whose dual Voronoi edges cross
//! the cocones of their vertices. BoundCocone additionally detects boundary
//! and undersampled points and leaves the surface open there.
//!
//! ```ignore
//! use manifold_cocone::{create_manifold_constructor, NoProgress};
//!
//! let constructor = create_manifold_constructor::<3>(&points, &NoProgress)?;
//! let mut normals = Vec::new();
//! let mut facets = Vec::new();
//! constructor.cocone(&mut normals, &mut facets, &NoProgress)?;
//! ```

mod constructor;
mod delaunay;
mod dimension;
mod error;
mod linalg;
mod mst;
mod progress;
mod reconstruction;
mod timing;
mod util;

pub use constructor::{
    create_manifold_constructor, create_manifold_constructor_with, ConstructorConfig,
    ManifoldConstructor, ReconstructionDiagnostics, DEFAULT_REFERENCE_ALPHA,
    DEFAULT_REFERENCE_RHO,
};
pub use dimension::{Dim, SupportedDimension};
pub use error::{ReconstructionError, Stage};
pub use progress::{NoProgress, Progress, ProgressRatio};

/// Per-point normal as returned by the reconstructions.
pub type Normal<const N: usize> = [f64; N];

/// Vertex indices of an output facet.
pub type Facet<const N: usize> = [usize; N];
