pub mod mesh;
pub mod samples;

pub use mesh::{read_obj, read_points, write_obj, Mesh, MeshFacet};
pub use samples::{clone_object, ellipsoid, sphere_with_notch};
