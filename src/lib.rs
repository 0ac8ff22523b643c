//! Sample generators and mesh export around the `manifold-cocone` library.

pub mod geometry;
