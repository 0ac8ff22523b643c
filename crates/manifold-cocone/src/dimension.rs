//! Compile-time dimensions supported by the reconstruction.

use crate::delaunay::hull;
use crate::{Progress, ReconstructionError};

/// Marker type carrying a dimension as a const parameter.
///
/// Only `Dim<2>`, `Dim<3>` and `Dim<4>` implement [`SupportedDimension`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Dim<const N: usize>;

mod sealed {
    pub trait Sealed {}
}

/// Dimensions with a lifted convex hull implementation (`N + 1` is not
/// expressible as a const generic argument, so each is spelled out).
pub trait SupportedDimension<const N: usize>: sealed::Sealed {
    #[doc(hidden)]
    fn lower_hull(
        points: &[[i64; N]],
        progress: &dyn Progress,
    ) -> Result<Vec<u32>, ReconstructionError>;
}

macro_rules! supported_dimension {
    ($($n:literal => $d:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for Dim<$n> {}

            impl SupportedDimension<$n> for Dim<$n> {
                #[inline]
                fn lower_hull(
                    points: &[[i64; $n]],
                    progress: &dyn Progress,
                ) -> Result<Vec<u32>, ReconstructionError> {
                    hull::lower_hull::<$n, $d>(points, progress)
                }
            }
        )*
    };
}

supported_dimension!(2 => 3, 3 => 4, 4 => 5);
