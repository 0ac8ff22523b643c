use std::fmt;

use thiserror::Error;

/// Reconstruction stage whose output turned out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// No facet passed the cocone test.
    Cocone,
    /// BoundCocone found no interior point.
    InteriorPoints,
    /// Sharp-ridge pruning removed every facet.
    Prune,
    /// The traversal from the outside reached no facet.
    Extract,
    /// The Delaunay graph is not connected.
    SpanningTree,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cocone => "cocone facets",
            Stage::InteriorPoints => "interior points",
            Stage::Prune => "facets after pruning",
            Stage::Extract => "facets after manifold extraction",
            Stage::SpanningTree => "spanning tree",
        };
        f.write_str(name)
    }
}

/// Errors returned by manifold construction and reconstruction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconstructionError {
    #[error("insufficient points: got {count}, need at least {required}")]
    InsufficientPoints { count: usize, required: usize },

    #[error("points {first} and {second} coincide")]
    DuplicatePoint { first: usize, second: usize },

    #[error("point {0} has a non-finite coordinate")]
    NonFinitePoint(usize),

    #[error("points do not span the space (collinear, coplanar or cospherical input)")]
    DegenerateInput,

    #[error("{name} must be in the interval ({min}, {max}), but {name} = {value}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("manifold constructor was created for Cocone only")]
    CoconeOnly,

    #[error("{0} not found, manifold is not reconstructable")]
    NotReconstructable(Stage),

    #[error("reconstruction cancelled")]
    Cancelled,
}

impl ReconstructionError {
    /// True for cooperative cancellation, which callers usually treat as a quiet exit.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconstructionError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = ReconstructionError::InsufficientPoints {
            count: 2,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient points: got 2, need at least 3"
        );

        let err = ReconstructionError::NotReconstructable(Stage::Prune);
        assert!(err.to_string().contains("pruning"));
        assert!(!err.is_cancelled());
        assert!(ReconstructionError::Cancelled.is_cancelled());
    }
}
