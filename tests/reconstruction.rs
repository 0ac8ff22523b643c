//! End-to-end reconstruction of notched spheres in 2, 3 and 4 dimensions.

use cocone::geometry::{clone_object, ellipsoid, read_obj, sphere_with_notch, write_obj, Mesh};
use manifold_cocone::{
    create_manifold_constructor, Dim, ManifoldConstructor, NoProgress, ReconstructionError,
    SupportedDimension,
};

const RHO: f64 = 0.3;
const ALPHA: f64 = 0.14;
const CLONE_SHIFT: f32 = 3.0;

/// Expected facet count range for a closed sample of `points` points.
fn facet_bounds<const N: usize>(points: usize) -> (usize, usize) {
    match N {
        2 => (points, points),
        3 => (2 * points - 4, 2 * points - 4),
        _ => (
            (6.55 * points as f64).round() as usize,
            (6.85 * points as f64).round() as usize,
        ),
    }
}

fn bound_facet_bounds<const N: usize>(points: usize) -> (usize, usize) {
    let (min, max) = facet_bounds::<N>(points);
    (
        (0.9 * min as f64).round() as usize,
        (1.1 * max as f64).round() as usize,
    )
}

struct Counts {
    cocone: Option<usize>,
    bound_cocone: usize,
}

fn reconstruct<const N: usize>(points: &[[f32; N]], with_cocone: bool) -> Counts
where
    Dim<N>: SupportedDimension<N>,
{
    let constructor = create_manifold_constructor(points, &NoProgress).unwrap();

    // Buffers start out with unrelated content that must be replaced.
    let mut normals = vec![[0.0; N]; 10000];
    let mut facets = vec![[0usize; N]; 10000];

    let cocone = with_cocone.then(|| {
        constructor
            .cocone(&mut normals, &mut facets, &NoProgress)
            .unwrap();
        assert_eq!(normals.len(), points.len());
        facets.len()
    });

    constructor
        .bound_cocone(RHO, ALPHA, &mut normals, &mut facets, &NoProgress)
        .unwrap();
    assert_eq!(normals.len(), points.len());

    Counts {
        cocone,
        bound_cocone: facets.len(),
    }
}

fn assert_in_range(name: &str, count: usize, (min, max): (usize, usize)) {
    assert!(
        (min..=max).contains(&count),
        "{}: {} facets, expected [{}, {}]",
        name,
        count,
        min,
        max
    );
}

fn check_closed<const N: usize>(count: usize, seed: u64)
where
    Dim<N>: SupportedDimension<N>,
{
    let points = sphere_with_notch::<N>(count, false, seed);
    let counts = reconstruct(&points, true);
    let single_cocone = counts.cocone.unwrap();
    assert_in_range("Cocone", single_cocone, facet_bounds::<N>(points.len()));
    assert_in_range(
        "BoundCocone",
        counts.bound_cocone,
        bound_facet_bounds::<N>(points.len()),
    );

    let copies = 1 << N;
    let clones = clone_object(&points, copies, CLONE_SHIFT);
    let counts = reconstruct(&clones, true);
    let scale = 1 + copies;
    // Separated copies are reconstructed independently of each other.
    assert_eq!(
        counts.cocone.unwrap(),
        scale * single_cocone,
        "Cocone on {} copies",
        scale
    );
    let (min, max) = bound_facet_bounds::<N>(points.len());
    assert_in_range(
        "BoundCocone on clones",
        counts.bound_cocone,
        (min * scale, max * scale),
    );
}

fn check_bounded<const N: usize>(count: usize, seed: u64)
where
    Dim<N>: SupportedDimension<N>,
{
    let points = sphere_with_notch::<N>(count, true, seed);
    let counts = reconstruct(&points, false);
    assert_in_range(
        "BoundCocone",
        counts.bound_cocone,
        bound_facet_bounds::<N>(points.len()),
    );

    let copies = 1 << N;
    let clones = clone_object(&points, copies, CLONE_SHIFT);
    let counts = reconstruct(&clones, false);
    let scale = 1 + copies;
    let (min, max) = bound_facet_bounds::<N>(points.len());
    assert_in_range(
        "BoundCocone on clones",
        counts.bound_cocone,
        (min * scale, max * scale),
    );
}

#[test]
fn test_closed_2d() {
    check_closed::<2>(600, 21);
}

#[test]
fn test_bounded_2d() {
    check_bounded::<2>(600, 22);
}

#[test]
fn test_closed_3d() {
    check_closed::<3>(2500, 31);
}

#[test]
fn test_bounded_3d() {
    check_bounded::<3>(2500, 32);
}

#[test]
#[ignore = "takes minutes; run with --ignored in release mode"]
fn test_closed_4d() {
    check_closed::<4>(22000, 41);
}

#[test]
#[ignore = "takes minutes; run with --ignored in release mode"]
fn test_bounded_4d() {
    check_bounded::<4>(22000, 42);
}

#[test]
fn test_obj_export_round_trip() {
    let points = sphere_with_notch::<3>(1000, false, 51);
    let constructor = create_manifold_constructor(&points, &NoProgress).unwrap();
    let mut normals = Vec::new();
    let mut facets = Vec::new();
    constructor
        .cocone(&mut normals, &mut facets, &NoProgress)
        .unwrap();

    let mesh = Mesh::from_facets(&points, &normals, &facets);
    let path = std::env::temp_dir().join(format!(
        "cocone_round_trip_{}.obj.gz",
        std::process::id()
    ));
    write_obj(&mesh, &path, "notched sphere").unwrap();
    let read = read_obj::<3>(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(read.vertices.len(), mesh.vertices.len());
    assert_eq!(read.normals.len(), mesh.normals.len());
    assert_eq!(read.facets.len(), facets.len());
    assert_eq!(read.facets, mesh.facets);
}

#[test]
fn test_spanning_tree_covers_sample() {
    let points = sphere_with_notch::<2>(300, true, 61);
    let constructor = create_manifold_constructor(&points, &NoProgress).unwrap();
    let tree = constructor.minimum_spanning_tree(&NoProgress).unwrap();
    assert_eq!(tree.len(), points.len() - 1);

    let mesh = Mesh::from_lines(&points, &tree);
    assert_eq!(mesh.vertices.len(), points.len());
    assert_eq!(mesh.lines.len(), tree.len());
}

#[test]
fn test_closed_ellipse_2d() {
    let points = ellipsoid::<2>(800, [1.0, 0.7], 81);
    let counts = reconstruct(&points, true);
    assert_eq!(counts.cocone, Some(points.len()));
    assert_in_range(
        "BoundCocone",
        counts.bound_cocone,
        bound_facet_bounds::<2>(points.len()),
    );
}

const SWEEP_RHO: [f64; 5] = [0.9, 0.7, 0.5, 0.3, 0.1];
const SWEEP_ALPHA: [f64; 4] = [0.3, 0.14, 0.1, 0.05];

/// BoundCocone facet count, zero when nothing is reconstructable.
fn bound_facet_count<const N: usize>(
    constructor: &ManifoldConstructor<N>,
    rho: f64,
    alpha: f64,
) -> usize {
    let mut normals = Vec::new();
    let mut facets = Vec::new();
    match constructor.bound_cocone(rho, alpha, &mut normals, &mut facets, &NoProgress) {
        Ok(()) => facets.len(),
        Err(ReconstructionError::NotReconstructable(_)) => 0,
        Err(e) => panic!("rho={} alpha={}: {}", rho, alpha, e),
    }
}

/// Every parameter pair is compared with all pairs that are at least as
/// strict in both parameters.
fn check_monotone_sweep<const N: usize>(points: &[[f32; N]])
where
    Dim<N>: SupportedDimension<N>,
{
    let constructor = create_manifold_constructor(points, &NoProgress).unwrap();
    let counts: Vec<Vec<usize>> = SWEEP_RHO
        .iter()
        .map(|&rho| {
            SWEEP_ALPHA
                .iter()
                .map(|&alpha| bound_facet_count(&constructor, rho, alpha))
                .collect()
        })
        .collect();

    for (i, &rho) in SWEEP_RHO.iter().enumerate() {
        for (j, &alpha) in SWEEP_ALPHA.iter().enumerate() {
            for (k, &stricter_rho) in SWEEP_RHO.iter().enumerate().skip(i) {
                for (l, &stricter_alpha) in SWEEP_ALPHA.iter().enumerate().skip(j) {
                    assert!(
                        counts[k][l] <= counts[i][j],
                        "rho={} alpha={}: {} facets, but rho={} alpha={}: {}",
                        stricter_rho,
                        stricter_alpha,
                        counts[k][l],
                        rho,
                        alpha,
                        counts[i][j]
                    );
                }
            }
        }
    }

    // Looser than the default reference (0.3, 0.14) keeps the whole surface.
    assert!(counts[3][1] > 0);
    assert_eq!(counts[0][0], counts[3][1]);
}

#[test]
fn test_stricter_parameters_never_add_facets_closed() {
    for seed in 0..5 {
        check_monotone_sweep(&sphere_with_notch::<3>(1500, false, seed));
    }
}

#[test]
fn test_stricter_parameters_never_add_facets_bounded() {
    for seed in 0..3 {
        check_monotone_sweep(&sphere_with_notch::<3>(1500, true, 100 + seed));
    }
    check_monotone_sweep(&sphere_with_notch::<2>(600, true, 110));
}
