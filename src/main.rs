use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use clap::{Parser, ValueEnum};

use cocone::geometry::{clone_object, read_points, sphere_with_notch, write_obj, Mesh};
use manifold_cocone::{
    create_manifold_constructor_with, ConstructorConfig, Dim, Progress, SupportedDimension,
};

/// Shift of cloned copies along each axis.
const CLONE_SHIFT: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Cocone,
    #[value(name = "bound-cocone")]
    BoundCocone,
    Mst,
    All,
}

/// Cocone - manifold reconstruction from point samples
#[derive(Parser, Debug)]
#[command(name = "cocone", version, about)]
struct Cli {
    /// Space dimension (2, 3 or 4)
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(2..=4))]
    dim: u8,

    /// Number of sample points on the notched sphere
    #[arg(short = 'p', long, default_value_t = 2000)]
    points: usize,

    /// Random seed for the sample
    #[arg(long)]
    seed: Option<u64>,

    /// Leave a cap of the sphere unsampled (manifold with boundary)
    #[arg(long)]
    bounded: bool,

    /// Shifted copies of the object to add (at most 2^dim)
    #[arg(long, default_value_t = 0)]
    clones: usize,

    /// Read points from the `v` records of an OBJ file instead of sampling
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Reconstruction to run
    #[arg(long, value_enum, default_value_t = Algorithm::All)]
    algorithm: Algorithm,

    /// BoundCocone ratio parameter, in (0, 1)
    #[arg(long, default_value_t = 0.3)]
    rho: f64,

    /// BoundCocone normal angle in radians, in (0, π/2)
    #[arg(long, default_value_t = 0.14)]
    alpha: f64,

    /// Export the result as OBJ (supports .obj and .obj.gz)
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

/// Logs each completed tenth of a phase at debug level.
#[derive(Default)]
struct LogProgress {
    tenth: AtomicU64,
}

impl Progress for LogProgress {
    fn set(&self, value: u64, max: u64) {
        if max > 0 {
            self.set_ratio(value as f64 / max as f64);
        }
    }

    fn set_ratio(&self, ratio: f64) {
        let tenth = (ratio.clamp(0.0, 1.0) * 10.0) as u64;
        if self.tenth.swap(tenth, Ordering::Relaxed) != tenth {
            log::debug!("progress {}%", tenth * 10);
        }
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

fn ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.dim {
        2 => run::<2>(&cli),
        3 => run::<3>(&cli),
        _ => run::<4>(&cli),
    }
}

fn load_points<const N: usize>(cli: &Cli) -> Result<Vec<[f32; N]>, Box<dyn Error>> {
    let points = match &cli.input {
        Some(path) => {
            let points = read_points::<N>(path)?;
            println!("Read {} points from {}", points.len(), path.display());
            points
        }
        None => {
            let seed = cli.seed.unwrap_or_else(rand::random);
            println!(
                "Sampling {} points: dim={}, seed={}, bounded={}",
                cli.points, N, seed, cli.bounded
            );
            sphere_with_notch::<N>(cli.points, cli.bounded, seed)
        }
    };

    if cli.clones == 0 {
        return Ok(points);
    }
    if cli.clones > 1 << N {
        return Err(format!("at most {} clones in {} dimensions", 1 << N, N).into());
    }
    Ok(clone_object(&points, cli.clones, CLONE_SHIFT))
}

fn run<const N: usize>(cli: &Cli) -> Result<(), Box<dyn Error>>
where
    Dim<N>: SupportedDimension<N>,
{
    let points = load_points::<N>(cli)?;
    let progress = LogProgress::default();

    print!("Building constructor for {} points... ", points.len());
    let start = Instant::now();
    let config = ConstructorConfig {
        reference_rho: cli.rho,
        reference_alpha: cli.alpha,
        ..Default::default()
    };
    let constructor = create_manifold_constructor_with(&points, config, &progress)?;
    println!("{:.1}ms", ms(start));

    let diagnostics = constructor.diagnostics();
    if !diagnostics.is_clean() {
        log::warn!("construction diagnostics: {:?}", diagnostics);
    }

    let mut normals = Vec::new();
    let mut facets = Vec::new();
    let mut mesh = None;
    let comment = format!(
        "{} points, dim {}, algorithm {:?}, rho {}, alpha {}",
        points.len(),
        N,
        cli.algorithm,
        cli.rho,
        cli.alpha
    );

    if matches!(cli.algorithm, Algorithm::Cocone | Algorithm::All) {
        print!("Cocone... ");
        let start = Instant::now();
        constructor.cocone(&mut normals, &mut facets, &progress)?;
        println!("{:.1}ms, {} facets", ms(start), facets.len());
        mesh = Some(Mesh::from_facets(&points, &normals, &facets));
    }

    if matches!(cli.algorithm, Algorithm::BoundCocone | Algorithm::All) {
        print!("BoundCocone (rho={}, alpha={})... ", cli.rho, cli.alpha);
        let start = Instant::now();
        constructor.bound_cocone(cli.rho, cli.alpha, &mut normals, &mut facets, &progress)?;
        println!("{:.1}ms, {} facets", ms(start), facets.len());
        mesh = Some(Mesh::from_facets(&points, &normals, &facets));
    }

    if matches!(cli.algorithm, Algorithm::Mst | Algorithm::All) {
        print!("Minimum spanning tree... ");
        let start = Instant::now();
        let tree = constructor.minimum_spanning_tree(&progress)?;
        let length: f64 = tree
            .iter()
            .map(|&[a, b]| {
                (0..N)
                    .map(|i| {
                        let d = points[a][i] as f64 - points[b][i] as f64;
                        d * d
                    })
                    .sum::<f64>()
                    .sqrt()
            })
            .sum();
        println!("{:.1}ms, {} edges, length {:.4}", ms(start), tree.len(), length);
        if cli.algorithm == Algorithm::Mst {
            mesh = Some(Mesh::from_lines(&points, &tree));
        }
    }

    if let (Some(path), Some(mesh)) = (&cli.export, &mesh) {
        print!("Exporting to {}... ", path.display());
        let start = Instant::now();
        write_obj(mesh, path, &comment)?;
        println!("{:.1}ms", ms(start));
    }

    Ok(())
}
