//! Benchmark manifold construction and reconstruction at several scales.
//!
//! Run with: cargo run --release --bin bench_reconstruction
//!
//! Usage:
//!   bench_reconstruction                Run default sizes for 3D (10k)
//!   bench_reconstruction 5k 50k 200k    Run multiple sizes
//!   bench_reconstruction -d 4 20k       Run in 4D
//!   bench_reconstruction -n 5           Run 5 iterations (for profiling)
//!
//! For detailed per-phase timing, build with: cargo run --release --features timing --bin bench_reconstruction

use std::error::Error;
use std::io::{self, Write};
use std::time::Instant;

use clap::Parser;

use cocone::geometry::sphere_with_notch;
use manifold_cocone::{
    create_manifold_constructor_with, ConstructorConfig, Dim, NoProgress, SupportedDimension,
};

fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.to_lowercase();
    let (num_str, multiplier) = if s.ends_with('m') {
        (&s[..s.len() - 1], 1_000_000)
    } else if s.ends_with('k') {
        (&s[..s.len() - 1], 1_000)
    } else {
        (s.as_str(), 1)
    };

    num_str
        .parse::<f64>()
        .map(|n| (n * multiplier as f64) as usize)
        .map_err(|e| format!("Invalid number '{}': {}", s, e))
}

#[derive(Parser)]
#[command(name = "bench_reconstruction")]
#[command(about = "Benchmark Cocone and BoundCocone at various scales")]
struct Args {
    /// Point counts to benchmark (e.g., 10k, 100k, 1m)
    #[arg(value_parser = parse_count)]
    sizes: Vec<usize>,

    /// Space dimension (2, 3 or 4)
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(2..=4))]
    dim: u8,

    /// Random seed
    #[arg(short, long, default_value_t = 12345)]
    seed: u64,

    /// Sample with a boundary (open cap)
    #[arg(long)]
    bounded: bool,

    /// BoundCocone ratio parameter
    #[arg(long, default_value_t = 0.3)]
    rho: f64,

    /// BoundCocone normal angle in radians
    #[arg(long, default_value_t = 0.14)]
    alpha: f64,

    /// Number of iterations to run (useful for profiling)
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: usize,
}

fn format_rate(count: usize, ms: f64) -> String {
    if ms <= 0.0 {
        return "N/A".to_string();
    }
    let per_sec = count as f64 / (ms / 1000.0);
    if per_sec >= 1_000_000.0 {
        format!("{:.2}M/s", per_sec / 1_000_000.0)
    } else if per_sec >= 1_000.0 {
        format!("{:.1}k/s", per_sec / 1000.0)
    } else {
        format!("{:.0}/s", per_sec)
    }
}

fn format_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{}k", n / 1_000)
    } else {
        format!("{}", n)
    }
}

struct BenchResult {
    n: usize,
    construct_ms: f64,
    cocone_ms: f64,
    bound_ms: f64,
    cocone_facets: usize,
    bound_facets: usize,
}

impl BenchResult {
    fn total_ms(&self) -> f64 {
        self.construct_ms + self.cocone_ms + self.bound_ms
    }
}

fn run_benchmark<const N: usize>(
    points: &[[f32; N]],
    rho: f64,
    alpha: f64,
) -> Result<BenchResult, Box<dyn Error>>
where
    Dim<N>: SupportedDimension<N>,
{
    let t0 = Instant::now();
    let config = ConstructorConfig {
        reference_rho: rho,
        reference_alpha: alpha,
        ..Default::default()
    };
    let constructor = create_manifold_constructor_with(points, config, &NoProgress)?;
    let construct_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let mut normals = Vec::new();
    let mut facets = Vec::new();

    let t1 = Instant::now();
    constructor.cocone(&mut normals, &mut facets, &NoProgress)?;
    let cocone_ms = t1.elapsed().as_secs_f64() * 1000.0;
    let cocone_facets = facets.len();

    let t2 = Instant::now();
    constructor.bound_cocone(rho, alpha, &mut normals, &mut facets, &NoProgress)?;
    let bound_ms = t2.elapsed().as_secs_f64() * 1000.0;

    Ok(BenchResult {
        n: points.len(),
        construct_ms,
        cocone_ms,
        bound_ms,
        cocone_facets,
        bound_facets: facets.len(),
    })
}

fn bench_size<const N: usize>(n: usize, args: &Args) -> Result<BenchResult, Box<dyn Error>>
where
    Dim<N>: SupportedDimension<N>,
{
    let t_gen = Instant::now();
    let points = sphere_with_notch::<N>(n, args.bounded, args.seed);
    println!(
        "Point generation: {:.1}ms",
        t_gen.elapsed().as_secs_f64() * 1000.0
    );

    let mut times: Vec<f64> = Vec::with_capacity(args.repeat);
    let mut last_result = None;

    for iter in 0..args.repeat.max(1) {
        if args.repeat > 1 {
            print!("  Iteration {}/{}... ", iter + 1, args.repeat);
            io::stdout().flush()?;
        }

        let result = run_benchmark(&points, args.rho, args.alpha)?;
        times.push(result.total_ms());

        if args.repeat > 1 {
            println!("{:.1}ms", result.total_ms());
        }
        last_result = Some(result);
    }

    let result = last_result.ok_or("no iterations run")?;

    println!("\nResults:");
    if args.repeat > 1 {
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        println!("  Min time:      {:>8.1}ms", min);
        println!("  Max time:      {:>8.1}ms", max);
        println!("  Avg time:      {:>8.1}ms", avg);
    }
    println!("  Constructor:   {:>8.1}ms", result.construct_ms);
    println!("  Cocone:        {:>8.1}ms", result.cocone_ms);
    println!("  BoundCocone:   {:>8.1}ms", result.bound_ms);
    println!(
        "  Throughput:    {:>8}",
        format_rate(result.n, result.total_ms())
    );
    println!("  Cocone facets: {:>8}", format_num(result.cocone_facets));
    println!("  Bound facets:  {:>8}", format_num(result.bound_facets));
    println!(
        "  Facets/point:  {:>8.2}",
        result.cocone_facets as f64 / result.n as f64
    );

    Ok(result)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("Manifold Reconstruction Benchmark");
    println!("=================================\n");

    let sizes: Vec<usize> = if args.sizes.is_empty() {
        vec![10_000]
    } else {
        args.sizes.clone()
    };

    println!("Configuration:");
    println!("  dim = {}", args.dim);
    println!("  seed = {}", args.seed);
    println!("  bounded = {}", args.bounded);
    println!("  rho = {}, alpha = {}", args.rho, args.alpha);
    println!(
        "  sizes = {:?}",
        sizes.iter().map(|&n| format_num(n)).collect::<Vec<_>>()
    );
    if args.repeat > 1 {
        println!("  repeat = {}", args.repeat);
    }

    #[cfg(feature = "timing")]
    println!("  timing = enabled (per-phase timing is logged at info level)");

    let mut results: Vec<BenchResult> = Vec::new();

    for &n in &sizes {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking n = {} ({}D)", format_num(n), args.dim);
        println!("{}", "=".repeat(60));

        let result = match args.dim {
            2 => bench_size::<2>(n, &args)?,
            3 => bench_size::<3>(n, &args)?,
            _ => bench_size::<4>(n, &args)?,
        };
        results.push(result);
    }

    if results.len() > 1 {
        println!("\n\n{}", "=".repeat(60));
        println!("SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "{:>10} | {:>10} | {:>12} | {:>10}",
            "n", "time", "throughput", "facets"
        );
        println!("{:-<10}-+-{:-<10}-+-{:-<12}-+-{:-<10}", "", "", "", "");

        for r in &results {
            println!(
                "{:>10} | {:>9.1}ms | {:>12} | {:>10}",
                format_num(r.n),
                r.total_ms(),
                format_rate(r.n, r.total_ms()),
                format_num(r.cocone_facets)
            );
        }
    }

    println!("\nBenchmark complete.");
    Ok(())
}
