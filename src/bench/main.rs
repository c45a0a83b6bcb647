//! Benchmark harness for bulk query performance testing
//!
//! Supports:
//! - Synthetic grid generation with a configurable parking fraction
//! - One-to-all query benchmarks per profile across worker threads
//!
//! Outputs: p50/p95/p99 times + settled-label counters, optional CSV rows
//! and a JSON summary for offline analysis.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use hdrhistogram::Histogram;
use rand::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use switchback::profiles::transitions::DEFAULT_PARKING_COST;
use switchback::profiles::SearchProfile;
use switchback::{
    BikeProfile, CarProfile, CombiProfile, Cost, Dijkstra, Direction, FootProfile, GraphBuilder,
    Level, NodeIdx, NodeProperties, Profile, RoutingGraph, WayProperties,
};

#[derive(Parser)]
#[command(name = "switchback-bench")]
#[command(about = "Benchmark harness for switchback query performance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic grid graph and save it
    Generate {
        /// Output directory for the graph tables
        #[arg(long)]
        out: PathBuf,

        /// Grid width and height in nodes
        #[arg(long, default_value = "200")]
        size: usize,

        /// Distance between neighboring nodes in meters
        #[arg(long, default_value = "120")]
        spacing: u16,

        /// Fraction of nodes flagged as parking
        #[arg(long, default_value = "0.02")]
        parking: f64,

        /// Random seed for parking placement
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Run one-to-all queries against a saved graph
    Run {
        /// Directory containing the graph tables
        #[arg(long)]
        data_dir: PathBuf,

        /// Profile (foot, wheelchair, bike, car, car-foot-parking)
        #[arg(long, default_value = "car")]
        profile: String,

        /// Cost budget per query in seconds
        #[arg(long, default_value = "900")]
        radius: u16,

        /// Worker threads
        #[arg(long, default_value = "4")]
        threads: usize,

        /// Queries per worker
        #[arg(long, default_value = "250")]
        queries: usize,

        /// Random seed; each worker derives its own origin stream
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Write per-query rows (thread,query,duration_us,settled) here
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write a JSON summary here
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

struct QueryRow {
    thread: usize,
    query: usize,
    duration_us: u64,
    settled: usize,
}

#[derive(Serialize)]
struct Summary {
    profile: String,
    radius: u16,
    threads: usize,
    queries_per_thread: usize,
    total_queries: usize,
    p50_us: u64,
    p95_us: u64,
    p99_us: u64,
    max_us: u64,
    mean_us: f64,
    mean_settled: f64,
    throughput_qps: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            out,
            size,
            spacing,
            parking,
            seed,
        } => generate(&out, size, spacing, parking, seed),

        Commands::Run {
            data_dir,
            profile,
            radius,
            threads,
            queries,
            seed,
            csv,
            summary,
        } => {
            let profile: SearchProfile = profile.parse()?;
            run(
                &data_dir,
                profile,
                radius,
                threads,
                queries,
                seed,
                csv.as_deref(),
                summary.as_deref(),
            )
        }
    }
}

fn generate(out: &Path, size: usize, spacing: u16, parking: f64, seed: u64) -> anyhow::Result<()> {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  GRID GENERATION");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Size: {size}x{size}");
    println!("  Spacing: {spacing} m");
    println!("  Parking fraction: {parking}");
    println!();

    println!("[1/2] Building grid...");
    let t = Instant::now();
    let g = build_grid(size, spacing, parking, seed);
    println!(
        "  ✓ {} nodes, {} ways in {:.1}s",
        g.n_nodes(),
        g.n_ways(),
        t.elapsed().as_secs_f64()
    );

    println!("[2/2] Saving to {}...", out.display());
    g.save(out)?;
    println!("  ✓ Done");
    Ok(())
}

/// Square grid: one way per row and per column, every way open to all
/// modes. A `parking` fraction of nodes gets the parking flag so the
/// park-and-ride profile has somewhere to switch.
fn build_grid(size: usize, spacing: u16, parking: f64, seed: u64) -> RoutingGraph {
    assert!(size >= 2, "grid needs at least 2x2 nodes");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = GraphBuilder::new();

    let mut nodes = Vec::with_capacity(size * size);
    for _ in 0..size * size {
        let props = if rng.random_bool(parking) {
            NodeProperties::all_modes().with_parking()
        } else {
            NodeProperties::all_modes()
        };
        nodes.push(b.add_node(props));
    }

    let dists = vec![spacing; size - 1];
    for row in 0..size {
        let row_nodes: Vec<_> = (0..size).map(|col| nodes[row * size + col]).collect();
        b.add_way(WayProperties::road(50), &row_nodes, &dists);
    }
    for col in 0..size {
        let col_nodes: Vec<_> = (0..size).map(|row| nodes[row * size + col]).collect();
        b.add_way(WayProperties::road(50), &col_nodes, &dists);
    }
    b.build()
}

#[allow(clippy::too_many_arguments)]
fn run(
    data_dir: &Path,
    profile: SearchProfile,
    radius: u16,
    threads: usize,
    queries: usize,
    seed: u64,
    csv: Option<&Path>,
    summary: Option<&Path>,
) -> anyhow::Result<()> {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ONE-TO-ALL QUERY BENCHMARK");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Profile: {}", profile.name());
    println!("  Radius: {radius} s");
    println!("  Workers: {threads} x {queries} queries");
    println!("  Seed: {seed}");
    println!();

    println!("[1/2] Mapping graph from {}...", data_dir.display());
    let t = Instant::now();
    let g = RoutingGraph::load(data_dir)?;
    println!(
        "  ✓ {} nodes, {} ways in {:.2}s",
        g.n_nodes(),
        g.n_ways(),
        t.elapsed().as_secs_f64()
    );
    println!();

    println!("[2/2] Running queries...");
    let wall = Instant::now();
    let rows = match profile {
        SearchProfile::Foot => run_workers(&g, FootProfile::walking(), radius, threads, queries, seed),
        SearchProfile::Wheelchair => {
            run_workers(&g, FootProfile::wheelchair(), radius, threads, queries, seed)
        }
        SearchProfile::Bike => run_workers(&g, BikeProfile, radius, threads, queries, seed),
        SearchProfile::Car => run_workers(&g, CarProfile, radius, threads, queries, seed),
        SearchProfile::CarFootParking => run_workers(
            &g,
            CombiProfile::car_foot_parking(DEFAULT_PARKING_COST),
            radius,
            threads,
            queries,
            seed,
        ),
    }?;
    let wall = wall.elapsed();
    println!("  ✓ {} queries in {:.2}s", rows.len(), wall.as_secs_f64());
    println!();

    report(&rows, profile, radius, threads, queries, wall, csv, summary)
}

/// Per-worker loop: one engine reused across queries, origins drawn from a
/// worker-seeded stream, all profile states of the origin seeded at cost 0.
fn run_workers<P: Profile + Clone + Sync>(
    g: &RoutingGraph,
    profile: P,
    radius: Cost,
    threads: usize,
    queries: usize,
    seed: u64,
) -> anyhow::Result<Vec<QueryRow>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    let per_worker: Vec<Vec<QueryRow>> = pool.install(|| {
        (0..threads)
            .into_par_iter()
            .map(|worker| {
                let mut d = Dijkstra::new(profile.clone());
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(worker as u64));
                let mut rows = Vec::with_capacity(queries);
                let mut starts = Vec::new();
                for query in 0..queries {
                    d.reset();
                    let origin = NodeIdx(rng.random_range(0..g.n_nodes() as u32));
                    starts.clear();
                    d.profile()
                        .resolve_all(g, origin, Level::ANY, |n| starts.push(n));
                    for &n in &starts {
                        d.add_start(n, 0, radius);
                    }

                    let t = Instant::now();
                    d.run(g, radius, None, Direction::Forward);
                    rows.push(QueryRow {
                        thread: worker,
                        query,
                        duration_us: t.elapsed().as_micros() as u64,
                        settled: d.stats().settled,
                    });
                }
                rows
            })
            .collect()
    });
    Ok(per_worker.into_iter().flatten().collect())
}

#[allow(clippy::too_many_arguments)]
fn report(
    rows: &[QueryRow],
    profile: SearchProfile,
    radius: u16,
    threads: usize,
    queries: usize,
    wall: Duration,
    csv: Option<&Path>,
    summary: Option<&Path>,
) -> anyhow::Result<()> {
    let mut hist = Histogram::<u64>::new(3)?;
    let mut settled_total = 0u64;
    for r in rows {
        hist.record(r.duration_us)?;
        settled_total += r.settled as u64;
    }
    let mean_settled = settled_total as f64 / rows.len().max(1) as f64;
    let throughput = rows.len() as f64 / wall.as_secs_f64().max(f64::EPSILON);

    print_histogram_stats("Query", &hist);
    println!();
    println!("  Mean settled labels: {mean_settled:.0}");
    println!("  Throughput: {throughput:.1} queries/sec");
    println!();

    if let Some(path) = csv {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "thread,query,duration_us,settled")?;
        for r in rows {
            writeln!(w, "{},{},{},{}", r.thread, r.query, r.duration_us, r.settled)?;
        }
        println!("  ✓ CSV written to {}", path.display());
    }

    if let Some(path) = summary {
        let s = Summary {
            profile: profile.name().to_string(),
            radius,
            threads,
            queries_per_thread: queries,
            total_queries: rows.len(),
            p50_us: hist.value_at_quantile(0.50),
            p95_us: hist.value_at_quantile(0.95),
            p99_us: hist.value_at_quantile(0.99),
            max_us: hist.max(),
            mean_us: hist.mean(),
            mean_settled,
            throughput_qps: throughput,
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &s)?;
        println!("  ✓ Summary written to {}", path.display());
    }

    Ok(())
}

fn print_histogram_stats(name: &str, hist: &Histogram<u64>) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {} timing (μs)", name);
    println!("───────────────────────────────────────────────────────────────");
    println!("    min:    {:>10.0}", hist.min() as f64);
    println!("    p50:    {:>10.0}", hist.value_at_quantile(0.50) as f64);
    println!("    p90:    {:>10.0}", hist.value_at_quantile(0.90) as f64);
    println!("    p95:    {:>10.0}", hist.value_at_quantile(0.95) as f64);
    println!("    p99:    {:>10.0}", hist.value_at_quantile(0.99) as f64);
    println!("    max:    {:>10.0}", hist.max() as f64);
    println!("    mean:   {:>10.1}", hist.mean());
    println!("    stdev:  {:>10.1}", hist.stdev());
}
