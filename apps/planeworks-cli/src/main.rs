use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec2;
use planeworks_common::WorldBounds;
use planeworks_kernel::PlaneConfig;
use planeworks_render::{DebugTextRenderer, Frame, HeadlessBackend, RenderLoop, Renderer};
use planeworks_stream::{ChunkManager, Viewport};
use planeworks_tools::{PlaneInspector, TickTimer, grid_overlay};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planeworks-cli", about = "CLI tool for planeworks operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and crate info
    Info,
    /// Build a chunk grid and show it through a viewport
    Grid {
        #[arg(long, default_value = "2000")]
        width: u32,
        #[arg(long, default_value = "1500")]
        height: u32,
        #[arg(long, default_value = "500")]
        cell_size: u32,
        /// Viewport as x,y,width,height
        #[arg(long, value_delimiter = ',', default_values_t = [0.0, 0.0, 1000.0, 500.0])]
        viewport: Vec<f32>,
        /// Print machine-readable output
        #[arg(long)]
        json: bool,
    },
    /// Run a headless simulation with a separate render thread
    Simulate {
        /// YAML plane config; defaults apply to missing keys
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of ticks to simulate
        #[arg(short, long)]
        ticks: Option<u64>,
        /// Number of objects to scatter
        #[arg(short, long)]
        objects: Option<usize>,
        /// RNG seed for object placement
        #[arg(short, long)]
        seed: Option<u64>,
        /// Update every object every tick
        #[arg(long)]
        unchunked: bool,
        /// Camera pan per tick, in pixels along both axes
        #[arg(long, default_value = "8.0")]
        pan: f32,
        /// Render thread frame interval in milliseconds
        #[arg(long, default_value = "2")]
        frame_ms: u64,
        /// Print machine-readable output
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("planeworks-cli v{}", env!("CARGO_PKG_VERSION"));
            let defaults = PlaneConfig::default();
            println!(
                "kernel: default plane {}x{}",
                defaults.world_width, defaults.world_height
            );
            println!("stream: {}", planeworks_stream::crate_info());
            println!("render: {}", planeworks_render::crate_info());
            println!("tools: {}", planeworks_tools::crate_info());
            println!(
                "default cell size: {}px",
                planeworks_common::DEFAULT_CELL_SIZE
            );
        }
        Commands::Grid {
            width,
            height,
            cell_size,
            viewport,
            json,
        } => run_grid(width, height, cell_size, &viewport, json)?,
        Commands::Simulate {
            config,
            ticks,
            objects,
            seed,
            unchunked,
            pan,
            frame_ms,
            json,
        } => {
            let mut plane = match config {
                Some(path) => PlaneConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => PlaneConfig::default(),
            };
            if let Some(ticks) = ticks {
                plane.ticks = ticks;
            }
            if let Some(objects) = objects {
                plane.objects = objects;
            }
            if let Some(seed) = seed {
                plane.seed = seed;
            }
            if unchunked {
                plane.chunked = false;
            }
            run_simulation(&plane, pan, Duration::from_millis(frame_ms), json)?;
        }
    }

    Ok(())
}

fn run_grid(
    width: u32,
    height: u32,
    cell_size: u32,
    rect: &[f32],
    json: bool,
) -> anyhow::Result<()> {
    let [x, y, w, h] = rect else {
        anyhow::bail!("viewport takes exactly four values: x,y,width,height");
    };
    let mut chunks = ChunkManager::with_bounds(WorldBounds::new(width, height), cell_size)?;
    let viewport = Viewport::unzoomed(Vec2::new(*x, *y), Vec2::new(*w, *h))?;
    let diff = chunks.scan(&viewport);

    // neighbor count -> number of cells with that many neighbors
    let mut topology: BTreeMap<usize, usize> = BTreeMap::new();
    for cell in chunks.cells() {
        *topology.entry(cell.neighbors().len()).or_default() += 1;
    }

    if json {
        let out = serde_json::json!({
            "rows": chunks.rows(),
            "columns": chunks.columns(),
            "cell_size": chunks.cell_size(),
            "neighbor_counts": topology,
            "visible": diff.shown,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Grid: {}x{} cells of {}px over {}x{}",
        chunks.rows(),
        chunks.columns(),
        chunks.cell_size(),
        width,
        height
    );
    for (neighbors, cells) in &topology {
        println!("  {cells} cell(s) with {neighbors} neighbor(s)");
    }
    println!(
        "Viewport rows {:?} columns {:?}: {} visible cell(s)",
        viewport.row_range(cell_size),
        viewport.column_range(cell_size),
        chunks.visible_count()
    );
    print!("{}", grid_overlay(&chunks));
    Ok(())
}

fn run_simulation(
    plane: &PlaneConfig,
    pan: f32,
    frame_interval: Duration,
    json: bool,
) -> anyhow::Result<()> {
    let mut world = plane.build_world()?;
    let mut viewport = plane.viewport()?;
    tracing::info!(
        objects = world.object_count(),
        chunked = world.is_chunked(),
        ticks = plane.ticks,
        "simulation starting"
    );

    let render_loop = match world.chunks() {
        Some(chunks) => Some(RenderLoop::spawn(
            chunks.render_queues(),
            HeadlessBackend::new(),
            frame_interval,
        )?),
        None => None,
    };

    let renderer = DebugTextRenderer::with_limit(5);
    let mut timer = TickTimer::new(64);
    let mut updated = 0usize;
    let mut staged = 0usize;
    let mut last_frame = String::new();

    for _ in 0..plane.ticks {
        let start = Instant::now();
        let report = world.step(&viewport);
        timer.record(start.elapsed());

        updated += report.updated;
        staged += report.staged;
        let objects = world.drain_staged();
        last_frame = renderer.render(&Frame::new(&world, &viewport, &objects));
        viewport.translate(Vec2::splat(pan))?;
    }

    let summary = PlaneInspector::summary(&world);
    let overlay = world.chunks().map(grid_overlay);
    let render = match render_loop {
        Some(render_loop) => Some(render_loop.shutdown()?),
        None => None,
    };

    if json {
        let out = serde_json::json!({
            "summary": summary,
            "updated": updated,
            "staged": staged,
            "tick_time_us": {
                "avg": timer.average().as_micros(),
                "min": timer.min().as_micros(),
                "max": timer.max().as_micros(),
                "p95": timer.percentile(0.95).as_micros(),
            },
            "render_loop": render.as_ref().map(|(_, stats)| stats),
            "backend": render.as_ref().map(|(backend, _)| backend.stats()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{summary}");
    println!("Updated {updated} object-ticks, staged {staged}");
    println!(
        "Tick time over last {}: avg={:?} min={:?} max={:?} p95={:?}",
        timer.count(),
        timer.average(),
        timer.min(),
        timer.max(),
        timer.percentile(0.95)
    );
    print!("{last_frame}");
    if let Some(overlay) = overlay {
        print!("{overlay}");
    }
    if let Some((backend, stats)) = render {
        let b = backend.stats();
        println!(
            "Render thread: frames={} allocated={} released={} resident={}",
            stats.frames,
            stats.allocated,
            stats.released,
            backend.resident_count()
        );
        println!(
            "Backend: redundant allocations={} redundant releases={}",
            b.redundant_allocations, b.redundant_releases
        );
    }
    Ok(())
}
