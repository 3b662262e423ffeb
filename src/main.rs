#![warn(clippy::all)]

use anyhow::Result;
use clap::Parser;
use polylife::{EngineConfig, GenerationEngine, Grid};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scatter a random multi-population board and print its generations.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value_t = 50)]
    width: u32,

    #[arg(long, default_value_t = 10)]
    height: u32,

    /// Number of competing populations.
    #[arg(long, default_value_t = 1)]
    populations: u32,

    /// Share of the board occupied initially.
    #[arg(long, default_value_t = 0.1)]
    fill_rate: f64,

    /// Generations printed after the initial board.
    #[arg(long, default_value_t = 9)]
    generations: u32,

    #[arg(long, default_value_t = EngineConfig::DEFAULT_WORKERS)]
    workers: usize,

    /// Random seed; drawn from entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut grid = Grid::random(
        args.width,
        args.height,
        args.populations,
        args.fill_rate,
        args.seed,
    )?;
    // a block that survives whatever the scatter looks like
    let (x, y) = (args.width as i64 / 4, args.height as i64 / 2);
    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        if grid.contains((x + dx, y + dy).into()) {
            grid.set(x + dx, y + dy, Some(0))?;
        }
    }

    let config = EngineConfig::default()
        .with_workers(args.workers)
        .with_populations_count(args.populations);
    let engine = GenerationEngine::new(grid, config)?;
    let delimiter = "-".repeat(args.width as usize);

    println!("{}{}\n", engine.snapshot(), delimiter);
    for _ in 0..args.generations {
        engine.advance_generation()?;
        println!("{}{}\n", engine.snapshot(), delimiter);
    }
    info!("\n{}", engine.statistics());

    engine.shutdown()?;
    Ok(())
}
