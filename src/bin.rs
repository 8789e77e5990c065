use clap::Parser;
use crossfill::config::DifficultyConfig;
use crossfill::grid::GridCharset;
use crossfill::layout::generate_layout;
use crossfill::logging::init_logger;
use crossfill::plan::{generate_puzzle, PlanOptions};
use crossfill::pool::PoolStore;
use crossfill::MIN_ENTRY_LEN;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt::{Debug, Formatter};

const MIN_GRID_SIZE: usize = 5;
const MAX_GRID_SIZE: usize = 21;

/// crossfill: command-line crossword generation tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the word pool file (a JSON object keyed by word length)
    pool_path: String,

    /// Grid size (the grid is always square)
    #[arg(long, default_value_t = 15)]
    size: usize,

    /// Difficulty level, 1 (most open) through 7 (most constrained)
    #[arg(long, default_value_t = 4)]
    level: u8,

    /// RNG seed; runs with the same seed and pool are reproducible
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of layout attempts before giving up
    #[arg(long, default_value_t = 16)]
    attempts: usize,

    /// Only generate and print a block layout, without filling it
    #[arg(long)]
    layout_only: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

struct Error(String);

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0) // Print error unquoted
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logger(args.debug);

    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&args.size) {
        return Err(Error(format!(
            "Grid size {} is not supported (must be in {MIN_GRID_SIZE}..={MAX_GRID_SIZE})",
            args.size
        )));
    }

    let difficulty = DifficultyConfig::for_level(args.level);
    let charset = GridCharset::default();

    if args.layout_only {
        for attempt in 0..args.attempts {
            let mut rng = SmallRng::seed_from_u64(args.seed.wrapping_add(attempt as u64));
            if let Ok(grid) =
                generate_layout(args.size, difficulty.block_budget, MIN_ENTRY_LEN, &mut rng)
            {
                for row in grid.to_rows(&charset) {
                    println!("{row}");
                }
                return Ok(());
            }
        }
        return Err(Error(format!(
            "No valid layout found in {} attempt(s)",
            args.attempts
        )));
    }

    let store = PoolStore::new(&args.pool_path);
    let mut pool = store.load();
    if pool.is_empty() {
        return Err(Error(format!(
            "Word pool '{}' is empty or unreadable",
            args.pool_path
        )));
    }

    let opts = PlanOptions {
        attempts: args.attempts,
        charset,
        ..PlanOptions::default()
    };

    let result = generate_puzzle(args.size, &mut pool, &difficulty, args.seed, &opts, None)
        .map_err(|err| Error(format!("{err}")))?;

    for row in result.grid.to_rows(&charset) {
        println!("{row}");
    }
    println!();
    for assignment in &result.assignments {
        println!("{}: {}", assignment.slot, assignment.word);
    }
    eprintln!(
        "steps={} backtracks={} maxDepth={} durationMs={}",
        result.stats.steps,
        result.stats.backtracks,
        result.stats.max_depth,
        result.stats.duration_ms
    );

    Ok(())
}
