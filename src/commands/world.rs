use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use stacker::world::{
    DEFAULT_BLOCKS, DEFAULT_GOLD_LEVEL, DEFAULT_HEIGHT, DEFAULT_WALL_DENSITY, DEFAULT_WIDTH,
};
use stacker::{Grid, GridSpec, required_blocks};

#[derive(Subcommand)]
pub enum WorldCommand {
    /// Generate a grid and print it as a layout
    Generate {
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: usize,
        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: usize,
        /// Level of the gold platform
        #[arg(long, default_value_t = DEFAULT_GOLD_LEVEL)]
        gold_level: u32,
        /// Single-block stacks to scatter (raised to what the staircase needs)
        #[arg(long, default_value_t = DEFAULT_BLOCKS)]
        blocks: usize,
        /// Chance of a wall on each remaining cell (0.0 - 1.0)
        #[arg(long, default_value_t = DEFAULT_WALL_DENSITY)]
        wall_density: f64,
        /// Optional RNG seed for reproducible grids
        #[arg(long)]
        seed: Option<u64>,
        /// Write the layout to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Validate a layout file and print a summary
    Show {
        file: PathBuf,
        /// Gold level to assume for the layout
        #[arg(long, default_value_t = DEFAULT_GOLD_LEVEL)]
        gold_level: u32,
    },
}

pub(super) fn run_world(cmd: WorldCommand) -> Result<(), String> {
    match cmd {
        WorldCommand::Generate {
            width,
            height,
            gold_level,
            blocks,
            wall_density,
            seed,
            out,
        } => {
            if !(0.0..=1.0).contains(&wall_density) {
                return Err("wall density must be between 0.0 and 1.0".into());
            }
            let grid = GridSpec {
                width,
                height,
                gold_level,
                blocks,
                wall_density,
                seed,
            }
            .generate()
            .map_err(|e| e.to_string())?;

            match out {
                Some(path) => {
                    fs::write(&path, grid.to_string()).map_err(|e| e.to_string())?;
                    println!("Wrote {}x{} layout to {}", width, height, path.display());
                }
                None => print!("{}", grid),
            }
            Ok(())
        }
        WorldCommand::Show { file, gold_level } => {
            let text = fs::read_to_string(&file)
                .map_err(|e| format!("could not read {}: {}", file.display(), e))?;
            let grid = Grid::parse(&text, gold_level).map_err(|e| e.to_string())?;
            print!("{}", grid);
            print_summary(&grid);
            Ok(())
        }
    }
}

fn print_summary(grid: &Grid) {
    let needed = required_blocks(grid.gold_level());
    let available = grid.block_height() as usize;
    println!("Size      : {}x{}", grid.width(), grid.height());
    println!("Start     : {}", grid.start());
    println!("Gold      : {} at level {}", grid.gold(), grid.gold_level());
    println!("Blocks    : {} available, {} needed", available, needed);
    println!("Connected : {}", if grid.is_connected() { "yes" } else { "no" });
    if available < needed {
        println!("warning: not enough blocks for a full staircase");
    }
}
