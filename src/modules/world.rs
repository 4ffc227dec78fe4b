use std::collections::{HashSet, VecDeque};
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::modules::types::{CellView, Position, TileKind};

pub const DEFAULT_WIDTH: usize = 14;
pub const DEFAULT_HEIGHT: usize = 14;
pub const DEFAULT_GOLD_LEVEL: u32 = 6;
pub const DEFAULT_BLOCKS: usize = 24;
pub const DEFAULT_WALL_DENSITY: f64 = 0.12;
/// Cells around the gold (Chebyshev radius) kept free of walls and blocks.
pub const GOLD_CLEARANCE: i32 = 2;
const MAX_GENERATION_ATTEMPTS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout is empty")]
    Empty,
    #[error("line {line} has {found} cells, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile '{ch}' at line {line}, column {column}")]
    UnknownTile { line: usize, column: usize, ch: char },
    #[error("layout needs exactly one '{marker}', found {found}")]
    Marker { marker: char, found: usize },
    #[error("grid {width}x{height} is too small")]
    TooSmall { width: usize, height: usize },
    #[error("no connected layout after {attempts} attempts")]
    Unconnected { attempts: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<CellView>,
    start: Position,
    gold: Position,
}

impl Grid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn gold(&self) -> Position {
        self.gold
    }

    pub fn gold_level(&self) -> u32 {
        self.cells[self.index(self.gold)].level
    }

    pub fn in_bounds(&self, p: Position) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    fn index(&self, p: Position) -> usize {
        p.y as usize * self.width + p.x as usize
    }

    pub fn get(&self, p: Position) -> Option<CellView> {
        self.in_bounds(p).then(|| self.cells[self.index(p)])
    }

    pub fn set(&mut self, p: Position, cell: CellView) {
        if self.in_bounds(p) {
            let idx = self.index(p);
            self.cells[idx] = cell;
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x as i32, y as i32)))
    }

    /// Sum of all block stack heights.
    pub fn block_height(&self) -> u32 {
        self.cells
            .iter()
            .filter(|c| c.kind == TileKind::Block)
            .map(|c| c.level)
            .sum()
    }

    /// Parse an ASCII layout; `G` takes `gold_level`, `@` marks an empty start tile.
    pub fn parse(text: &str, gold_level: u32) -> Result<Self, LayoutError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();
        let width = lines.first().map(|l| l.chars().count()).ok_or(LayoutError::Empty)?;

        let mut cells = Vec::with_capacity(width * lines.len());
        let mut starts = Vec::new();
        let mut golds = Vec::new();
        for (y, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LayoutError::Ragged {
                    line: y + 1,
                    expected: width,
                    found,
                });
            }
            for (x, ch) in line.chars().enumerate() {
                let p = Position::new(x as i32, y as i32);
                let cell = match ch {
                    '.' => CellView::empty(),
                    '#' => CellView::wall(),
                    '@' => {
                        starts.push(p);
                        CellView::empty()
                    }
                    'G' => {
                        golds.push(p);
                        CellView::gold(gold_level)
                    }
                    d @ '1'..='9' => CellView::block(d as u32 - '0' as u32),
                    other => {
                        return Err(LayoutError::UnknownTile {
                            line: y + 1,
                            column: x + 1,
                            ch: other,
                        });
                    }
                };
                cells.push(cell);
            }
        }

        let start = single(&starts, '@')?;
        let gold = single(&golds, 'G')?;
        Ok(Self {
            width,
            height: lines.len(),
            cells,
            start,
            gold,
        })
    }

    /// Render in the layout format with `@` at `marker`.
    pub fn render(&self, marker: Position) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Position::new(x as i32, y as i32);
                out.push(if p == marker { '@' } else { glyph(self.cells[self.index(p)]) });
            }
            out.push('\n');
        }
        out
    }

    /// Every non-wall, non-gold cell reachable from the start over non-wall cells.
    pub fn is_connected(&self) -> bool {
        let mut seen = HashSet::from([self.start]);
        let mut queue = VecDeque::from([self.start]);
        while let Some(p) = queue.pop_front() {
            for (_, next) in p.neighbors() {
                let Some(cell) = self.get(next) else { continue };
                if cell.kind == TileKind::Wall || cell.kind == TileKind::Gold {
                    continue;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        self.positions().all(|p| {
            matches!(self.get(p).map(|c| c.kind), Some(TileKind::Wall | TileKind::Gold)) || seen.contains(&p)
        })
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(self.start))
    }
}

fn single(found: &[Position], marker: char) -> Result<Position, LayoutError> {
    match found {
        [p] => Ok(*p),
        _ => Err(LayoutError::Marker {
            marker,
            found: found.len(),
        }),
    }
}

fn glyph(cell: CellView) -> char {
    match cell.kind {
        TileKind::Empty => '.',
        TileKind::Wall => '#',
        TileKind::Gold => 'G',
        TileKind::Block => char::from_digit(cell.level.clamp(1, 9), 10).unwrap_or('9'),
    }
}

/// Blocks needed for a staircase to `gold_level` with a doubled base.
pub fn required_blocks(gold_level: u32) -> usize {
    if gold_level <= 1 {
        return 0;
    }
    let n = gold_level as usize;
    n * (n - 1) / 2 + 1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub gold_level: u32,
    /// Single-block stacks to scatter; raised to what the staircase needs.
    pub blocks: usize,
    pub wall_density: f64,
    pub seed: Option<u64>,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            gold_level: DEFAULT_GOLD_LEVEL,
            blocks: DEFAULT_BLOCKS,
            wall_density: DEFAULT_WALL_DENSITY,
            seed: None,
        }
    }
}

impl GridSpec {
    pub fn generate(&self) -> Result<Grid, LayoutError> {
        if self.width < 5 || self.height < 5 {
            return Err(LayoutError::TooSmall {
                width: self.width,
                height: self.height,
            });
        }
        let blocks = self.blocks.max(required_blocks(self.gold_level));
        let clear_cells = (2 * GOLD_CLEARANCE as usize + 1).pow(2);
        if blocks + clear_cells + 1 > self.width * self.height {
            return Err(LayoutError::TooSmall {
                width: self.width,
                height: self.height,
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let grid = self.attempt(blocks, &mut rng);
            if grid.is_connected() {
                debug!(attempt, "grid generated");
                return Ok(grid);
            }
        }
        Err(LayoutError::Unconnected {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    fn attempt(&self, blocks: usize, rng: &mut StdRng) -> Grid {
        let gold = Position::new(
            rng.gen_range(1..self.width as i32 - 1),
            rng.gen_range(1..self.height as i32 - 1),
        );
        let near_gold = |p: Position| (p.x - gold.x).abs() <= GOLD_CLEARANCE && (p.y - gold.y).abs() <= GOLD_CLEARANCE;

        let mut grid = Grid {
            width: self.width,
            height: self.height,
            cells: vec![CellView::empty(); self.width * self.height],
            start: Position::origin(),
            gold,
        };
        grid.set(gold, CellView::gold(self.gold_level));

        let mut open: Vec<Position> = grid.positions().filter(|p| !near_gold(*p)).collect();
        open.shuffle(rng);
        let start = open.pop().unwrap_or(Position::origin());
        grid.start = start;

        for p in open.iter().take(blocks) {
            grid.set(*p, CellView::block(1));
        }
        for p in open.iter().skip(blocks) {
            if rng.gen_bool(self.wall_density.clamp(0.0, 1.0)) {
                grid.set(*p, CellView::wall());
            }
        }
        grid
    }
}
