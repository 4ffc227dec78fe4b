use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::modules::types::{CellView, Direction, Observation, Position, TileKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub level: u32,
    pub visit_count: u32,
}

impl Tile {
    pub fn view(&self) -> CellView {
        CellView::new(self.kind, self.level)
    }

    pub fn is_wall(&self) -> bool {
        self.kind == TileKind::Wall
    }
}

/// A tile known to hold a block the agent may carry away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorBlock {
    pub position: Position,
    pub level: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldLocation {
    pub position: Position,
    pub level: u32,
}

/// What a single `record_observation` call discovered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub gold_discovered: Option<GoldLocation>,
    pub donors_added: usize,
    pub tiles_added: usize,
}

#[derive(Clone, Debug, Default)]
pub struct WorldMap {
    tiles: HashMap<Position, Tile>,
    /// Unseen coordinates beside an observed tile or around a visited one.
    frontier: BTreeSet<Position>,
    donors: Vec<DonorBlock>,
    gold: Option<GoldLocation>,
    last_position: Option<Position>,
}

impl WorldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_observation(&mut self, position: Position, obs: &Observation) -> RecordOutcome {
        let mut outcome = RecordOutcome::default();

        self.write_tile(position, obs.current, &mut outcome);
        for dir in Direction::ALL {
            if let Some(view) = obs.neighbor(dir) {
                self.write_tile(position.step(dir), view, &mut outcome);
            }
        }

        // Visits count arrivals, so re-recording the same spot is a no-op.
        if self.last_position != Some(position) {
            if let Some(tile) = self.tiles.get_mut(&position) {
                tile.visit_count = tile.visit_count.saturating_add(1);
            }
            self.last_position = Some(position);
        }

        for candidate in position.surrounding() {
            if !self.tiles.contains_key(&candidate) {
                self.frontier.insert(candidate);
            }
        }
        let tiles = &self.tiles;
        self.frontier.retain(|p| !tiles.contains_key(p));

        outcome
    }

    fn write_tile(&mut self, position: Position, view: CellView, outcome: &mut RecordOutcome) {
        let visit_count = match self.tiles.get(&position) {
            Some(existing) => existing.visit_count,
            None => {
                outcome.tiles_added += 1;
                0
            }
        };
        self.tiles.insert(
            position,
            Tile {
                kind: view.kind,
                level: view.level,
                visit_count,
            },
        );
        self.frontier.remove(&position);
        for (_, neighbor) in position.neighbors() {
            if !self.tiles.contains_key(&neighbor) {
                self.frontier.insert(neighbor);
            }
        }

        if view.kind == TileKind::Gold && self.gold.is_none() {
            let gold = GoldLocation {
                position,
                level: view.level,
            };
            self.gold = Some(gold);
            outcome.gold_discovered = Some(gold);
        }

        if view.kind == TileKind::Block && view.level >= 1 {
            match self.donors.iter_mut().find(|d| d.position == position) {
                Some(existing) => existing.level = view.level,
                None => {
                    self.donors.push(DonorBlock {
                        position,
                        level: view.level,
                    });
                    outcome.donors_added += 1;
                }
            }
        } else {
            self.donors.retain(|d| d.position != position);
        }
    }

    /// Drop donor entries whose tile no longer reads `(Block, level)`. Returns how many went.
    pub fn mark_donors_stale(&mut self) -> usize {
        let before = self.donors.len();
        let tiles = &self.tiles;
        self.donors.retain(|donor| {
            tiles
                .get(&donor.position)
                .map(|t| t.kind == TileKind::Block && t.level == donor.level)
                .unwrap_or(false)
        });
        before - self.donors.len()
    }

    /// Model the agent lifting the block it stands on.
    pub fn apply_pickup(&mut self, position: Position) {
        let mut outcome = RecordOutcome::default();
        self.write_tile(position, CellView::empty(), &mut outcome);
    }

    /// Model the agent setting a block down where it stands, raising the tile to `level`.
    pub fn apply_drop(&mut self, position: Position, level: u32) {
        let mut outcome = RecordOutcome::default();
        self.write_tile(position, CellView::block(level), &mut outcome);
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn level_at(&self, position: Position) -> Option<u32> {
        self.tiles.get(&position).map(|t| t.level)
    }

    pub fn kind_at(&self, position: Position) -> Option<TileKind> {
        self.tiles.get(&position).map(|t| t.kind)
    }

    pub fn is_known(&self, position: Position) -> bool {
        self.tiles.contains_key(&position)
    }

    /// Known and not a wall.
    pub fn is_walkable(&self, position: Position) -> bool {
        self.tiles.get(&position).is_some_and(|t| !t.is_wall())
    }

    pub fn visit_count(&self, position: Position) -> u32 {
        self.tiles.get(&position).map(|t| t.visit_count).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = (&Position, &Tile)> {
        self.tiles.iter()
    }

    pub fn frontier(&self) -> &BTreeSet<Position> {
        &self.frontier
    }

    pub fn in_frontier(&self, position: Position) -> bool {
        self.frontier.contains(&position)
    }

    /// Cardinal neighbors of `position` sitting in the frontier. Positive means
    /// standing on `position` would reveal something.
    pub fn frontier_neighbors(&self, position: Position) -> usize {
        position
            .neighbors()
            .iter()
            .filter(|(_, p)| self.frontier.contains(p))
            .count()
    }

    pub fn donors(&self) -> &[DonorBlock] {
        &self.donors
    }

    pub fn gold(&self) -> Option<GoldLocation> {
        self.gold
    }
}

#[cfg(test)]
impl WorldMap {
    /// Build a fully known map from ASCII rows: `.` empty, `#` wall, `1`-`9` block
    /// stacks, `G` gold at `gold_level`, `?` left unknown. Row index is `y`.
    pub(crate) fn from_rows(rows: &[&str], gold_level: u32) -> Self {
        let mut map = WorldMap::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let view = match ch {
                    '.' => CellView::empty(),
                    '#' => CellView::wall(),
                    'G' => CellView::gold(gold_level),
                    d if d.is_ascii_digit() => CellView::block(d.to_digit(10).unwrap_or(0)),
                    _ => continue,
                };
                let mut outcome = RecordOutcome::default();
                map.write_tile(Position::new(x as i32, y as i32), view, &mut outcome);
            }
        }
        map
    }
}
