use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::modules::map::{GoldLocation, WorldMap};
use crate::modules::types::{Position, TileKind};

/// Open (empty) cardinal neighbors a cell needs to count as accessible.
pub const ACCESSIBLE_MIN_OPEN: usize = 2;
/// Wall neighbors an accessible cell may have.
pub const ACCESSIBLE_MAX_WALLS: usize = 1;
/// Score for an accessible step candidate.
pub const ACCESSIBLE_BONUS: i64 = 10;
/// Score for a level-2 candidate with room for two base cells.
pub const DOUBLE_BASE_BONUS: i64 = 1000;
/// Score for a level-2 candidate with room for a single base cell.
pub const SINGLE_BASE_BONUS: i64 = 1;
/// Level-1 cells collected under the level-2 step.
pub const MAX_BASE_CELLS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub position: Position,
    pub level: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Staircase {
    steps: Vec<Step>,
    cells: HashSet<Position>,
}

impl Staircase {
    /// Steps are kept highest level first; equal levels keep their given order.
    pub fn from_steps(mut steps: Vec<Step>) -> Self {
        steps.sort_by(|a, b| b.level.cmp(&a.level));
        let cells = steps.iter().map(|s| s.position).collect();
        Self { steps, cells }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(&position)
    }

    /// The step beside the gold.
    pub fn final_step(&self) -> Option<Step> {
        self.steps.first().copied()
    }

    /// Where layer 1 starts: the first base cell.
    pub fn layer_origin(&self) -> Option<Position> {
        self.steps
            .iter()
            .find(|s| s.level == 1)
            .map(|s| s.position)
    }

    pub fn max_level(&self) -> u32 {
        self.steps.iter().map(|s| s.level).max().unwrap_or(0)
    }

    pub fn built_level(map: &WorldMap, step: &Step) -> u32 {
        map.level_at(step.position).unwrap_or(0)
    }

    /// Lowest-level step that still needs a block for `layer`.
    pub fn next_target(&self, map: &WorldMap, layer: u32) -> Option<Step> {
        self.steps
            .iter()
            .filter(|s| s.level >= layer && Self::built_level(map, s) < layer)
            .min_by_key(|s| s.level)
            .copied()
    }

    pub fn is_complete(&self, map: &WorldMap) -> bool {
        self.steps
            .iter()
            .all(|s| Self::built_level(map, s) >= s.level)
    }
}

/// At least two empty cardinal neighbors and at most one wall.
pub fn is_accessible(map: &WorldMap, position: Position) -> bool {
    let mut open = 0;
    let mut walls = 0;
    for (_, neighbor) in position.neighbors() {
        match map.kind_at(neighbor) {
            Some(TileKind::Empty) => open += 1,
            Some(TileKind::Wall) => walls += 1,
            _ => {}
        }
    }
    open >= ACCESSIBLE_MIN_OPEN && walls <= ACCESSIBLE_MAX_WALLS
}

/// Observed, not wall or gold, not already in this attempt, and not taller than `level`.
fn is_candidate(map: &WorldMap, position: Position, level: u32, used: &HashSet<Position>) -> bool {
    if used.contains(&position) {
        return false;
    }
    match map.tile(position) {
        Some(tile) => {
            !matches!(tile.kind, TileKind::Wall | TileKind::Gold) && tile.level <= level
        }
        None => false,
    }
}

/// Plan a staircase up to `gold`, or `None` when no top-step candidate works out.
///
/// Gold at level 0 or 1 needs no steps and yields an empty staircase.
pub fn plan_staircase(map: &WorldMap, gold: GoldLocation) -> Option<Staircase> {
    if gold.level <= 1 {
        return Some(Staircase::default());
    }

    let top_level = gold.level - 1;
    let none_used = HashSet::new();
    for (_, top) in gold.position.neighbors() {
        if !is_candidate(map, top, top_level, &none_used) || !is_accessible(map, top) {
            continue;
        }
        if let Some(steps) = descend_from(map, gold, top) {
            return Some(Staircase::from_steps(steps));
        }
    }

    None
}

fn descend_from(map: &WorldMap, gold: GoldLocation, top: Position) -> Option<Vec<Step>> {
    let top_level = gold.level - 1;
    let mut used: HashSet<Position> = HashSet::from([gold.position, top]);
    let mut steps = vec![Step {
        position: top,
        level: top_level,
    }];
    if top_level == 1 {
        return Some(steps);
    }

    let mut current = top;
    for level in (2..top_level).rev() {
        let next = best_next_step(map, current, level, &used)?;
        used.insert(next);
        steps.push(Step {
            position: next,
            level,
        });
        current = next;
    }

    let bases = base_cells(map, current, &used);
    if bases.is_empty() {
        return None;
    }
    steps.extend(bases.into_iter().map(|position| Step { position, level: 1 }));
    Some(steps)
}

fn best_next_step(
    map: &WorldMap,
    current: Position,
    level: u32,
    used: &HashSet<Position>,
) -> Option<Position> {
    let mut best: Option<(i64, Position)> = None;

    for (_, candidate) in current.neighbors() {
        if !is_candidate(map, candidate, level, used) {
            continue;
        }

        let mut score = 0;
        if is_accessible(map, candidate) {
            score += ACCESSIBLE_BONUS;
        }
        if level == 2 {
            let mut probe = used.clone();
            probe.insert(candidate);
            match base_cells(map, candidate, &probe).len() {
                0 => continue,
                1 => score += SINGLE_BASE_BONUS,
                n => score += DOUBLE_BASE_BONUS + n as i64,
            }
        }

        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }

    best.map(|(_, position)| position)
}

fn base_cells(map: &WorldMap, step: Position, used: &HashSet<Position>) -> Vec<Position> {
    step.neighbors()
        .into_iter()
        .map(|(_, p)| p)
        .filter(|p| is_candidate(map, *p, 1, used) && is_accessible(map, *p))
        .take(MAX_BASE_CELLS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN_FIELD: [&str; 7] = [
        ".......",
        ".......",
        ".......",
        "...G...",
        ".......",
        ".......",
        ".......",
    ];

    fn gold_at(map: &WorldMap) -> GoldLocation {
        map.gold().unwrap()
    }

    fn assert_climbable(staircase: &Staircase, gold: GoldLocation) {
        let steps = staircase.steps();
        let top = staircase.final_step().unwrap();
        assert!(top.position.is_adjacent(gold.position));
        assert_eq!(top.level, gold.level - 1);
        for step in steps.iter().filter(|s| s.level < top.level) {
            assert!(
                steps
                    .iter()
                    .any(|up| up.level == step.level + 1 && up.position.is_adjacent(step.position)),
                "step {:?} has no neighbor one level up",
                step
            );
        }
    }

    #[test]
    fn plans_four_high_staircase_in_open_field() {
        let map = WorldMap::from_rows(&OPEN_FIELD, 4);
        let gold = gold_at(&map);
        let plan = plan_staircase(&map, gold).unwrap();

        let levels: Vec<u32> = plan.steps().iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![3, 2, 1, 1]);
        assert_eq!(plan.final_step().unwrap().position, Position::new(2, 3));
        assert_eq!(plan.layer_origin(), Some(Position::new(0, 3)));
        assert_climbable(&plan, gold);
    }

    #[test]
    fn low_gold_needs_little_or_nothing() {
        let map = WorldMap::from_rows(&OPEN_FIELD, 1);
        assert!(plan_staircase(&map, gold_at(&map)).unwrap().is_empty());

        let map = WorldMap::from_rows(&OPEN_FIELD, 2);
        let plan = plan_staircase(&map, gold_at(&map)).unwrap();
        assert_eq!(plan.steps(), &[Step { position: Position::new(2, 3), level: 1 }]);
    }

    #[test]
    fn three_high_uses_top_step_as_level_two() {
        let map = WorldMap::from_rows(&OPEN_FIELD, 3);
        let plan = plan_staircase(&map, gold_at(&map)).unwrap();
        let levels: Vec<u32> = plan.steps().iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![2, 1, 1]);
        assert_climbable(&plan, gold_at(&map));
    }

    #[test]
    fn tall_stacks_are_not_used_as_low_steps() {
        let rows = [
            ".......",
            ".......",
            ".......",
            ".5.G...",
            ".......",
            ".......",
            ".......",
        ];
        let map = WorldMap::from_rows(&rows, 4);
        let plan = plan_staircase(&map, gold_at(&map)).unwrap();
        assert!(!plan.contains(Position::new(1, 3)));
        assert_climbable(&plan, gold_at(&map));
    }

    #[test]
    fn gold_in_a_pocket_fails() {
        let rows = ["#####", "##.##", "#.G.#", "##.##", "#####"];
        let map = WorldMap::from_rows(&rows, 5);
        assert!(plan_staircase(&map, gold_at(&map)).is_none());
    }

    #[test]
    fn unknown_terrain_is_never_planned_on() {
        let rows = ["???", "?G.", "???"];
        let map = WorldMap::from_rows(&rows, 3);
        assert!(plan_staircase(&map, gold_at(&map)).is_none());
    }

    #[test]
    fn accessibility_counts_empties_and_walls() {
        let rows = ["#.#", "...", "###"];
        let map = WorldMap::from_rows(&rows, 0);
        // (1,1): up empty, left empty, right empty, down wall.
        assert!(is_accessible(&map, Position::new(1, 1)));
        // (0,1): left unknown, right empty, up wall, down wall.
        assert!(!is_accessible(&map, Position::new(0, 1)));
    }

    #[test]
    fn layers_target_lowest_steps_first() {
        let mut map = WorldMap::from_rows(&OPEN_FIELD, 4);
        let plan = plan_staircase(&map, gold_at(&map)).unwrap();

        let first = plan.next_target(&map, 1).unwrap();
        assert_eq!(first.level, 1);

        for step in plan.steps() {
            map.apply_drop(step.position, 1);
        }
        assert!(plan.next_target(&map, 1).is_none());
        assert_eq!(plan.next_target(&map, 2).unwrap().level, 2);
        assert!(!plan.is_complete(&map));

        for step in plan.steps() {
            map.apply_drop(step.position, step.level);
        }
        assert!(plan.is_complete(&map));
        assert!(plan.next_target(&map, 3).is_none());
    }
}
