use std::collections::HashMap;

use proptest::prelude::*;
use stacker::{
    CellView, Direction, GoldLocation, Observation, Position, TileKind, WorldMap, plan_staircase,
    shortest_path, trace,
};

const SIDE: i32 = 6;

/// Codes: 0-5 empty, 6 wall, 7 block level 1, 8 block level 2, 9 block level 3.
fn cell_for(code: u8) -> CellView {
    match code {
        6 => CellView::wall(),
        7 => CellView::block(1),
        8 => CellView::block(2),
        9 => CellView::block(3),
        _ => CellView::empty(),
    }
}

fn grid_cells(codes: &[u8]) -> HashMap<Position, CellView> {
    codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            let p = Position::new(i as i32 % SIDE, i as i32 / SIDE);
            (p, cell_for(*code))
        })
        .collect()
}

/// Observation at `p` with all four neighbors, off-grid ones as walls.
fn observe(cells: &HashMap<Position, CellView>, p: Position) -> Observation {
    let current = cells.get(&p).copied().unwrap_or(CellView::wall());
    Direction::ALL.into_iter().fold(Observation::new(current), |obs, dir| {
        let view = cells.get(&p.step(dir)).copied().unwrap_or(CellView::wall());
        obs.with(dir, view)
    })
}

fn known_map(cells: &HashMap<Position, CellView>) -> WorldMap {
    let mut map = WorldMap::new();
    for p in cells.keys() {
        map.record_observation(*p, &observe(cells, *p));
    }
    map
}

/// Move counts from `from` by repeated relaxation, independent of the BFS under test.
fn relaxed_distances(cells: &HashMap<Position, CellView>, from: Position) -> HashMap<Position, usize> {
    let mut dist: HashMap<Position, usize> = HashMap::from([(from, 0)]);
    loop {
        let mut changed = false;
        for (p, cell) in cells {
            if cell.is_wall() {
                continue;
            }
            for (_, q) in p.neighbors() {
                let (Some(dq), Some(qc)) = (dist.get(&q).copied(), cells.get(&q)) else {
                    continue;
                };
                if qc.is_wall() || qc.level.abs_diff(cell.level) > 1 {
                    continue;
                }
                if dist.get(p).is_none_or(|d| dq + 1 < *d) {
                    dist.insert(*p, dq + 1);
                    changed = true;
                }
            }
        }
        if !changed {
            return dist;
        }
    }
}

fn position_strategy() -> impl Strategy<Value = Position> {
    (0..SIDE, 0..SIDE).prop_map(|(x, y)| Position::new(x, y))
}

proptest! {
    #[test]
    fn paths_are_legal_and_shortest(
        codes in prop::collection::vec(0_u8..10, (SIDE * SIDE) as usize),
        from in position_strategy(),
        to in position_strategy(),
    ) {
        let cells = grid_cells(&codes);
        prop_assume!(!cells[&from].is_wall());
        let map = known_map(&cells);
        let expected = relaxed_distances(&cells, from);

        match shortest_path(&map, from, to) {
            Some(moves) => {
                let visited = trace(from, &moves);
                prop_assert_eq!(visited.last().copied(), Some(to));
                for pair in visited.windows(2) {
                    let a = map.tile(pair[0]).expect("known");
                    let b = map.tile(pair[1]).expect("known");
                    prop_assert!(!a.is_wall() && !b.is_wall());
                    prop_assert!(a.level.abs_diff(b.level) <= 1);
                }
                prop_assert_eq!(Some(moves.len()), expected.get(&to).copied());
            }
            None => prop_assert!(!expected.contains_key(&to)),
        }
    }

    #[test]
    fn repeated_observations_change_nothing(
        codes in prop::collection::vec(0_u8..10, (SIDE * SIDE) as usize),
        walk in prop::collection::vec(position_strategy(), 1..20),
    ) {
        let cells = grid_cells(&codes);
        let mut map = WorldMap::new();
        for p in walk {
            let obs = observe(&cells, p);
            map.record_observation(p, &obs);
            let donors = map.donors().to_vec();
            let visits = map.visit_count(p);
            let frontier = map.frontier().clone();

            let second = map.record_observation(p, &obs);
            prop_assert_eq!(second.tiles_added, 0);
            prop_assert_eq!(second.donors_added, 0);
            prop_assert_eq!(map.donors(), donors.as_slice());
            prop_assert_eq!(map.visit_count(p), visits);
            prop_assert_eq!(map.frontier(), &frontier);

            let mut seen = std::collections::HashSet::new();
            for donor in map.donors() {
                prop_assert!(seen.insert(donor.position));
                let tile = map.tile(donor.position).expect("donor tile known");
                prop_assert_eq!(tile.kind, TileKind::Block);
                prop_assert_eq!(tile.level, donor.level);
            }
        }
    }

    #[test]
    fn frontier_never_overlaps_the_map(
        codes in prop::collection::vec(0_u8..10, (SIDE * SIDE) as usize),
        walk in prop::collection::vec(position_strategy(), 1..30),
    ) {
        let cells = grid_cells(&codes);
        let mut map = WorldMap::new();
        for p in walk {
            map.record_observation(p, &observe(&cells, p));
            for q in map.frontier() {
                prop_assert!(!map.is_known(*q));
            }
        }
    }

    #[test]
    fn staircases_climb_one_level_at_a_time(
        codes in prop::collection::vec(0_u8..8, (SIDE * SIDE) as usize),
        gold in position_strategy(),
        gold_level in 2_u32..7,
    ) {
        let mut cells = grid_cells(&codes);
        cells.insert(gold, CellView::gold(gold_level));
        let map = known_map(&cells);
        let location = GoldLocation { position: gold, level: gold_level };

        if let Some(plan) = plan_staircase(&map, location) {
            let steps = plan.steps();
            let top = plan.final_step().expect("non-empty plan");
            prop_assert_eq!(top.level, gold_level - 1);
            prop_assert!(top.position.is_adjacent(gold));

            let mut levels: Vec<u32> = steps.iter().map(|s| s.level).collect();
            let ones = levels.iter().filter(|l| **l == 1).count();
            prop_assert!(ones == 1 || ones == 2);
            levels.dedup();
            let expected: Vec<u32> = (1..gold_level).rev().collect();
            prop_assert_eq!(levels, expected);

            let mut positions = std::collections::HashSet::new();
            for step in steps {
                prop_assert!(positions.insert(step.position));
                let tile = map.tile(step.position).expect("planned on known tile");
                prop_assert!(!matches!(tile.kind, TileKind::Wall | TileKind::Gold));
                prop_assert!(tile.level <= step.level);
                if step.level < top.level {
                    let has_step_up = steps.iter().any(|up| {
                        up.level == step.level + 1 && up.position.is_adjacent(step.position)
                    });
                    prop_assert!(has_step_up);
                }
            }
        }
    }
}
