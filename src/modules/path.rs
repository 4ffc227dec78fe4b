use std::collections::{HashMap, VecDeque};

use crate::modules::map::WorldMap;
use crate::modules::types::{Direction, Position};

/// Largest level difference a single move may climb or drop.
pub const MAX_CLIMB: u32 = 1;

/// Moves from `from` to `to`, or `None` when known terrain has no legal route.
/// An empty list means the two positions are the same.
pub fn shortest_path(map: &WorldMap, from: Position, to: Position) -> Option<Vec<Direction>> {
    nearest_path(map, from, |p| p == to).map(|(_, path)| path)
}

/// Route to the closest position satisfying `is_goal`, together with that position.
/// Unknown tiles and walls are impassable; neighbors expand in `Direction::ALL` order.
pub fn nearest_path<F>(map: &WorldMap, from: Position, is_goal: F) -> Option<(Position, Vec<Direction>)>
where
    F: Fn(Position) -> bool,
{
    if is_goal(from) {
        return Some((from, Vec::new()));
    }

    let mut parents: HashMap<Position, (Position, Direction)> = HashMap::new();
    let mut queue: VecDeque<Position> = VecDeque::with_capacity(64);
    parents.insert(from, (from, Direction::Left));
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        let level = map.level_at(current).unwrap_or(0);
        for (dir, next) in current.neighbors() {
            if parents.contains_key(&next) {
                continue;
            }
            let Some(tile) = map.tile(next) else {
                continue;
            };
            if tile.is_wall() || tile.level.abs_diff(level) > MAX_CLIMB {
                continue;
            }

            parents.insert(next, (current, dir));
            if is_goal(next) {
                return Some((next, unwind(&parents, from, next)));
            }
            queue.push_back(next);
        }
    }

    None
}

fn unwind(parents: &HashMap<Position, (Position, Direction)>, from: Position, goal: Position) -> Vec<Direction> {
    let mut moves = Vec::new();
    let mut cursor = goal;
    while cursor != from {
        let Some(&(prev, dir)) = parents.get(&cursor) else {
            break;
        };
        moves.push(dir);
        cursor = prev;
    }
    moves.reverse();
    moves
}

/// Positions visited when walking `moves` from `from`, including the start.
pub fn trace(from: Position, moves: &[Direction]) -> Vec<Position> {
    let mut cells = Vec::with_capacity(moves.len() + 1);
    let mut cursor = from;
    cells.push(cursor);
    for dir in moves {
        cursor = cursor.step(*dir);
        cells.push(cursor);
    }
    cells
}
