use tracing::debug;

use crate::modules::map::{DonorBlock, WorldMap};
use crate::modules::path::shortest_path;
use crate::modules::staircase::Staircase;
use crate::modules::types::{Direction, Position};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonorChoice {
    pub block: DonorBlock,
    /// Moves to reach the donor; empty when the agent already stands on it.
    pub path: Vec<Direction>,
}

/// Closest reachable donor that is not part of the staircase.
///
/// Stale entries are pruned first. Equal path lengths keep the donor that was
/// discovered earliest.
pub fn find_safe_donor(
    map: &mut WorldMap,
    staircase: Option<&Staircase>,
    from: Position,
) -> Option<DonorChoice> {
    let pruned = map.mark_donors_stale();
    if pruned > 0 {
        debug!(pruned, "dropped stale donors");
    }

    let mut best: Option<DonorChoice> = None;
    for donor in map.donors() {
        if staircase.is_some_and(|s| s.contains(donor.position)) {
            continue;
        }
        let Some(path) = shortest_path(map, from, donor.position) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| path.len() < b.path.len()) {
            best = Some(DonorChoice {
                block: *donor,
                path,
            });
        }
    }

    best
}
