use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::modules::config::DEFAULT_STUCK_THRESHOLD;
use crate::modules::types::{Direction, Observation, Position};

#[derive(Clone, Debug)]
pub struct FallbackMover {
    last_observation: Option<Observation>,
    stuck_count: u32,
    threshold: u32,
}

impl Default for FallbackMover {
    fn default() -> Self {
        Self::new(DEFAULT_STUCK_THRESHOLD)
    }
}

impl FallbackMover {
    pub fn new(threshold: u32) -> Self {
        Self {
            last_observation: None,
            stuck_count: 0,
            threshold,
        }
    }

    /// Feed this turn's observation; identical consecutive observations count toward being stuck.
    pub fn observe(&mut self, obs: &Observation) {
        if self.last_observation.as_ref() == Some(obs) {
            self.stuck_count = self.stuck_count.saturating_add(1);
        } else {
            self.stuck_count = 0;
            self.last_observation = Some(*obs);
        }
    }

    pub fn stuck_count(&self) -> u32 {
        self.stuck_count
    }

    /// More than `threshold` repeats of the same observation.
    pub fn is_stuck(&self) -> bool {
        self.stuck_count > self.threshold
    }

    /// A safe one-step move that best closes the distance to `target`.
    ///
    /// Preference: the axis with the larger gap, then the other axis, then any
    /// remaining safe direction. When stuck, a uniformly random safe direction.
    pub fn safe_move_towards<R: Rng>(
        &self,
        obs: &Observation,
        from: Position,
        target: Position,
        rng: &mut R,
    ) -> Option<Direction> {
        let safe = obs.safe_directions();
        if safe.is_empty() {
            return None;
        }

        if self.is_stuck() {
            let choice = safe.choose(rng).copied();
            debug!(stuck = self.stuck_count, ?choice, "escaping with random move");
            return choice;
        }

        let dx = target.x - from.x;
        let dy = target.y - from.y;
        let horizontal = match dx.signum() {
            1 => Some(Direction::Right),
            -1 => Some(Direction::Left),
            _ => None,
        };
        let vertical = match dy.signum() {
            1 => Some(Direction::Down),
            -1 => Some(Direction::Up),
            _ => None,
        };
        let (primary, secondary) = if dx.abs() >= dy.abs() {
            (horizontal, vertical)
        } else {
            (vertical, horizontal)
        };

        primary
            .into_iter()
            .chain(secondary)
            .find(|dir| safe.contains(dir))
            .or_else(|| safe.first().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::types::CellView;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn open() -> Observation {
        Direction::ALL
            .into_iter()
            .fold(Observation::new(CellView::empty()), |obs, dir| {
                obs.with(dir, CellView::empty())
            })
    }

    #[test]
    fn larger_gap_axis_goes_first() {
        let mover = FallbackMover::default();
        let mut rng = StdRng::seed_from_u64(1);
        let dir = mover.safe_move_towards(&open(), Position::origin(), Position::new(1, -4), &mut rng);
        assert_eq!(dir, Some(Direction::Up));
    }

    #[test]
    fn blocked_primary_falls_to_secondary_then_anything() {
        let mover = FallbackMover::default();
        let mut rng = StdRng::seed_from_u64(1);
        let obs = open().with(Direction::Right, CellView::wall());
        let dir = mover.safe_move_towards(&obs, Position::origin(), Position::new(5, 2), &mut rng);
        assert_eq!(dir, Some(Direction::Down));

        let obs = obs.with(Direction::Down, CellView::block(3));
        let dir = mover.safe_move_towards(&obs, Position::origin(), Position::new(5, 2), &mut rng);
        assert_eq!(dir, Some(Direction::Left));
    }

    #[test]
    fn boxed_in_has_no_move() {
        let mover = FallbackMover::default();
        let mut rng = StdRng::seed_from_u64(1);
        let obs = Observation::new(CellView::empty()).with(Direction::Left, CellView::wall());
        assert!(mover.safe_move_towards(&obs, Position::origin(), Position::new(3, 3), &mut rng).is_none());
    }

    #[test]
    fn repeated_observations_trip_stuck_and_reset() {
        let mut mover = FallbackMover::new(2);
        let obs = open();
        mover.observe(&obs);
        assert!(!mover.is_stuck());
        mover.observe(&obs);
        mover.observe(&obs);
        assert_eq!(mover.stuck_count(), 2);
        assert!(!mover.is_stuck());
        mover.observe(&obs);
        assert!(mover.is_stuck());

        mover.observe(&Observation::new(CellView::block(1)));
        assert_eq!(mover.stuck_count(), 0);
    }

    #[test]
    fn stuck_moves_stay_safe() {
        let mut mover = FallbackMover::new(0);
        let obs = Observation::new(CellView::empty())
            .with(Direction::Left, CellView::wall())
            .with(Direction::Up, CellView::empty())
            .with(Direction::Down, CellView::block(2));
        mover.observe(&obs);
        mover.observe(&obs);
        assert!(mover.is_stuck());
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let dir = mover.safe_move_towards(&obs, Position::origin(), Position::new(9, 0), &mut rng);
            assert_eq!(dir, Some(Direction::Up));
        }
    }
}
