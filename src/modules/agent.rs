use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::modules::config::AgentConfig;
use crate::modules::donor::find_safe_donor;
use crate::modules::fallback::FallbackMover;
use crate::modules::map::WorldMap;
use crate::modules::path::{nearest_path, shortest_path};
use crate::modules::staircase::{Staircase, Step, plan_staircase};
use crate::modules::types::{Action, Direction, Observation, Position, TileKind};

/// State changes allowed within a single turn before the agent gives up and explores.
pub const MAX_TRANSITIONS_PER_TURN: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "layer", rename_all = "snake_case")]
pub enum AgentState {
    Exploring,
    BuildingLayer(u32),
    FinalPhase,
    /// Standing on gold.
    Done,
    /// Turn ceiling exceeded.
    Abandoned,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done | AgentState::Abandoned)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Exploring => write!(f, "exploring"),
            AgentState::BuildingLayer(k) => write!(f, "building layer {}", k),
            AgentState::FinalPhase => write!(f, "final phase"),
            AgentState::Done => write!(f, "done"),
            AgentState::Abandoned => write!(f, "abandoned"),
        }
    }
}

enum Decision {
    Act(Action),
    Advance(AgentState),
}

pub struct Agent<R: Rng = StdRng> {
    config: AgentConfig,
    map: WorldMap,
    position: Position,
    carrying: bool,
    staircase: Option<Staircase>,
    final_step: Option<Step>,
    state: AgentState,
    turns: u64,
    fallback: FallbackMover,
    rng: R,
    /// Map size at the last failed planning attempt.
    failed_plan_at: Option<usize>,
}

impl Agent<StdRng> {
    /// Agent seeded from `config.seed`, or from entropy when unset.
    pub fn new(config: AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Agent<R> {
    pub fn with_rng(config: AgentConfig, rng: R) -> Self {
        let fallback = FallbackMover::new(config.stuck_threshold);
        Self {
            config,
            map: WorldMap::new(),
            position: Position::origin(),
            carrying: false,
            staircase: None,
            final_step: None,
            state: AgentState::Exploring,
            turns: 0,
            fallback,
            rng,
            failed_plan_at: None,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    /// Dead-reckoned position relative to the starting tile.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_carrying(&self) -> bool {
        self.carrying
    }

    pub fn staircase(&self) -> Option<&Staircase> {
        self.staircase.as_ref()
    }

    pub fn final_step(&self) -> Option<Step> {
        self.final_step
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Decide this turn's action. Always returns a valid action.
    pub fn turn(&mut self, obs: &Observation) -> Action {
        self.turns += 1;
        if self.state.is_terminal() {
            return Action::Idle;
        }
        if self.turns > self.config.max_turns {
            warn!(turns = self.turns, max = self.config.max_turns, "turn ceiling reached; abandoning");
            self.state = AgentState::Abandoned;
            return Action::Idle;
        }

        let outcome = self.map.record_observation(self.position, obs);
        if let Some(gold) = outcome.gold_discovered {
            info!(position = %gold.position, level = gold.level, turn = self.turns, "gold sighted");
        }
        self.fallback.observe(obs);

        if obs.current.kind == TileKind::Gold {
            info!(turn = self.turns, "standing on gold");
            self.state = AgentState::Done;
            return Action::Idle;
        }

        let action = self.decide(obs);
        debug!(turn = self.turns, state = %self.state, position = %self.position, %action, "turn");
        self.commit(action, obs);
        action
    }

    fn decide(&mut self, obs: &Observation) -> Action {
        if let Some(dir) = gold_step(obs) {
            return Action::Move(dir);
        }

        for _ in 0..MAX_TRANSITIONS_PER_TURN {
            let decision = match self.state {
                AgentState::Exploring => self.explore(obs),
                AgentState::BuildingLayer(layer) => self.build_layer(obs, layer),
                AgentState::FinalPhase => self.final_phase(obs),
                AgentState::Done | AgentState::Abandoned => return Action::Idle,
            };
            match decision {
                Decision::Act(action) => return action,
                Decision::Advance(next) => {
                    info!(from = %self.state, to = %next, turn = self.turns, "state change");
                    self.state = next;
                }
            }
        }

        warn!(state = %self.state, "no action settled this turn");
        self.explore_move(obs)
    }

    fn commit(&mut self, action: Action, obs: &Observation) {
        match action {
            Action::Move(dir) => self.position = self.position.step(dir),
            Action::Pickup => {
                self.map.apply_pickup(self.position);
                self.carrying = true;
            }
            Action::Drop => {
                self.map.apply_drop(self.position, obs.current.level + 1);
                self.carrying = false;
            }
            Action::Idle => {}
        }
    }

    fn explore(&mut self, obs: &Observation) -> Decision {
        if let Some(next) = self.try_plan() {
            return Decision::Advance(next);
        }
        Decision::Act(self.explore_move(obs))
    }

    /// Plan once the map looks rich enough. Failures wait for the map to grow.
    fn try_plan(&mut self) -> Option<AgentState> {
        let gold = self.map.gold()?;
        if gold.level > 1 {
            if self.map.donors().len() < self.config.min_donors(gold.level) {
                return None;
            }
            if self.map.len() < self.config.min_explored_cells(gold.level) {
                return None;
            }
        }
        if self.failed_plan_at == Some(self.map.len()) {
            return None;
        }

        match plan_staircase(&self.map, gold) {
            Some(stairs) => {
                info!(
                    steps = stairs.len(),
                    top = ?stairs.final_step().map(|s| s.position),
                    origin = ?stairs.layer_origin(),
                    "staircase planned"
                );
                let next = if stairs.is_empty() {
                    AgentState::FinalPhase
                } else {
                    AgentState::BuildingLayer(1)
                };
                self.final_step = stairs.final_step();
                self.staircase = Some(stairs);
                self.failed_plan_at = None;
                Some(next)
            }
            None => {
                debug!(known = self.map.len(), donors = self.map.donors().len(), "planning failed");
                self.failed_plan_at = Some(self.map.len());
                None
            }
        }
    }

    fn build_layer(&mut self, obs: &Observation, layer: u32) -> Decision {
        let Some(stairs) = self.staircase.as_ref() else {
            warn!(layer, "building without a staircase; replanning");
            return Decision::Advance(AgentState::Exploring);
        };
        if layer > stairs.max_level() || stairs.is_complete(&self.map) {
            return Decision::Advance(AgentState::FinalPhase);
        }
        match stairs.next_target(&self.map, layer) {
            Some(target) => Decision::Act(self.deliver_to(obs, target.position)),
            None => Decision::Advance(AgentState::BuildingLayer(layer + 1)),
        }
    }

    fn final_phase(&mut self, obs: &Observation) -> Decision {
        let Some(gold) = self.map.gold() else {
            warn!("final phase without a known gold tile");
            return Decision::Advance(AgentState::Exploring);
        };
        let needed = gold.level.saturating_sub(1);

        match self.final_step {
            Some(step) if Staircase::built_level(&self.map, &step) < needed => {
                Decision::Act(self.deliver_to(obs, step.position))
            }
            Some(_) => Decision::Act(self.route_to(obs, gold.position)),
            None if self.staircase.as_ref().is_some_and(|s| s.is_empty()) => {
                Decision::Act(self.route_to(obs, gold.position))
            }
            None => {
                warn!("final phase without a final step; replanning");
                self.staircase = None;
                self.failed_plan_at = None;
                Decision::Advance(AgentState::Exploring)
            }
        }
    }

    /// Bring a block to `target` and drop it there, fetching one first if needed.
    fn deliver_to(&mut self, obs: &Observation, target: Position) -> Action {
        if self.carrying {
            if self.position == target {
                return Action::Drop;
            }
            return self.route_to(obs, target);
        }

        match find_safe_donor(&mut self.map, self.staircase.as_ref(), self.position) {
            Some(choice) => match choice.path.first() {
                None => Action::Pickup,
                Some(&dir) if obs.is_safe(dir) => Action::Move(dir),
                Some(_) => self.route_to(obs, choice.block.position),
            },
            None => {
                debug!("no reachable donor; exploring for blocks");
                self.explore_move(obs)
            }
        }
    }

    /// One move toward `target`: known route, then directed fallback, then exploration.
    fn route_to(&mut self, obs: &Observation, target: Position) -> Action {
        if let Some(path) = shortest_path(&self.map, self.position, target)
            && let Some(&dir) = path.first()
            && obs.is_safe(dir)
        {
            return Action::Move(dir);
        }

        let fallback = self
            .fallback
            .safe_move_towards(obs, self.position, target, &mut self.rng);
        match fallback {
            Some(dir) => {
                debug!(%target, %dir, "no known route; moving greedily");
                Action::Move(dir)
            }
            None => self.explore_move(obs),
        }
    }

    /// Exploration step: reveal nearby unknowns first, then head for the nearest
    /// cell that would reveal something, then wander to the least-visited neighbor.
    fn explore_move(&mut self, obs: &Observation) -> Action {
        let safe = obs.safe_directions();
        if safe.is_empty() {
            return Action::Idle;
        }

        if self.fallback.is_stuck() {
            let target = self.map.gold().map(|g| g.position).unwrap_or(self.position);
            if let Some(dir) = self
                .fallback
                .safe_move_towards(obs, self.position, target, &mut self.rng)
            {
                return Action::Move(dir);
            }
        }

        let revealing: Vec<(Direction, usize)> = safe
            .iter()
            .map(|dir| (*dir, self.map.frontier_neighbors(self.position.step(*dir))))
            .filter(|(_, unknown)| *unknown > 0)
            .collect();
        if let Some(dir) = pick_max(&revealing, &mut self.rng) {
            return Action::Move(dir);
        }

        let map = &self.map;
        let here = self.position;
        if let Some((_, path)) = nearest_path(map, here, |p| p != here && map.frontier_neighbors(p) > 0)
            && let Some(&dir) = path.first()
            && obs.is_safe(dir)
        {
            return Action::Move(dir);
        }

        // Least visited; negate so the shared max-picker applies.
        let visits: Vec<(Direction, i64)> = safe
            .iter()
            .map(|dir| (*dir, -i64::from(self.map.visit_count(self.position.step(*dir)))))
            .collect();
        match pick_max(&visits, &mut self.rng) {
            Some(dir) => Action::Move(dir),
            None => Action::Idle,
        }
    }
}

/// A safe direction leading straight onto gold.
fn gold_step(obs: &Observation) -> Option<Direction> {
    Direction::ALL.into_iter().find(|dir| {
        obs.neighbor(*dir).is_some_and(|v| v.kind == TileKind::Gold) && obs.is_safe(*dir)
    })
}

/// Highest-scoring direction, ties broken at random.
fn pick_max<T: Ord + Copy, R: Rng>(scored: &[(Direction, T)], rng: &mut R) -> Option<Direction> {
    let best = scored.iter().map(|(_, score)| *score).max()?;
    let tied: Vec<Direction> = scored
        .iter()
        .filter(|(_, score)| *score == best)
        .map(|(dir, _)| *dir)
        .collect();
    tied.choose(rng).copied()
}
