use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::modules::agent::{Agent, AgentState};
use crate::modules::stats::ActionStats;
use crate::modules::types::{Action, CellView, Direction, Observation, Position, TileKind};
use crate::modules::world::Grid;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionError {
    #[error("cannot move {dir}: wall or edge of the grid")]
    Blocked { dir: Direction },
    #[error("cannot move {dir}: level {from} to {to} is too steep")]
    TooSteep { dir: Direction, from: u32, to: u32 },
    #[error("already carrying a block")]
    AlreadyCarrying,
    #[error("no block here to pick up")]
    NoBlock,
    #[error("not carrying a block")]
    NotCarrying,
    #[error("cannot drop onto gold")]
    DropOnGold,
    #[error("game already solved")]
    Solved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub turn: u64,
    pub action: Action,
    pub rejection: Option<ActionError>,
    pub solved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Solved,
    Abandoned,
    OutOfTurns,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Solved => write!(f, "solved"),
            Outcome::Abandoned => write!(f, "abandoned"),
            Outcome::OutOfTurns => write!(f, "out of turns"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    grid: Grid,
    position: Position,
    carrying: bool,
    turn: u64,
    solved: bool,
}

impl Game {
    pub fn new(grid: Grid) -> Self {
        let position = grid.start();
        Self {
            grid,
            position,
            carrying: false,
            turn: 0,
            solved: false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_carrying(&self) -> bool {
        self.carrying
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// What the agent sees from its true position. Off-grid neighbors read as walls.
    pub fn observe(&self) -> Observation {
        let current = self.grid.get(self.position).unwrap_or_default();
        Direction::ALL
            .into_iter()
            .fold(Observation::new(current), |obs, dir| {
                let view = self
                    .grid
                    .get(self.position.step(dir))
                    .unwrap_or(CellView::wall());
                obs.with(dir, view)
            })
    }

    /// Apply one action. Rejected actions leave the game unchanged.
    pub fn apply(&mut self, action: Action) -> TurnResult {
        self.turn += 1;
        let rejection = self.try_apply(action).err();
        if let Some(err) = &rejection {
            debug!(turn = self.turn, %action, %err, "action rejected");
        }
        TurnResult {
            turn: self.turn,
            action,
            rejection,
            solved: self.solved,
        }
    }

    fn try_apply(&mut self, action: Action) -> Result<(), ActionError> {
        if self.solved {
            return Err(ActionError::Solved);
        }
        let here = self.grid.get(self.position).unwrap_or_default();

        match action {
            Action::Idle => {}
            Action::Move(dir) => {
                let target = self.position.step(dir);
                let cell = self
                    .grid
                    .get(target)
                    .filter(|c| !c.is_wall())
                    .ok_or(ActionError::Blocked { dir })?;
                if cell.level.abs_diff(here.level) > 1 {
                    return Err(ActionError::TooSteep {
                        dir,
                        from: here.level,
                        to: cell.level,
                    });
                }
                self.position = target;
                if cell.kind == TileKind::Gold {
                    info!(turn = self.turn, "gold reached");
                    self.solved = true;
                }
            }
            Action::Pickup => {
                if self.carrying {
                    return Err(ActionError::AlreadyCarrying);
                }
                if here.kind != TileKind::Block || here.level == 0 {
                    return Err(ActionError::NoBlock);
                }
                let level = here.level - 1;
                let cell = if level == 0 {
                    CellView::empty()
                } else {
                    CellView::block(level)
                };
                self.grid.set(self.position, cell);
                self.carrying = true;
            }
            Action::Drop => {
                if !self.carrying {
                    return Err(ActionError::NotCarrying);
                }
                if here.kind == TileKind::Gold {
                    return Err(ActionError::DropOnGold);
                }
                self.grid.set(self.position, CellView::block(here.level + 1));
                self.carrying = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub outcome: Outcome,
    pub turns: u64,
    pub rejections: u64,
    pub stats: ActionStats,
    pub final_state: AgentState,
    pub staircase_steps: usize,
    pub known_tiles: usize,
}

/// Drive `agent` against `game` until solved, abandoned or `max_turns` elapse.
pub fn run_episode<R: Rng>(game: &mut Game, agent: &mut Agent<R>, max_turns: u64) -> EpisodeReport {
    run_episode_with(game, agent, max_turns, |_, _, _| {})
}

/// Like [`run_episode`], calling `on_turn` after every applied action.
pub fn run_episode_with<R, F>(
    game: &mut Game,
    agent: &mut Agent<R>,
    max_turns: u64,
    mut on_turn: F,
) -> EpisodeReport
where
    R: Rng,
    F: FnMut(&Game, &Agent<R>, &TurnResult),
{
    let mut stats = ActionStats::default();
    let mut rejections = 0;

    let outcome = loop {
        if game.is_solved() {
            break Outcome::Solved;
        }
        if game.turn() >= max_turns {
            break Outcome::OutOfTurns;
        }

        let action = agent.turn(&game.observe());
        if agent.state() == AgentState::Abandoned {
            break Outcome::Abandoned;
        }

        let result = game.apply(action);
        stats.record(&action);
        if result.rejection.is_some() {
            rejections += 1;
        }
        on_turn(game, agent, &result);
    };

    info!(?outcome, turns = game.turn(), rejections, "episode finished");
    EpisodeReport {
        outcome,
        turns: game.turn(),
        rejections,
        stats,
        final_state: agent.state(),
        staircase_steps: agent.staircase().map(|s| s.len()).unwrap_or(0),
        known_tiles: agent.map().len(),
    }
}
