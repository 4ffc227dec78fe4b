pub mod modules;

pub use modules::agent::{Agent, AgentState, MAX_TRANSITIONS_PER_TURN};
pub use modules::config::{self, AgentConfig, ConfigError};
pub use modules::donor::{DonorChoice, find_safe_donor};
pub use modules::fallback::FallbackMover;
pub use modules::map::{DonorBlock, GoldLocation, RecordOutcome, Tile, WorldMap};
pub use modules::path::{MAX_CLIMB, nearest_path, shortest_path, trace};
pub use modules::sim::{
    ActionError, EpisodeReport, Game, Outcome, TurnResult, run_episode, run_episode_with,
};
pub use modules::staircase::{Staircase, Step, is_accessible, plan_staircase};
pub use modules::stats::{
    ActionStats, RunRecord, RunStore, append_run, load_runs, reset_runs,
};
pub use modules::types::{Action, CellView, Direction, Observation, Position, TileKind};
pub use modules::view::{
    KnowledgeSnapshot, load_snapshot, save_snapshot, save_snapshot_turn, snapshot_dir,
};
pub use modules::world::{self, Grid, GridSpec, LayoutError, required_blocks};
