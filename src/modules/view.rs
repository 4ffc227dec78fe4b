use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modules::agent::{Agent, AgentState};
use crate::modules::map::{DonorBlock, GoldLocation, Tile};
use crate::modules::staircase::Step;
use crate::modules::types::Position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    pub position: Position,
    #[serde(flatten)]
    pub tile: Tile,
}

/// Everything the agent believes about the world at one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    pub turn: u64,
    pub state: AgentState,
    pub position: Position,
    pub carrying: bool,
    pub gold: Option<GoldLocation>,
    pub staircase: Vec<Step>,
    pub donors: Vec<DonorBlock>,
    pub frontier: Vec<Position>,
    pub tiles: Vec<TileView>,
}

impl KnowledgeSnapshot {
    pub fn capture<R: Rng>(agent: &Agent<R>) -> Self {
        let map = agent.map();
        let mut tiles: Vec<TileView> = map
            .tiles()
            .map(|(position, tile)| TileView {
                position: *position,
                tile: *tile,
            })
            .collect();
        tiles.sort_by_key(|t| (t.position.y, t.position.x));

        Self {
            turn: agent.turns(),
            state: agent.state(),
            position: agent.position(),
            carrying: agent.is_carrying(),
            gold: map.gold(),
            staircase: agent
                .staircase()
                .map(|s| s.steps().to_vec())
                .unwrap_or_default(),
            donors: map.donors().to_vec(),
            frontier: map.frontier().iter().copied().collect(),
            tiles,
        }
    }
}

pub fn snapshot_dir() -> PathBuf {
    PathBuf::from(".stacker")
}

pub fn snapshot_file_path(dir: &Path) -> PathBuf {
    dir.join("snapshot.json")
}

pub fn snapshots_dir(dir: &Path) -> PathBuf {
    dir.join("snapshots")
}

pub fn save_snapshot(dir: &Path, snapshot: &KnowledgeSnapshot) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = snapshot_file_path(dir);
    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(&path, json)?;
    Ok(path)
}

pub fn save_snapshot_turn(dir: &Path, snapshot: &KnowledgeSnapshot) -> io::Result<PathBuf> {
    let dir = snapshots_dir(dir);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("turn_{:06}.json", snapshot.turn));
    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(&path, json)?;
    Ok(path)
}

pub fn load_snapshot(dir: &Path) -> io::Result<Option<KnowledgeSnapshot>> {
    let path = snapshot_file_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let snapshot = serde_json::from_slice(&bytes)?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::config::AgentConfig;
    use crate::modules::types::{CellView, Direction, Observation};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn captures_and_reloads_agent_knowledge() {
        let mut agent = Agent::with_rng(AgentConfig::default(), StdRng::seed_from_u64(5));
        let obs = Observation::new(CellView::empty())
            .with(Direction::Left, CellView::block(1))
            .with(Direction::Right, CellView::gold(3))
            .with(Direction::Up, CellView::wall())
            .with(Direction::Down, CellView::empty());
        agent.turn(&obs);

        let snapshot = KnowledgeSnapshot::capture(&agent);
        assert_eq!(snapshot.turn, 1);
        assert_eq!(snapshot.tiles.len(), 5);
        assert_eq!(snapshot.tiles[0].position, Position::new(0, -1));
        assert_eq!(snapshot.donors.len(), 1);
        assert_eq!(snapshot.gold.map(|g| g.level), Some(3));
        assert!(!snapshot.frontier.is_empty());

        let dir = std::env::temp_dir().join(format!("stacker-view-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        save_snapshot(&dir, &snapshot).unwrap();
        let per_turn = save_snapshot_turn(&dir, &snapshot).unwrap();
        assert!(per_turn.ends_with("snapshots/turn_000001.json"));
        assert_eq!(load_snapshot(&dir).unwrap(), Some(snapshot));
        let _ = fs::remove_dir_all(&dir);
    }
}
