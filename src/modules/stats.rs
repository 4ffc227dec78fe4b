use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::sim::Outcome;
use crate::modules::types::Action;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStats {
    pub move_count: u64,
    pub pickup_count: u64,
    pub drop_count: u64,
    pub idle_count: u64,
}

impl ActionStats {
    pub fn record(&mut self, action: &Action) {
        match action {
            Action::Move(_) => self.move_count = self.move_count.saturating_add(1),
            Action::Pickup => self.pickup_count = self.pickup_count.saturating_add(1),
            Action::Drop => self.drop_count = self.drop_count.saturating_add(1),
            Action::Idle => self.idle_count = self.idle_count.saturating_add(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.move_count + self.pickup_count + self.drop_count + self.idle_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub recorded_at: DateTime<Utc>,
    /// Layout file, or `generated` for seeded grids.
    pub source: String,
    pub seed: Option<u64>,
    pub gold_level: u32,
    pub outcome: Outcome,
    pub turns: u64,
    pub rejections: u64,
    pub stats: ActionStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStore {
    pub runs: Vec<RunRecord>,
}

impl RunStore {
    pub fn solved(&self) -> usize {
        self.runs.iter().filter(|r| r.outcome == Outcome::Solved).count()
    }

    /// Mean turns over solved runs.
    pub fn mean_solved_turns(&self) -> Option<f64> {
        let solved: Vec<u64> = self
            .runs
            .iter()
            .filter(|r| r.outcome == Outcome::Solved)
            .map(|r| r.turns)
            .collect();
        if solved.is_empty() {
            return None;
        }
        Some(solved.iter().sum::<u64>() as f64 / solved.len() as f64)
    }
}

pub fn stats_dir() -> PathBuf {
    PathBuf::from(".stacker")
}

fn runs_path(dir: &Path) -> PathBuf {
    dir.join("runs.json")
}

pub fn load_runs() -> io::Result<RunStore> {
    load_runs_in(&stats_dir())
}

pub fn load_runs_in(dir: &Path) -> io::Result<RunStore> {
    let path = runs_path(dir);
    if !path.exists() {
        return Ok(RunStore::default());
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(RunStore::default());
    }

    let store: RunStore = serde_json::from_slice(&bytes)?;
    Ok(store)
}

pub fn save_runs_in(dir: &Path, store: &RunStore) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(store)?;
    fs::write(runs_path(dir), json)?;
    Ok(())
}

pub fn append_run(record: RunRecord) -> io::Result<()> {
    append_run_in(&stats_dir(), record)
}

pub fn append_run_in(dir: &Path, record: RunRecord) -> io::Result<()> {
    let mut store = load_runs_in(dir)?;
    store.runs.push(record);
    save_runs_in(dir, &store)
}

pub fn reset_runs() -> io::Result<()> {
    save_runs_in(&stats_dir(), &RunStore::default())
}
