pub mod agent;
pub mod config;
pub mod donor;
pub mod fallback;
pub mod map;
pub mod path;
pub mod sim;
pub mod staircase;
pub mod stats;
pub mod types;
pub mod view;
pub mod world;
