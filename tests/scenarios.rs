use rand::SeedableRng;
use rand::rngs::StdRng;
use stacker::{
    Action, Agent, AgentConfig, AgentState, Game, Grid, GridSpec, Outcome, Position, run_episode,
    run_episode_with,
};

fn agent(seed: u64, max_turns: u64) -> Agent {
    let config = AgentConfig {
        max_turns,
        seed: Some(seed),
        ..AgentConfig::default()
    };
    Agent::with_rng(config, StdRng::seed_from_u64(seed))
}

/// Runs an episode while checking that the agent's dead-reckoned position
/// always matches the game's true position.
fn play(grid: Grid, seed: u64, max_turns: u64) -> (stacker::EpisodeReport, Agent) {
    let start = grid.start();
    let mut game = Game::new(grid);
    let mut agent = agent(seed, max_turns);
    let report = run_episode_with(&mut game, &mut agent, max_turns + 1, |game, agent, _| {
        let believed = agent.position();
        let truth = game.position();
        assert_eq!(
            Position::new(start.x + believed.x, start.y + believed.y),
            truth,
            "agent lost track of its position"
        );
    });
    (report, agent)
}

#[test]
fn walks_onto_low_gold() {
    let grid = Grid::parse("@...G", 1).unwrap();
    let (report, agent) = play(grid, 1, 100);
    assert_eq!(report.outcome, Outcome::Solved);
    assert_eq!(report.rejections, 0);
    assert_eq!(report.turns, 4);
    assert!(agent.staircase().is_none_or(|s| s.is_empty()));
}

#[test]
fn single_block_is_enough_for_level_two_gold() {
    let layout = "\
.....
.@1..
.....
...G.
.....
";
    let grid = Grid::parse(layout, 2).unwrap();
    let (report, agent) = play(grid, 1, 1500);
    assert_eq!(report.outcome, Outcome::Solved);
    assert_eq!(report.rejections, 0);
    assert_eq!(report.stats.pickup_count, 1);
    assert_eq!(report.stats.drop_count, 1);
    assert_eq!(agent.staircase().map(|s| s.len()), Some(1));
}

#[test]
fn builds_a_staircase_to_level_three_gold() {
    let layout = "\
......1
.1.....
.......
...G...
.....1.
.1.....
@.1....
";
    for seed in [1, 2, 3] {
        let grid = Grid::parse(layout, 3).unwrap();
        let (report, agent) = play(grid, seed, 1500);
        assert_eq!(report.outcome, Outcome::Solved, "seed {}", seed);
        assert_eq!(report.rejections, 0, "seed {}", seed);
        assert!(report.stats.pickup_count >= 3);
        assert_eq!(report.stats.pickup_count, report.stats.drop_count);
        assert!(report.staircase_steps >= 2);
        assert!(!agent.is_carrying());
    }
}

#[test]
fn gold_in_a_dead_end_is_abandoned_at_the_ceiling() {
    let layout = "\
@.1.1.
.1....
.####.
...G#.
.####.
1.....
";
    let grid = Grid::parse(layout, 4).unwrap();
    let (report, agent) = play(grid, 5, 200);
    assert_eq!(report.outcome, Outcome::Abandoned);
    assert_eq!(report.final_state, AgentState::Abandoned);
    assert_eq!(report.rejections, 0);
    assert_eq!(report.turns, 200);
    assert!(agent.staircase().is_none());
    assert!(agent.map().gold().is_some());
}

#[test]
fn generated_grids_never_desync_or_break_rules() {
    for seed in 0..4 {
        let spec = GridSpec {
            width: 10,
            height: 10,
            gold_level: 4,
            seed: Some(seed),
            ..GridSpec::default()
        };
        let grid = spec.generate().unwrap();
        let (report, _) = play(grid, seed, 1500);
        assert_eq!(report.rejections, 0, "seed {}", seed);
        assert!(report.turns <= 1500);
    }
}

#[test]
fn same_seed_same_episode() {
    let spec = GridSpec {
        width: 9,
        height: 9,
        gold_level: 3,
        seed: Some(42),
        ..GridSpec::default()
    };
    let run = || {
        let mut game = Game::new(spec.generate().unwrap());
        let mut agent = agent(42, 800);
        let report = run_episode(&mut game, &mut agent, 801);
        (report.outcome, report.turns, report.stats)
    };
    assert_eq!(run(), run());
}

#[test]
fn terminal_agent_only_idles() {
    let grid = Grid::parse("@G", 1).unwrap();
    let mut game = Game::new(grid);
    let mut agent = agent(0, 10);
    let report = run_episode(&mut game, &mut agent, 10);
    assert_eq!(report.outcome, Outcome::Solved);

    assert_eq!(agent.turn(&game.observe()), Action::Idle);
    assert_eq!(agent.state(), AgentState::Done);
    assert_eq!(agent.turn(&game.observe()), Action::Idle);
}
