use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn origin() -> Self {
        Self { x: 0, y: 0 }
    }

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub const fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// Cardinal neighbors in `Direction::ALL` order.
    pub fn neighbors(self) -> [(Direction, Position); 4] {
        Direction::ALL.map(|dir| (dir, self.step(dir)))
    }

    /// All eight surrounding coordinates, row by row.
    pub fn surrounding(self) -> impl Iterator<Item = Position> {
        (-1..=1)
            .flat_map(move |dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .map(move |(dx, dy)| self.offset(dx, dy))
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Fixed enumeration order; every tie between directions is broken by it.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tile kinds carry the integer tags used on the wire: 0 empty, 1 wall, 2 block, 3 gold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TileKind {
    #[default]
    Empty,
    Wall,
    Block,
    Gold,
}

impl TileKind {
    pub const fn tag(self) -> u8 {
        match self {
            TileKind::Empty => 0,
            TileKind::Wall => 1,
            TileKind::Block => 2,
            TileKind::Gold => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TileKind::Empty => "empty",
            TileKind::Wall => "wall",
            TileKind::Block => "block",
            TileKind::Gold => "gold",
        }
    }
}

impl TryFrom<u8> for TileKind {
    type Error = String;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(TileKind::Empty),
            1 => Ok(TileKind::Wall),
            2 => Ok(TileKind::Block),
            3 => Ok(TileKind::Gold),
            other => Err(format!("unknown tile type {}", other)),
        }
    }
}

impl From<TileKind> for u8 {
    fn from(kind: TileKind) -> u8 {
        kind.tag()
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What the agent sees of one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub level: u32,
}

impl CellView {
    pub const fn new(kind: TileKind, level: u32) -> Self {
        Self { kind, level }
    }

    pub const fn empty() -> Self {
        Self::new(TileKind::Empty, 0)
    }

    pub const fn wall() -> Self {
        Self::new(TileKind::Wall, 0)
    }

    pub const fn block(level: u32) -> Self {
        Self::new(TileKind::Block, level)
    }

    pub const fn gold(level: u32) -> Self {
        Self::new(TileKind::Gold, level)
    }

    pub fn is_wall(&self) -> bool {
        self.kind == TileKind::Wall
    }
}

/// One turn's local view: the tile under the agent plus whichever cardinal neighbors are visible.
///
/// Deserializes from the harness shape `{"type":0,"level":0,"left":{"type":1,"level":0},...}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(flatten)]
    pub current: CellView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<CellView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<CellView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<CellView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<CellView>,
}

impl Observation {
    pub fn new(current: CellView) -> Self {
        Self {
            current,
            ..Self::default()
        }
    }

    pub fn with(mut self, dir: Direction, view: CellView) -> Self {
        *self.slot_mut(dir) = Some(view);
        self
    }

    pub fn neighbor(&self, dir: Direction) -> Option<CellView> {
        match dir {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    fn slot_mut(&mut self, dir: Direction) -> &mut Option<CellView> {
        match dir {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }

    /// Directions that are visible, not walls, and within one level of the current tile.
    pub fn safe_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|dir| self.is_safe(*dir))
            .collect()
    }

    pub fn is_safe(&self, dir: Direction) -> bool {
        match self.neighbor(dir) {
            Some(view) => !view.is_wall() && view.level.abs_diff(self.current.level) <= 1,
            None => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    Move(Direction),
    Pickup,
    Drop,
    Idle,
}

impl Action {
    pub const fn label(&self) -> &'static str {
        match self {
            Action::Move(dir) => dir.label(),
            Action::Pickup => "pickup",
            Action::Drop => "drop",
            Action::Idle => "none",
        }
    }

    pub const fn is_move(&self) -> bool {
        matches!(self, Action::Move(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "left" => Ok(Action::Move(Direction::Left)),
            "right" => Ok(Action::Move(Direction::Right)),
            "up" => Ok(Action::Move(Direction::Up)),
            "down" => Ok(Action::Move(Direction::Down)),
            "pickup" => Ok(Action::Pickup),
            "drop" => Ok(Action::Drop),
            "none" | "idle" => Ok(Action::Idle),
            other => Err(format!(
                "unknown action '{}'; use left|right|up|down|pickup|drop|none",
                other
            )),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Action::from_str(&value)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> String {
        action.label().to_string()
    }
}
