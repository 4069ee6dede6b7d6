use serde::Deserialize;

/// Controller buttons a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Z,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::A,
        Action::B,
        Action::Start,
        Action::Z,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Up => "Up",
            Action::Down => "Down",
            Action::Left => "Left",
            Action::Right => "Right",
            Action::A => "A",
            Action::B => "B",
            Action::Start => "Start",
            Action::Z => "Z",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(name))
    }

    /// Value written to the input register when this action fires. Stable across runs.
    pub fn input_code(self) -> u32 {
        (xxhash_rust::xxh64::xxh64(self.name().as_bytes(), 0) % 0xFFFF) as u32
    }
}

/// Key name bound to each [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub a: String,
    pub b: String,
    pub start: String,
    pub z: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            up: "w".into(),
            down: "s".into(),
            left: "a".into(),
            right: "d".into(),
            a: "j".into(),
            b: "k".into(),
            start: "Return".into(),
            z: "z".into(),
        }
    }
}

impl ControllerConfig {
    pub fn binding(&self, action: Action) -> &str {
        match action {
            Action::Up => &self.up,
            Action::Down => &self.down,
            Action::Left => &self.left,
            Action::Right => &self.right,
            Action::A => &self.a,
            Action::B => &self.b,
            Action::Start => &self.start,
            Action::Z => &self.z,
        }
    }

    pub fn set_binding(&mut self, action: Action, key: impl Into<String>) {
        let slot = match action {
            Action::Up => &mut self.up,
            Action::Down => &mut self.down,
            Action::Left => &mut self.left,
            Action::Right => &mut self.right,
            Action::A => &mut self.a,
            Action::B => &mut self.b,
            Action::Start => &mut self.start,
            Action::Z => &mut self.z,
        };
        *slot = key.into();
    }

    /// First action bound to `key`, in [`Action::ALL`] order.
    pub fn action_for_key(&self, key: &str) -> Option<Action> {
        Action::ALL
            .into_iter()
            .find(|&action| self.binding(action) == key)
    }
}
