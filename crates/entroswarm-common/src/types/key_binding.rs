//! Key bindings - logical game actions mapped to physical keys
//!
//! Every agent carries one binding per logical action, always in the order of
//! [`LogicalAction::ALL`]. An idle control agent is bound to [`PhysicalKey::none`]
//! on every slot.

use serde::{Deserialize, Serialize};

/// The fixed set of named game actions an agent can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalAction {
    A,
    B,
    Up,
    Down,
    Left,
    Right,
}

impl LogicalAction {
    /// Canonical binding order
    pub const ALL: [LogicalAction; 6] = [
        LogicalAction::A,
        LogicalAction::B,
        LogicalAction::Up,
        LogicalAction::Down,
        LogicalAction::Left,
        LogicalAction::Right,
    ];

    /// Number of logical actions
    pub const COUNT: usize = Self::ALL.len();

    pub fn name(&self) -> &'static str {
        match self {
            LogicalAction::A => "A",
            LogicalAction::B => "B",
            LogicalAction::Up => "Up",
            LogicalAction::Down => "Down",
            LogicalAction::Left => "Left",
            LogicalAction::Right => "Right",
        }
    }

    /// Joypad entry name in the frontend's ini file
    pub fn ini_key(&self) -> &'static str {
        match self {
            LogicalAction::A => "Joy0_A",
            LogicalAction::B => "Joy0_B",
            LogicalAction::Up => "Joy0_Up",
            LogicalAction::Down => "Joy0_Down",
            LogicalAction::Left => "Joy0_Left",
            LogicalAction::Right => "Joy0_Right",
        }
    }
}

impl std::fmt::Display for LogicalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A physical key: the code written into the frontend configuration and the
/// name used when the key is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalKey {
    /// Virtual key code
    pub value: u32,
    /// Key name as understood by the input layer
    #[serde(alias = "key")]
    pub name: String,
}

impl PhysicalKey {
    pub fn new(value: u32, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }

    /// Sentinel for agents that never act
    pub fn none() -> Self {
        Self::new(0, NO_KEY_NAME)
    }

    pub fn is_none(&self) -> bool {
        self.value == 0
    }
}

/// Name of the sentinel key
pub const NO_KEY_NAME: &str = "No key";

/// One logical action bound to one physical key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub action: LogicalAction,
    pub key: PhysicalKey,
}

impl KeyBinding {
    pub fn new(action: LogicalAction, key: PhysicalKey) -> Self {
        Self { action, key }
    }

    /// Binding to the sentinel key
    pub fn unbound(action: LogicalAction) -> Self {
        Self::new(action, PhysicalKey::none())
    }
}

/// Bind the keys, in order, to [`LogicalAction::ALL`].
///
/// Extra keys are ignored; missing keys leave the remaining actions unbound.
pub fn bind_in_order<I>(keys: I) -> Vec<KeyBinding>
where
    I: IntoIterator<Item = PhysicalKey>,
{
    let mut keys = keys.into_iter();
    LogicalAction::ALL
        .iter()
        .map(|action| match keys.next() {
            Some(key) => KeyBinding::new(*action, key),
            None => KeyBinding::unbound(*action),
        })
        .collect()
}

/// Sentinel binding list for the idle control agent
pub fn no_key_bindings() -> Vec<KeyBinding> {
    LogicalAction::ALL
        .iter()
        .map(|action| KeyBinding::unbound(*action))
        .collect()
}
