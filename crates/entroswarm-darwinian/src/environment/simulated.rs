//! In-memory simulated environment
//!
//! A deterministic stand-in for a real game instance. Bound keys move a
//! cursor over a square byte grid (`Up`/`Down`/`Left`/`Right`), stamp the
//! cell under it (`A`) or clear it (`B`). Keys the instance has not bound
//! are ignored, the way an emulator ignores keys outside its joypad mapping.
//!
//! Snapshot layout: `[row, column, pen, cells...]`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use entroswarm_common::{KeyBinding, LogicalAction, Placement, Result, SwarmError};
use parking_lot::Mutex;
use tracing::trace;

use super::Environment;

/// Side length of the simulated grid
pub const GRID_SIDE: usize = 16;

const HEADER_LEN: usize = 3;

/// Snapshot length in bytes
pub const SNAPSHOT_LEN: usize = HEADER_LEN + GRID_SIDE * GRID_SIDE;

/// Shared view of what a simulated environment was asked to do
#[derive(Debug, Clone, Default)]
pub struct SimulationProbe {
    inner: Arc<Mutex<ProbeState>>,
}

/// Calls observed by a [`SimulationProbe`]
#[derive(Debug, Clone, Default)]
pub struct ProbeState {
    pub spawns: usize,
    pub configures: usize,
    pub persists: usize,
    pub loads: usize,
    pub teardowns: usize,
    pub executed: Vec<String>,
    pub placement: Option<Placement>,
    pub bindings: Vec<KeyBinding>,
    pub last_loaded: Option<Bytes>,
    /// Make the next persist calls fail
    pub fail_persist: bool,
}

impl SimulationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the observed calls
    pub fn snapshot(&self) -> ProbeState {
        self.inner.lock().clone()
    }

    pub fn set_fail_persist(&self, fail: bool) {
        self.inner.lock().fail_persist = fail;
    }

    fn with<T>(&self, f: impl FnOnce(&mut ProbeState) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

/// Deterministic in-memory game instance
#[derive(Debug)]
pub struct SimulatedEnvironment {
    name: String,
    row: u8,
    column: u8,
    pen: u8,
    cells: Vec<u8>,
    keymap: HashMap<String, LogicalAction>,
    running: bool,
    probe: Option<SimulationProbe>,
}

impl SimulatedEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        let center = (GRID_SIDE / 2) as u8;
        Self {
            name: name.into(),
            row: center,
            column: center,
            pen: 1,
            cells: vec![0; GRID_SIDE * GRID_SIDE],
            keymap: HashMap::new(),
            running: false,
            probe: None,
        }
    }

    /// Record calls into `probe`
    pub fn with_probe(mut self, probe: SimulationProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn record(&self, f: impl FnOnce(&mut ProbeState)) {
        if let Some(probe) = &self.probe {
            probe.with(f);
        }
    }

    fn require_running(&self, operation: &str) -> Result<()> {
        if self.running {
            Ok(())
        } else {
            Err(SwarmError::unavailable(&self.name, operation, "instance is not running"))
        }
    }

    fn apply(&mut self, action: LogicalAction) {
        let side = GRID_SIDE as u8;
        let cell = self.row as usize * GRID_SIDE + self.column as usize;
        match action {
            LogicalAction::Up => self.row = (self.row + side - 1) % side,
            LogicalAction::Down => self.row = (self.row + 1) % side,
            LogicalAction::Left => self.column = (self.column + side - 1) % side,
            LogicalAction::Right => self.column = (self.column + 1) % side,
            LogicalAction::A => {
                self.cells[cell] = self.cells[cell].wrapping_add(self.pen);
                self.pen = self.pen.wrapping_mul(31).wrapping_add(7);
            }
            LogicalAction::B => self.cells[cell] = 0,
        }
    }

    fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(SNAPSHOT_LEN);
        out.extend_from_slice(&[self.row, self.column, self.pen]);
        out.extend_from_slice(&self.cells);
        Bytes::from(out)
    }
}

#[async_trait]
impl Environment for SimulatedEnvironment {
    async fn spawn(&mut self) -> Result<()> {
        self.running = true;
        self.record(|p| p.spawns += 1);
        Ok(())
    }

    async fn configure(&mut self, bindings: &[KeyBinding], placement: Placement) -> Result<()> {
        self.keymap = bindings
            .iter()
            .filter(|b| !b.key.is_none())
            .map(|b| (b.key.name.clone(), b.action))
            .collect();
        self.record(|p| {
            p.configures += 1;
            p.placement = Some(placement);
            p.bindings = bindings.to_vec();
        });
        Ok(())
    }

    async fn execute(&mut self, action: &str) -> Result<()> {
        self.require_running("execute")?;
        if let Some(logical) = self.keymap.get(action).copied() {
            self.apply(logical);
        }
        self.record(|p| p.executed.push(action.to_string()));
        Ok(())
    }

    async fn persist_state(&mut self) -> Result<Bytes> {
        self.require_running("persist state")?;
        let fail = self
            .probe
            .as_ref()
            .map(|p| p.with(|s| s.fail_persist))
            .unwrap_or(false);
        if fail {
            return Err(SwarmError::unavailable(&self.name, "persist state", "simulated failure"));
        }
        self.record(|p| p.persists += 1);
        Ok(self.encode())
    }

    async fn load_state(&mut self, snapshot: &Bytes) -> Result<()> {
        self.require_running("load state")?;
        if snapshot.len() != SNAPSHOT_LEN {
            return Err(SwarmError::unavailable(
                &self.name,
                "load state",
                format!("expected {} bytes, got {}", SNAPSHOT_LEN, snapshot.len()),
            ));
        }
        let side = GRID_SIDE as u8;
        self.row = snapshot[0] % side;
        self.column = snapshot[1] % side;
        self.pen = snapshot[2];
        self.cells.copy_from_slice(&snapshot[HEADER_LEN..]);
        trace!(agent = %self.name, "Loaded simulated snapshot");
        self.record(|p| {
            p.loads += 1;
            p.last_loaded = Some(snapshot.clone());
        });
        Ok(())
    }

    async fn teardown(&mut self) -> Result<()> {
        self.running = false;
        self.record(|p| p.teardowns += 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entroswarm_common::{bind_in_order, PhysicalKey};

    fn bindings() -> Vec<KeyBinding> {
        // A=z B=x Up=i Down=k Left=j Right=l
        bind_in_order(
            [("z", 90), ("x", 88), ("i", 73), ("k", 75), ("j", 74), ("l", 76)]
                .into_iter()
                .map(|(name, value)| PhysicalKey::new(value, name)),
        )
    }

    async fn running() -> SimulatedEnvironment {
        let mut env = SimulatedEnvironment::new("sim-0");
        env.spawn().await.unwrap();
        env.configure(&bindings(), Placement::default()).await.unwrap();
        env
    }

    #[tokio::test]
    async fn test_unbound_keys_are_ignored() {
        let mut env = running().await;
        let before = env.persist_state().await.unwrap();
        env.execute("q").await.unwrap();
        assert_eq!(env.persist_state().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_bound_keys_change_state() {
        let mut env = running().await;
        let before = env.persist_state().await.unwrap();
        for key in ["z", "l", "z", "k", "z"] {
            env.execute(key).await.unwrap();
        }
        let after = env.persist_state().await.unwrap();
        assert_ne!(after, before);
        assert_eq!(after.len(), SNAPSHOT_LEN);
    }

    #[tokio::test]
    async fn test_load_restores_persisted_state() {
        let mut env = running().await;
        let initial = env.persist_state().await.unwrap();
        env.execute("z").await.unwrap();
        env.execute("i").await.unwrap();
        env.load_state(&initial).await.unwrap();
        assert_eq!(env.persist_state().await.unwrap(), initial);
    }

    #[tokio::test]
    async fn test_load_rejects_wrong_size() {
        let mut env = running().await;
        let err = env.load_state(&Bytes::from_static(b"short")).await.unwrap_err();
        assert!(matches!(err, SwarmError::CollaboratorUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_execute_requires_spawn() {
        let mut env = SimulatedEnvironment::new("sim-1");
        assert!(env.execute("z").await.is_err());
    }

    #[tokio::test]
    async fn test_probe_records_calls() {
        let probe = SimulationProbe::new();
        let mut env = SimulatedEnvironment::new("sim-2").with_probe(probe.clone());
        env.spawn().await.unwrap();
        env.configure(&bindings(), Placement::new(245, 0)).await.unwrap();
        env.execute("z").await.unwrap();
        env.teardown().await.unwrap();

        let seen = probe.snapshot();
        assert_eq!(seen.spawns, 1);
        assert_eq!(seen.configures, 1);
        assert_eq!(seen.executed, vec!["z".to_string()]);
        assert_eq!(seen.placement, Some(Placement::new(245, 0)));
        assert_eq!(seen.teardowns, 1);
    }

    #[tokio::test]
    async fn test_probe_can_fail_persist() {
        let probe = SimulationProbe::new();
        let mut env = SimulatedEnvironment::new("sim-3").with_probe(probe.clone());
        env.spawn().await.unwrap();
        probe.set_fail_persist(true);
        assert!(env.persist_state().await.is_err());
    }
}
