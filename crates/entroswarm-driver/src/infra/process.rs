//! Process-backed environment
//!
//! Runs one frontend per agent as `<binary> --config <ini> <rom>` inside the
//! agent folder and drives it with newline terminated commands on stdin:
//!
//! ```text
//! key <name>      press and release one key
//! save <path>     write the current state to <path>
//! load <path>     restore the state stored at <path>
//! config <path>   re-read the ini at <path>
//! quit
//! ```

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use entroswarm_common::{KeyBinding, Placement, Result, SwarmError};
use entroswarm_darwinian::Environment;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::ini::{patch_ini, verify_ini};
use crate::config::ProcessSettings;
use crate::workspace::AgentWorkspace;

pub struct ProcessEnvironment {
    name: String,
    workspace: AgentWorkspace,
    settings: ProcessSettings,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl ProcessEnvironment {
    pub fn new(name: impl Into<String>, workspace: AgentWorkspace, settings: ProcessSettings) -> Self {
        Self {
            name: name.into(),
            workspace,
            settings,
            child: None,
            stdin: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workspace(&self) -> &AgentWorkspace {
        &self.workspace
    }

    pub fn is_running(&self) -> bool {
        self.stdin.is_some()
    }

    async fn send(&mut self, operation: &str, command: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SwarmError::unavailable(&self.name, operation, "frontend is not running"))?;

        let line = format!("{command}\n");
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SwarmError::unavailable(&self.name, operation, e))?;
        stdin
            .flush()
            .await
            .map_err(|e| SwarmError::unavailable(&self.name, operation, e))
    }

    /// Patch the ini, then read it back and check it
    async fn write_ini(&self, bindings: &[KeyBinding], placement: Placement) -> std::io::Result<bool> {
        let current = match tokio::fs::read_to_string(&self.workspace.ini).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        tokio::fs::write(&self.workspace.ini, patch_ini(&current, bindings, placement)).await?;

        let written = tokio::fs::read_to_string(&self.workspace.ini).await?;
        Ok(verify_ini(&written, bindings, placement))
    }
}

/// Size and modification time of a save file at one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

async fn stamp(path: &Path) -> Option<FileStamp> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some(FileStamp {
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}

/// Whether `bytes`, read at `current`, is a save written after `before`.
///
/// Content is compared as well as the stamp, since coarse mtime resolution
/// can leave a fresh save with the same timestamp as the old one.
fn is_new_save(
    before: Option<FileStamp>,
    previous: Option<&[u8]>,
    current: FileStamp,
    bytes: &[u8],
) -> bool {
    let stamp_moved = match before {
        Some(before) => current.len != before.len || current.modified > before.modified,
        None => true,
    };
    stamp_moved || previous != Some(bytes)
}

#[async_trait]
impl Environment for ProcessEnvironment {
    #[instrument(skip(self), fields(agent = %self.name))]
    async fn spawn(&mut self) -> Result<()> {
        let mut child = Command::new(&self.workspace.binary)
            .arg("--config")
            .arg(&self.workspace.ini)
            .arg(&self.workspace.rom)
            .current_dir(&self.workspace.dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SwarmError::unavailable(&self.name, "spawn", e))?;

        self.stdin = child.stdin.take();
        self.child = Some(child);
        debug!("Frontend spawned");
        Ok(())
    }

    #[instrument(skip(self, bindings), fields(agent = %self.name))]
    async fn configure(&mut self, bindings: &[KeyBinding], placement: Placement) -> Result<()> {
        let attempts = self.settings.configure_attempts.max(1);
        let delay = Duration::from_millis(self.settings.configure_retry_delay_ms);

        for attempt in 1..=attempts {
            match self.write_ini(bindings, placement).await {
                Ok(true) => {
                    debug!(attempt, "Ini verified");
                    if self.is_running() {
                        let command = format!("config {}", self.workspace.ini.display());
                        self.send("configure", &command).await?;
                    }
                    return Ok(());
                }
                Ok(false) => warn!(attempt, "Ini did not verify, rewriting"),
                Err(e) => warn!(attempt, error = %e, "Ini write failed, retrying"),
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(SwarmError::unavailable(
            &self.name,
            "configure",
            format!("ini not verified after {attempts} attempts"),
        ))
    }

    async fn execute(&mut self, action: &str) -> Result<()> {
        self.send("execute", &format!("key {action}")).await
    }

    /// Ask for a save and wait until it has landed.
    ///
    /// The file is read only once its size and mtime held still across two
    /// consecutive polls, so a save written in several chunks is not picked
    /// up half done.
    #[instrument(skip(self), fields(agent = %self.name))]
    async fn persist_state(&mut self) -> Result<Bytes> {
        let path = self.workspace.snapshot.clone();
        let before = stamp(&path).await;
        let previous = tokio::fs::read(&path).await.ok();
        self.send("persist state", &format!("save {}", path.display())).await?;

        let timeout = Duration::from_millis(self.settings.persist_timeout_ms);
        let poll = Duration::from_millis(self.settings.persist_poll_ms.max(1));
        let deadline = Instant::now() + timeout;
        let mut last_seen: Option<FileStamp> = None;

        loop {
            let current = stamp(&path).await;
            if let Some(current) = current.filter(|c| c.len > 0 && last_seen == Some(*c)) {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| SwarmError::unavailable(&self.name, "persist state", e))?;
                if bytes.len() as u64 == current.len
                    && is_new_save(before, previous.as_deref(), current, &bytes)
                {
                    debug!(bytes = bytes.len(), "Snapshot saved");
                    return Ok(Bytes::from(bytes));
                }
            }
            last_seen = current;

            if Instant::now() >= deadline {
                return Err(SwarmError::unavailable(
                    &self.name,
                    "persist state",
                    format!("{} not rewritten within {} ms", path.display(), timeout.as_millis()),
                ));
            }
            tokio::time::sleep(poll).await;
        }
    }

    #[instrument(skip(self, snapshot), fields(agent = %self.name, bytes = snapshot.len()))]
    async fn load_state(&mut self, snapshot: &Bytes) -> Result<()> {
        let path = self.workspace.snapshot.clone();
        tokio::fs::write(&path, snapshot)
            .await
            .map_err(|e| SwarmError::unavailable(&self.name, "load state", e))?;
        self.send("load state", &format!("load {}", path.display())).await
    }

    #[instrument(skip(self), fields(agent = %self.name))]
    async fn teardown(&mut self) -> Result<()> {
        if self.stdin.is_some() {
            if let Err(e) = self.send("teardown", "quit").await {
                debug!(error = %e, "Quit command not delivered");
            }
        }
        self.stdin = None;

        if let Some(mut child) = self.child.take() {
            let grace = Duration::from_millis(self.settings.shutdown_timeout_ms);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "Frontend exited"),
                _ => {
                    warn!("Frontend did not exit, killing");
                    child
                        .kill()
                        .await
                        .map_err(|e| SwarmError::unavailable(&self.name, "teardown", e))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64, len: u64) -> FileStamp {
        FileStamp {
            len,
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
        }
    }

    #[test]
    fn test_first_save_is_new() {
        assert!(is_new_save(None, None, at(10, 4), b"abcd"));
    }

    #[test]
    fn test_same_second_different_content_is_new() {
        assert!(is_new_save(Some(at(10, 4)), Some(&b"abcd"[..]), at(10, 4), b"wxyz"));
    }

    #[test]
    fn test_untouched_file_is_not_new() {
        assert!(!is_new_save(Some(at(10, 4)), Some(&b"abcd"[..]), at(10, 4), b"abcd"));
    }

    #[test]
    fn test_rewritten_with_same_content_is_new() {
        assert!(is_new_save(Some(at(10, 4)), Some(&b"abcd"[..]), at(11, 4), b"abcd"));
    }
}
