//! Working directory: one folder per agent holding its own copies of the
//! frontend, ini and rom, plus its snapshot slot.

use std::fs;
use std::path::{Path, PathBuf};

use entroswarm_common::Result;
use tracing::{debug, info};

use crate::config::ReferenceSettings;

/// Snapshot slot file name inside each agent folder
pub const SNAPSHOT_FILE: &str = "current.sgm";

/// Paths owned by one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentWorkspace {
    pub dir: PathBuf,
    pub binary: PathBuf,
    pub ini: PathBuf,
    pub rom: PathBuf,
    pub snapshot: PathBuf,
}

/// The run's working directory
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Remove anything left from a previous run and recreate the root
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        info!(path = %root.display(), "Prepared working directory");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the agent's folder and copy the reference files into it
    pub fn provision(&self, name: &str, reference: &ReferenceSettings) -> Result<AgentWorkspace> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)?;

        let workspace = AgentWorkspace {
            binary: copy_into(&reference.binary, &dir)?,
            ini: copy_into(&reference.ini, &dir)?,
            rom: copy_into(&reference.rom, &dir)?,
            snapshot: dir.join(SNAPSHOT_FILE),
            dir,
        };
        debug!(agent = name, dir = %workspace.dir.display(), "Provisioned agent folder");
        Ok(workspace)
    }
}

/// Copy `source` into `dir` under its own file name
fn copy_into(source: &Path, dir: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        entroswarm_common::ConfigurationError::InvalidParameter(format!(
            "reference path has no file name: {}",
            source.display()
        ))
    })?;
    let target = dir.join(name);
    fs::copy(source, &target)?;
    Ok(target)
}
