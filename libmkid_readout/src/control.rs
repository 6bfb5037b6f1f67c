//! Filesystem control plane on the shared ramdisk.
//!
//! The operator drives the pipeline by touching files: `START` (containing
//! the bulk-capture destination directory) and `STOP` gate the recorder, and
//! `QUIT` shuts the whole pipeline down. Existence is the signal; `START` is
//! the only file whose contents are read. Each file has a single writer by
//! convention, so no locking is needed at human timescales.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::ControlError;

const START_FILE: &str = "START";
const STOP_FILE: &str = "STOP";
const QUIT_FILE: &str = "QUIT";

/// Shared handle to the control-file directory.
///
/// The quit signal is latched in-process once any worker observes the `QUIT`
/// file, so the recorder deleting the file on its way out cannot strand the
/// other workers, and repeated polls after shutdown stay safe.
#[derive(Debug, Clone)]
pub struct ControlPlane {
    dir: PathBuf,
    quit_latch: Arc<AtomicBool>,
}

impl ControlPlane {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            quit_latch: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once `QUIT` has appeared. Latches on first observation.
    pub fn quit_requested(&self) -> bool {
        if self.quit_latch.load(Ordering::Relaxed) {
            return true;
        }
        if self.dir.join(QUIT_FILE).exists() {
            self.quit_latch.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Consume a pending `START` file and return the capture destination it
    /// names, or `None` if no start has been requested.
    pub fn take_start(&self) -> Result<Option<PathBuf>, ControlError> {
        let path = self.dir.join(START_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        let dest = contents
            .split_whitespace()
            .next()
            .ok_or(ControlError::EmptyStart)?;
        Ok(Some(PathBuf::from(dest)))
    }

    /// Consume a pending `STOP` file. Returns whether one was present.
    pub fn take_stop(&self) -> Result<bool, ControlError> {
        let path = self.dir.join(STOP_FILE);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }

    /// Delete every control file that exists. Used to clear stale files at
    /// startup and by the recorder on shutdown.
    pub fn remove_all(&self) -> Result<(), ControlError> {
        for name in [START_FILE, STOP_FILE, QUIT_FILE] {
            let path = self.dir.join(name);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
