//! Hand-off to the external image-to-PNG converter.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};

/// Spawns the downstream renderer for each flushed image.
///
/// The converter runs detached; the aggregator never waits on it. Finished
/// children are reaped opportunistically on the next trigger so they do not
/// pile up over a long observing night. A missing or failing renderer is a
/// lost PNG, never a lost capture.
#[derive(Debug)]
pub struct Renderer {
    program: Option<PathBuf>,
    pending: Vec<Child>,
}

impl Renderer {
    pub fn new(program: Option<PathBuf>) -> Self {
        Self {
            program,
            pending: Vec::new(),
        }
    }

    /// Convert `img_path` into `png_path` in the background.
    pub fn trigger(&mut self, img_path: &Path, png_path: &Path) {
        self.reap_finished();
        let Some(program) = &self.program else {
            return;
        };
        match Command::new(program).arg(img_path).arg(png_path).spawn() {
            Ok(child) => self.pending.push(child),
            Err(e) => spdlog::warn!("Failed to spawn renderer {}: {}", program.display(), e),
        }
    }

    fn reap_finished(&mut self) {
        self.pending.retain_mut(|child| match child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(_) => false,
        });
    }
}
