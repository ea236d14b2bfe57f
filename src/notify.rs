//! Alert presentation: audio cue, image export, and the local
//! contact-authorities placeholder.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frame::decode_data_url;
use crate::Alert;

/// Audible alert cue.
///
/// Implementations own the mute state; `ring` is a no-op while muted.
pub trait Siren {
    fn ring(&mut self);
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
}

/// Terminal-bell siren for the binaries.
#[derive(Debug, Default)]
pub struct TerminalBell {
    muted: bool,
}

impl TerminalBell {
    pub fn new(muted: bool) -> Self {
        Self { muted }
    }
}

impl Siren for TerminalBell {
    fn ring(&mut self) {
        if self.muted {
            return;
        }
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }
}

/// Counting siren for tests.
#[derive(Debug, Default)]
pub struct StubSiren {
    pub rings: u64,
    muted: bool,
}

impl Siren for StubSiren {
    fn ring(&mut self) {
        if !self.muted {
            self.rings += 1;
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }
}

/// Write an alert's annotated still to `dir`, named from its timestamp:
/// `detection-<ISO-stamp-with-dashes>.jpg`. Returns the written path.
pub fn export_alert_image(alert: &Alert, dir: &Path) -> Result<PathBuf> {
    let bytes = decode_data_url(&alert.image)
        .with_context(|| format!("alert {} has no exportable image", alert.id))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create export directory {}", dir.display()))?;
    let path = dir.join(format!("detection-{}.jpg", alert.stamp.filename_stamp()));
    std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Placeholder for the contact-authorities action. Produces only a local
/// confirmation message; no external call is made.
pub fn contact_authorities(alert_count: usize) -> String {
    format!(
        "Security alert: {} weapon detection(s). Contacting law enforcement...",
        alert_count
    )
}
