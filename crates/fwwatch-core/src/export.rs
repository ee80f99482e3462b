// ── Snapshot export ──
//
// Writes the raw lines of every held event to a timestamp-named file so an
// operator can keep evidence beyond the in-memory window.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::CoreError;
use crate::store::StoreSnapshot;

/// `<dir>/firewall_snapshot_<unix-seconds>.log`
pub fn snapshot_path(dir: &Path, unix_seconds: i64) -> PathBuf {
    dir.join(format!("firewall_snapshot_{unix_seconds}.log"))
}

/// Write one raw line per event, in stored (newest-first) order, to a new
/// file in `dir`. Returns the path written.
pub fn export_snapshot(snapshot: &StoreSnapshot, dir: &Path) -> Result<PathBuf, CoreError> {
    let path = snapshot_path(dir, Utc::now().timestamp());
    write_lines(snapshot, &path).map_err(|source| CoreError::Export {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), events = snapshot.events.len(), "snapshot exported");
    Ok(path)
}

fn write_lines(snapshot: &StoreSnapshot, path: &Path) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for event in &snapshot.events {
        writeln!(out, "{}", event.raw)?;
    }
    out.flush()
}
