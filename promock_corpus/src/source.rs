//! Snapshot files on disk.

use chrono::{DateTime, Utc};
use promock_core::{parse_snapshot_bytes, ParseReport};
use std::io;
use std::path::{Path, PathBuf};

/// One visible snapshot file. The full list doubles as the change
/// fingerprint of the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub len: u64,
}

/// List regular files in `dir` carrying `extension`, ordered by
/// (modification time, path).
pub async fn scan_directory(dir: &Path, extension: &str) -> io::Result<Vec<SnapshotFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        files.push(SnapshotFile {
            path,
            modified,
            len: metadata.len(),
        });
    }

    files.sort_by(|a, b| (a.modified, &a.path).cmp(&(b.modified, &b.path)));
    Ok(files)
}

/// Read and parse one snapshot, stamping samples with the file's
/// modification time unless they carry their own timestamp. Undecodable
/// lines end up in the report's errors.
pub async fn read_snapshot(file: &SnapshotFile) -> io::Result<ParseReport> {
    let bytes = tokio::fs::read(&file.path).await?;
    Ok(parse_snapshot_bytes(&bytes, file.modified))
}
