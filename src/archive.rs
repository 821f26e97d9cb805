//! The durable checkpoint: one JSON file per player holding the full
//! accumulated match list plus the offset a resumed run should continue at.
//! Rewritten wholesale after every page, atomically (temp file + rename).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::config::PlayerRef;
use crate::fetch::TerminationReason;
use crate::model::MatchRecord;

pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArchive {
    pub version: u32,
    pub player: PlayerRef,
    pub target_year: i32,
    /// Pagination offset the next session should request first.
    pub next_offset: u32,
    /// Set once the year is fully retrieved; resuming is then a no-op.
    #[serde(default)]
    pub terminated: bool,
    #[serde(default)]
    pub termination_reason: Option<TerminationReason>,
    pub matches: Vec<MatchRecord>,
}

impl MatchArchive {
    pub fn new(player: PlayerRef, target_year: i32) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            player,
            target_year,
            next_offset: 0,
            terminated: false,
            termination_reason: None,
            matches: Vec::new(),
        }
    }
}

pub fn write_archive(path: &Path, archive: &MatchArchive) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create archive dir {}", dir.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(archive).context("serialize match archive")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {} into place", path.display()))?;
    Ok(())
}

/// Loads a checkpoint for resuming. Rejects archives written by a different
/// schema version or for a different player or year rather than mixing runs.
pub fn load_archive(path: &Path, player: &PlayerRef, target_year: i32) -> Result<MatchArchive> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read archive {}", path.display()))?;
    let archive: MatchArchive =
        serde_json::from_str(&raw).context("invalid match archive json")?;
    if archive.version != ARCHIVE_VERSION {
        return Err(anyhow!(
            "archive {} has version {}, expected {}",
            path.display(),
            archive.version,
            ARCHIVE_VERSION
        ));
    }
    if !archive.player.same_player(player) {
        return Err(anyhow!(
            "archive {} belongs to {}, not {}",
            path.display(),
            archive.player,
            player
        ));
    }
    if archive.target_year != target_year {
        return Err(anyhow!(
            "archive {} covers {}, not {}",
            path.display(),
            archive.target_year,
            target_year
        ));
    }
    Ok(archive)
}

/// Read side for the stats binary: just the matches.
pub fn load_archive_matches(path: &Path) -> Result<Vec<MatchRecord>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read archive {}", path.display()))?;
    let archive: MatchArchive =
        serde_json::from_str(&raw).context("invalid match archive json")?;
    Ok(archive.matches)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ARCHIVE_VERSION, MatchArchive, load_archive, write_archive};
    use crate::config::PlayerRef;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("valo_recap_{}_{name}.json", std::process::id()))
    }

    fn player(name: &str, tag: &str) -> PlayerRef {
        PlayerRef {
            name: name.to_string(),
            tag: Some(tag.to_string()),
        }
    }

    #[test]
    fn round_trips_and_leaves_no_temp_file() {
        let path = scratch_path("roundtrip");
        let who = player("Test", "NA1");
        let mut archive = MatchArchive::new(who.clone(), 2025);
        archive.next_offset = 30;
        write_archive(&path, &archive).expect("write should succeed");

        let loaded = load_archive(&path, &who, 2025).expect("load should succeed");
        assert_eq!(loaded.version, ARCHIVE_VERSION);
        assert_eq!(loaded.next_offset, 30);
        assert!(!path.with_extension("json.tmp").exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_foreign_archives() {
        let path = scratch_path("mismatch");
        let archive = MatchArchive::new(player("Someone", "EU1"), 2024);
        write_archive(&path, &archive).expect("write should succeed");

        assert!(load_archive(&path, &player("Someone", "EU1"), 2025).is_err());
        assert!(load_archive(&path, &player("Else", "EU1"), 2024).is_err());
        assert!(load_archive(&path, &player("Someone", "EU1"), 2024).is_ok());
        let _ = std::fs::remove_file(&path);
    }
}
