//! Alert-rule consolidation and hash-gated sync.
//!
//! Rule files from every source identity are consolidated into one
//! directory, the aggregate content is hashed, and the external
//! rules-sync tool runs only when that hash moved since the last
//! successful sync (recorded in a sidecar file next to the rules).

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors raised by the external rules-sync tool invocation.
#[derive(Debug, Error)]
pub enum RulesSyncError {
    #[error("failed to launch rules-sync tool: {0}")]
    Launch(#[from] io::Error),

    #[error("rules-sync tool exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Invocation of the external rules-sync tool.
#[derive(Debug, Clone)]
pub struct RulesSync {
    tool: PathBuf,
}

impl RulesSync {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Run the tool against the public URL of the deployment.
    ///
    /// Stdout/stderr are captured; a failure is reported to the caller,
    /// who logs it and retries on the next naturally-triggered tick.
    pub fn run(&self, external_url: &str, rules_dir: &Path) -> Result<(), RulesSyncError> {
        let output = Command::new(&self.tool)
            .arg("rules")
            .arg("sync")
            .arg("--address")
            .arg(external_url)
            .arg("--rule-dirs")
            .arg(rules_dir)
            .output()?;

        if output.status.success() {
            debug!(
                stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
                "rules sync complete"
            );
            Ok(())
        } else {
            Err(RulesSyncError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

/// Copy every regular file under `sources` into `dest` (flat), creating
/// `dest` first. Returns the destination paths written.
pub fn consolidate_rules(sources: &[PathBuf], dest: &Path) -> io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dest)?;
    let mut written = Vec::new();

    for source in sources {
        if !source.exists() {
            debug!(source = %source.display(), "rules source absent, skipping");
            continue;
        }
        for entry in WalkDir::new(source).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let target = dest.join(entry.file_name());
            std::fs::copy(entry.path(), &target)?;
            written.push(target);
        }
    }

    debug!(files = written.len(), dest = %dest.display(), "consolidated alert rules");
    Ok(written)
}

/// Hash the aggregate rule set: file names and contents, in sorted order.
///
/// Dotfiles are excluded so the hash sidecar itself never perturbs the
/// hash it records.
pub fn aggregate_hash(dir: &Path) -> io::Result<String> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && !entry.file_name().to_string_lossy().starts_with('.')
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let mut hasher = Sha256::new();
    for file in files {
        if let Some(name) = file.file_name() {
            hasher.update(name.as_encoded_bytes());
        }
        hasher.update(std::fs::read(&file)?);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Sync the consolidated rules when their aggregate hash moved.
///
/// The sidecar is updated only after a successful tool run, so a failed
/// sync is retried next tick. Returns whether a sync ran successfully.
pub fn sync_if_changed(
    sync: &RulesSync,
    rules_dir: &Path,
    hash_file: &Path,
    external_url: &str,
) -> bool {
    let current = match aggregate_hash(rules_dir) {
        Ok(hash) => hash,
        Err(err) => {
            warn!(error = %err, "failed to hash rule set, skipping sync");
            return false;
        }
    };

    let previous = std::fs::read_to_string(hash_file).unwrap_or_default();
    if previous.trim() == current {
        debug!("rule set unchanged, skipping sync");
        return false;
    }

    match sync.run(external_url, rules_dir) {
        Ok(()) => {
            if let Err(err) = std::fs::write(hash_file, &current) {
                warn!(error = %err, "failed to record rules hash");
            }
            info!(hash = %current, "rule set synced");
            true
        }
        Err(err) => {
            warn!(error = %err, "rules sync failed, will retry next tick");
            false
        }
    }
}

// The sidecar file lives alongside the rules so wiping the rules
// directory also forgets the last-synced hash.
pub fn default_hash_file(rules_dir: &Path) -> PathBuf {
    rules_dir.join(".rules.sha256")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn consolidation_copies_all_source_files() {
        let root = tempfile::tempdir().unwrap();
        let nginx_rules = root.path().join("nginx");
        let worker_rules = root.path().join("workers");
        write(&nginx_rules, "nginx.rules", "groups: []\n");
        write(&worker_rules, "workers.rules", "groups: []\n");

        let dest = root.path().join("consolidated");
        let written =
            consolidate_rules(&[nginx_rules, worker_rules], &dest).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dest.join("nginx.rules").exists());
        assert!(dest.join("workers.rules").exists());
    }

    #[test]
    fn absent_sources_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let dest = root.path().join("consolidated");
        let missing = root.path().join("nope");

        let written = consolidate_rules(&[missing], &dest).unwrap();
        assert!(written.is_empty());
        assert!(dest.exists());
    }

    #[test]
    fn aggregate_hash_tracks_content() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("rules");
        write(&dir, "a.rules", "one");

        let first = aggregate_hash(&dir).unwrap();
        assert_eq!(first, aggregate_hash(&dir).unwrap());

        write(&dir, "a.rules", "two");
        assert_ne!(first, aggregate_hash(&dir).unwrap());
    }

    #[test]
    fn aggregate_hash_tracks_file_set() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("rules");
        write(&dir, "a.rules", "one");

        let first = aggregate_hash(&dir).unwrap();
        write(&dir, "b.rules", "one");
        assert_ne!(first, aggregate_hash(&dir).unwrap());
    }

    #[test]
    fn failed_tool_leaves_sidecar_untouched() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("rules");
        write(&dir, "a.rules", "one");
        let hash_file = default_hash_file(&dir);

        let sync = RulesSync::new("/definitely/not/a/tool");
        let synced = sync_if_changed(&sync, &dir, &hash_file, "http://example.com");

        assert!(!synced);
        assert!(!hash_file.exists());
    }

    #[test]
    fn successful_tool_records_hash_and_skips_next_tick() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("rules");
        write(&dir, "a.rules", "one");
        // Sidecar lives inside the rules dir; it must not feed back
        // into the aggregate hash.
        let hash_file = default_hash_file(&dir);

        // `true` exits 0 regardless of arguments.
        let sync = RulesSync::new("/bin/true");
        assert!(sync_if_changed(&sync, &dir, &hash_file, "http://example.com"));
        assert!(hash_file.exists());

        // Unchanged rule set: no second sync.
        assert!(!sync_if_changed(&sync, &dir, &hash_file, "http://example.com"));
    }
}
