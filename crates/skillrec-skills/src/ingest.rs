//! Directory ingestion: scan → parse → upsert.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StoreError;
use crate::loader::load_skill;
use crate::skill::{Skill, normalize_category};
use crate::store::SkillStore;

pub const SKILL_FILE_NAME: &str = "SKILL.md";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IngestMode {
    /// Replace stored skills sharing an id (last write wins).
    #[default]
    Merge,
    /// Leave skills that are already stored untouched.
    SkipExisting,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IngestOptions {
    pub mode: IngestMode,
    /// Remove stored skills that were not seen during the run.
    pub prune: bool,
}

/// One document that could not be turned into a skill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of an ingestion run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IngestReport {
    pub scanned: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub pruned: Vec<String>,
    pub errors: Vec<IngestFailure>,
}

impl IngestReport {
    /// Skills now present in the store as a result of this run.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.added + self.updated + self.unchanged
    }
}

/// Parsed documents from a scan, plus the documents that were rejected.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub skills: Vec<Skill>,
    pub errors: Vec<IngestFailure>,
    pub scanned: usize,
}

/// Category context for a document: the directory above its skill folder, unless that is the
/// scan root itself.
fn category_context(root: &Path, path: &Path) -> Option<String> {
    let skill_dir = path.parent()?;
    let container = skill_dir.parent()?;
    if container == root || !container.starts_with(root) {
        return None;
    }
    let name = container.file_name()?.to_str()?;
    let category = normalize_category(name);
    (!category.is_empty()).then_some(category)
}

/// Sorted `SKILL.md` paths under `root`. Unreadable entries are logged and recorded, the rest
/// of the walk continues.
fn skill_files(root: &Path, errors: &mut Vec<IngestFailure>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build()
    {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file())
                    && entry.file_name() == SKILL_FILE_NAME
                {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("cannot walk {}: {e}", root.display());
                errors.push(IngestFailure {
                    path: walk_error_path(&e).unwrap_or(root).to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }
    files.sort();
    files
}

fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        _ => None,
    }
}

/// Walk the given roots and parse every `SKILL.md` found.
///
/// Hidden entries and gitignored paths are skipped. Rejected documents are logged and
/// collected; they never abort the scan. Within one scan the last document for an id wins.
pub fn scan_skill_documents(roots: &[impl AsRef<Path>]) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for root in roots {
        let root = root.as_ref();
        if !root.is_dir() {
            tracing::warn!("cannot read skill directory: {}", root.display());
            outcome.errors.push(IngestFailure {
                path: root.to_path_buf(),
                message: "skill directory not found".into(),
            });
            continue;
        }

        for path in skill_files(root, &mut outcome.errors) {
            outcome.scanned += 1;
            let category = category_context(root, &path);
            match load_skill(&path, category.as_deref()) {
                Ok(skill) => {
                    if let Some(&idx) = index_by_id.get(&skill.id) {
                        tracing::warn!(
                            skill = %skill.id,
                            "duplicate skill id, {} replaces earlier document",
                            path.display()
                        );
                        outcome.skills[idx] = skill;
                    } else {
                        index_by_id.insert(skill.id.clone(), outcome.skills.len());
                        outcome.skills.push(skill);
                    }
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {e:#}", path.display());
                    outcome.errors.push(IngestFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    outcome
}

/// Apply already-parsed skills to a store.
///
/// # Errors
///
/// Returns an error only when the store itself fails; document errors are carried in the
/// report.
pub async fn apply_scan(
    outcome: ScanOutcome,
    store: &dyn SkillStore,
    options: IngestOptions,
) -> Result<IngestReport, StoreError> {
    let mut report = IngestReport {
        scanned: outcome.scanned,
        errors: outcome.errors,
        ..IngestReport::default()
    };

    let existing: HashMap<String, String> = store
        .get_all()
        .await?
        .into_iter()
        .map(|s| (s.id, s.content_hash))
        .collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(outcome.skills.len());

    for skill in outcome.skills {
        seen.insert(skill.id.clone());
        match existing.get(&skill.id) {
            Some(_) if options.mode == IngestMode::SkipExisting => {
                tracing::debug!(skill = %skill.id, "already stored, skipping");
                report.skipped += 1;
            }
            Some(hash) if *hash == skill.content_hash => report.unchanged += 1,
            Some(_) => {
                store.upsert(skill).await?;
                report.updated += 1;
            }
            None => {
                store.upsert(skill).await?;
                report.added += 1;
            }
        }
    }

    if options.prune {
        let mut stale: Vec<&String> = existing.keys().filter(|id| !seen.contains(*id)).collect();
        stale.sort();
        for id in stale {
            if store.remove(id).await? {
                report.pruned.push(id.clone());
            }
        }
    }

    tracing::info!(
        added = report.added,
        updated = report.updated,
        unchanged = report.unchanged,
        skipped = report.skipped,
        pruned = report.pruned.len(),
        errors = report.errors.len(),
        "skill ingestion complete"
    );
    Ok(report)
}

/// Scan the roots and upsert every valid skill into the store.
///
/// # Errors
///
/// Returns an error only when the store itself fails.
pub async fn ingest(
    roots: &[impl AsRef<Path>],
    store: &dyn SkillStore,
    options: IngestOptions,
) -> Result<IngestReport, StoreError> {
    let outcome = scan_skill_documents(roots);
    apply_scan(outcome, store, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySkillStore;

    fn write_skill(root: &Path, rel: &str, content: &str) -> PathBuf {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SKILL_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    const TTEST: &str = "---\nname: T-Test\ndescription: Compare means with a t-test\ntags: [hypothesis_testing]\n---\nbody";

    #[tokio::test]
    async fn ingest_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "statistical_method/t-test", TTEST);
        write_skill(
            dir.path(),
            "fibonacci",
            "---\nname: Fibonacci Sequence Generator\n---\n",
        );

        let store = InMemorySkillStore::new();
        let report = ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.added, 2);
        assert!(report.errors.is_empty());

        let ttest = store.get_by_id("t-test").await.unwrap().unwrap();
        assert_eq!(ttest.category, "statistical_method");
        let fib = store.get_by_id("fibonacci").await.unwrap().unwrap();
        assert_eq!(fib.category, "general");
    }

    #[tokio::test]
    async fn unclosed_front_matter_is_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "good", TTEST);
        let bad = write_skill(dir.path(), "broken", "---\nname: Broken\nno closing");

        let store = InMemorySkillStore::new();
        let report = ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.loaded(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, bad);
        assert!(report.errors[0].message.contains("unclosed"));

        let all = store.get_all().await.unwrap();
        assert!(all.iter().all(|s| s.id != "broken"));
    }

    #[tokio::test]
    async fn reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "t-test", TTEST);
        let store = InMemorySkillStore::new();

        ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();
        let first = store.get_all().await.unwrap();

        let report = ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();
        let second = store.get_all().await.unwrap();

        assert_eq!(report.unchanged, 1);
        assert_eq!(report.added, 0);
        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn changed_document_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_skill(dir.path(), "t-test", TTEST);
        let store = InMemorySkillStore::new();
        ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();

        std::fs::write(&path, "---\nname: T-Test v2\n---\n").unwrap();
        let report = ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();
        assert_eq!(report.updated, 1);
        let skill = store.get_by_id("t-test").await.unwrap().unwrap();
        assert_eq!(skill.name, "T-Test v2");
    }

    #[tokio::test]
    async fn skip_existing_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "t-test", "---\nname: New Name\n---\n");
        let store = InMemorySkillStore::with_skills([Skill::new("t-test", "Old Name", "x")]);

        let options = IngestOptions {
            mode: IngestMode::SkipExisting,
            prune: false,
        };
        let report = ingest(&[dir.path()], &store, options).await.unwrap();
        assert_eq!(report.skipped, 1);
        let skill = store.get_by_id("t-test").await.unwrap().unwrap();
        assert_eq!(skill.name, "Old Name");
    }

    #[tokio::test]
    async fn prune_only_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "t-test", TTEST);
        let store = InMemorySkillStore::with_skills([Skill::new("stale", "Stale", "x")]);

        ingest(&[dir.path()], &store, IngestOptions::default())
            .await
            .unwrap();
        assert!(store.get_by_id("stale").await.unwrap().is_some());

        let options = IngestOptions {
            mode: IngestMode::Merge,
            prune: true,
        };
        let report = ingest(&[dir.path()], &store, options).await.unwrap();
        assert_eq!(report.pruned, vec!["stale".to_owned()]);
        assert!(store.get_by_id("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_ids_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "a/dup", "---\nname: First\n---\n");
        write_skill(dir.path(), "b/dup", "---\nname: Second\n---\n");

        let outcome = scan_skill_documents(&[dir.path()]);
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.skills.len(), 1);
        assert_eq!(outcome.skills[0].name, "Second");
    }

    #[test]
    fn hidden_dirs_and_other_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), ".hidden/secret", TTEST);
        std::fs::write(dir.path().join("README.md"), "---\nname: x\n---\n").unwrap();
        std::fs::write(dir.path().join("skill.md"), "---\nname: x\n---\n").unwrap();

        let outcome = scan_skill_documents(&[dir.path()]);
        assert_eq!(outcome.scanned, 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_reported_and_walk_continues() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "t-test", TTEST);
        let locked = dir.path().join("locked");
        write_skill(&locked, "hidden-skill", TTEST);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users read through the mode bits, nothing to observe then
        let readable = std::fs::read_dir(&locked).is_ok();
        let outcome = scan_skill_documents(&[dir.path()]);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        assert_eq!(outcome.scanned, 1);
        assert_eq!(outcome.skills[0].id, "t-test");
        assert!(!outcome.errors.is_empty());
        assert!(outcome.errors.iter().all(|e| e.path.starts_with(&locked)));
    }

    #[test]
    fn missing_root_is_an_error_entry() {
        let outcome = scan_skill_documents(&[Path::new("/nonexistent/skills")]);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.skills.is_empty());
    }
}
