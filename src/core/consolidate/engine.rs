//! Consolidation of a single duplicate set.

use super::promote::promote;
use super::{ConsolidationPlan, ConsolidationReport, PromoteMode};
use crate::core::fingerprint::fingerprint_file;
use crate::core::index::{FileIndex, FileRecord};
use crate::core::media::MediaKind;
use crate::error::{ConsolidateError, FingerprintError};
use crate::events::{null_sender, ConsolidateEvent, EventSender};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::iter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reduces a duplicate set to one file and one index record
pub struct ConsolidationEngine<'a> {
    index: &'a dyn FileIndex,
    events: EventSender,
    mode: PromoteMode,
}

impl<'a> ConsolidationEngine<'a> {
    pub fn new(index: &'a dyn FileIndex) -> Self {
        Self {
            index,
            events: null_sender(),
            mode: PromoteMode::default(),
        }
    }

    /// Report progress on `events`
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn promote_mode(mut self, mode: PromoteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Consolidate `members` onto `keeper`, returning how many files were
    /// (or on a dry run, would be) removed
    pub fn consolidate(
        &self,
        members: &[PathBuf],
        keeper: &Path,
        dry_run: bool,
    ) -> Result<usize, ConsolidateError> {
        let plan = self.plan(members, keeper)?;
        let report = self.execute(&plan, dry_run)?;
        Ok(report.removed_count())
    }

    /// Work out what consolidating `members` onto `keeper` would do
    pub fn plan(
        &self,
        members: &[PathBuf],
        keeper: &Path,
    ) -> Result<ConsolidationPlan, ConsolidateError> {
        let mut members: BTreeSet<PathBuf> = members.iter().cloned().collect();

        check_exists(members.iter().map(PathBuf::as_path).chain(iter::once(keeper)))?;

        let promote_from = if members.remove(keeper) {
            None
        } else {
            match members.pop_first() {
                Some(source) => Some(source),
                None => {
                    return Err(ConsolidateError::EmptySet {
                        keeper: keeper.to_path_buf(),
                    })
                }
            }
        };

        Ok(ConsolidationPlan {
            keeper: keeper.to_path_buf(),
            promote_from,
            removals: members.into_iter().collect(),
        })
    }

    /// Carry out a plan
    ///
    /// The plan's shape and the existence of every path are checked first,
    /// so a malformed or stale plan fails without changing anything.
    pub fn execute(
        &self,
        plan: &ConsolidationPlan,
        dry_run: bool,
    ) -> Result<ConsolidationReport, ConsolidateError> {
        validate(plan)?;
        check_exists(
            plan.promote_from
                .iter()
                .chain(plan.removals.iter())
                .map(PathBuf::as_path)
                .chain(iter::once(plan.keeper.as_path())),
        )?;

        info!(
            keeper = %plan.keeper.display(),
            promote_from = ?plan.promote_from,
            removals = plan.removal_count(),
            dry_run,
            "Consolidating duplicate set"
        );
        self.events.consolidate(ConsolidateEvent::Planned {
            keeper: plan.keeper.clone(),
            promote_from: plan.promote_from.clone(),
            removals: plan.removal_count(),
            dry_run,
        });

        let mut removed = Vec::with_capacity(plan.removal_count());
        let mut failed = Vec::new();

        match &plan.promote_from {
            Some(source) if dry_run => {
                info!(from = %source.display(), to = %plan.keeper.display(), "Would promote onto keeper");
            }
            Some(source) => {
                let leftover = promote(source, &plan.keeper, self.mode)?;
                self.relocate_record(source, &plan.keeper)?;
                self.events.consolidate(ConsolidateEvent::Promoted {
                    from: source.clone(),
                    to: plan.keeper.clone(),
                });
                if let Some(e) = leftover {
                    self.events.consolidate(ConsolidateEvent::RemoveFailed {
                        path: source.clone(),
                        message: e.to_string(),
                    });
                    failed.push((source.clone(), e.to_string()));
                }
            }
            None if dry_run => {}
            None => {
                if self.index.get(&plan.keeper)?.is_none() {
                    info!(path = %plan.keeper.display(), "Keeper was not cataloged, recording it");
                    self.record_keeper(&plan.keeper)?;
                }
            }
        }

        for path in &plan.removals {
            info!(path = %path.display(), dry_run, "Removing duplicate");
            self.events.consolidate(ConsolidateEvent::Removing {
                path: path.clone(),
                dry_run,
            });

            if dry_run {
                removed.push(path.clone());
                continue;
            }

            match fs::remove_file(path) {
                Ok(()) => removed.push(path.clone()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(path = %path.display(), "Duplicate already gone, dropping its record");
                    removed.push(path.clone());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove duplicate");
                    self.events.consolidate(ConsolidateEvent::RemoveFailed {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                    failed.push((path.clone(), e.to_string()));
                }
            }
        }

        if !dry_run && !removed.is_empty() {
            self.index.delete_batch(&removed)?;
        }

        self.events.consolidate(ConsolidateEvent::Completed {
            removed: removed.len(),
            dry_run,
        });

        if !failed.is_empty() {
            return Err(ConsolidateError::IncompleteCleanup {
                removed: removed.len(),
                failed,
            });
        }

        Ok(ConsolidationReport {
            keeper: plan.keeper.clone(),
            promoted_from: plan.promote_from.clone(),
            removed,
            dry_run,
        })
    }

    /// Point the source's record at the keeper path
    ///
    /// A source the index never saw gets a fresh record for the keeper.
    fn relocate_record(&self, source: &Path, keeper: &Path) -> Result<(), ConsolidateError> {
        if self.index.relocate(source, keeper)? {
            return Ok(());
        }
        self.record_keeper(keeper)
    }

    /// Write a record for the keeper from its bytes on disk; the next
    /// catalog run backfills its capture time
    fn record_keeper(&self, keeper: &Path) -> Result<(), ConsolidateError> {
        let size = fs::metadata(keeper)
            .map_err(|e| ConsolidateError::Fingerprint(FingerprintError::Io {
                path: keeper.to_path_buf(),
                source: e,
            }))?
            .len();
        let record = FileRecord::new(keeper, size, fingerprint_file(keeper)?)
            .with_kind(MediaKind::from_path(keeper));
        self.index.upsert(&record)?;
        Ok(())
    }
}

/// Reject plans that would remove the file they keep
fn validate(plan: &ConsolidationPlan) -> Result<(), ConsolidateError> {
    let invalid = |reason: &str| ConsolidateError::InvalidPlan {
        keeper: plan.keeper.clone(),
        reason: reason.to_string(),
    };

    if plan.promote_from.as_ref() == Some(&plan.keeper) {
        return Err(invalid("keeper is promoted onto itself"));
    }

    let mut seen = BTreeSet::new();
    for path in &plan.removals {
        if *path == plan.keeper {
            return Err(invalid("removals include the keeper"));
        }
        if plan.promote_from.as_ref() == Some(path) {
            return Err(invalid("removals include the promoted member"));
        }
        if !seen.insert(path) {
            return Err(invalid("a removal is listed twice"));
        }
    }
    Ok(())
}

fn check_exists<'p>(paths: impl IntoIterator<Item = &'p Path>) -> Result<(), ConsolidateError> {
    for path in paths {
        if !path.is_file() {
            return Err(ConsolidateError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::InMemoryIndex;
    use crate::events::{Event, EventChannel};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        index: InMemoryIndex,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                index: InMemoryIndex::new(),
            }
        }

        /// Write a file and catalog it
        fn add(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            let record = FileRecord::new(&path, content.len() as u64, fingerprint_file(&path).unwrap())
                .with_kind(MediaKind::Image);
            self.index.upsert(&record).unwrap();
            path
        }

        fn engine(&self) -> ConsolidationEngine<'_> {
            ConsolidationEngine::new(&self.index)
        }
    }

    #[test]
    fn keeper_in_members_removes_the_rest() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");
        let c = fx.add("c.jpg", b"dup");

        let removed = fx.engine().consolidate(&[a.clone(), b.clone(), c.clone()], &b, false).unwrap();

        assert_eq!(removed, 2);
        assert!(!a.exists());
        assert!(b.exists());
        assert!(!c.exists());
        assert_eq!(fx.index.paths().unwrap(), vec![b]);
    }

    #[test]
    fn keeper_outside_members_receives_promoted_file() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");
        let keeper = fx.add("keeper.jpg", b"other");

        let removed = fx.engine().consolidate(&[b.clone(), a.clone()], &keeper, false).unwrap();

        assert_eq!(removed, 1);
        assert!(!a.exists());
        assert!(!b.exists());
        assert_eq!(fs::read(&keeper).unwrap(), b"dup");
        assert_eq!(fx.index.paths().unwrap(), vec![keeper.clone()]);
        let record = fx.index.get(&keeper).unwrap().unwrap();
        assert_eq!(record.fingerprint, fingerprint_file(&keeper).unwrap());
    }

    #[test]
    fn plan_promotes_smallest_path() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");
        let keeper = fx.add("z.jpg", b"dup");

        let plan = fx.engine().plan(&[b.clone(), a.clone(), b.clone()], &keeper).unwrap();

        assert_eq!(plan.promote_from, Some(a));
        assert_eq!(plan.removals, vec![b]);
    }

    #[test]
    fn dry_run_matches_real_count_without_mutation() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");
        let keeper = fx.add("k.jpg", b"dup");
        let members = vec![a.clone(), b.clone()];

        let preview = fx.engine().consolidate(&members, &keeper, true).unwrap();

        assert!(a.exists() && b.exists() && keeper.exists());
        assert_eq!(fx.index.paths().unwrap().len(), 3);

        let removed = fx.engine().consolidate(&members, &keeper, false).unwrap();
        assert_eq!(preview, removed);
    }

    #[test]
    fn missing_member_changes_nothing() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");
        let ghost = fx.dir.path().join("ghost.jpg");

        let result = fx.engine().consolidate(&[a.clone(), b.clone(), ghost.clone()], &a, false);

        match result {
            Err(ConsolidateError::NotFound { path }) => assert_eq!(path, ghost),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(a.exists() && b.exists());
        assert_eq!(fx.index.paths().unwrap().len(), 2);
    }

    #[test]
    fn missing_keeper_changes_nothing() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let keeper = fx.dir.path().join("nope.jpg");

        let result = fx.engine().consolidate(&[a.clone()], &keeper, false);

        assert!(matches!(result, Err(ConsolidateError::NotFound { .. })));
        assert!(a.exists());
    }

    #[test]
    fn empty_set_with_outside_keeper_fails() {
        let fx = Fixture::new();
        let keeper = fx.add("k.jpg", b"x");

        let result = fx.engine().consolidate(&[], &keeper, false);

        assert!(matches!(result, Err(ConsolidateError::EmptySet { .. })));
        assert!(keeper.exists());
    }

    #[test]
    fn keeper_alone_is_a_noop() {
        let fx = Fixture::new();
        let keeper = fx.add("k.jpg", b"x");

        let removed = fx.engine().consolidate(&[keeper.clone()], &keeper, false).unwrap();

        assert_eq!(removed, 0);
        assert!(keeper.exists());
    }

    #[test]
    fn copy_verify_promotes() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let keeper = fx.add("k.jpg", b"dup");

        let removed = fx
            .engine()
            .promote_mode(PromoteMode::CopyVerify)
            .consolidate(&[a.clone()], &keeper, false)
            .unwrap();

        assert_eq!(removed, 0);
        assert!(!a.exists());
        assert_eq!(fx.index.paths().unwrap(), vec![keeper]);
    }

    #[test]
    fn uncataloged_source_gets_fresh_keeper_record() {
        let fx = Fixture::new();
        let stray = fx.dir.path().join("stray.jpg");
        fs::write(&stray, b"dup").unwrap();
        let keeper = fx.dir.path().join("keep.jpg");
        fs::write(&keeper, b"dup").unwrap();

        fx.engine().consolidate(&[stray.clone()], &keeper, false).unwrap();

        let record = fx.index.get(&keeper).unwrap().unwrap();
        assert_eq!(record.size, 3);
        assert_eq!(record.kind, Some(MediaKind::Image));
    }

    #[test]
    fn events_follow_the_removals() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");
        let (sender, receiver) = EventChannel::new();

        fx.engine()
            .events(sender)
            .consolidate(&[a.clone(), b.clone()], &a, true)
            .unwrap();

        let events = receiver.drain();
        assert!(matches!(
            events.first(),
            Some(Event::Consolidate(ConsolidateEvent::Planned { removals: 1, dry_run: true, .. }))
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Consolidate(ConsolidateEvent::Removing { path, .. }) if *path == b
        )));
        assert!(matches!(
            events.last(),
            Some(Event::Consolidate(ConsolidateEvent::Completed { removed: 1, .. }))
        ));
    }

    /// Permission bits do not bind root; restores the directory when they don't
    #[cfg(unix)]
    fn permissions_ignored(dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;

        let canary = dir.join(".canary");
        if fs::write(&canary, b"").is_ok() {
            let _ = fs::remove_file(&canary);
            fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
            return true;
        }
        false
    }

    fn hand_written_plan(
        keeper: &PathBuf,
        promote_from: Option<&PathBuf>,
        removals: &[&PathBuf],
    ) -> ConsolidationPlan {
        ConsolidationPlan {
            keeper: keeper.clone(),
            promote_from: promote_from.cloned(),
            removals: removals.iter().map(|p| (*p).clone()).collect(),
        }
    }

    fn assert_invalid(result: Result<ConsolidationReport, ConsolidateError>, expected_reason: &str) {
        match result {
            Err(ConsolidateError::InvalidPlan { reason, .. }) => assert!(
                reason.contains(expected_reason),
                "unexpected reason: {}",
                reason
            ),
            other => panic!("expected InvalidPlan, got {:?}", other),
        }
    }

    #[test]
    fn plan_removing_its_keeper_is_rejected() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");

        let result = fx.engine().execute(&hand_written_plan(&a, None, &[&a, &b]), false);

        assert_invalid(result, "keeper");
        assert!(a.exists() && b.exists());
        assert_eq!(fx.index.paths().unwrap().len(), 2);
    }

    #[test]
    fn plan_removing_its_promoted_member_is_rejected() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let keeper = fx.add("k.jpg", b"dup");

        let result = fx
            .engine()
            .execute(&hand_written_plan(&keeper, Some(&a), &[&a]), false);

        assert_invalid(result, "promoted member");
        assert!(a.exists() && keeper.exists());
        assert_eq!(fx.index.paths().unwrap().len(), 2);
    }

    #[test]
    fn plan_promoting_keeper_onto_itself_is_rejected() {
        let fx = Fixture::new();
        let keeper = fx.add("k.jpg", b"dup");

        let result = fx
            .engine()
            .execute(&hand_written_plan(&keeper, Some(&keeper), &[]), false);

        assert_invalid(result, "itself");
        assert!(keeper.exists());
    }

    #[test]
    fn plan_with_repeated_removal_is_rejected() {
        let fx = Fixture::new();
        let a = fx.add("a.jpg", b"dup");
        let b = fx.add("b.jpg", b"dup");

        let result = fx.engine().execute(&hand_written_plan(&a, None, &[&b, &b]), true);

        assert_invalid(result, "twice");
        assert!(b.exists());
    }

    #[test]
    fn uncataloged_keeper_member_is_recorded() {
        let fx = Fixture::new();
        let keeper = fx.dir.path().join("a.jpg");
        fs::write(&keeper, b"dup").unwrap();
        let b = fx.add("b.jpg", b"dup");

        let removed = fx.engine().consolidate(&[keeper.clone(), b.clone()], &keeper, false).unwrap();

        assert_eq!(removed, 1);
        assert!(!b.exists());
        assert_eq!(fx.index.paths().unwrap(), vec![keeper.clone()]);
        let record = fx.index.get(&keeper).unwrap().unwrap();
        assert_eq!(record.fingerprint, fingerprint_file(&keeper).unwrap());
        assert_eq!(record.size, 3);
    }

    #[test]
    fn dry_run_leaves_uncataloged_keeper_unrecorded() {
        let fx = Fixture::new();
        let keeper = fx.dir.path().join("a.jpg");
        fs::write(&keeper, b"dup").unwrap();
        let b = fx.add("b.jpg", b"dup");

        fx.engine().consolidate(&[keeper.clone(), b.clone()], &keeper, true).unwrap();

        assert!(fx.index.get(&keeper).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn copied_source_left_behind_reports_incomplete_cleanup() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        let keeper = fx.add("keep.jpg", b"old");
        let locked_dir = fx.dir.path().join("locked");
        fs::create_dir(&locked_dir).unwrap();
        let source = locked_dir.join("a.jpg");
        fs::write(&source, b"dup").unwrap();
        fx.index
            .upsert(&FileRecord::new(&source, 3, fingerprint_file(&source).unwrap()))
            .unwrap();
        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o555)).unwrap();

        if permissions_ignored(&locked_dir) {
            return;
        }

        let result = fx
            .engine()
            .promote_mode(PromoteMode::CopyVerify)
            .consolidate(&[source.clone()], &keeper, false);

        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(ConsolidateError::IncompleteCleanup { removed, failed }) => {
                assert_eq!(removed, 0);
                assert_eq!(failed[0].0, source);
            }
            other => panic!("expected IncompleteCleanup, got {:?}", other),
        }
        assert_eq!(fs::read(&keeper).unwrap(), b"dup");
        let record = fx.index.get(&keeper).unwrap().unwrap();
        assert_eq!(record.fingerprint, fingerprint_file(&keeper).unwrap());
        assert!(fx.index.get(&source).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn undeletable_member_reports_incomplete_cleanup() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        let keeper = fx.add("keep.jpg", b"dup");
        let free = fx.add("free.jpg", b"dup");
        let locked_dir = fx.dir.path().join("locked");
        fs::create_dir(&locked_dir).unwrap();
        let locked = locked_dir.join("stuck.jpg");
        fs::write(&locked, b"dup").unwrap();
        fx.index
            .upsert(&FileRecord::new(&locked, 3, fingerprint_file(&locked).unwrap()))
            .unwrap();
        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o555)).unwrap();

        if permissions_ignored(&locked_dir) {
            return;
        }

        let result = fx
            .engine()
            .consolidate(&[keeper.clone(), free.clone(), locked.clone()], &keeper, false);

        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(ConsolidateError::IncompleteCleanup { removed, failed }) => {
                assert_eq!(removed, 1);
                assert_eq!(failed[0].0, locked);
            }
            other => panic!("expected IncompleteCleanup, got {:?}", other),
        }
        assert!(!free.exists());
        assert!(fx.index.get(&free).unwrap().is_none());
        assert!(fx.index.get(&locked).unwrap().is_some());
    }
}
