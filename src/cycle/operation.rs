use chrono::Local;

use crate::auth::Credential;
use crate::git::{SyncError, Vcs};
use crate::paths::Paths;
use crate::record::{RepoRecord, SyncFault};

use super::SyncOutcome;

/// Bring one repository up to date and refresh its record.
///
/// A directory under the target root means the repository was cloned before
/// and gets pulled; otherwise it is cloned fresh with the credential spliced
/// into its URL. On success the head commit unconditionally replaces the
/// stored hash; on failure only the error fields change, so the last good
/// sync stays visible.
pub fn sync_repo(
    vcs: &dyn Vcs,
    record: &mut RepoRecord,
    paths: &Paths,
    credential: &Credential,
) -> SyncOutcome {
    let dest = paths.repo_dir(&record.name);

    let result = if dest.is_dir() {
        tracing::debug!(repo = %record.name, "pulling");
        vcs.update(&dest)
    } else {
        tracing::debug!(repo = %record.name, "cloning");
        match record.clone_url.as_deref() {
            Some(url) => vcs.clone_repo(&credential.apply(url), &dest),
            None => Err(SyncError::MissingUrl),
        }
    };

    match result.and_then(|_| vcs.head_commit(&dest)) {
        Ok(head) => {
            let previous = record.commit_hash.clone();
            record.mark_synced(
                head.hash.clone(),
                head.committed_at,
                Local::now().naive_local(),
            );
            match previous {
                Some(old) if old == head.hash => SyncOutcome::Unchanged { hash: head.hash },
                old => {
                    tracing::info!(
                        repo = %record.name,
                        from = old.as_deref().unwrap_or("none"),
                        to = %head.hash,
                        "commit hash changed"
                    );
                    SyncOutcome::Advanced {
                        from: old,
                        to: head.hash,
                    }
                }
            }
        }
        Err(err) => {
            tracing::warn!(repo = %record.name, error = %err, "sync failed");
            let fault = SyncFault::from(err);
            record.mark_failed(fault.clone());
            SyncOutcome::Failed(fault)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakeVcs, VcsCall};
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(name: &str) -> RepoRecord {
        RepoRecord::new(name, &format!("https://example.com/{name}.git"))
    }

    #[test]
    fn fresh_repo_is_cloned_with_the_credential_spliced_in() {
        let td = tempdir().unwrap();
        let paths = Paths::at(td.path().join("mirrors"));
        fs::create_dir_all(&paths.root).unwrap();
        let vcs = FakeVcs::new();
        let credential = Credential::new("t0k3n");
        let mut rec = record("api");

        let outcome = sync_repo(&vcs, &mut rec, &paths, &credential);

        assert!(matches!(outcome, SyncOutcome::Advanced { from: None, .. }));
        assert_eq!(
            vcs.calls()[0],
            VcsCall::Clone {
                name: "api".to_string(),
                url: "https://t0k3n@example.com/api.git".to_string(),
            }
        );
        assert!(rec.commit_hash.is_some());
        assert!(rec.last_pull.is_some());
        assert!(!rec.has_error);
    }

    #[test]
    fn existing_directory_is_pulled_not_recloned() {
        let td = tempdir().unwrap();
        let paths = Paths::at(td.path().join("mirrors"));
        fs::create_dir_all(paths.repo_dir("api")).unwrap();
        let vcs = FakeVcs::new();
        let credential = Credential::new("t0k3n");
        let mut rec = record("api");

        sync_repo(&vcs, &mut rec, &paths, &credential);

        assert_eq!(
            vcs.calls()[0],
            VcsCall::Update {
                name: "api".to_string()
            }
        );
        assert!(
            !vcs.calls()
                .iter()
                .any(|call| matches!(call, VcsCall::Clone { .. }))
        );
    }

    #[test]
    fn failure_keeps_the_last_good_hash_and_pull_time() {
        let td = tempdir().unwrap();
        let paths = Paths::at(td.path().join("mirrors"));
        fs::create_dir_all(&paths.root).unwrap();
        let vcs = FakeVcs::new();
        let credential = Credential::new("t0k3n");
        let mut rec = record("api");

        sync_repo(&vcs, &mut rec, &paths, &credential);
        let hash = rec.commit_hash.clone();
        let pulled = rec.last_pull;

        vcs.fail_forever("api", 128);
        let outcome = sync_repo(&vcs, &mut rec, &paths, &credential);

        assert_eq!(outcome, SyncOutcome::Failed(SyncFault::Exit(128)));
        assert!(rec.has_error);
        assert_eq!(rec.error, Some(SyncFault::Exit(128)));
        assert_eq!(rec.commit_hash, hash);
        assert_eq!(rec.last_pull, pulled);
    }

    #[test]
    fn record_without_a_clone_url_fails_instead_of_spawning_git() {
        let td = tempdir().unwrap();
        let paths = Paths::at(td.path().join("mirrors"));
        fs::create_dir_all(&paths.root).unwrap();
        let vcs = FakeVcs::new();
        let credential = Credential::new("t0k3n");
        let mut rec = RepoRecord {
            clone_url: None,
            ..record("orphan")
        };

        let outcome = sync_repo(&vcs, &mut rec, &paths, &credential);

        assert!(vcs.calls().is_empty());
        assert!(rec.has_error);
        match outcome {
            SyncOutcome::Failed(SyncFault::Message(msg)) => {
                assert!(msg.contains("no clone URL"), "got {msg:?}")
            }
            other => panic!("expected a message fault, got {other:?}"),
        }
    }

    #[test]
    fn head_lookup_failure_counts_as_a_sync_failure() {
        let td = tempdir().unwrap();
        let paths = Paths::at(td.path().join("mirrors"));
        fs::create_dir_all(&paths.root).unwrap();
        let vcs = FakeVcs::new();
        vcs.fail_head("api", 129);
        let credential = Credential::new("t0k3n");
        let mut rec = record("api");

        let outcome = sync_repo(&vcs, &mut rec, &paths, &credential);

        assert_eq!(outcome, SyncOutcome::Failed(SyncFault::Exit(129)));
        assert!(rec.has_error);
        assert_eq!(rec.commit_hash, None);
    }

    #[test]
    fn success_clears_an_earlier_fault() {
        let td = tempdir().unwrap();
        let paths = Paths::at(td.path().join("mirrors"));
        fs::create_dir_all(&paths.root).unwrap();
        let vcs = FakeVcs::new();
        let credential = Credential::new("t0k3n");
        let mut rec = record("api");
        rec.mark_failed(SyncFault::Exit(1));

        sync_repo(&vcs, &mut rec, &paths, &credential);

        assert!(!rec.has_error);
        assert_eq!(rec.error, None);
    }
}
