mod operation;

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use crate::auth::Credential;
use crate::git::Vcs;
use crate::paths::Paths;
use crate::record::{RepoRecord, SyncFault};
use crate::roster::RosterEntry;

/// Outcome of one sync attempt, kept per repository for summaries and
/// progress display.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Advanced { from: Option<String>, to: String },
    Unchanged { hash: String },
    Failed(SyncFault),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

/// Progress callbacks for a pass. The interactive `run` command renders
/// spinners from these; the daemon passes [`NoopObserver`]. Callbacks may
/// arrive from worker threads when the cycle runs parallel.
pub trait CycleObserver: Sync {
    fn repo_started(&self, _name: &str) {}
    fn repo_finished(&self, _name: &str, _outcome: &SyncOutcome) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl CycleObserver for NoopObserver {}

/// Everything a sync pass needs besides the records themselves.
pub struct CycleContext<'a> {
    pub vcs: &'a dyn Vcs,
    pub paths: &'a Paths,
    pub credential: &'a Credential,
    pub jobs: usize,
    pub observer: &'a dyn CycleObserver,
}

/// Owns the tracked records, drives sync passes over them and keeps the set
/// of repositories that failed the most recent pass.
///
/// The failed set is cycle-scoped: it is rebuilt by every pass and never
/// persisted.
pub struct Coordinator {
    records: BTreeMap<String, RepoRecord>,
    failed: BTreeSet<String>,
}

impl Coordinator {
    pub fn new(records: BTreeMap<String, RepoRecord>) -> Self {
        Self {
            records,
            failed: BTreeSet::new(),
        }
    }

    pub fn records(&self) -> &BTreeMap<String, RepoRecord> {
        &self.records
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    /// Create a record for every roster name seen for the first time.
    /// Existing records keep their stored state, clone URL included, and
    /// duplicate roster names never overwrite an earlier one.
    pub fn merge_roster(&mut self, entries: &[RosterEntry]) {
        for entry in entries {
            if !self.records.contains_key(&entry.name) {
                self.records.insert(
                    entry.name.clone(),
                    RepoRecord::new(&entry.name, &entry.clone_url),
                );
            }
        }
    }

    /// Drop records whose names have left the roster and return the dropped
    /// names. Clone directories stay on disk; only state is removed.
    pub fn prune_stale(&mut self, entries: &[RosterEntry]) -> Vec<String> {
        let keep: BTreeSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        let stale: Vec<String> = self
            .records
            .keys()
            .filter(|name| !keep.contains(name.as_str()))
            .cloned()
            .collect();
        for name in &stale {
            self.records.remove(name);
            self.failed.remove(name);
        }
        stale
    }

    /// One full pass over every tracked record, in name order. Failures are
    /// isolated per repository; the failed set is rebuilt from scratch.
    pub fn run_cycle(&mut self, ctx: &CycleContext) -> Result<BTreeMap<String, SyncOutcome>> {
        let names: Vec<String> = self.records.keys().cloned().collect();
        let outcomes = self.run_pass(&names, ctx)?;
        self.failed = failing(&outcomes);
        Ok(outcomes)
    }

    /// Re-sync only the currently failing repositories. The failed set is
    /// rebuilt from the repositories visited in this pass: recovered ones
    /// drop out, untouched records are not reconsidered.
    pub fn run_failed_retry(&mut self, ctx: &CycleContext) -> Result<BTreeMap<String, SyncOutcome>> {
        let names: Vec<String> = self.failed.iter().cloned().collect();
        let outcomes = self.run_pass(&names, ctx)?;
        self.failed = failing(&outcomes);
        Ok(outcomes)
    }

    fn run_pass(
        &mut self,
        names: &[String],
        ctx: &CycleContext,
    ) -> Result<BTreeMap<String, SyncOutcome>> {
        fs::create_dir_all(&ctx.paths.root).with_context(|| {
            format!("failed to create target root {}", ctx.paths.root.display())
        })?;

        if ctx.jobs <= 1 {
            let mut outcomes = BTreeMap::new();
            for name in names {
                let Some(record) = self.records.get_mut(name) else {
                    continue;
                };
                ctx.observer.repo_started(name);
                let outcome = operation::sync_repo(ctx.vcs, record, ctx.paths, ctx.credential);
                ctx.observer.repo_finished(name, &outcome);
                outcomes.insert(name.clone(), outcome);
            }
            return Ok(outcomes);
        }

        // Each worker owns its record exclusively: the visited records move
        // out of the map for the pass and merge back by name afterwards.
        let mut batch: Vec<(String, RepoRecord)> = names
            .iter()
            .filter_map(|name| self.records.remove(name).map(|rec| (name.clone(), rec)))
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ctx.jobs)
            .build()
            .context("failed to build sync worker pool")?;
        let results: Vec<(String, SyncOutcome)> = pool.install(|| {
            batch
                .par_iter_mut()
                .map(|(name, record)| {
                    ctx.observer.repo_started(name);
                    let outcome = operation::sync_repo(ctx.vcs, record, ctx.paths, ctx.credential);
                    ctx.observer.repo_finished(name, &outcome);
                    (name.clone(), outcome)
                })
                .collect()
        });
        for (name, record) in batch {
            self.records.insert(name, record);
        }
        Ok(results.into_iter().collect())
    }
}

fn failing(outcomes: &BTreeMap<String, SyncOutcome>) -> BTreeSet<String> {
    outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_failure())
        .map(|(name, _)| name.clone())
        .collect()
}
