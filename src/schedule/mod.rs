//! The daily loop: load the roster, run a backup cycle, persist, notify,
//! retry the failed subset, sleep until the next local midnight.

mod clock;
mod shutdown;

pub use shutdown::{Shutdown, ShutdownHandle};

use anyhow::Result;
use chrono::Local;
use std::time::{Duration, Instant};

use crate::cycle::{Coordinator, CycleContext, CycleObserver, NoopObserver};
use crate::git::{GitCli, Vcs};
use crate::notify::{self, Notifier};
use crate::paths::Paths;
use crate::roster;
use crate::settings::Settings;
use crate::store;

/// What one iteration did, for callers that render results themselves.
pub struct IterationReport {
    pub elapsed: Duration,
    pub failed: usize,
}

pub struct Scheduler<'a> {
    settings: &'a Settings,
    paths: &'a Paths,
    vcs: &'a dyn Vcs,
    notifier: &'a Notifier,
    shutdown: &'a Shutdown,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        settings: &'a Settings,
        paths: &'a Paths,
        vcs: &'a dyn Vcs,
        notifier: &'a Notifier,
        shutdown: &'a Shutdown,
    ) -> Self {
        Self {
            settings,
            paths,
            vcs,
            notifier,
            shutdown,
        }
    }

    /// One full iteration. A missing or malformed roster is fatal before any
    /// repository is touched; per-repository failures are recorded, retried
    /// if the policy allows, and reported rather than propagated.
    pub fn run_iteration(
        &self,
        coordinator: &mut Coordinator,
        observer: &dyn CycleObserver,
        prune: bool,
    ) -> Result<IterationReport> {
        let entries = roster::load(&self.paths.roster)?;
        coordinator.merge_roster(&entries);
        if prune {
            for name in coordinator.prune_stale(&entries) {
                tracing::info!(repo = %name, "dropped stale record");
            }
        }

        self.notify(&notify::cycle_started(coordinator.records().len()));

        let ctx = CycleContext {
            vcs: self.vcs,
            paths: self.paths,
            credential: &self.settings.credential,
            jobs: self.settings.jobs,
            observer,
        };

        let started = Instant::now();
        let outcomes = coordinator.run_cycle(&ctx)?;
        let elapsed = started.elapsed();

        self.persist(coordinator);
        self.notify(&notify::cycle_summary(&outcomes, elapsed));

        if self.settings.retry.enabled {
            self.retry_failed(coordinator, &ctx);
        }

        Ok(IterationReport {
            elapsed,
            failed: coordinator.failed().len(),
        })
    }

    /// Loop forever, one iteration per day at local midnight. Returns cleanly
    /// once the shutdown handle stops it.
    pub fn run_forever(
        &self,
        coordinator: &mut Coordinator,
        observer: &dyn CycleObserver,
        prune: bool,
    ) -> Result<()> {
        loop {
            if self.shutdown.stop_requested() {
                return Ok(());
            }

            let report = self.run_iteration(coordinator, observer, prune)?;
            tracing::info!(
                elapsed_secs = report.elapsed.as_secs(),
                failed = report.failed,
                "backup cycle complete"
            );

            let now = Local::now().naive_local();
            let wake = clock::next_midnight(now);
            tracing::info!(wake = %wake.format("%d/%m/%Y %H:%M:%S"), "sleeping until next cycle");
            if !self.shutdown.wait(clock::span_until(now, wake)) {
                tracing::info!("shutdown requested, leaving the scheduler loop");
                return Ok(());
            }
        }
    }

    fn retry_failed(&self, coordinator: &mut Coordinator, ctx: &CycleContext) {
        let policy = &self.settings.retry;
        for attempt in 1..=policy.limit {
            if coordinator.failed().is_empty() {
                return;
            }
            tracing::info!(
                attempt,
                limit = policy.limit,
                failing = coordinator.failed().len(),
                "waiting before retrying failed repositories"
            );
            if !self.shutdown.wait(policy.delay) {
                return;
            }
            match coordinator.run_failed_retry(ctx) {
                Ok(outcomes) => {
                    self.persist(coordinator);
                    self.notify(&notify::retry_summary(attempt, policy.limit, &outcomes));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "retry pass aborted");
                    return;
                }
            }
        }
    }

    fn persist(&self, coordinator: &Coordinator) {
        if let Err(err) = store::save(&self.paths.state, coordinator.records()) {
            tracing::warn!(error = %err, "failed to persist backup state");
        }
    }

    fn notify(&self, message: &str) {
        if let Err(err) = self.notifier.send(message) {
            tracing::warn!(error = %err, "notification failed");
        }
    }
}

/// Run the scheduler loop until the given handle stops it. This is the
/// embedding surface: create the pair with [`Shutdown::channel`], keep the
/// [`ShutdownHandle`], and drive the loop on a thread of your own.
pub fn run_daemon(prune: bool, shutdown: &Shutdown) -> Result<()> {
    let settings = Settings::from_env()?;
    let paths = Paths::from_settings(&settings);
    let notifier = Notifier::new(settings.webhook_url.clone())?;
    let vcs = GitCli::new();

    let mut coordinator = Coordinator::new(store::load(&paths.state));
    let scheduler = Scheduler::new(&settings, &paths, &vcs, &notifier, shutdown);
    scheduler.run_forever(&mut coordinator, &NoopObserver, prune)
}

/// Run the scheduler loop in the foreground until the process is stopped.
pub fn cmd_daemon(prune: bool) -> Result<()> {
    let (_handle, shutdown) = Shutdown::channel();
    run_daemon(prune, &shutdown)
}
