mod progress;

use anyhow::Result;

use crate::cycle::Coordinator;
use crate::git::GitCli;
use crate::notify::Notifier;
use crate::paths::Paths;
use crate::schedule::{Scheduler, Shutdown};
use crate::settings::Settings;
use crate::store;

use progress::SpinnerObserver;

/// Run one backup cycle in the foreground with a spinner per repository.
///
/// Per-repository failures are recorded and reported, not fatal; the command
/// still exits zero so a cron wrapper keeps running.
pub fn cmd_run(prune: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let paths = Paths::from_settings(&settings);
    let notifier = Notifier::new(settings.webhook_url.clone())?;
    let vcs = GitCli::new();
    let (_handle, shutdown) = Shutdown::channel();

    let mut coordinator = Coordinator::new(store::load(&paths.state));
    let scheduler = Scheduler::new(&settings, &paths, &vcs, &notifier, &shutdown);
    let observer = SpinnerObserver::new();
    let report = scheduler.run_iteration(&mut coordinator, &observer, prune)?;

    println!("Backup finished in {} seconds.", report.elapsed.as_secs());
    if report.failed > 0 {
        eprintln!(
            "{} repositories still failing, run `repokeep status` for details",
            report.failed
        );
    }
    Ok(())
}
