use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::cycle::{CycleObserver, SyncOutcome};
use crate::record::short_hash;

/// Spinner style used while a repository syncs.
/// - Yellow spinner with animated braille-style frames.
/// - Displays the current message (`{wide_msg}`) next to the spinner.
fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Style used when a repository finishes successfully.
fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}").unwrap()
}

/// Style used when a repository fails.
fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}

/// Renders one spinner per repository while a cycle runs. Bars appear as
/// repositories start, so retry passes reuse the same display.
pub struct SpinnerObserver {
    mp: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }
}

impl CycleObserver for SpinnerObserver {
    fn repo_started(&self, name: &str) {
        let pb = self.mp.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb.set_message(format!("syncing {}", name));
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(name.to_string(), pb);
        }
    }

    fn repo_finished(&self, name: &str, outcome: &SyncOutcome) {
        let Some(pb) = self.bars.lock().ok().and_then(|mut bars| bars.remove(name)) else {
            return;
        };
        match outcome {
            SyncOutcome::Advanced { from: Some(old), to } => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!(
                    "syncing {} ({} -> {})",
                    name,
                    short_hash(old),
                    short_hash(to)
                ));
            }
            SyncOutcome::Advanced { from: None, to } => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!("syncing {} (cloned at {})", name, short_hash(to)));
            }
            SyncOutcome::Unchanged { hash } => {
                pb.set_style(ok_style());
                pb.finish_with_message(format!(
                    "syncing {} (unchanged at {})",
                    name,
                    short_hash(hash)
                ));
            }
            SyncOutcome::Failed(err) => {
                pb.set_style(err_style());
                pb.finish_with_message(format!("syncing {} (error: {})", name, err));
            }
        }
    }
}
