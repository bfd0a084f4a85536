use reqwest::blocking::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::cycle::SyncOutcome;
use crate::record::short_hash;

#[derive(Debug, Error)]
#[error("webhook request failed: {0}")]
pub struct NotifyError(#[from] reqwest::Error);

#[derive(Serialize)]
struct Payload<'a> {
    text: &'a str,
}

/// Posts cycle summaries to an optional webhook. Without a configured URL
/// every send is a quiet no-op, so callers never branch on configuration.
pub struct Notifier {
    client: Client,
    url: Option<String>,
}

impl Notifier {
    pub fn new(url: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, url })
    }

    pub fn send(&self, message: &str) -> Result<(), NotifyError> {
        let Some(url) = self.url.as_deref() else {
            tracing::debug!("no webhook configured, dropping notification");
            return Ok(());
        };
        self.client
            .post(url)
            .json(&Payload { text: message })
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

pub fn cycle_started(total: usize) -> String {
    format!("Starting backup of {} repositories", total)
}

pub fn cycle_summary(outcomes: &BTreeMap<String, SyncOutcome>, elapsed: Duration) -> String {
    let failed = outcomes.values().filter(|o| o.is_failure()).count();
    let ok = outcomes.len() - failed;
    let mut lines = vec![format!(
        "Backup finished in {} seconds: {} ok, {} failed",
        elapsed.as_secs(),
        ok,
        failed
    )];
    lines.extend(outcomes.iter().map(|(name, outcome)| repo_line(name, outcome)));
    lines.join("\n")
}

pub fn retry_summary(
    attempt: u32,
    limit: u32,
    outcomes: &BTreeMap<String, SyncOutcome>,
) -> String {
    let still = outcomes.values().filter(|o| o.is_failure()).count();
    let recovered = outcomes.len() - still;
    let mut lines = vec![format!(
        "Retry attempt {}/{}: {} recovered, {} still failing",
        attempt, limit, recovered, still
    )];
    lines.extend(outcomes.iter().map(|(name, outcome)| repo_line(name, outcome)));
    lines.join("\n")
}

fn repo_line(name: &str, outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Advanced { to, .. } => format!("{}: updated to {}", name, short_hash(to)),
        SyncOutcome::Unchanged { hash } => format!("{}: unchanged at {}", name, short_hash(hash)),
        SyncOutcome::Failed(fault) => format!("{}: FAILED ({})", name, fault),
    }
}
