use anyhow::Result;
use colored::Colorize;

use crate::paths::Paths;
use crate::record::{RepoRecord, short_hash};
use crate::settings::Settings;
use crate::store;

/// Print one line per tracked repository from the persisted state, plus a
/// totals line.
pub fn cmd_status() -> Result<()> {
    let settings = Settings::from_env()?;
    let paths = Paths::from_settings(&settings);
    let records = store::load(&paths.state);

    if records.is_empty() {
        println!("no repositories tracked yet, run `repokeep run` first");
        return Ok(());
    }

    let mut failing = 0usize;
    for record in records.values() {
        println!("{}", status_line(record));
        if record.has_error {
            failing += 1;
        }
    }
    println!("{} tracked, {} failing", records.len(), failing);
    Ok(())
}

fn status_line(record: &RepoRecord) -> String {
    let pulled = record
        .last_pull
        .map(|t| t.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    if record.has_error {
        let detail = record
            .error
            .as_ref()
            .map(|fault| fault.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return format!(
            "{} {} last pull {} FAILED ({})",
            "✘".red(),
            record.name,
            pulled,
            detail
        );
    }
    match record.commit_hash.as_deref() {
        Some(hash) => format!(
            "{} {} {} pulled {}",
            "✔".green(),
            record.name,
            short_hash(hash),
            pulled
        ),
        None => format!("{} {} never synced", "●".yellow(), record.name),
    }
}
