use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::paths::Paths;
use crate::roster::{self, RosterEntry, RosterError};
use crate::settings::Settings;

#[derive(Debug, Deserialize)]
struct OrgRepo {
    name: String,
    clone_url: String,
}

fn api_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static("repokeep-discover"));
    let client = Client::builder().default_headers(headers).build()?;
    Ok(client)
}

fn fetch_org_repos(client: &Client, settings: &Settings, org: &str) -> Result<Vec<OrgRepo>> {
    let url = format!("{}/orgs/{}/repos", settings.api_base, org);
    // TODO: follow the Link header once an org outgrows the first page.
    let repos: Vec<OrgRepo> = client
        .get(&url)
        .basic_auth(&settings.user, Some(settings.credential.token()))
        .send()?
        .error_for_status()?
        .json()?;
    Ok(repos)
}

fn discover(settings: &Settings, paths: &Paths, dry_run: bool) -> Result<Vec<RosterEntry>> {
    let org = settings.org.as_deref().context("GITHUB_ORG is not set")?;
    let client = api_client()?;
    let found = fetch_org_repos(&client, settings, org)
        .with_context(|| format!("failed to list repositories of {}", org))?;

    let existing = match roster::load(&paths.roster) {
        Ok(entries) => entries,
        Err(RosterError::Missing { .. }) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let known: BTreeSet<&str> = existing.iter().map(|e| e.name.as_str()).collect();

    let mut additions = Vec::new();
    for repo in found {
        if known.contains(repo.name.as_str()) {
            continue;
        }
        // Never write a line the loader would reject.
        if !roster::fits_line_format(&repo.name, &repo.clone_url) {
            tracing::warn!(name = %repo.name, "skipping repository that does not fit the roster line format");
            continue;
        }
        additions.push(RosterEntry {
            name: repo.name,
            clone_url: repo.clone_url,
        });
    }

    if !dry_run && !additions.is_empty() {
        roster::append(&paths.roster, &additions)?;
    }
    Ok(additions)
}

/// List the organization's repositories and add the missing ones to
/// `repos.conf`. Existing lines are never rewritten.
pub fn cmd_discover(dry_run: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let paths = Paths::from_settings(&settings);

    let additions = discover(&settings, &paths, dry_run)?;
    if additions.is_empty() {
        println!("no new repositories found");
        return Ok(());
    }
    for entry in &additions {
        if dry_run {
            println!("would add {} {}", entry.name, entry.clone_url);
        } else {
            println!("added {} {}", entry.name, entry.clone_url);
        }
    }
    Ok(())
}
