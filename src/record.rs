use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted state for one tracked repository.
///
/// Field names and order follow the on-disk `repos.json` format, which this
/// tool has used since its first iteration:
///
/// ```json
/// {
///   "clone_url": "https://example.com/api-server.git",
///   "commitHash": "4f9d2a1c…",
///   "lastPull": "25/08/2026 00:03:41",
///   "hasError": false,
///   "lastCommit": "Mon Aug 24 18:12:55 2026 +0200",
///   "error": null
/// }
/// ```
///
/// `name` is the JSON map key, not part of the value; it doubles as the
/// clone directory name under the target root. A missing `commitHash` means
/// the repository has never been synced, never a placeholder string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRecord {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(rename = "commitHash", default)]
    pub commit_hash: Option<String>,
    #[serde(rename = "lastPull", with = "pull_time", default)]
    pub last_pull: Option<NaiveDateTime>,
    #[serde(rename = "hasError", default)]
    pub has_error: bool,
    #[serde(rename = "lastCommit", default)]
    pub last_commit: Option<String>,
    #[serde(default)]
    pub error: Option<SyncFault>,
}

impl RepoRecord {
    pub fn new(name: impl Into<String>, clone_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clone_url: Some(clone_url.into()),
            commit_hash: None,
            last_pull: None,
            has_error: false,
            last_commit: None,
            error: None,
        }
    }

    /// Record a successful sync: refresh the pull time, overwrite the commit
    /// fields with the freshly queried values, and clear any prior fault.
    pub fn mark_synced(
        &mut self,
        hash: impl Into<String>,
        committed_at: impl Into<String>,
        at: NaiveDateTime,
    ) {
        self.commit_hash = Some(hash.into());
        self.last_commit = Some(committed_at.into());
        self.last_pull = Some(at);
        self.has_error = false;
        self.error = None;
    }

    /// Record a failed sync attempt. Commit hash and pull time keep the
    /// values from the last successful sync.
    pub fn mark_failed(&mut self, fault: SyncFault) {
        self.has_error = true;
        self.error = Some(fault);
    }
}

/// What went wrong with a sync attempt, as persisted in the `error` field.
///
/// Subprocess failures keep their exit code as a JSON number; everything
/// else (spawn failures, death by signal, missing clone URL) is stored as a
/// message string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncFault {
    Exit(i32),
    Message(String),
}

impl fmt::Display for SyncFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncFault::Exit(code) => write!(f, "exit code {}", code),
            SyncFault::Message(msg) => f.write_str(msg),
        }
    }
}

/// Abbreviate a commit hash for display. Anything shorter than the usual
/// abbreviated length is returned as is.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

mod pull_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%d/%m/%Y %H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => ser.serialize_str(&t.format(FORMAT).to_string()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(de: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(de)? {
            Some(raw) => NaiveDateTime::parse_from_str(&raw, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 25)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn mark_synced_clears_prior_fault_and_refreshes_fields() {
        let mut rec = RepoRecord::new("api", "https://example.com/api.git");
        rec.mark_failed(SyncFault::Exit(128));
        assert!(rec.has_error);

        rec.mark_synced("abc1234def", "Mon Aug 24 10:00:00 2026 +0000", noon());

        assert!(!rec.has_error);
        assert_eq!(rec.error, None);
        assert_eq!(rec.commit_hash.as_deref(), Some("abc1234def"));
        assert_eq!(
            rec.last_commit.as_deref(),
            Some("Mon Aug 24 10:00:00 2026 +0000")
        );
        assert_eq!(rec.last_pull, Some(noon()));
    }

    #[test]
    fn mark_failed_touches_only_the_error_fields() {
        let mut rec = RepoRecord::new("api", "https://example.com/api.git");
        rec.mark_synced("abc1234def", "Mon Aug 24 10:00:00 2026 +0000", noon());

        rec.mark_failed(SyncFault::Exit(1));

        assert!(rec.has_error);
        assert_eq!(rec.error, Some(SyncFault::Exit(1)));
        assert_eq!(rec.commit_hash.as_deref(), Some("abc1234def"));
        assert_eq!(rec.last_pull, Some(noon()));
        assert_eq!(
            rec.last_commit.as_deref(),
            Some("Mon Aug 24 10:00:00 2026 +0000")
        );
    }

    #[test]
    fn serializes_with_wire_field_names_and_explicit_nulls() {
        let rec = RepoRecord::new("api", "https://example.com/api.git");
        let value = serde_json::to_value(&rec).unwrap();

        let obj = value.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "clone_url",
                "commitHash",
                "lastPull",
                "hasError",
                "lastCommit",
                "error"
            ]
        );
        assert!(obj["commitHash"].is_null());
        assert!(obj["error"].is_null());
        assert_eq!(obj["hasError"], serde_json::json!(false));
    }

    #[test]
    fn last_pull_round_trips_in_day_first_format() {
        let mut rec = RepoRecord::new("api", "https://example.com/api.git");
        rec.mark_synced("abc1234def", "date", noon());

        let raw = serde_json::to_string(&rec).unwrap();
        assert!(raw.contains("\"25/08/2026 12:00:00\""), "raw: {}", raw);

        let back: RepoRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.last_pull, Some(noon()));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rec: RepoRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(rec.clone_url, None);
        assert_eq!(rec.commit_hash, None);
        assert_eq!(rec.last_pull, None);
        assert!(!rec.has_error);
        assert_eq!(rec.last_commit, None);
        assert_eq!(rec.error, None);
    }

    #[test]
    fn fault_persists_exit_codes_as_numbers_and_messages_as_strings() {
        assert_eq!(
            serde_json::to_string(&SyncFault::Exit(128)).unwrap(),
            "128"
        );
        assert_eq!(
            serde_json::to_string(&SyncFault::Message("boom".into())).unwrap(),
            "\"boom\""
        );

        let exit: SyncFault = serde_json::from_str("128").unwrap();
        assert_eq!(exit, SyncFault::Exit(128));
        let msg: SyncFault = serde_json::from_str("\"boom\"").unwrap();
        assert_eq!(msg, SyncFault::Message("boom".into()));
    }

    #[test]
    fn fault_display_is_summary_friendly() {
        assert_eq!(SyncFault::Exit(128).to_string(), "exit code 128");
        assert_eq!(SyncFault::Message("no clone URL".into()).to_string(), "no clone URL");
    }

    #[test]
    fn short_hash_handles_short_input() {
        assert_eq!(short_hash("4f9d2a1c77"), "4f9d2a1");
        assert_eq!(short_hash("4f9d"), "4f9d");
    }
}
