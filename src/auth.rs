use std::fmt;

/// Access token for the remote host. Lives only in memory; the redacted
/// Debug impl keeps it out of logs and error chains.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Splice the token into the authority of an `https://` URL, the form
    /// the remote host accepts for token auth (`https://<token>@host/...`).
    /// Other schemes pass through untouched.
    pub fn apply(&self, url: &str) -> AuthedUrl {
        match url.strip_prefix("https://") {
            Some(rest) => AuthedUrl(format!("https://{}@{}", self.0, rest)),
            None => AuthedUrl(url.to_string()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A clone URL that may carry the embedded token. Never persisted and never
/// formatted into log lines or error messages.
#[derive(Clone)]
pub struct AuthedUrl(String);

impl AuthedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthedUrl(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_token_into_https_authority() {
        let cred = Credential::new("t0k3n");
        let url = cred.apply("https://example.com/acme/api.git");
        assert_eq!(url.as_str(), "https://t0k3n@example.com/acme/api.git");
    }

    #[test]
    fn leaves_other_schemes_alone() {
        let cred = Credential::new("t0k3n");
        assert_eq!(
            cred.apply("git@example.com:acme/api.git").as_str(),
            "git@example.com:acme/api.git"
        );
        assert_eq!(
            cred.apply("http://example.com/acme/api.git").as_str(),
            "http://example.com/acme/api.git"
        );
    }

    #[test]
    fn debug_output_never_contains_the_token() {
        let cred = Credential::new("sup3r-secret");
        let authed = cred.apply("https://example.com/acme/api.git");
        assert!(!format!("{:?}", cred).contains("sup3r-secret"));
        assert!(!format!("{:?}", authed).contains("sup3r-secret"));
    }
}
