//! Repository target: where to publish and how to connect.
//!
//! A `RepositoryTarget` is an explicit value passed into the workflow,
//! replacing any ambient form/field state. URL normalization lives here so
//! the same rules apply no matter which operation builds the remote ref.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Transport used to reach the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    #[default]
    Ssh,
    Https,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Https => "https",
        }
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "https" => Ok(Self::Https),
            other => Err(format!("unknown connection mode '{other}' (ssh|https)")),
        }
    }
}

/// Where and how a publish operation pushes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    /// Local working tree
    pub local_path: PathBuf,
    /// Remote URL as configured (either form; normalized before use)
    pub remote_url: String,
    /// Branch to publish
    pub branch: String,
    /// Pathspec handed to `git add`
    pub file_pattern: String,
    /// Transport selection; the URL is rewritten to agree with it
    pub mode: ConnectionMode,
    /// Personal access token, used for HTTPS pushes and the token check
    pub token: Option<String>,
}

impl RepositoryTarget {
    /// Remote URL normalized and rewritten to match the selected mode.
    pub fn effective_url(&self) -> String {
        let url = normalize_url(&self.remote_url);
        match self.mode {
            ConnectionMode::Ssh if !is_ssh_url(&url) => {
                let rewritten = to_ssh_url(&url);
                tracing::warn!(from = %url, to = %rewritten, "remote URL did not match ssh mode, rewriting");
                rewritten
            }
            ConnectionMode::Https if !is_https_url(&url) => {
                let rewritten = to_https_url(&url);
                tracing::warn!(from = %url, to = %rewritten, "remote URL did not match https mode, rewriting");
                rewritten
            }
            _ => url,
        }
    }

    /// Remote ref for the actual push: HTTPS with a token embeds it inline,
    /// SSH uses the URL unmodified.
    pub fn push_url(&self) -> String {
        let url = self.effective_url();
        match (&self.mode, &self.token) {
            (ConnectionMode::Https, Some(token)) if url.contains("github.com") => {
                url.replacen("https://", &format!("https://{token}@"), 1)
            }
            _ => url,
        }
    }

    /// Remote host name, used for the host-key trust step.
    pub fn host(&self) -> String {
        host_of(&self.effective_url()).unwrap_or_else(|| "github.com".to_string())
    }
}

fn ssh_host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:ssh://)?[^@/]+@([^:/]+)[:/]").unwrap())
}

fn https_host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://(?:[^@/]+@)?([^:/]+)").unwrap())
}

fn host_of(url: &str) -> Option<String> {
    let re = if is_ssh_url(url) {
        ssh_host_re()
    } else {
        https_host_re()
    };
    re.captures(url).map(|c| c[1].to_string())
}

/// `git@...` style remote URL?
pub fn is_ssh_url(url: &str) -> bool {
    url.trim().starts_with("git@")
}

/// `https://...` style remote URL?
pub fn is_https_url(url: &str) -> bool {
    url.trim().starts_with("https://")
}

/// Trim, strip trailing slashes, append `.git` when missing. Idempotent.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return String::new();
    }
    if url.ends_with(".git") {
        url.to_string()
    } else {
        format!("{url}.git")
    }
}

/// Rewrite an HTTPS GitHub URL into the `git@github.com:` form.
pub fn to_ssh_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("github.com") {
        url.replacen("https://github.com/", "git@github.com:", 1)
            .replacen("http://github.com/", "git@github.com:", 1)
    } else {
        url.to_string()
    }
}

/// Rewrite a `git@github.com:` URL into the HTTPS form.
pub fn to_https_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("git@github.com:") {
        url.replacen("git@github.com:", "https://github.com/", 1)
    } else {
        url.to_string()
    }
}

/// Escape characters that have historically broken commit invocations.
/// Kept for parity with persisted messages from earlier versions; the
/// exec path here never goes through a shell.
pub fn sanitize_commit_message(message: &str) -> String {
    message
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('$', "\\$")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str, mode: ConnectionMode, token: Option<&str>) -> RepositoryTarget {
        RepositoryTarget {
            local_path: PathBuf::from("/tmp/repo"),
            remote_url: url.to_string(),
            branch: "main".to_string(),
            file_pattern: ".".to_string(),
            mode,
            token: token.map(String::from),
        }
    }

    #[test]
    fn normalize_appends_git_suffix() {
        assert_eq!(
            normalize_url("https://github.com/u/r"),
            "https://github.com/u/r.git"
        );
        assert_eq!(
            normalize_url("https://github.com/u/r/"),
            "https://github.com/u/r.git"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_url("https://github.com/u/r");
        assert_eq!(normalize_url(&once), once);

        let ssh = normalize_url("git@github.com:u/r.git");
        assert_eq!(normalize_url(&ssh), ssh);
    }

    #[test]
    fn conversions_between_forms() {
        assert_eq!(
            to_ssh_url("https://github.com/u/r.git"),
            "git@github.com:u/r.git"
        );
        assert_eq!(
            to_https_url("git@github.com:u/r.git"),
            "https://github.com/u/r.git"
        );
        // Non-GitHub hosts pass through untouched
        assert_eq!(
            to_ssh_url("https://gitlab.example.com/u/r.git"),
            "https://gitlab.example.com/u/r.git"
        );
    }

    #[test]
    fn effective_url_rewrites_scheme_mismatch() {
        let t = target("https://github.com/u/r", ConnectionMode::Ssh, None);
        assert_eq!(t.effective_url(), "git@github.com:u/r.git");

        let t = target("git@github.com:u/r.git", ConnectionMode::Https, None);
        assert_eq!(t.effective_url(), "https://github.com/u/r.git");
    }

    #[test]
    fn effective_url_matches_end_to_end_scenario() {
        let t = target("https://github.com/u/r", ConnectionMode::Https, None);
        assert_eq!(t.effective_url(), "https://github.com/u/r.git");
    }

    #[test]
    fn push_url_embeds_token_for_https() {
        let t = target("https://github.com/u/r", ConnectionMode::Https, Some("ghp_x"));
        assert_eq!(t.push_url(), "https://ghp_x@github.com/u/r.git");
    }

    #[test]
    fn push_url_leaves_ssh_unmodified() {
        let t = target("git@github.com:u/r.git", ConnectionMode::Ssh, Some("ghp_x"));
        assert_eq!(t.push_url(), "git@github.com:u/r.git");
    }

    #[test]
    fn host_extraction() {
        let t = target("git@github.com:u/r.git", ConnectionMode::Ssh, None);
        assert_eq!(t.host(), "github.com");

        let t = target("https://github.com/u/r", ConnectionMode::Https, None);
        assert_eq!(t.host(), "github.com");
    }

    #[test]
    fn sanitize_escapes_shell_metacharacters() {
        assert_eq!(
            sanitize_commit_message(r#"fix "quote" `tick` $var"#),
            r#"fix \"quote\" \`tick\` \$var"#
        );
    }
}
