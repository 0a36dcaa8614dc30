//! Publish outcomes and push-error classification.
//!
//! Classification is an ordered rule table rather than nested branches so
//! the tie-break between overlapping error texts is explicit and testable.

/// Terminal result of a publish attempt. Nothing is re-thrown past the
/// workflow boundary; every path ends in one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Push accepted by the remote
    Published,
    /// User chose to abort; local and remote state unchanged
    Aborted,
    /// Rebase hit a content conflict; user must resolve out-of-band
    ManualResolutionRequired,
    /// Credentials must be fixed out-of-band
    AuthFailed(AuthFailureKind),
    /// An external command exceeded its time budget
    TimedOut,
    /// Catch-all terminal failure with the raw error text
    Failed(String),
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Published)
    }

    /// Human-readable explanation for display.
    pub fn explanation(&self) -> String {
        match self {
            Self::Published => "push accepted by the remote".to_string(),
            Self::Aborted => "aborted; nothing was changed".to_string(),
            Self::ManualResolutionRequired => {
                "rebase stopped on a content conflict; resolve it in the working tree, \
                 run `git rebase --continue`, then push again"
                    .to_string()
            }
            Self::AuthFailed(AuthFailureKind::SshKeyMissing) => {
                "SSH authentication failed; add your public key to the remote host".to_string()
            }
            Self::AuthFailed(AuthFailureKind::CredentialRejected) => {
                "the remote rejected the access token; regenerate it with the repo scope"
                    .to_string()
            }
            Self::TimedOut => "an external command timed out".to_string(),
            Self::Failed(raw) => format!("push failed: {}", raw.trim()),
        }
    }
}

impl std::fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.explanation())
    }
}

/// Which credential needs fixing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    SshKeyMissing,
    CredentialRejected,
}

/// The three-way user decision on a rejected push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    MergeViaRebase,
    ForceOverwrite,
    Abort,
}

/// Classified kind of a failed push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushErrorKind {
    /// The remote host's key is not in the local trust list
    HostKeyFailure,
    /// Non-fast-forward rejection; recoverable via the conflict workflow
    Rejected,
    /// SSH key not accepted by the remote
    SshAuthFailure,
    /// HTTP 403, token invalid or underscoped
    TokenRejected,
    /// Anything else
    Other,
}

/// Classify a failed push's stderr. Rules are evaluated in priority order
/// and the first match wins: host-key failure is the only auto-recoverable
/// kind, and rejection (recoverable via the conflict workflow) precedes the
/// terminal auth kinds. A stderr matching both "rejected" and the
/// publickey pair therefore classifies as `Rejected`.
pub fn classify_stderr(stderr: &str) -> PushErrorKind {
    let text = stderr.to_ascii_lowercase();
    let rules: [(fn(&str) -> bool, PushErrorKind); 4] = [
        (
            |t| t.contains("host key verification failed"),
            PushErrorKind::HostKeyFailure,
        ),
        (
            |t| t.contains("rejected") || t.contains("non-fast-forward"),
            PushErrorKind::Rejected,
        ),
        (
            |t| t.contains("permission denied") && t.contains("publickey"),
            PushErrorKind::SshAuthFailure,
        ),
        (|t| t.contains("403"), PushErrorKind::TokenRejected),
    ];

    for (matches, kind) in rules {
        if matches(&text) {
            return kind;
        }
    }
    PushErrorKind::Other
}
