//! The publish workflow: initialize, stage, commit, push, and resolve a
//! rejected push through an explicit user decision.
//!
//! Every external-command failure is classified once, here, and mapped to
//! a terminal `PublishOutcome`; nothing is re-thrown past this boundary.
//! At most one retry happens automatically (the host-key fix); every other
//! recovery requires a decision from the `DecisionProvider`.

use crate::domain::{
    classify_stderr, sanitize_commit_message, AuthFailureKind, ConflictDecision, ConnectionMode,
    PublishOutcome, PushErrorKind, RepositoryTarget,
};
use crate::error::{GitError, GitResult};
use crate::services::git::{GitClient, PushOptions};
use crate::services::process::CommandResult;
use crate::services::trust::HostTrust;
use async_trait::async_trait;

/// Seam through which the interaction layer answers the conflict prompts
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Pick one of the three ways out of a rejected push.
    async fn resolve_conflict(&self, branch: &str) -> ConflictDecision;

    /// Secondary confirmation gating every force push. A force push
    /// discards remote commits that are absent locally.
    async fn confirm_force(&self) -> bool;
}

/// Non-interactive provider: always abort, never force.
pub struct AbortOnConflict;

#[async_trait]
impl DecisionProvider for AbortOnConflict {
    async fn resolve_conflict(&self, _branch: &str) -> ConflictDecision {
        ConflictDecision::Abort
    }

    async fn confirm_force(&self) -> bool {
        false
    }
}

/// Provider with a predetermined answer, for flags and tests
pub struct ScriptedDecisions {
    decision: ConflictDecision,
    confirm: bool,
}

impl ScriptedDecisions {
    pub fn new(decision: ConflictDecision, confirm: bool) -> Self {
        Self { decision, confirm }
    }
}

#[async_trait]
impl DecisionProvider for ScriptedDecisions {
    async fn resolve_conflict(&self, _branch: &str) -> ConflictDecision {
        self.decision
    }

    async fn confirm_force(&self) -> bool {
        self.confirm
    }
}

/// Orchestrates the publish sequence against a `RepositoryTarget`
pub struct PushWorkflow {
    git: GitClient,
    trust: Box<dyn HostTrust>,
    decisions: Box<dyn DecisionProvider>,
}

impl PushWorkflow {
    pub fn new(
        git: GitClient,
        trust: Box<dyn HostTrust>,
        decisions: Box<dyn DecisionProvider>,
    ) -> Self {
        Self {
            git,
            trust,
            decisions,
        }
    }

    pub fn git(&self) -> &GitClient {
        &self.git
    }

    /// Initialize the working tree as a repository and point `origin` at
    /// the target, replacing any existing `origin`.
    pub async fn init_repository(&self, target: &RepositoryTarget) -> GitResult<()> {
        let repo = &target.local_path;
        if !repo.exists() {
            std::fs::create_dir_all(repo)?;
        }

        if self.git.is_repository(repo) {
            tracing::debug!(path = %repo.display(), "repository already initialized");
        } else {
            self.git.init(repo).await?;
        }

        if self.git.remote_exists(repo, "origin").await? {
            self.git.remove_remote(repo, "origin").await?;
        }
        self.git
            .add_remote(repo, "origin", &target.effective_url())
            .await?;
        self.git.rename_branch(repo, &target.branch).await?;
        Ok(())
    }

    /// Stage the target's pattern and commit. Returns false when the
    /// working tree has nothing to commit. The committer identity is
    /// checked first so a missing config surfaces as a directed error
    /// rather than a raw commit failure.
    pub async fn commit(&self, target: &RepositoryTarget, message: &str) -> GitResult<bool> {
        let repo = &target.local_path;
        if !self.git.is_repository(repo) {
            return Err(GitError::NotARepository(repo.clone()));
        }

        self.git.stage(repo, &target.file_pattern).await?;
        if !self.git.has_changes(repo).await? {
            tracing::info!("no changes to commit");
            return Ok(false);
        }

        if !self.git.identity(repo).await?.is_complete() {
            return Err(GitError::IdentityUnset);
        }
        self.git
            .commit(repo, &sanitize_commit_message(message))
            .await?;
        Ok(true)
    }

    /// The full sequence: preflight, init, remote setup, stage, commit,
    /// push. A clean working tree is tolerated; there may be unpushed
    /// commits.
    pub async fn upload(&self, target: &RepositoryTarget, message: &str) -> PublishOutcome {
        let prepared: GitResult<()> = async {
            self.git.version().await?;
            self.init_repository(target).await?;
            self.commit(target, message).await?;
            Ok(())
        }
        .await;

        match prepared {
            Ok(()) => self.publish(target).await,
            Err(e) => PublishOutcome::Failed(e.to_string()),
        }
    }

    /// Publish the target's branch to the configured remote, resolving a
    /// rejected push through the decision provider. Always terminal.
    pub async fn publish(&self, target: &RepositoryTarget) -> PublishOutcome {
        match self.try_publish(target).await {
            Ok(outcome) => outcome,
            Err(e) => PublishOutcome::Failed(e.to_string()),
        }
    }

    async fn try_publish(&self, target: &RepositoryTarget) -> GitResult<PublishOutcome> {
        let repo = &target.local_path;

        // Pre-push trust step, SSH only. Non-fatal: the push itself will
        // surface a real host-key problem.
        if target.mode == ConnectionMode::Ssh {
            if let Err(e) = self.trust.ensure_trusted(&target.host()).await {
                tracing::warn!(error = %e, "host trust setup failed, continuing");
            }
        }

        let remote = self.push_remote(target);
        let first = self
            .git
            .push(
                repo,
                &remote,
                &target.branch,
                PushOptions {
                    force: false,
                    set_upstream: true,
                },
            )
            .await?;

        if first.succeeded {
            return Ok(PublishOutcome::Published);
        }
        if first.timed_out {
            return Ok(PublishOutcome::TimedOut);
        }

        match classify_stderr(&first.stderr) {
            PushErrorKind::HostKeyFailure if target.mode == ConnectionMode::Ssh => {
                self.retry_after_trust_fix(target, &remote).await
            }
            PushErrorKind::Rejected => self.resolve_conflict(target, &remote).await,
            kind => Ok(Self::terminal_outcome(kind, &first)),
        }
    }

    /// The single automatic recovery: refresh the trust list and push
    /// again, once. The retried result is re-classified, except that a
    /// second host-key failure is terminal.
    async fn retry_after_trust_fix(
        &self,
        target: &RepositoryTarget,
        remote: &str,
    ) -> GitResult<PublishOutcome> {
        tracing::info!("host key verification failed, refreshing trust and retrying once");
        if let Err(e) = self.trust.ensure_trusted(&target.host()).await {
            tracing::warn!(error = %e, "host trust refresh failed");
        }

        let retry = self
            .git
            .push(
                &target.local_path,
                remote,
                &target.branch,
                PushOptions {
                    force: false,
                    set_upstream: true,
                },
            )
            .await?;

        if retry.succeeded {
            return Ok(PublishOutcome::Published);
        }
        if retry.timed_out {
            return Ok(PublishOutcome::TimedOut);
        }
        match classify_stderr(&retry.stderr) {
            PushErrorKind::Rejected => self.resolve_conflict(target, remote).await,
            // No further auto-retry for a repeated host-key failure
            PushErrorKind::HostKeyFailure => {
                Ok(PublishOutcome::Failed(retry.stderr.trim().to_string()))
            }
            kind => Ok(Self::terminal_outcome(kind, &retry)),
        }
    }

    /// Conflict sub-workflow. Entered at most once per publish attempt.
    async fn resolve_conflict(
        &self,
        target: &RepositoryTarget,
        remote: &str,
    ) -> GitResult<PublishOutcome> {
        let repo = &target.local_path;
        tracing::info!(branch = %target.branch, "push rejected, remote has diverged");

        match self.decisions.resolve_conflict(&target.branch).await {
            ConflictDecision::Abort => {
                tracing::info!("conflict resolution aborted by user");
                Ok(PublishOutcome::Aborted)
            }
            ConflictDecision::MergeViaRebase => {
                let pull = self.git.pull_rebase(repo, remote, &target.branch).await?;
                if !pull.succeeded && Self::has_content_conflict(&pull) {
                    tracing::warn!("rebase stopped on a content conflict");
                    return Ok(PublishOutcome::ManualResolutionRequired);
                }

                let retry = self
                    .git
                    .push(repo, remote, &target.branch, PushOptions::default())
                    .await?;
                if retry.succeeded {
                    Ok(PublishOutcome::Published)
                } else if retry.timed_out {
                    Ok(PublishOutcome::TimedOut)
                } else {
                    Ok(PublishOutcome::Failed(retry.stderr.trim().to_string()))
                }
            }
            ConflictDecision::ForceOverwrite => {
                if !self.decisions.confirm_force().await {
                    tracing::info!("force push declined at confirmation");
                    return Ok(PublishOutcome::Aborted);
                }
                tracing::warn!("force pushing, remote-only commits will be discarded");
                let forced = self
                    .git
                    .push(
                        repo,
                        remote,
                        &target.branch,
                        PushOptions {
                            force: true,
                            set_upstream: false,
                        },
                    )
                    .await?;
                if forced.succeeded {
                    Ok(PublishOutcome::Published)
                } else if forced.timed_out {
                    Ok(PublishOutcome::TimedOut)
                } else {
                    Ok(PublishOutcome::Failed(forced.stderr.trim().to_string()))
                }
            }
        }
    }

    /// HTTPS with a token pushes straight to the credentialed URL; SSH
    /// (and tokenless HTTPS) goes through the configured remote.
    fn push_remote(&self, target: &RepositoryTarget) -> String {
        match (&target.mode, &target.token) {
            (ConnectionMode::Https, Some(_)) => target.push_url(),
            _ => "origin".to_string(),
        }
    }

    fn has_content_conflict(pull: &CommandResult) -> bool {
        pull.stdout.contains("CONFLICT") || pull.stderr.contains("CONFLICT")
    }

    fn terminal_outcome(kind: PushErrorKind, result: &CommandResult) -> PublishOutcome {
        match kind {
            PushErrorKind::SshAuthFailure => {
                PublishOutcome::AuthFailed(AuthFailureKind::SshKeyMissing)
            }
            PushErrorKind::TokenRejected => {
                PublishOutcome::AuthFailed(AuthFailureKind::CredentialRejected)
            }
            _ => PublishOutcome::Failed(result.stderr.trim().to_string()),
        }
    }
}
