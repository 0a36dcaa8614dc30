//! Thin typed wrappers over the git CLI.
//!
//! Each method issues exactly one git invocation through the runner and
//! maps a failed exit to `GitError::Operation` with the stderr text, except
//! `push` and `pull_rebase`, which return the raw result so the workflow
//! can classify it.

use crate::error::{GitError, GitResult};
use crate::services::process::{CommandResult, CommandRunner};
use std::path::Path;
use std::sync::Arc;

/// Options for a push invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    pub force: bool,
    pub set_upstream: bool,
}

/// The committer identity git would use, with either half possibly unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.email.is_some()
    }
}

/// Git CLI client
#[derive(Clone)]
pub struct GitClient {
    runner: Arc<dyn CommandRunner>,
}

impl GitClient {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn git(&self, repo: &Path, args: &[&str]) -> GitResult<CommandResult> {
        self.runner.run("git", args, repo).await
    }

    async fn git_checked(&self, repo: &Path, args: &[&str]) -> GitResult<CommandResult> {
        let result = self.git(repo, args).await?;
        if !result.succeeded {
            return Err(GitError::Operation(result.stderr.trim().to_string()));
        }
        Ok(result)
    }

    /// Preflight: is git installed at all?
    pub async fn version(&self) -> GitResult<String> {
        let result = self
            .git(Path::new("."), &["--version"])
            .await
            .map_err(|_| GitError::NotInstalled)?;
        if !result.succeeded {
            return Err(GitError::NotInstalled);
        }
        Ok(result.stdout.trim().to_string())
    }

    pub fn is_repository(&self, repo: &Path) -> bool {
        repo.join(".git").exists()
    }

    pub async fn init(&self, repo: &Path) -> GitResult<()> {
        self.git_checked(repo, &["init"]).await?;
        Ok(())
    }

    pub async fn remote_exists(&self, repo: &Path, name: &str) -> GitResult<bool> {
        let result = self.git(repo, &["remote"]).await?;
        Ok(result.succeeded && result.stdout.split_whitespace().any(|r| r == name))
    }

    pub async fn add_remote(&self, repo: &Path, name: &str, url: &str) -> GitResult<()> {
        self.git_checked(repo, &["remote", "add", name, url]).await?;
        Ok(())
    }

    pub async fn remove_remote(&self, repo: &Path, name: &str) -> GitResult<()> {
        self.git_checked(repo, &["remote", "remove", name]).await?;
        Ok(())
    }

    /// `git branch -M <name>`. Best effort: fails on a repo with no
    /// commits yet, which is fine before the first commit.
    pub async fn rename_branch(&self, repo: &Path, branch: &str) -> GitResult<()> {
        let result = self.git(repo, &["branch", "-M", branch]).await?;
        if !result.succeeded {
            tracing::debug!(branch, stderr = %result.stderr.trim(), "branch rename skipped");
        }
        Ok(())
    }

    /// A single config value, or None when the key is unset. A nonzero
    /// exit from `git config <key>` means unset, not failure.
    async fn config_value(&self, repo: &Path, args: &[&str]) -> GitResult<Option<String>> {
        let result = self.git(repo, args).await?;
        let value = result.stdout.trim();
        if !result.succeeded || value.is_empty() {
            return Ok(None);
        }
        Ok(Some(value.to_string()))
    }

    /// The identity a commit in `repo` would be recorded under (local
    /// config included).
    pub async fn identity(&self, repo: &Path) -> GitResult<Identity> {
        Ok(Identity {
            name: self.config_value(repo, &["config", "user.name"]).await?,
            email: self.config_value(repo, &["config", "user.email"]).await?,
        })
    }

    /// The global identity, independent of any repository.
    pub async fn global_identity(&self) -> GitResult<Identity> {
        let cwd = Path::new(".");
        Ok(Identity {
            name: self
                .config_value(cwd, &["config", "--global", "user.name"])
                .await?,
            email: self
                .config_value(cwd, &["config", "--global", "user.email"])
                .await?,
        })
    }

    /// Write `user.name` and `user.email` to the global config.
    pub async fn set_global_identity(&self, name: &str, email: &str) -> GitResult<()> {
        let cwd = Path::new(".");
        self.git_checked(cwd, &["config", "--global", "user.name", name])
            .await?;
        self.git_checked(cwd, &["config", "--global", "user.email", email])
            .await?;
        Ok(())
    }

    pub async fn stage(&self, repo: &Path, pattern: &str) -> GitResult<()> {
        self.git_checked(repo, &["add", pattern]).await?;
        Ok(())
    }

    /// Anything staged or unstaged according to `status --short`?
    pub async fn has_changes(&self, repo: &Path) -> GitResult<bool> {
        let result = self.git_checked(repo, &["status", "--short"]).await?;
        Ok(!result.stdout.trim().is_empty())
    }

    pub async fn commit(&self, repo: &Path, message: &str) -> GitResult<()> {
        self.git_checked(repo, &["commit", "-m", message]).await?;
        Ok(())
    }

    /// Push `branch` to `remote` (a remote name or a full URL). Returns the
    /// raw result; classification is the caller's concern.
    pub async fn push(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
        opts: PushOptions,
    ) -> GitResult<CommandResult> {
        let mut args = vec!["push"];
        if opts.force {
            args.push("-f");
        }
        if opts.set_upstream {
            args.push("-u");
        }
        args.push(remote);
        args.push(branch);
        self.git(repo, &args).await
    }

    /// `git pull --rebase <remote> <branch>`, raw result.
    pub async fn pull_rebase(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> GitResult<CommandResult> {
        self.git(repo, &["pull", "--rebase", remote, branch]).await
    }

    pub async fn current_branch(&self, repo: &Path) -> GitResult<String> {
        let result = self
            .git_checked(repo, &["branch", "--show-current"])
            .await?;
        Ok(result.stdout.trim().to_string())
    }

    /// Branch names on the remote, via `ls-remote --heads`.
    pub async fn remote_branches(&self, repo: &Path) -> GitResult<Vec<String>> {
        let result = self
            .git_checked(repo, &["ls-remote", "--heads", "origin"])
            .await?;
        let branches = result
            .stdout
            .lines()
            .filter_map(|line| line.split("refs/heads/").nth(1))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Ok(branches)
    }

    /// Working tree status, remotes, and current branch as display text.
    pub async fn status_report(&self, repo: &Path) -> GitResult<String> {
        if !self.is_repository(repo) {
            return Err(GitError::NotARepository(repo.to_path_buf()));
        }
        let branch = self.current_branch(repo).await?;
        let remotes = self.git_checked(repo, &["remote", "-v"]).await?;
        let status = self.git_checked(repo, &["status"]).await?;

        let mut report = String::new();
        if !branch.is_empty() {
            report.push_str(&format!("On branch {branch}\n"));
        }
        if !remotes.stdout.trim().is_empty() {
            report.push_str(&format!("Remotes:\n{}\n", remotes.stdout.trim_end()));
        }
        report.push_str(status.stdout.trim_end());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::SystemRunner;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn client() -> GitClient {
        GitClient::new(Arc::new(SystemRunner::new()))
    }

    async fn create_test_repo(git: &GitClient) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().to_path_buf();

        git.init(&path).await.unwrap();
        git.git_checked(&path, &["config", "user.email", "test@test.com"])
            .await
            .unwrap();
        git.git_checked(&path, &["config", "user.name", "Test"])
            .await
            .unwrap();

        (temp, path)
    }

    #[tokio::test]
    async fn version_reports_installed_git() {
        let version = client().version().await.unwrap();
        assert!(version.contains("git version"));
    }

    #[tokio::test]
    async fn init_creates_a_repository() {
        let git = client();
        let (_temp, path) = create_test_repo(&git).await;
        assert!(git.is_repository(&path));
    }

    #[tokio::test]
    async fn stage_and_commit_flow() {
        let git = client();
        let (_temp, path) = create_test_repo(&git).await;

        assert!(!git.has_changes(&path).await.unwrap());

        std::fs::write(path.join("README.md"), "# Test").unwrap();
        git.stage(&path, ".").await.unwrap();
        assert!(git.has_changes(&path).await.unwrap());

        git.commit(&path, "Initial commit").await.unwrap();
        assert!(!git.has_changes(&path).await.unwrap());
    }

    #[tokio::test]
    async fn remote_add_remove_roundtrip() {
        let git = client();
        let (_temp, path) = create_test_repo(&git).await;

        assert!(!git.remote_exists(&path, "origin").await.unwrap());
        git.add_remote(&path, "origin", "git@github.com:u/r.git")
            .await
            .unwrap();
        assert!(git.remote_exists(&path, "origin").await.unwrap());
        git.remove_remote(&path, "origin").await.unwrap();
        assert!(!git.remote_exists(&path, "origin").await.unwrap());
    }

    #[tokio::test]
    async fn rename_branch_after_first_commit() {
        let git = client();
        let (_temp, path) = create_test_repo(&git).await;

        std::fs::write(path.join("a.txt"), "a").unwrap();
        git.stage(&path, ".").await.unwrap();
        git.commit(&path, "first").await.unwrap();

        git.rename_branch(&path, "main").await.unwrap();
        assert_eq!(git.current_branch(&path).await.unwrap(), "main");
    }

    #[tokio::test]
    async fn status_report_mentions_branch() {
        let git = client();
        let (_temp, path) = create_test_repo(&git).await;

        std::fs::write(path.join("a.txt"), "a").unwrap();
        git.stage(&path, ".").await.unwrap();
        git.commit(&path, "first").await.unwrap();
        git.rename_branch(&path, "main").await.unwrap();

        let report = git.status_report(&path).await.unwrap();
        assert!(report.contains("On branch main"));
    }

    #[tokio::test]
    async fn identity_reads_local_config() {
        let git = client();
        let (_temp, path) = create_test_repo(&git).await;

        let identity = git.identity(&path).await.unwrap();
        assert_eq!(identity.name.as_deref(), Some("Test"));
        assert_eq!(identity.email.as_deref(), Some("test@test.com"));
        assert!(identity.is_complete());
    }

    #[tokio::test]
    async fn unset_identity_halves_are_none() {
        use crate::services::process::testing::ScriptedRunner;
        use crate::services::process::CommandResult;

        // git exits nonzero for an unset key; that is "unset", not an error
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("config user.name", CommandResult::success("Test\n"))
                .respond("config user.email", CommandResult::failure("")),
        );
        let git = GitClient::new(runner);

        let identity = git.identity(Path::new("/tmp/repo")).await.unwrap();
        assert_eq!(identity.name.as_deref(), Some("Test"));
        assert_eq!(identity.email, None);
        assert!(!identity.is_complete());
    }

    #[tokio::test]
    async fn set_global_identity_writes_both_keys() {
        use crate::services::process::testing::ScriptedRunner;

        let runner = Arc::new(ScriptedRunner::new());
        let git = GitClient::new(runner.clone());

        git.set_global_identity("Test", "test@test.com").await.unwrap();

        let calls = runner.calls();
        assert!(calls
            .iter()
            .any(|c| c.contains("config --global user.name Test")));
        assert!(calls
            .iter()
            .any(|c| c.contains("config --global user.email test@test.com")));
    }

    #[tokio::test]
    async fn status_report_requires_repository() {
        let git = client();
        let temp = TempDir::new().unwrap();
        let err = git.status_report(temp.path()).await.unwrap_err();
        assert!(matches!(err, GitError::NotARepository(_)));
    }
}
