//! Command-line surface and interactive conflict prompts.

use crate::config::Settings;
use crate::domain::{ConflictDecision, ConnectionMode};
use crate::services::workflow::DecisionProvider;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "git-publish",
    version,
    about = "Publish a local directory to a GitHub repository over SSH or HTTPS"
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: TargetOverrides,

    /// Answer the conflict prompt without asking (merge|force|abort)
    #[arg(long, global = true, value_name = "STRATEGY")]
    pub on_conflict: Option<ConflictStrategy>,

    /// Required for a scripted force push; without it the push is refused
    #[arg(long, global = true)]
    pub confirm_force: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-invocation overrides of the persisted settings
#[derive(Debug, Args)]
pub struct TargetOverrides {
    /// Local working tree
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Remote repository URL (either form)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Branch to publish
    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Pathspec handed to `git add`
    #[arg(long, global = true)]
    pub pattern: Option<String>,

    /// Transport: ssh or https
    #[arg(long, global = true)]
    pub mode: Option<ConnectionMode>,

    /// Personal access token for HTTPS pushes
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl TargetOverrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(repo) = &self.repo {
            settings.repo_path = repo.display().to_string();
        }
        if let Some(url) = &self.url {
            settings.git_url = url.clone();
        }
        if let Some(branch) = &self.branch {
            settings.branch = branch.clone();
        }
        if let Some(pattern) = &self.pattern {
            settings.file_pattern = pattern.clone();
        }
        if let Some(mode) = self.mode {
            settings.connection_type = mode;
        }
        if let Some(token) = &self.token {
            settings.github_token = token.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize, configure the remote, stage, commit, and push
    Publish {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// git init plus remote and branch configuration only
    Init,
    /// Stage the file pattern and commit locally
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Push already-committed work, resolving conflicts interactively
    Push,
    /// Show branch, remotes, and working tree status
    Status,
    /// List the remote's branches
    DetectBranch,
    /// Show the git identity commits would be recorded under
    CheckConfig,
    /// Set the global git user.name and user.email
    SetIdentity {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Validate the configured GitHub token
    CheckToken,
    /// Probe SSH connectivity to the remote host
    CheckSsh,
    /// Generate an SSH key pair if needed and trust the remote host
    SetupSsh,
    /// Persist the current settings (after overrides) to the user config
    SaveConfig,
}

/// Scripted answer to the conflict prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictStrategy {
    Merge,
    Force,
    Abort,
}

impl From<ConflictStrategy> for ConflictDecision {
    fn from(strategy: ConflictStrategy) -> Self {
        match strategy {
            ConflictStrategy::Merge => ConflictDecision::MergeViaRebase,
            ConflictStrategy::Force => ConflictDecision::ForceOverwrite,
            ConflictStrategy::Abort => ConflictDecision::Abort,
        }
    }
}

/// Interactive provider reading the decision from stdin
pub struct PromptDecisions;

impl PromptDecisions {
    /// Stdin reads are blocking, so they run on the blocking pool rather
    /// than stalling a runtime worker.
    async fn read_line(prompt: &'static str) -> String {
        tokio::task::spawn_blocking(move || {
            print!("{prompt}");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return String::new();
            }
            line.trim().to_ascii_lowercase()
        })
        .await
        .unwrap_or_default()
    }

    fn parse_choice(answer: &str) -> Option<ConflictDecision> {
        match answer {
            "m" | "merge" => Some(ConflictDecision::MergeViaRebase),
            "f" | "force" => Some(ConflictDecision::ForceOverwrite),
            "a" | "abort" | "" => Some(ConflictDecision::Abort),
            _ => None,
        }
    }
}

#[async_trait]
impl DecisionProvider for PromptDecisions {
    async fn resolve_conflict(&self, branch: &str) -> ConflictDecision {
        println!("The remote branch '{branch}' has commits that are not present locally.");
        println!("  [m] pull --rebase and retry the push (recommended)");
        println!("  [f] force push, overwriting the remote history");
        println!("  [a] abort");
        loop {
            let answer = Self::read_line("choice [m/f/a]: ").await;
            match Self::parse_choice(&answer) {
                Some(decision) => return decision,
                None => println!("unrecognized choice '{answer}'"),
            }
        }
    }

    async fn confirm_force(&self) -> bool {
        println!(
            "A force push discards every remote commit that is not present locally. \
             This cannot be undone."
        );
        Self::read_line("type 'yes' to continue: ").await == "yes"
    }
}
