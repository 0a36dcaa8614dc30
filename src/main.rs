//! git-publish: publish a local directory to a GitHub repository.
//!
//! Thin binary over the library: parse arguments, load settings, wire the
//! services together, and print the outcome.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use git_publish::cli::{Cli, Command, ConflictStrategy, PromptDecisions};
use git_publish::domain::PublishOutcome;
use git_publish::services::{
    check_ssh, ensure_key, validate_token, AbortOnConflict, CommandRunner, DecisionProvider,
    GitClient, HostTrust, KeySetup, KnownHostsTrust, PushWorkflow, ScriptedDecisions, SshStatus,
    SystemRunner, GITHUB_API_BASE,
};
use git_publish::Settings;

/// Initialize logging with RUST_LOG environment variable support
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn build_decisions(cli: &Cli) -> Box<dyn DecisionProvider> {
    match cli.on_conflict {
        None => Box::new(PromptDecisions),
        Some(ConflictStrategy::Abort) => Box::new(AbortOnConflict),
        Some(strategy) => Box::new(ScriptedDecisions::new(strategy.into(), cli.confirm_force)),
    }
}

fn report(outcome: PublishOutcome) -> Result<()> {
    match &outcome {
        PublishOutcome::Published => {
            println!("{outcome}");
            Ok(())
        }
        PublishOutcome::Aborted => {
            println!("{outcome}");
            Ok(())
        }
        _ => Err(anyhow!("{outcome}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    cli.overrides.apply(&mut settings);

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let git = GitClient::new(runner.clone());

    // Commands that do not need a complete target
    match &cli.command {
        Command::SaveConfig => {
            let path = settings.save()?;
            println!("configuration written to {}", path.display());
            return Ok(());
        }
        Command::CheckConfig => {
            let identity = git.global_identity().await?;
            println!(
                "user.name:  {}",
                identity.name.as_deref().unwrap_or("(not set)")
            );
            println!(
                "user.email: {}",
                identity.email.as_deref().unwrap_or("(not set)")
            );
            if !identity.is_complete() {
                return Err(anyhow!(
                    "incomplete git identity; run `git-publish set-identity --name ... --email ...`"
                ));
            }
            return Ok(());
        }
        Command::SetIdentity { name, email } => {
            git.set_global_identity(name, email).await?;
            println!("git identity saved: {name} <{email}>");
            return Ok(());
        }
        Command::SetupSsh => {
            let ssh_dir = directories::BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".ssh"))
                .unwrap_or_else(|| std::path::PathBuf::from(".ssh"));
            let comment = git
                .global_identity()
                .await
                .ok()
                .and_then(|identity| identity.email)
                .unwrap_or_else(|| "git-publish".to_string());

            let setup = ensure_key(runner.as_ref(), &ssh_dir, &comment).await?;
            if let KeySetup::Generated(_) = &setup {
                println!("generated a new ed25519 key pair in {}", ssh_dir.display());
            }

            let host = settings
                .to_target()
                .map(|t| t.host())
                .unwrap_or_else(|_| "github.com".to_string());
            let trust = KnownHostsTrust::new(runner.clone());
            trust.ensure_trusted(&host).await?;

            match check_ssh(runner.as_ref(), &host).await? {
                SshStatus::Configured => println!("SSH is configured for {host}"),
                SshStatus::KeyMissing => {
                    println!("add this public key to your account on {host}:");
                    println!("{}", setup.public_key());
                    return Err(anyhow!("public key is not registered with {host}"));
                }
                SshStatus::Unreachable => return Err(anyhow!("could not reach {host} over SSH")),
            }
            return Ok(());
        }
        Command::CheckToken => {
            let token = settings.github_token.trim();
            if token.is_empty() {
                return Err(anyhow!("no GitHub token configured"));
            }
            let status = validate_token(GITHUB_API_BASE, token).await?;
            println!("token accepted for {}", status.login);
            if status.has_repo_scope() {
                println!("repo scope granted");
            } else {
                println!("warning: token lacks the repo scope; pushes will be refused");
            }
            return Ok(());
        }
        Command::CheckSsh => {
            let host = settings
                .to_target()
                .map(|t| t.host())
                .unwrap_or_else(|_| "github.com".to_string());
            let trust = KnownHostsTrust::new(runner.clone());
            if let Err(e) = trust.ensure_trusted(&host).await {
                tracing::warn!(error = %e, "host trust setup failed");
            }
            match check_ssh(runner.as_ref(), &host).await? {
                SshStatus::Configured => println!("SSH is configured for {host}"),
                SshStatus::KeyMissing => {
                    return Err(anyhow!("SSH key is not registered with {host}"))
                }
                SshStatus::Unreachable => return Err(anyhow!("could not reach {host} over SSH")),
            }
            return Ok(());
        }
        _ => {}
    }

    let target = settings.to_target()?;
    let workflow = PushWorkflow::new(
        git,
        Box::new(KnownHostsTrust::new(runner.clone())),
        build_decisions(&cli),
    );

    match cli.command {
        Command::Publish { message } => report(workflow.upload(&target, &message).await),
        Command::Push => report(workflow.publish(&target).await),
        Command::Init => {
            workflow.git().version().await?;
            workflow.init_repository(&target).await?;
            println!(
                "initialized {} with origin {}",
                target.local_path.display(),
                target.effective_url()
            );
            Ok(())
        }
        Command::Commit { message } => {
            if workflow.commit(&target, &message).await? {
                println!("committed to {}", target.branch);
            } else {
                println!("nothing to commit");
            }
            Ok(())
        }
        Command::Status => {
            let report = workflow.git().status_report(&target.local_path).await?;
            println!("{report}");
            Ok(())
        }
        Command::DetectBranch => {
            let branches = workflow.git().remote_branches(&target.local_path).await?;
            if branches.is_empty() {
                println!("remote is empty; the first push will create '{}'", target.branch);
            } else {
                println!("remote branches: {}", branches.join(", "));
            }
            Ok(())
        }
        Command::SaveConfig
        | Command::CheckConfig
        | Command::SetIdentity { .. }
        | Command::CheckToken
        | Command::CheckSsh
        | Command::SetupSsh => unreachable!(),
    }
}
