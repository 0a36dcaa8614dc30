//! Host-key trust and SSH connectivity probing.
//!
//! `ensure_trusted` scans the remote host's keys and appends the missing
//! ones to the local known_hosts list. It is idempotent and its failure is
//! never fatal to a publish; the caller logs and continues.

use crate::error::{GitError, GitResult};
use crate::services::process::CommandRunner;
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Seam for the host-key trust step
#[async_trait]
pub trait HostTrust: Send + Sync {
    async fn ensure_trusted(&self, host: &str) -> GitResult<()>;
}

/// Outcome of the SSH connectivity probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshStatus {
    /// Host accepted the key
    Configured,
    /// Host reachable but the key is not registered there
    KeyMissing,
    /// Connection failed for another reason
    Unreachable,
}

/// Appends ssh-keyscan output to `~/.ssh/known_hosts`
pub struct KnownHostsTrust {
    runner: Arc<dyn CommandRunner>,
    known_hosts: PathBuf,
}

impl KnownHostsTrust {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let known_hosts = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
            .unwrap_or_else(|| PathBuf::from(".ssh/known_hosts"));
        Self {
            runner,
            known_hosts,
        }
    }

    pub fn with_path(runner: Arc<dyn CommandRunner>, known_hosts: PathBuf) -> Self {
        Self {
            runner,
            known_hosts,
        }
    }
}

#[async_trait]
impl HostTrust for KnownHostsTrust {
    async fn ensure_trusted(&self, host: &str) -> GitResult<()> {
        let result = self.runner.run("ssh-keyscan", &[host], Path::new(".")).await?;
        if !result.succeeded || result.stdout.trim().is_empty() {
            return Err(GitError::Operation(format!(
                "ssh-keyscan produced no keys for {host}: {}",
                result.stderr.trim()
            )));
        }

        let existing = fs::read_to_string(&self.known_hosts).unwrap_or_default();
        let missing: Vec<&str> = result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| !existing.lines().any(|known| known.trim() == *line))
            .collect();

        if missing.is_empty() {
            tracing::debug!(host, "host keys already trusted");
            return Ok(());
        }

        if let Some(parent) = self.known_hosts.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.known_hosts)?;
        for line in &missing {
            writeln!(file, "{line}")?;
        }
        tracing::info!(host, added = missing.len(), "host keys added to trust list");
        Ok(())
    }
}

/// Result of the key setup step, carrying the public key so the caller
/// can show it for registration with the remote host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySetup {
    /// A key pair already existed
    Existing(String),
    /// A new ed25519 key pair was generated, unprotected
    Generated(String),
}

impl KeySetup {
    pub fn public_key(&self) -> &str {
        match self {
            Self::Existing(key) | Self::Generated(key) => key,
        }
    }
}

/// Make sure `<ssh_dir>/id_ed25519` exists, generating it without a
/// passphrase when missing, and return the public key text.
pub async fn ensure_key(
    runner: &dyn CommandRunner,
    ssh_dir: &Path,
    comment: &str,
) -> GitResult<KeySetup> {
    let key_file = ssh_dir.join("id_ed25519");
    let pub_file = ssh_dir.join("id_ed25519.pub");

    let generated = if key_file.exists() {
        tracing::debug!(path = %key_file.display(), "key pair already present");
        false
    } else {
        fs::create_dir_all(ssh_dir)?;
        let key_arg = key_file.display().to_string();
        let result = runner
            .run(
                "ssh-keygen",
                &["-t", "ed25519", "-C", comment, "-f", &key_arg, "-N", ""],
                Path::new("."),
            )
            .await?;
        if !result.succeeded {
            return Err(GitError::Operation(format!(
                "ssh-keygen failed: {}",
                result.stderr.trim()
            )));
        }
        tracing::info!(path = %key_file.display(), "key pair generated");
        true
    };

    let public_key = fs::read_to_string(&pub_file)?.trim().to_string();
    Ok(if generated {
        KeySetup::Generated(public_key)
    } else {
        KeySetup::Existing(public_key)
    })
}

/// Probe SSH connectivity the way `ssh -T git@<host>` reports it. The ssh
/// exit code is nonzero even on success, so only the text matters.
pub async fn check_ssh(runner: &dyn CommandRunner, host: &str) -> GitResult<SshStatus> {
    let login = format!("git@{host}");
    let result = runner
        .run(
            "ssh",
            &["-T", &login, "-o", "StrictHostKeyChecking=no"],
            Path::new("."),
        )
        .await?;

    let text = format!("{}\n{}", result.stdout, result.stderr);
    if text.contains("successfully authenticated") {
        Ok(SshStatus::Configured)
    } else if text.contains("Permission denied") {
        Ok(SshStatus::KeyMissing)
    } else {
        Ok(SshStatus::Unreachable)
    }
}
