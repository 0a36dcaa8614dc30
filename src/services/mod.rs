//! Infrastructure services for git-publish.
//!
//! This module contains:
//! - GitClient: typed wrappers over the git CLI
//! - PushWorkflow: the publish sequence and conflict resolution
//! - KnownHostsTrust: SSH host-key trust management
//! - process: external command execution behind the CommandRunner seam
//! - github: access-token validation

pub mod git;
pub mod github;
pub mod process;
pub mod trust;
pub mod workflow;

pub use git::{GitClient, Identity, PushOptions};
pub use github::{validate_token, TokenStatus, GITHUB_API_BASE};
pub use process::{CommandResult, CommandRunner, SystemRunner, DEFAULT_COMMAND_TIMEOUT};
pub use trust::{check_ssh, ensure_key, HostTrust, KeySetup, KnownHostsTrust, SshStatus};
pub use workflow::{AbortOnConflict, DecisionProvider, PushWorkflow, ScriptedDecisions};
