//! git-publish: publish a local directory to a GitHub repository.
//!
//! This crate wraps the git CLI in a typed publish workflow: initialize,
//! configure the remote, stage, commit, push, and resolve a rejected push
//! through an explicit three-way decision (rebase, force, abort).

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;

pub use config::Settings;
pub use domain::{ConflictDecision, ConnectionMode, PublishOutcome, RepositoryTarget};
pub use error::{AppError, Result};
pub use services::PushWorkflow;
