//! Domain entities for git-publish.
//!
//! This module contains the core value types:
//! - RepositoryTarget: where to publish and how to connect
//! - PublishOutcome: terminal result of a publish attempt
//! - ConflictDecision: the three-way choice on a rejected push

mod outcome;
mod target;

pub use outcome::{
    classify_stderr, AuthFailureKind, ConflictDecision, PublishOutcome, PushErrorKind,
};
pub use target::{
    is_https_url, is_ssh_url, normalize_url, sanitize_commit_message, to_https_url, to_ssh_url,
    ConnectionMode, RepositoryTarget,
};
