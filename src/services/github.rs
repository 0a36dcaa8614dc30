//! GitHub token validation.
//!
//! One authenticated call to the "current user" endpoint; the granted
//! scopes come back in the `x-oauth-scopes` response header.

use crate::error::{GitError, GitResult};
use reqwest::StatusCode;
use serde::Deserialize;

pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// What a token is good for
#[derive(Debug, Clone)]
pub struct TokenStatus {
    pub login: String,
    pub scopes: Vec<String>,
}

impl TokenStatus {
    /// Pushing needs the `repo` scope.
    pub fn has_repo_scope(&self) -> bool {
        self.scopes.iter().any(|scope| scope == "repo")
    }
}

/// Validate a token against `GET <api_base>/user`.
pub async fn validate_token(api_base: &str, token: &str) -> GitResult<TokenStatus> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{api_base}/user"))
        .header("Authorization", format!("Bearer {token}"))
        .header("User-Agent", "git-publish")
        .header("Accept", "application/vnd.github+json")
        .send()
        .await
        .map_err(|e| GitError::Api(e.to_string()))?;

    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(GitError::TokenRejected),
        status if !status.is_success() => {
            return Err(GitError::Api(format!("GitHub returned {status}")))
        }
        _ => {}
    }

    let scopes: Vec<String> = response
        .headers()
        .get("x-oauth-scopes")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .map(|scope| scope.trim().to_string())
                .filter(|scope| !scope.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let user: GitHubUser = response
        .json()
        .await
        .map_err(|e| GitError::Api(e.to_string()))?;

    tracing::info!(login = %user.login, ?scopes, "token accepted");
    Ok(TokenStatus {
        login: user.login,
        scopes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reads_login_and_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-oauth-scopes", "gist, repo")
                    .set_body_json(serde_json::json!({ "login": "octocat" })),
            )
            .mount(&server)
            .await;

        let status = validate_token(&server.uri(), "tok").await.unwrap();
        assert_eq!(status.login, "octocat");
        assert_eq!(status.scopes, vec!["gist", "repo"]);
        assert!(status.has_repo_scope());
    }

    #[tokio::test]
    async fn missing_repo_scope_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-oauth-scopes", "gist")
                    .set_body_json(serde_json::json!({ "login": "octocat" })),
            )
            .mount(&server)
            .await;

        let status = validate_token(&server.uri(), "tok").await.unwrap();
        assert!(!status.has_repo_scope());
    }

    #[tokio::test]
    async fn unauthorized_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = validate_token(&server.uri(), "bad").await.unwrap_err();
        assert!(matches!(err, GitError::TokenRejected));
    }

    #[tokio::test]
    async fn server_error_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = validate_token(&server.uri(), "tok").await.unwrap_err();
        assert!(matches!(err, GitError::Api(_)));
    }
}
