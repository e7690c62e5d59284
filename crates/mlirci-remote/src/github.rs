//! GitHub REST API client
//!
//! Uses `Authorization: token <t>` like the Jenkins droid account does.
//! GitHub rejects requests without a User-Agent.

use crate::error::{RemoteError, Result, check_status};
use mlirci_core::MergeableState;
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = concat!("mlirci/", env!("CARGO_PKG_VERSION"));

/// GitHub client
pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    mergeable_state: MergeableState,
}

#[derive(Debug, Deserialize)]
struct Commit {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: String,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

/// A posted issue comment
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
    pub body: String,
}

impl GitHubClient {
    /// Create a client. Without a token requests are anonymous.
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, token })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, format!("token {}", token)),
            None => builder,
        }
    }

    /// Mergeable state of a pull request (`pr_url` is the API URL)
    pub async fn mergeable_state(&self, pr_url: &str) -> Result<MergeableState> {
        let response = self.request(reqwest::Method::GET, pr_url).send().await?;
        let pr: PullRequest = check_status(response)?.json().await?;
        Ok(pr.mergeable_state)
    }

    /// Author date of a commit (`repo_api` is `.../repos/<owner>/<name>`)
    pub async fn commit_date(&self, repo_api: &str, sha: &str) -> Result<String> {
        let url = format!("{}/commits/{}", repo_api.trim_end_matches('/'), sha);
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let commit: Commit = check_status(response)?.json().await?;
        Ok(commit.commit.author.date)
    }

    /// Post a comment to an issue comments URL
    pub async fn post_comment(&self, comments_url: &str, body: &str) -> Result<Comment> {
        let response = self
            .request(reqwest::Method::POST, comments_url)
            .json(&NewComment { body })
            .send()
            .await?;
        let comment: Comment = check_status(response)?.json().await?;

        tracing::info!(
            url = %comment.url,
            created_at = %comment.created_at,
            updated_at = %comment.updated_at,
            body = %comment.body,
            "Posted PR comment"
        );
        Ok(comment)
    }
}

/// Issue comments URL for a pull request API URL
///
/// `.../repos/onnx/onnx-mlir/pulls/1234` -> `.../repos/onnx/onnx-mlir/issues/1234/comments`
pub fn comments_url(pr_url: &str) -> Result<String> {
    let trimmed = pr_url.trim_end_matches('/');
    let (prefix, number) = trimmed
        .rsplit_once("/pulls/")
        .filter(|(_, n)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| RemoteError::InvalidUrl(pr_url.to_string()))?;
    Ok(format!("{}/issues/{}/comments", prefix, number))
}
