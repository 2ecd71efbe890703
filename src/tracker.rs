use std::fmt;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;

const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const AGENT: &str = concat!("slashops/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_SNIPPET: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
}

/// An issue as the tracker reports it. Every field beyond the number is
/// optional so partial API payloads still decode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Actor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<Milestone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
    pub fn close() -> Self {
        IssueUpdate {
            state: Some("closed".to_string()),
            ..IssueUpdate::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.assignee.is_none()
            && self.state.is_none()
            && self.milestone.is_none()
            && self.labels.is_none()
    }
}

/// The operations commands need from an issue tracker. Handlers only ever
/// see this trait; the REST client below is one implementation, the tests
/// carry another.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, repo: &RepoRef, new_issue: &NewIssue) -> Result<Issue>;

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<Issue>;

    async fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<Issue>;
}

/// Thin client for a GitHub-v3-shaped issues API.
pub struct RestTracker {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let token = match config.token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => bail!("tracker token is not configured"),
        };
        Ok(RestTracker {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn issues_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/issues", self.base_url, repo.owner, repo.repo)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Issue> {
        let response = request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, AGENT)
            .send()
            .await
            .context("tracker request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_BODY_SNIPPET).collect();
            bail!("tracker responded {status}: {snippet}");
        }
        response
            .json::<Issue>()
            .await
            .context("decode tracker response")
    }
}

#[async_trait]
impl IssueTracker for RestTracker {
    async fn create_issue(&self, repo: &RepoRef, new_issue: &NewIssue) -> Result<Issue> {
        self.execute(self.client.post(self.issues_url(repo)).json(new_issue))
            .await
    }

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<Issue> {
        let url = format!("{}/{number}", self.issues_url(repo));
        self.execute(self.client.get(url)).await
    }

    async fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<Issue> {
        let url = format!("{}/{number}", self.issues_url(repo));
        self.execute(self.client.patch(url).json(update)).await
    }
}
