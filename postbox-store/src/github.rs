//! GitHub contents API client.
//!
//! ```text
//! GET {api}/repos/{owner}/{repo}/contents/{path}?ref={branch}  -> { sha, content (base64) }
//! PUT {api}/repos/{owner}/{repo}/contents/{path}               <- { message, content, branch, sha? }
//! GET {api}/user                                               -> { login }
//! GET {api}/repos/{owner}/{repo}                               -> { permissions: { push } }
//! ```

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use postbox_core::{RepoConfig, VersionToken};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::contents::{AccessToken, ContentStore, FileWrite, Identity, RemoteFile, RepositoryAccess};
use crate::error::{malformed, StoreError};

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("postbox/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Contents-API client bound to one repository and branch.
#[derive(Clone)]
pub struct GithubStore {
    client: Client,
    repo: RepoConfig,
    token: Option<AccessToken>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    permissions: Option<RepoPermissions>,
}

#[derive(Debug, Deserialize)]
struct RepoPermissions {
    #[serde(default)]
    push: bool,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl GithubStore {
    pub fn new(repo: RepoConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            repo,
            token: None,
        })
    }

    pub fn repo(&self) -> &RepoConfig {
        &self.repo
    }

    fn api_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.repo.api_base.trim_end_matches('/'), suffix)
    }

    fn contents_url(&self, path: &str) -> String {
        self.api_url(&format!(
            "repos/{}/{}/contents/{}",
            self.repo.owner,
            self.repo.name,
            path.trim_start_matches('/')
        ))
    }

    fn request(&self, method: Method, url: &str, token: Option<&AccessToken>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, ACCEPT);
        match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for GithubStore {
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let url = self.contents_url(path);
        tracing::debug!(path, "reading remote file");
        let response = self
            .request(Method::GET, &url, self.token.as_ref())
            .query(&[("ref", self.repo.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(read_error(path, status.as_u16(), message));
        }

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| malformed(path, e.to_string()))?;
        let content = match (body.content.as_deref(), body.encoding.as_deref()) {
            (Some(encoded), Some("base64") | None) => decode_content(path, encoded)?,
            (_, Some(other)) => {
                return Err(malformed(path, format!("unsupported encoding '{other}'")))
            }
            (None, _) => return Err(malformed(path, "response has no content")),
        };
        Ok(Some(RemoteFile {
            version: VersionToken(body.sha),
            content,
        }))
    }

    async fn write_file(
        &self,
        path: &str,
        write: FileWrite<'_>,
    ) -> Result<VersionToken, StoreError> {
        let Some(token) = self.token.as_ref() else {
            return Err(StoreError::MissingToken);
        };
        let body = PutBody {
            message: write.message,
            content: STANDARD.encode(write.content),
            branch: &self.repo.branch,
            sha: write.expected.map(|v| v.0.as_str()),
        };
        let url = self.contents_url(path);
        tracing::debug!(path, has_version = write.expected.is_some(), "writing remote file");
        let response = self
            .request(Method::PUT, &url, Some(token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(write_error(
                path,
                status.as_u16(),
                write.expected.is_some(),
                message,
            ));
        }

        let body: PutResponse = response
            .json()
            .await
            .map_err(|e| malformed(path, e.to_string()))?;
        Ok(VersionToken(body.content.sha))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.repo.raw_base.trim_end_matches('/'),
            self.repo.owner,
            self.repo.name,
            self.repo.branch,
            path.trim_start_matches('/')
        )
    }

    async fn identity(&self, token: &AccessToken) -> Result<Identity, StoreError> {
        let url = self.api_url("user");
        let response = self.request(Method::GET, &url, Some(token)).send().await?;
        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(StoreError::Unauthorized(
                "token was rejected by the identity endpoint".to_string(),
            ));
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(read_error("user", status.as_u16(), message));
        }
        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| malformed("user", e.to_string()))?;
        Ok(Identity { login: user.login })
    }

    async fn repository_access(
        &self,
        token: &AccessToken,
    ) -> Result<RepositoryAccess, StoreError> {
        let suffix = format!("repos/{}/{}", self.repo.owner, self.repo.name);
        let url = self.api_url(&suffix);
        let response = self.request(Method::GET, &url, Some(token)).send().await?;
        let status = response.status();
        // Private repositories the token cannot see answer 404.
        if status == StatusCode::NOT_FOUND {
            return Ok(RepositoryAccess { push: false });
        }
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(StoreError::Unauthorized(format!(
                "token was rejected for {suffix}"
            )));
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(read_error(&suffix, status.as_u16(), message));
        }
        let repo: RepoResponse = response
            .json()
            .await
            .map_err(|e| malformed(&suffix, e.to_string()))?;
        Ok(RepositoryAccess {
            push: repo.permissions.map(|p| p.push).unwrap_or(false),
        })
    }

    fn authorized(&self, token: AccessToken) -> Self {
        Self {
            client: self.client.clone(),
            repo: self.repo.clone(),
            token: Some(token),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// The API wraps base64 payloads at 60 columns; strip all whitespace first.
fn decode_content(path: &str, encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| malformed(path, format!("invalid base64 content: {e}")))
}

fn read_error(path: &str, status: u16, message: String) -> StoreError {
    match status {
        401 | 403 => StoreError::Unauthorized(format!("{path}: {message}")),
        _ => StoreError::Status {
            path: path.to_string(),
            status,
            message,
        },
    }
}

/// 409 is a stale token. 422 without a token means the file appeared
/// between our read and our create.
fn write_error(path: &str, status: u16, expected_supplied: bool, message: String) -> StoreError {
    match status {
        409 => StoreError::Conflict {
            path: path.to_string(),
        },
        422 if !expected_supplied => StoreError::Conflict {
            path: path.to_string(),
        },
        _ => read_error(path, status, message),
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) => serde_json::from_str::<ApiMessage>(&text)
            .map(|m| m.message)
            .unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    status.to_string()
                } else {
                    text
                }
            }),
        Err(_) => status.to_string(),
    }
}
