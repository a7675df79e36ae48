use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{AppError, AppResult};

use super::folders;
use super::messages;
use super::models::{DraftRequest, FolderCreation, FolderView, Message};
use super::store::MailStore;

const GRAPH_API_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const FOLDER_EXISTS_CODE: &str = "ErrorFolderExists";

#[derive(Debug, Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
    mailbox_root: String,
    timeout: Duration,
}

impl GraphClient {
    pub fn new(mailbox_root: impl Into<String>) -> Self {
        Self::with_base_url(GRAPH_API_BASE_URL, mailbox_root)
    }

    pub fn with_base_url(base_url: impl Into<String>, mailbox_root: impl Into<String>) -> Self {
        Self::with_timeout(
            base_url,
            mailbox_root,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Every request, paging included, is abandoned after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        mailbox_root: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: base_url.into(),
            mailbox_root: mailbox_root.into().trim_matches('/').to_string(),
            timeout,
        }
    }

    pub fn mailbox_root(&self) -> &str {
        &self.mailbox_root
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
        query: Option<&[(String, String)]>,
    ) -> AppResult<T> {
        let mut request = self.http.get(url).bearer_auth(access_token);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        self.parse_json_response(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .http
            .request(method, url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        self.parse_json_response(response).await
    }

    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        let base = self.base_url.trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    async fn parse_json_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_api_error(status, &body))
    }
}

#[async_trait]
impl MailStore for GraphClient {
    async fn list_unread(&self, access_token: &str, limit: u32) -> AppResult<Vec<Message>> {
        let url = self.endpoint_url(&messages::unread_endpoint(&self.mailbox_root))?;
        let query = messages::unread_query(limit);
        let page: GraphPage<GraphMessageResource> =
            self.get_json(url, access_token, Some(&query)).await?;

        Ok(page
            .value
            .into_iter()
            .map(GraphMessageResource::into_message)
            .collect())
    }

    async fn list_child_folders(&self, access_token: &str) -> AppResult<Vec<FolderView>> {
        let mut url = self.endpoint_url(&folders::inbox_children_endpoint(&self.mailbox_root))?;
        let first_query = folders::children_query();
        let mut query = Some(first_query.as_slice());
        let mut out = Vec::new();

        loop {
            let page: GraphPage<GraphFolderResource> =
                self.get_json(url, access_token, query).await?;
            out.extend(page.value.into_iter().map(|folder| FolderView {
                id: folder.id,
                display_name: folder.display_name,
            }));

            let Some(next) = page.next_link else {
                break;
            };
            debug!(next = %next, "following child folder page");
            url = Url::parse(&next)?;
            // nextLink already carries the original query.
            query = None;
        }

        Ok(out)
    }

    async fn create_child_folder(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> AppResult<FolderCreation> {
        let url = self.endpoint_url(&folders::inbox_children_endpoint(&self.mailbox_root))?;
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&GraphCreateFolderRequest { display_name })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let folder: GraphFolderResource = response.json().await?;
            return Ok(FolderCreation::Created(FolderView {
                id: folder.id,
                display_name: folder.display_name,
            }));
        }

        let body = response.text().await.unwrap_or_default();
        if is_folder_exists_error(status, &body) {
            return Ok(FolderCreation::AlreadyExists);
        }

        Err(map_api_error(status, &body))
    }

    async fn move_message(
        &self,
        access_token: &str,
        message_id: &str,
        folder_id: &str,
    ) -> AppResult<String> {
        let endpoint = messages::move_endpoint(&self.mailbox_root, message_id);
        let body = GraphMoveRequest {
            destination_id: folder_id,
        };
        let moved: GraphIdResource = self
            .send_json(Method::POST, &endpoint, access_token, &body)
            .await?;
        Ok(moved.id)
    }

    async fn mark_read(&self, access_token: &str, message_id: &str) -> AppResult<()> {
        let endpoint = messages::message_endpoint(&self.mailbox_root, message_id);
        let body = GraphReadStateRequest { is_read: true };
        let _: GraphIdResource = self
            .send_json(Method::PATCH, &endpoint, access_token, &body)
            .await?;
        Ok(())
    }

    async fn create_draft(&self, access_token: &str, draft: &DraftRequest) -> AppResult<String> {
        let endpoint = messages::drafts_endpoint(&self.mailbox_root);
        let body = GraphDraftRequest::from_request(draft);
        let created: GraphIdResource = self
            .send_json(Method::POST, &endpoint, access_token, &body)
            .await?;
        Ok(created.id)
    }
}

#[derive(Debug, Deserialize)]
struct GraphPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphMessageResource {
    id: String,
    subject: Option<String>,
    from: Option<GraphRecipient>,
    body: Option<GraphItemBody>,
    #[serde(rename = "isRead")]
    is_read: Option<bool>,
}

impl GraphMessageResource {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            subject: self.subject.unwrap_or_default(),
            sender: self
                .from
                .and_then(|from| from.email_address)
                .and_then(|address| address.address)
                .map(|address| address.trim().to_string())
                .unwrap_or_default(),
            body: self
                .body
                .and_then(|body| body.content)
                .unwrap_or_default(),
            is_read: self.is_read.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphRecipient {
    #[serde(rename = "emailAddress")]
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphItemBody {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphFolderResource {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct GraphIdResource {
    id: String,
}

#[derive(Debug, Serialize)]
struct GraphCreateFolderRequest<'a> {
    #[serde(rename = "displayName")]
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
struct GraphMoveRequest<'a> {
    #[serde(rename = "destinationId")]
    destination_id: &'a str,
}

#[derive(Debug, Serialize)]
struct GraphReadStateRequest {
    #[serde(rename = "isRead")]
    is_read: bool,
}

#[derive(Debug, Serialize)]
struct GraphDraftRequest<'a> {
    subject: &'a str,
    body: GraphDraftBody<'a>,
    #[serde(rename = "toRecipients")]
    to_recipients: Vec<GraphDraftRecipient<'a>>,
}

impl<'a> GraphDraftRequest<'a> {
    fn from_request(draft: &'a DraftRequest) -> Self {
        Self {
            subject: &draft.subject,
            body: GraphDraftBody {
                content_type: draft.format.content_type(),
                content: &draft.body,
            },
            to_recipients: vec![GraphDraftRecipient {
                email_address: GraphDraftAddress { address: &draft.to },
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphDraftBody<'a> {
    #[serde(rename = "contentType")]
    content_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct GraphDraftRecipient<'a> {
    #[serde(rename = "emailAddress")]
    email_address: GraphDraftAddress<'a>,
}

#[derive(Debug, Serialize)]
struct GraphDraftAddress<'a> {
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphApiErrorEnvelope {
    error: GraphApiError,
}

#[derive(Debug, Deserialize)]
struct GraphApiError {
    code: Option<String>,
    message: Option<String>,
}

fn is_folder_exists_error(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::CONFLICT {
        return true;
    }

    serde_json::from_str::<GraphApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.code)
        .is_some_and(|code| code.eq_ignore_ascii_case(FOLDER_EXISTS_CODE))
}

fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let message = parse_api_error_message(body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            "no error details in response body".to_string()
        } else {
            body.to_string()
        }
    });

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AppError::Auth(format!(
            "graph api authorization failed ({status}): {message}. run `mailtriage auth login`"
        ));
    }

    AppError::Api(format!("graph api request failed ({status}): {message}"))
}

fn parse_api_error_message(body: &str) -> Option<String> {
    let envelope = serde_json::from_str::<GraphApiErrorEnvelope>(body).ok()?;
    let mut parts = Vec::new();

    if let Some(message) = envelope.error.message {
        parts.push(message);
    }

    if let Some(code) = envelope.error.code {
        parts.push(format!("code={code}"));
    }

    if parts.is_empty() {
        return None;
    }

    Some(parts.join(", "))
}
