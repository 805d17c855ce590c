//! HTTP implementation of [`BoardApi`] for the monday.com GraphQL endpoint.
//!
//! Every call is one POST of a [`GraphQlRequest`] carrying the API key in
//! the `Authorization` header. Responses are trusted only after the
//! envelope check:
//!
//! 1. body must be a JSON object, else `Malformed`
//! 2. a non-empty `errors` array, or an `error_message` field, is `Reported`
//! 3. a non-2xx status without error details is `Http`
//! 4. `data` must deserialize into the operation's shape, else `Malformed`
//!
//! The transport timeout comes from [`RemoteConfig::timeout_secs`]; nothing
//! here retries.

use crate::config::RemoteConfig;
use crate::error::{Prd2BoardError, RemoteApiError, RemoteErrorKind, RemoteOperation};
use crate::model::{ColumnDefaults, ColumnKind};
use crate::remote::request::{self, GraphQlRequest};
use crate::remote::{BoardApi, ColumnValues, RemoteEntity};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Longest slice of a raw body quoted in a `Malformed` error.
const BODY_SNIPPET_LEN: usize = 200;

/// Board API client over HTTPS.
#[derive(Debug, Clone)]
pub struct MondayClient {
    http: reqwest::Client,
    config: RemoteConfig,
}

impl MondayClient {
    /// Build a client. Fails only if the API key is not a valid header value
    /// or the TLS backend cannot initialise.
    pub fn new(config: RemoteConfig) -> Result<Self, Prd2BoardError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&config.api_key).map_err(|_| {
            Prd2BoardError::InvalidConfig("API key contains invalid header characters".into())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref version) = config.api_version {
            let value = HeaderValue::from_str(version).map_err(|_| {
                Prd2BoardError::InvalidConfig(format!("invalid API version '{version}'"))
            })?;
            headers.insert("api-version", value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Prd2BoardError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// POST one request and return its typed `data` payload.
    async fn execute<T: DeserializeOwned>(&self, req: GraphQlRequest) -> Result<T, RemoteApiError> {
        let op = req.operation;
        debug!("{} → {}", op, self.config.api_url);

        let response = self
            .http
            .post(&self.config.api_url)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("timed out after {}s", self.config.timeout_secs)
                } else {
                    e.to_string()
                };
                RemoteApiError::new(op, RemoteErrorKind::Transport, detail)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteApiError::new(op, RemoteErrorKind::Transport, e.to_string()))?;

        parse_envelope(op, status, &body)
    }
}

/// Normalise a raw response into `data` of type `T` or a typed failure.
pub(crate) fn parse_envelope<T: DeserializeOwned>(
    op: RemoteOperation,
    status: reqwest::StatusCode,
    body: &str,
) -> Result<T, RemoteApiError> {
    let envelope: Value = serde_json::from_str(body).map_err(|_| {
        if status.is_success() {
            RemoteApiError::malformed(op, format!("response is not JSON: {}", snippet(body)))
        } else {
            RemoteApiError::new(op, RemoteErrorKind::Http, format!("HTTP {status}: {}", snippet(body)))
        }
    })?;

    if let Some(message) = reported_errors(&envelope) {
        return Err(RemoteApiError::reported(op, message));
    }
    if !status.is_success() {
        return Err(RemoteApiError::new(
            op,
            RemoteErrorKind::Http,
            format!("HTTP {status}: {}", snippet(body)),
        ));
    }

    let data = envelope
        .get("data")
        .filter(|d| !d.is_null())
        .ok_or_else(|| RemoteApiError::malformed(op, "response has no data"))?;

    serde_json::from_value(data.clone())
        .map_err(|e| RemoteApiError::malformed(op, format!("unexpected data shape: {e}")))
}

/// Collect error messages from either envelope style the service uses.
fn reported_errors(envelope: &Value) -> Option<String> {
    if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Some(messages.join("; "));
        }
    }
    envelope
        .get("error_message")
        .and_then(Value::as_str)
        .map(|msg| match envelope.get("error_code").and_then(Value::as_str) {
            Some(code) => format!("{code}: {msg}"),
            None => msg.to_string(),
        })
}

fn snippet(body: &str) -> String {
    if body.chars().count() > BODY_SNIPPET_LEN {
        let cut: String = body.chars().take(BODY_SNIPPET_LEN).collect();
        format!("{cut}\u{2026}")
    } else {
        body.to_string()
    }
}

/// `boards(ids: [id])` answers with an empty list for unknown or
/// inaccessible boards.
fn first_board<T>(op: RemoteOperation, board_id: &str, boards: Vec<T>) -> Result<T, RemoteApiError> {
    boards
        .into_iter()
        .next()
        .ok_or_else(|| RemoteApiError::malformed(op, format!("board {board_id} not found")))
}

#[async_trait]
impl BoardApi for MondayClient {
    async fn create_board(&self, name: &str) -> Result<String, RemoteApiError> {
        let data: request::CreateBoardData = self.execute(request::create_board(name)).await?;
        Ok(data.create_board.id)
    }

    async fn rename_board(&self, board_id: &str, name: &str) -> Result<(), RemoteApiError> {
        let _: request::RenameBoardData =
            self.execute(request::rename_board(board_id, name)).await?;
        Ok(())
    }

    async fn list_columns(&self, board_id: &str) -> Result<Vec<RemoteEntity>, RemoteApiError> {
        let data: request::ListColumnsData = self.execute(request::list_columns(board_id)).await?;
        Ok(first_board(RemoteOperation::ListColumns, board_id, data.boards)?.columns)
    }

    async fn create_column(
        &self,
        board_id: &str,
        title: &str,
        kind: ColumnKind,
        description: Option<&str>,
        defaults: Option<&ColumnDefaults>,
    ) -> Result<String, RemoteApiError> {
        let req = request::create_column(board_id, title, kind, description, defaults)?;
        let data: request::CreateColumnData = self.execute(req).await?;
        Ok(data.create_column.id)
    }

    async fn delete_column(&self, board_id: &str, column_id: &str) -> Result<(), RemoteApiError> {
        let _: request::DeleteColumnData =
            self.execute(request::delete_column(board_id, column_id)).await?;
        Ok(())
    }

    async fn create_group(
        &self,
        board_id: &str,
        name: &str,
        after: Option<&str>,
    ) -> Result<String, RemoteApiError> {
        let data: request::CreateGroupData =
            self.execute(request::create_group(board_id, name, after)).await?;
        Ok(data.create_group.id)
    }

    async fn list_groups(&self, board_id: &str) -> Result<Vec<RemoteEntity>, RemoteApiError> {
        let data: request::ListGroupsData = self.execute(request::list_groups(board_id)).await?;
        Ok(first_board(RemoteOperation::ListGroups, board_id, data.boards)?.groups)
    }

    async fn delete_group(&self, board_id: &str, group_id: &str) -> Result<(), RemoteApiError> {
        let _: request::DeleteGroupData =
            self.execute(request::delete_group(board_id, group_id)).await?;
        Ok(())
    }

    async fn create_item(
        &self,
        board_id: &str,
        group_id: &str,
        name: &str,
        column_values: &ColumnValues,
    ) -> Result<String, RemoteApiError> {
        let req = request::create_item(board_id, group_id, name, column_values)?;
        let data: request::CreateItemData = self.execute(req).await?;
        Ok(data.create_item.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::request::CreateBoardData;
    use reqwest::StatusCode;

    #[test]
    fn errors_array_wins_over_data() {
        let body = r#"{"data":{"create_board":{"id":"1"}},"errors":[{"message":"Rate limit"},{"message":"again"}]}"#;
        let err = parse_envelope::<CreateBoardData>(RemoteOperation::CreateBoard, StatusCode::OK, body)
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Reported);
        assert_eq!(err.message, "Rate limit; again");
    }

    #[test]
    fn error_message_style_is_reported() {
        let body = r#"{"error_code":"ColumnValueException","error_message":"invalid value","status_code":200}"#;
        let err = parse_envelope::<CreateBoardData>(RemoteOperation::CreateItem, StatusCode::OK, body)
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Reported);
        assert_eq!(err.message, "ColumnValueException: invalid value");
    }

    #[test]
    fn missing_id_is_malformed() {
        let body = r#"{"data":{"create_board":null}}"#;
        let err = parse_envelope::<CreateBoardData>(RemoteOperation::CreateBoard, StatusCode::OK, body)
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Malformed);
    }

    #[test]
    fn non_json_body() {
        let err = parse_envelope::<CreateBoardData>(
            RemoteOperation::CreateBoard,
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>",
        )
        .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Http);
        assert!(err.message.contains("502"));
    }

    #[test]
    fn success_yields_data() {
        let body = r#"{"data":{"create_board":{"id":"991"}},"account_id":1}"#;
        let data =
            parse_envelope::<CreateBoardData>(RemoteOperation::CreateBoard, StatusCode::OK, body)
                .unwrap();
        assert_eq!(data.create_board.id, "991");
    }

    #[test]
    fn empty_errors_array_is_ignored() {
        let body = r#"{"data":{"create_board":{"id":"5"}},"errors":[]}"#;
        assert!(parse_envelope::<CreateBoardData>(RemoteOperation::CreateBoard, StatusCode::OK, body).is_ok());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let s = snippet(&"x".repeat(500));
        assert_eq!(s.chars().count(), BODY_SNIPPET_LEN + 1);
    }
}
