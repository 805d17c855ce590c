//! Remote board API: one async method per capability of the service.
//!
//! [`BoardApi`] is the seam between the synchronizer and the network.
//! [`client::MondayClient`] implements it over HTTP; tests substitute an
//! in-memory double. Implementations are stateless request/response
//! wrappers: no caching, no batching, no retries. Every call either returns
//! its success value or a [`RemoteApiError`] naming the operation.
//!
//! ```text
//! BoardSynchronizer ──▶ dyn BoardApi ──▶ request (typed GraphQL) ──▶ POST
//!                                    ◀── envelope check (errors / data)
//! ```

pub mod client;
pub mod request;

use crate::error::RemoteApiError;
use crate::model::{ColumnDefaults, ColumnKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use client::MondayClient;

/// A column or group as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    #[serde(deserialize_with = "request::deserialize_id")]
    pub id: String,
    pub title: String,
}

/// Item column values: remote column id → value.
pub type ColumnValues = BTreeMap<String, serde_json::Value>;

/// Mutations and queries the synchronizer needs from the board service.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Create a private board and return its id.
    async fn create_board(&self, name: &str) -> Result<String, RemoteApiError>;

    async fn rename_board(&self, board_id: &str, name: &str) -> Result<(), RemoteApiError>;

    async fn list_columns(&self, board_id: &str) -> Result<Vec<RemoteEntity>, RemoteApiError>;

    /// Create a column and return its id.
    async fn create_column(
        &self,
        board_id: &str,
        title: &str,
        kind: ColumnKind,
        description: Option<&str>,
        defaults: Option<&ColumnDefaults>,
    ) -> Result<String, RemoteApiError>;

    async fn delete_column(&self, board_id: &str, column_id: &str) -> Result<(), RemoteApiError>;

    /// Create a group and return its id. With `after`, the group is placed
    /// directly below that group; otherwise at the top of the board.
    async fn create_group(
        &self,
        board_id: &str,
        name: &str,
        after: Option<&str>,
    ) -> Result<String, RemoteApiError>;

    async fn list_groups(&self, board_id: &str) -> Result<Vec<RemoteEntity>, RemoteApiError>;

    async fn delete_group(&self, board_id: &str, group_id: &str) -> Result<(), RemoteApiError>;

    /// Create an item in a group and return its id.
    async fn create_item(
        &self,
        board_id: &str,
        group_id: &str,
        name: &str,
        column_values: &ColumnValues,
    ) -> Result<String, RemoteApiError>;
}
