//! Typed GraphQL requests, one builder per remote operation.
//!
//! Query documents are constants; every caller-controlled value (board
//! names, task names, column values) travels in `variables` and is encoded
//! by `serde_json`. Names containing quotes, backslashes or newlines
//! therefore cannot break the document.
//!
//! The service's `JSON` scalar (column `defaults`, item `column_values`)
//! expects a JSON-encoded *string*, so those variables are serialised twice.

use crate::error::{RemoteApiError, RemoteOperation};
use crate::model::{ColumnDefaults, ColumnKind};
use crate::remote::{ColumnValues, RemoteEntity};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const CREATE_BOARD: &str = "mutation ($boardName: String!) { \
create_board(board_name: $boardName, board_kind: private) { id } }";

const RENAME_BOARD: &str = "mutation ($boardId: ID!, $newName: String!) { \
update_board(board_id: $boardId, board_attribute: name, new_value: $newName) }";

const LIST_COLUMNS: &str = "query ($boardId: ID!) { \
boards(ids: [$boardId]) { columns { id title } } }";

const CREATE_COLUMN: &str = "mutation ($boardId: ID!, $title: String!, $columnType: ColumnType!, \
$description: String, $defaults: JSON) { \
create_column(board_id: $boardId, title: $title, column_type: $columnType, \
description: $description, defaults: $defaults) { id } }";

const DELETE_COLUMN: &str = "mutation ($boardId: ID!, $columnId: String!) { \
delete_column(board_id: $boardId, column_id: $columnId) { id } }";

const CREATE_GROUP: &str = "mutation ($boardId: ID!, $groupName: String!, $relativeTo: String, \
$positionRelativeMethod: PositionRelative) { \
create_group(board_id: $boardId, group_name: $groupName, relative_to: $relativeTo, \
position_relative_method: $positionRelativeMethod) { id } }";

const LIST_GROUPS: &str = "query ($boardId: ID!) { \
boards(ids: [$boardId]) { groups { id title } } }";

const DELETE_GROUP: &str = "mutation ($boardId: ID!, $groupId: String!) { \
delete_group(board_id: $boardId, group_id: $groupId) { id } }";

const CREATE_ITEM: &str = "mutation ($boardId: ID!, $groupId: String!, $itemName: String!, \
$columnValues: JSON) { \
create_item(board_id: $boardId, group_id: $groupId, item_name: $itemName, \
column_values: $columnValues) { id } }";

/// A request body ready to POST.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    #[serde(skip)]
    pub operation: RemoteOperation,
    pub query: &'static str,
    pub variables: Value,
}

fn request(operation: RemoteOperation, query: &'static str, variables: Value) -> GraphQlRequest {
    GraphQlRequest {
        operation,
        query,
        variables,
    }
}

/// Encode a value for a `JSON` scalar variable.
fn json_scalar<T: Serialize>(
    operation: RemoteOperation,
    value: &T,
) -> Result<String, RemoteApiError> {
    serde_json::to_string(value).map_err(|e| {
        RemoteApiError::malformed(operation, format!("could not encode JSON argument: {e}"))
    })
}

pub fn create_board(name: &str) -> GraphQlRequest {
    request(
        RemoteOperation::CreateBoard,
        CREATE_BOARD,
        json!({ "boardName": name }),
    )
}

pub fn rename_board(board_id: &str, name: &str) -> GraphQlRequest {
    request(
        RemoteOperation::RenameBoard,
        RENAME_BOARD,
        json!({ "boardId": board_id, "newName": name }),
    )
}

pub fn list_columns(board_id: &str) -> GraphQlRequest {
    request(
        RemoteOperation::ListColumns,
        LIST_COLUMNS,
        json!({ "boardId": board_id }),
    )
}

pub fn create_column(
    board_id: &str,
    title: &str,
    kind: ColumnKind,
    description: Option<&str>,
    defaults: Option<&ColumnDefaults>,
) -> Result<GraphQlRequest, RemoteApiError> {
    let op = RemoteOperation::CreateColumn;
    let defaults = defaults.map(|d| json_scalar(op, d)).transpose()?;
    Ok(request(
        op,
        CREATE_COLUMN,
        json!({
            "boardId": board_id,
            "title": title,
            "columnType": kind.as_api_str(),
            "description": description,
            "defaults": defaults,
        }),
    ))
}

pub fn delete_column(board_id: &str, column_id: &str) -> GraphQlRequest {
    request(
        RemoteOperation::DeleteColumn,
        DELETE_COLUMN,
        json!({ "boardId": board_id, "columnId": column_id }),
    )
}

/// Without `after`, the service puts the new group at the top of the board.
pub fn create_group(board_id: &str, name: &str, after: Option<&str>) -> GraphQlRequest {
    request(
        RemoteOperation::CreateGroup,
        CREATE_GROUP,
        json!({
            "boardId": board_id,
            "groupName": name,
            "relativeTo": after,
            "positionRelativeMethod": after.map(|_| "after_at"),
        }),
    )
}

pub fn list_groups(board_id: &str) -> GraphQlRequest {
    request(
        RemoteOperation::ListGroups,
        LIST_GROUPS,
        json!({ "boardId": board_id }),
    )
}

pub fn delete_group(board_id: &str, group_id: &str) -> GraphQlRequest {
    request(
        RemoteOperation::DeleteGroup,
        DELETE_GROUP,
        json!({ "boardId": board_id, "groupId": group_id }),
    )
}

pub fn create_item(
    board_id: &str,
    group_id: &str,
    name: &str,
    column_values: &ColumnValues,
) -> Result<GraphQlRequest, RemoteApiError> {
    let op = RemoteOperation::CreateItem;
    let values = json_scalar(op, column_values)?;
    Ok(request(
        op,
        CREATE_ITEM,
        json!({
            "boardId": board_id,
            "groupId": group_id,
            "itemName": name,
            "columnValues": values,
        }),
    ))
}

// ── Response shapes (`data` payloads) ────────────────────────────────────

/// `{ "id": ... }` — ids arrive as strings, occasionally as numbers.
#[derive(Debug, Deserialize)]
pub struct Created {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoardData {
    pub create_board: Created,
}

#[derive(Debug, Deserialize)]
pub struct CreateColumnData {
    pub create_column: Created,
}

#[derive(Debug, Deserialize)]
pub struct DeleteColumnData {
    pub delete_column: Created,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupData {
    pub create_group: Created,
}

#[derive(Debug, Deserialize)]
pub struct DeleteGroupData {
    pub delete_group: Created,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemData {
    pub create_item: Created,
}

/// `update_board` returns an opaque JSON scalar; only its presence matters.
#[derive(Debug, Deserialize)]
pub struct RenameBoardData {
    pub update_board: Value,
}

#[derive(Debug, Deserialize)]
pub struct BoardColumns {
    pub columns: Vec<RemoteEntity>,
}

#[derive(Debug, Deserialize)]
pub struct ListColumnsData {
    pub boards: Vec<BoardColumns>,
}

#[derive(Debug, Deserialize)]
pub struct BoardGroups {
    pub groups: Vec<RemoteEntity>,
}

#[derive(Debug, Deserialize)]
pub struct ListGroupsData {
    pub boards: Vec<BoardGroups>,
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected an id, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn names_travel_as_variables() {
        let req = create_board(r#"Q3 "Launch" \ plan"#);
        assert!(!req.query.contains("Launch"));
        assert_eq!(req.variables["boardName"], r#"Q3 "Launch" \ plan"#);
        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("operation").is_none());
        assert_eq!(body["query"], CREATE_BOARD);
    }

    #[test]
    fn status_defaults_are_json_string() {
        let defaults = ColumnDefaults {
            labels: BTreeMap::from([
                ("0".to_string(), "Critical".to_string()),
                ("1".to_string(), "High".to_string()),
            ]),
        };
        let req = create_column("7", "Priority", ColumnKind::Status, None, Some(&defaults)).unwrap();
        let encoded = req.variables["defaults"].as_str().unwrap();
        let decoded: Value = serde_json::from_str(encoded).unwrap();
        assert_eq!(decoded, json!({"labels": {"0": "Critical", "1": "High"}}));
        assert_eq!(req.variables["columnType"], "status");
        assert!(req.variables["description"].is_null());
    }

    #[test]
    fn column_without_defaults_sends_null() {
        let req = create_column("7", "Sprint", ColumnKind::Text, Some("Which sprint"), None).unwrap();
        assert!(req.variables["defaults"].is_null());
        assert_eq!(req.variables["description"], "Which sprint");
    }

    #[test]
    fn item_column_values_are_json_string() {
        let values = ColumnValues::from([("numeric_abc".to_string(), json!(0.5))]);
        let req = create_item("7", "topics", "Add login form", &values).unwrap();
        assert_eq!(req.variables["columnValues"], r#"{"numeric_abc":0.5}"#);
        assert_eq!(req.variables["groupId"], "topics");
    }

    #[test]
    fn group_is_placed_after_previous() {
        let req = create_group("7", "Billing", Some("auth_grp"));
        assert_eq!(req.variables["relativeTo"], "auth_grp");
        assert_eq!(req.variables["positionRelativeMethod"], "after_at");

        let first = create_group("7", "Auth", None);
        assert!(first.variables["relativeTo"].is_null());
        assert!(first.variables["positionRelativeMethod"].is_null());
    }

    #[test]
    fn ids_accept_numbers() {
        let data: CreateBoardData =
            serde_json::from_value(json!({"create_board": {"id": 12345}})).unwrap();
        assert_eq!(data.create_board.id, "12345");
        let missing: Result<CreateBoardData, _> =
            serde_json::from_value(json!({"create_board": {"id": null}}));
        assert!(missing.is_err());
    }
}
