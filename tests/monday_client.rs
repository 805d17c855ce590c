//! `MondayClient` against a mock GraphQL endpoint.

use prd2board::{
    BoardApi, BoardSynchronizer, ColumnDefaults, ColumnKind, ColumnValues, Group, Item,
    MondayClient, RemoteConfig, RemoteErrorKind, RemoteOperation, SyncConfig, TaskHierarchy,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key-123";

fn client(server: &MockServer) -> MondayClient {
    let config = RemoteConfig::builder(KEY)
        .api_url(server.uri())
        .timeout_secs(5)
        .build()
        .unwrap();
    MondayClient::new(config).unwrap()
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data, "account_id": 1 }))
}

#[tokio::test]
async fn create_board_sends_key_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", KEY))
        .and(body_partial_json(json!({ "variables": { "boardName": "Event platform" } })))
        .respond_with(ok(json!({ "create_board": { "id": "4410" } })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server).create_board("Event platform").await.unwrap();
    assert_eq!(id, "4410");
}

#[tokio::test]
async fn api_version_header_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("api-version", "2024-10"))
        .respond_with(ok(json!({ "create_group": { "id": "topics" } })))
        .expect(1)
        .mount(&server)
        .await;

    let config = RemoteConfig::builder(KEY)
        .api_url(server.uri())
        .api_version("2024-10")
        .build()
        .unwrap();
    let id = MondayClient::new(config)
        .unwrap()
        .create_group("1", "Auth", None)
        .await
        .unwrap();
    assert_eq!(id, "topics");
}

#[tokio::test]
async fn awkward_names_are_sent_verbatim() {
    let server = MockServer::start().await;
    let name = "Say \"hi\"\nthen \\ leave";
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "itemName": name, "groupId": "g1" } })))
        .respond_with(ok(json!({ "create_item": { "id": 99 } })))
        .expect(1)
        .mount(&server)
        .await;

    let values = ColumnValues::from([("numeric_x".to_string(), json!(1.5))]);
    let id = client(&server)
        .create_item("7", "g1", name, &values)
        .await
        .unwrap();
    assert_eq!(id, "99");
}

#[tokio::test]
async fn status_defaults_travel_as_encoded_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {
                "title": "Priority",
                "columnType": "status",
                "defaults": r#"{"labels":{"0":"Critical","1":"High"}}"#,
            }
        })))
        .respond_with(ok(json!({ "create_column": { "id": "status_1" } })))
        .expect(1)
        .mount(&server)
        .await;

    let defaults = ColumnDefaults {
        labels: BTreeMap::from([
            ("0".to_string(), "Critical".to_string()),
            ("1".to_string(), "High".to_string()),
        ]),
    };
    let id = client(&server)
        .create_column("7", "Priority", ColumnKind::Status, None, Some(&defaults))
        .await
        .unwrap();
    assert_eq!(id, "status_1");
}

#[tokio::test]
async fn group_is_created_below_its_predecessor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {
                "groupName": "Billing",
                "relativeTo": "auth_grp",
                "positionRelativeMethod": "after_at",
            }
        })))
        .respond_with(ok(json!({ "create_group": { "id": "billing_grp" } })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .create_group("7", "Billing", Some("auth_grp"))
        .await
        .unwrap();
    assert_eq!(id, "billing_grp");
}

#[tokio::test]
async fn errors_envelope_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Column type not supported" }],
            "account_id": 1
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_column("7", "Timeline", ColumnKind::Timeline, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.operation, RemoteOperation::CreateColumn);
    assert_eq!(err.kind, RemoteErrorKind::Reported);
    assert!(err.message.contains("Column type not supported"));
}

#[tokio::test]
async fn missing_id_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({ "create_group": {} })))
        .mount(&server)
        .await;

    let err = client(&server).create_group("7", "Auth", None).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Malformed);
}

#[tokio::test]
async fn unknown_board_listing_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({ "boards": [] })))
        .mount(&server)
        .await;

    let err = client(&server).list_columns("404").await.unwrap_err();
    assert_eq!(err.operation, RemoteOperation::ListColumns);
    assert_eq!(err.kind, RemoteErrorKind::Malformed);
    assert!(err.message.contains("404"));
}

#[tokio::test]
async fn listing_maps_entities() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({
            "boards": [{ "groups": [
                { "id": "topics", "title": "Group Title" },
                { "id": "new_group", "title": "Auth" }
            ] }]
        })))
        .mount(&server)
        .await;

    let groups = client(&server).list_groups("7").await.unwrap();
    let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(titles, ["Group Title", "Auth"]);
    assert_eq!(groups[0].id, "topics");
}

#[tokio::test]
async fn server_error_without_details_is_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = client(&server).delete_group("7", "topics").await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Http);
    assert!(err.message.contains("500"));
}

#[tokio::test]
async fn unauthorized_with_error_message_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_code": "Unauthorized",
            "error_message": "Not Authenticated",
            "status_code": 401
        })))
        .mount(&server)
        .await;

    let err = client(&server).create_board("x").await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Reported);
    assert_eq!(err.message, "Unauthorized: Not Authenticated");
}

#[tokio::test]
async fn unreachable_endpoint_is_transport() {
    let config = RemoteConfig::builder(KEY)
        .api_url("http://127.0.0.1:1")
        .timeout_secs(2)
        .build()
        .unwrap();
    let err = MondayClient::new(config)
        .unwrap()
        .rename_board("7", "x")
        .await
        .unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Transport);
    assert_eq!(err.operation, RemoteOperation::RenameBoard);
}

/// One mocked response per operation, keyed by the variables each sends.
async fn mount_happy_board(server: &MockServer) {
    let routes = [
        (json!({ "variables": { "boardName": "Roadmap" } }), json!({ "create_board": { "id": "100" } })),
        (
            json!({ "query": "query ($boardId: ID!) { boards(ids: [$boardId]) { columns { id title } } }" }),
            json!({ "boards": [{ "columns": [{ "id": "name", "title": "Name" }] }] }),
        ),
        (json!({ "variables": { "columnId": "name" } }), json!({ "delete_column": { "id": "name" } })),
        (json!({ "variables": { "title": "Time Estimation AI" } }), json!({ "create_column": { "id": "numeric_est" } })),
        (json!({ "variables": { "groupName": "Auth" } }), json!({ "create_group": { "id": "auth_grp" } })),
        (json!({ "variables": { "itemName": "Login form" } }), json!({ "create_item": { "id": "501" } })),
        (
            json!({ "query": "query ($boardId: ID!) { boards(ids: [$boardId]) { groups { id title } } }" }),
            json!({ "boards": [{ "groups": [
                { "id": "auth_grp", "title": "Auth" },
                { "id": "topics", "title": "Group Title" }
            ] }] }),
        ),
        (json!({ "variables": { "groupId": "topics" } }), json!({ "delete_group": { "id": "topics" } })),
    ];
    for (matcher, data) in routes {
        Mock::given(method("POST"))
            .and(body_partial_json(matcher))
            .respond_with(ok(data))
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn synchronizer_drives_the_http_client() {
    let server = MockServer::start().await;
    mount_happy_board(&server).await;

    let config = SyncConfig::builder("Roadmap").build().unwrap();
    let sync = BoardSynchronizer::new(Arc::new(client(&server)), config);
    let hierarchy = TaskHierarchy::new(vec![
        Group::new("Auth", vec![Item::new("Login form", 0.5)]),
        Group::new("Billing", vec![]),
    ]);

    let report = sync.run(&hierarchy).await.unwrap();

    assert!(report.is_clean(), "{:?}", report.issues);
    assert_eq!(report.board_id, "100");
    assert_eq!(report.columns.get("Time Estimation AI"), Some("numeric_est"));
    assert_eq!(report.stats.remote_calls, 8);
    assert_eq!(report.stats.groups_deleted, 1);
    assert_eq!(report.skipped_groups, ["Billing"]);

    let item_request = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find_map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).ok()?;
            (body["variables"]["itemName"] == "Login form").then_some(body)
        })
        .unwrap();
    assert_eq!(
        item_request["variables"]["columnValues"],
        r#"{"numeric_est":0.5}"#
    );
}
