//! Tests for the OData client against a mock FileMaker server
//!
//! Covers:
//! - Auth and content headers on every request
//! - Record CRUD, including query encoding and status handling
//! - Container upload/download
//! - Script invocation
//! - Schema management
//! - Error classification

use fmodata_rs::{Client, ClientConfig, ClientError, FieldDefinition, FieldType, TableDefinition};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, body_string, header, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

const AUTH: &str = "Basic dXNlcjpwYXNz";

fn client_for(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri(), "testdb", "user", "pass")).unwrap()
}

fn record(value: serde_json::Value) -> fmodata_rs::Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test]
async fn test_base_url_from_config() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert_eq!(
        client.base_url(),
        format!("{}/fmi/odata/v4/testdb", server.uri())
    );
}

#[tokio::test]
async fn test_headers_on_every_request() {
    let server = MockServer::start().await;

    // One body every operation accepts
    Mock::given(header("Authorization", AUTH))
        .and(header("Content-Type", "application/json"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [],
            "scriptResult": {"code": 0}
        })))
        .expect(13)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = record(json!({"Name": "x"}));
    client.ping().await.unwrap();
    client.list_all("Table1").await.unwrap();
    client.get("Table1", "1").await.unwrap();
    client.create("Table1", &data).await.unwrap();
    client.update("Table1", "1", &data).await.unwrap();
    client.delete("Table1", "1").await.unwrap();
    client
        .upload_container("Table1", "1", "Photo", b"abc")
        .await
        .unwrap();
    client
        .download_container("Table1", "1", "Photo")
        .await
        .unwrap();
    client.run_script("Hello", None).await.unwrap();
    client
        .create_table(&TableDefinition::new(
            "Table2",
            vec![FieldDefinition::new("ID", FieldType::Numeric)],
        ))
        .await
        .unwrap();
    client.delete_table("Table2").await.unwrap();
    client.create_index("Table1", "Name").await.unwrap();
    client.delete_index("Table1", "Name").await.unwrap();
}

#[tokio::test]
async fn test_transport_error() {
    // Nothing listens on port 1
    let client = Client::new(ClientConfig::new("http://127.0.0.1:1", "testdb", "u", "p")).unwrap();
    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, ClientError::Request(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri(), "testdb", "user", "pass")
        .with_timeout(Duration::from_millis(100));
    let client = Client::new(config).unwrap();

    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, ClientError::Request(_)));
    assert!(err.is_timeout());
}

// ============================================================================
// Records
// ============================================================================

#[tokio::test]
async fn test_list_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Table1"))
        .and(header("Authorization", AUTH))
        .and(|req: &Request| req.url.query() == Some("filter=field%20eq%20%27value%27"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"value": [{"ID": "1", "Name": "Test"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = client
        .list("Table1", &[("filter", "field eq 'value'")])
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Name"], "Test");
}

#[tokio::test]
async fn test_list_never_sends_plus_for_space() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .list("Contacts", &[("$filter", "City eq 'New York'"), ("$top", "5")])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap().to_string();
    assert_eq!(query, "%24filter=City%20eq%20%27New%20York%27&%24top=5");
    assert!(!query.contains('+'));
}

#[tokio::test]
async fn test_list_empty_and_envelope_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Table1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.context": "https://host/fmi/odata/v4/testdb/$metadata#Table1",
            "@odata.count": 0,
            "value": []
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = client.list_all("Table1").await.unwrap();
    assert!(records.is_empty());

    // No query string at all when no options are given
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_list_rejects_non_200_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_all("Table1").await.unwrap_err();
    assert_eq!(err.status(), Some(204));
}

#[tokio::test]
async fn test_list_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_all("Table1").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_get_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Table1('1')"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "1", "Name": "Test"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = client.get("Table1", "1").await.unwrap();
    assert_eq!(record["Name"], "Test");
}

#[tokio::test]
async fn test_get_missing_record_is_remote_error() {
    let server = MockServer::start().await;
    let body = r#"{"error":{"code":"-1023","message":"Record is missing"}}"#;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Table1('42')"))
        .respond_with(ResponseTemplate::new(404).set_body_string(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("Table1", "42").await.unwrap_err();

    match &err {
        ClientError::Remote { status, body: got } => {
            assert_eq!(*status, 404);
            assert_eq!(got, body);
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    assert!(err.is_not_found());
    assert_eq!(err.odata_error().unwrap().error.message, "Record is missing");
}

#[tokio::test]
async fn test_create_record_without_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fmi/odata/v4/testdb/Table1"))
        .and(body_json(json!({"Name": "New"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client
        .create("Table1", &record(json!({"Name": "New"})))
        .await
        .unwrap();
    assert!(created.is_none());
}

#[tokio::test]
async fn test_create_record_returns_entity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fmi/odata/v4/testdb/Table1"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"ID": 7, "Name": "New", "Active": true})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let created = client
        .create("Table1", &record(json!({"Name": "New"})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created["ID"], 7);
    assert_eq!(created["Active"], true);
}

#[tokio::test]
async fn test_create_record_rejects_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .create("Table1", &record(json!({"Name": "New"})))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(202));
}

#[tokio::test]
async fn test_update_record() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/fmi/odata/v4/testdb/Table1('1')"))
        .and(body_json(json!({"Name": "Changed"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .update("Table1", "1", &record(json!({"Name": "Changed"})))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_record() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/fmi/odata/v4/testdb/Table1('1')"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete("Table1", "1").await.unwrap();
}

#[tokio::test]
async fn test_delete_record_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.delete("Table1", "1").await.unwrap_err();
    assert_eq!(err.to_string(), "OData request failed with status 500: boom");
}

// ============================================================================
// Containers
// ============================================================================

#[tokio::test]
async fn test_upload_container() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/fmi/odata/v4/testdb/Table1('1')"))
        .and(body_json(json!({"ContainerField": "dGVzdA=="})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .upload_container("Table1", "1", "ContainerField", b"test")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_container_from_reader() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(body_json(json!({"ContainerField": "dGVzdA=="})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .upload_container_from("Table1", "1", "ContainerField", &b"test"[..])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_download_container_returns_raw_bytes() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Table1('1')/ContainerField/$value"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = client
        .download_container("Table1", "1", "ContainerField")
        .await
        .unwrap();
    assert_eq!(data, payload);
}

#[tokio::test]
async fn test_download_container_not_base64_decoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Table1('1')/ContainerField/$value"))
        .respond_with(ResponseTemplate::new(200).set_body_string("test"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = client
        .download_container("Table1", "1", "ContainerField")
        .await
        .unwrap();
    assert_eq!(data, b"test");
}

// ============================================================================
// Scripts
// ============================================================================

#[tokio::test]
async fn test_run_script() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fmi/odata/v4/testdb/Script.TestScript"))
        .and(body_json(json!({"scriptParameterValue": "param"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "scriptResult": {"code": 0, "resultParameter": "Success"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .run_script("TestScript", Some(&json!("param")))
        .await
        .unwrap();
    assert_eq!(result.code, 0);
    assert_eq!(result.result_parameter, "Success");
}

#[tokio::test]
async fn test_run_script_without_parameter_sends_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fmi/odata/v4/testdb/Script.Cleanup"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "scriptResult": {"code": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.run_script("Cleanup", None).await.unwrap();
    // Non-zero codes are returned, not treated as failures
    assert_eq!(result.code, 3);
    assert!(result.result_parameter.is_null());
}

#[tokio::test]
async fn test_run_script_malformed_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.run_script("TestScript", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_create_table() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fmi/odata/v4/testdb/FileMaker_Tables"))
        .and(body_json(json!({
            "tableName": "Logs",
            "fields": [
                {"name": "ID", "type": "NUMERIC", "primary": true, "unique": true},
                {"name": "Method", "type": "VARCHAR"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tableName": "Logs"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let table = TableDefinition::new(
        "Logs",
        vec![
            FieldDefinition::new("ID", FieldType::Numeric).primary().unique(),
            FieldDefinition::new("Method", FieldType::Varchar),
        ],
    );
    client.create_table(&table).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_table_passes_error_through() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/fmi/odata/v4/testdb/FileMaker_Tables/Ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Table not found"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.delete_table("Ghost").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_create_and_delete_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fmi/odata/v4/testdb/FileMaker_Indexes/Logs"))
        .and(body_json(json!({"indexName": "Method"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/fmi/odata/v4/testdb/FileMaker_Indexes/Logs/Method"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.create_index("Logs", "Method").await.unwrap();
    client.delete_index("Logs", "Method").await.unwrap();
}

// ============================================================================
// Probe
// ============================================================================

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_requires_exactly_200() {
    for status in [201u16, 404] {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fmi/odata/v4/testdb"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.ping().await.unwrap_err();
        match err {
            ClientError::Remote { status: got, body } => {
                assert_eq!(got, status);
                assert_eq!(body, "nope");
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_client_is_shareable_across_tasks() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb"))
        .respond_with(ResponseTemplate::new(200))
        .expect(8)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.ping().await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_record_keys_are_escaped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Customers('12%23frag')"))
        .and(|req: &Request| req.url.query().is_none())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "12#frag"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fmi/odata/v4/testdb/Customers('7%3F$select=Secret')"))
        .and(|req: &Request| req.url.query().is_none())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ID": "7"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/fmi/odata/v4/testdb/Customers('1'')%3Fx=(''')"))
        .and(|req: &Request| req.url.query().is_none())
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/fmi/odata/v4/testdb/Customers('1')"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let found = client.get("Customers", "12#frag").await.unwrap();
    assert_eq!(found["ID"], "12#frag");
    client.get("Customers", "7?$select=Secret").await.unwrap();
    client.delete("Customers", "1')?x=('").await.unwrap();
}
