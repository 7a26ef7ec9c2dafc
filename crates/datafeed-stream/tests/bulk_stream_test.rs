use async_trait::async_trait;
use datafeed_stream::{BulkStreamService, DataSet, DataSource, KeySpec, StreamHeader, StreamError, NDJSON_CONTENT_TYPE};
use futures::{stream, StreamExt};
use serde_json::{json, Value};

/// Serves a fixed set of objects, keyed by their map key
struct FixedSource {
    objects: Vec<(&'static str, Value)>,
}

#[async_trait]
impl DataSource for FixedSource {
    type Request = ();

    async fn get_data(&self, _request: ()) -> anyhow::Result<DataSet> {
        let entities: Vec<anyhow::Result<Value>> = self
            .objects
            .iter()
            .map(|(key, obj)| {
                let mut obj = obj.clone();
                obj["_id"] = json!(key);
                obj["createdAt"] = json!("2021-01-01T00:00:00.00Z");
                Ok(obj)
            })
            .collect();

        Ok(DataSet::new(
            StreamHeader::with_count(self.objects.len()),
            stream::iter(entities),
        ))
    }
}

struct FailingSource;

#[async_trait]
impl DataSource for FailingSource {
    type Request = String;

    async fn get_data(&self, request: String) -> anyhow::Result<DataSet> {
        anyhow::bail!("no such collection: {}", request)
    }
}

async fn body_lines(service: &BulkStreamService<FixedSource>) -> Vec<String> {
    let response = service.serve(()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, NDJSON_CONTENT_TYPE);

    response.body.map(|line| line.unwrap()).collect().await
}

#[tokio::test]
async fn test_serves_header_then_keyed_rows() {
    let service = BulkStreamService::with_key(
        FixedSource {
            objects: vec![("1", json!({"what": "ever"}))],
        },
        KeySpec::prefixed("_id", "test"),
    );

    let lines = body_lines(&service).await;
    assert_eq!(lines.len(), 2);

    let header: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(header, json!({"count": 1, "errors": [], "update": false}));

    let row: Value = serde_json::from_str(&lines[1]).unwrap();
    let key = row[0].as_str().unwrap();
    assert_eq!(key.split('.').collect::<Vec<_>>(), vec!["test", "1"]);
    assert_eq!(row[1]["what"], json!("ever"));
    assert_eq!(row[1]["_id"], json!("1"));
}

#[tokio::test]
async fn test_default_key_is_id_property() {
    let service = BulkStreamService::new(FixedSource {
        objects: vec![("a", json!({})), ("b", json!({}))],
    });

    let lines = body_lines(&service).await;
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("[\"a\","));
    assert!(lines[2].starts_with("[\"b\","));
}

#[tokio::test]
async fn test_function_key() {
    let service = BulkStreamService::with_key(
        FixedSource {
            objects: vec![("x", json!({"n": 5}))],
        },
        KeySpec::function(|e| e["n"].clone()),
    );

    let lines = body_lines(&service).await;
    let row: Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(row[0], json!(5));
}

#[tokio::test]
async fn test_source_error_is_returned() {
    let service = BulkStreamService::new(FailingSource);
    let result = service.serve("suppliers".to_string()).await;

    match result {
        Err(StreamError::Source(e)) => assert!(e.to_string().contains("suppliers")),
        Err(other) => panic!("Unexpected error: {}", other),
        Ok(_) => panic!("Expected error"),
    }
}
