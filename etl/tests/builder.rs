use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use etl::builder::PipelineBuilder;
use etl::error::{ErrorKind, EtlResult};
use etl::registry::{Capability, Registry};
use etl::sink::Sink;
use etl::sink::memory::MemorySink;
use etl::source::Source;
use etl::source::memory::MemorySource;
use etl::transform::Transform;
use etl::transform::fetcher::Fetcher;
use etl::types::Record;
use etl_config::shared::ComponentDescriptor;
use etl_telemetry::tracing::init_test_tracing;
use serde_json::{Value, json};

/// Registry with a `memory` source fed from the `records` option and a shared `memory` sink.
fn registry(sink: &MemorySink) -> Arc<Registry> {
    let registry = Registry::new();
    registry.register_source("memory", |descriptor| {
        let records = descriptor
            .option("records")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(MemorySource::new(records)) as Box<dyn Source>)
    });

    let sink = sink.clone();
    registry.register_sink("memory", move |_| Ok(Box::new(sink.clone()) as Box<dyn Sink>));

    Arc::new(registry)
}

fn document(records: Value, transforms: Value) -> Value {
    json!({
        "name": "test",
        "source": {"type": "memory", "options": {"records": records}},
        "transforms": transforms,
        "sink": {"type": "memory"}
    })
}

/// Answers from a fixed table keyed by URL and records every request.
struct TableFetcher {
    responses: BTreeMap<String, Value>,
    requests: Mutex<Vec<(String, BTreeMap<String, String>)>>,
}

#[async_trait]
impl Fetcher for TableFetcher {
    async fn fetch_json(&self, url: &str, headers: &BTreeMap<String, String>) -> EtlResult<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_owned(), headers.clone()));

        match self.responses.get(url) {
            Some(response) => Ok(response.clone()),
            None => Err(etl::etl_error!(
                ErrorKind::HttpRequestFailed,
                "Unexpected request",
                url.to_owned()
            )),
        }
    }
}

/// Adds the `tag` option under the `tag` key of every record.
struct TagTransform {
    tag: String,
}

#[async_trait]
impl Transform for TagTransform {
    fn name(&self) -> &str {
        "TAG"
    }

    async fn transform_one(&self, mut record: Record) -> EtlResult<Record> {
        if let Some(object) = record.as_object_mut() {
            object.insert("tag".to_owned(), Value::String(self.tag.clone()));
        }

        Ok(record)
    }
}

#[tokio::test]
async fn empty_transform_list_is_identity() {
    init_test_tracing();

    let sink = MemorySink::new();
    let records = json!([{"id": 1, "nested": {"a": [1, 2, 3]}}, {"id": 2}]);
    let mut pipeline = PipelineBuilder::new(registry(&sink))
        .build_from_value(document(records.clone(), json!([])))
        .unwrap();

    pipeline.run().await.unwrap();

    assert_eq!(Value::Array(sink.records().await), records);
}

#[tokio::test]
async fn documented_pipeline_produces_expected_records() {
    init_test_tracing();

    let sink = MemorySink::new();
    let mut pipeline = PipelineBuilder::new(registry(&sink))
        .build_from_value(document(
            json!([
                {"firstName": "John", "age": "30", "status": "active"},
                {"firstName": "Jane", "age": "41", "status": "inactive"}
            ]),
            json!([
                {"type": "FILTER", "field": "status", "operator": "EQUALS", "value": "active"},
                {
                    "type": "FIELD_MAPPING",
                    "fieldMap": {"firstName": "name", "age": "age"},
                    "dropUnmapped": true
                },
                {"type": "MAP", "operations": [{"field": "age", "operation": "NUMBER"}]}
            ]),
        ))
        .unwrap();

    let report = pipeline.run().await.unwrap();

    assert_eq!(sink.records().await, vec![json!({"name": "John", "age": 30})]);
    assert_eq!(report.records_read, 2);
    assert_eq!(report.records_written, 1);
}

#[tokio::test]
async fn nested_paths_round_trip_through_add_field_and_mapping() {
    init_test_tracing();

    let sink = MemorySink::new();
    let mut pipeline = PipelineBuilder::new(registry(&sink))
        .build_from_value(document(
            json!([{"id": 7}]),
            json!([
                {"type": "ADD_FIELD", "field": "a.b.c", "value": {"deep": true}},
                {"type": "FIELD_MAPPING", "fieldMap": {"a.b.c": "copy"}}
            ]),
        ))
        .unwrap();

    pipeline.run().await.unwrap();

    assert_eq!(
        sink.records().await,
        vec![json!({"id": 7, "a": {"b": {"c": {"deep": true}}}, "copy": {"deep": true}})]
    );
}

#[tokio::test]
async fn filter_applied_twice_matches_once() {
    init_test_tracing();

    let records = json!([{"score": 10}, {"score": 3}, {"score": "12"}, {"name": "none"}]);
    let filter = json!({
        "type": "FILTER",
        "field": "score",
        "operator": "GREATER_THAN",
        "value": 5
    });

    let once_sink = MemorySink::new();
    PipelineBuilder::new(registry(&once_sink))
        .build_from_value(document(records.clone(), json!([filter.clone()])))
        .unwrap()
        .run()
        .await
        .unwrap();

    let twice_sink = MemorySink::new();
    PipelineBuilder::new(registry(&twice_sink))
        .build_from_value(document(records, json!([filter.clone(), filter])))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(once_sink.records().await, twice_sink.records().await);
    assert_eq!(
        once_sink.records().await,
        vec![json!({"score": 10}), json!({"score": "12"})]
    );
}

#[tokio::test]
async fn composite_nests_like_a_flat_list() {
    init_test_tracing();

    let records = json!([{"name": "  Ada  "}]);
    let flat_sink = MemorySink::new();
    PipelineBuilder::new(registry(&flat_sink))
        .build_from_value(document(
            records.clone(),
            json!([
                {"type": "MAP", "operations": [{"field": "name", "operation": "TRIM"}]},
                {"type": "MAP", "operations": [{"field": "name", "operation": "TO_LOWER_CASE"}]}
            ]),
        ))
        .unwrap()
        .run()
        .await
        .unwrap();

    let nested_sink = MemorySink::new();
    PipelineBuilder::new(registry(&nested_sink))
        .build_from_value(document(
            records,
            json!([{"type": "COMPOSITE", "transforms": [
                {"type": "MAP", "operations": [{"field": "name", "operation": "TRIM"}]},
                {"type": "COMPOSITE", "transforms": [
                    {"type": "MAP", "operations": [{"field": "name", "operation": "TO_LOWER_CASE"}]}
                ]}
            ]}]),
        ))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(flat_sink.records().await, vec![json!({"name": "ada"})]);
    assert_eq!(flat_sink.records().await, nested_sink.records().await);
}

#[tokio::test]
async fn unknown_transform_type_is_named() {
    init_test_tracing();

    let sink = MemorySink::new();
    let err = PipelineBuilder::new(registry(&sink))
        .build_from_value(document(json!([]), json!([{"type": "NOPE"}])))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownComponentType);
    assert!(err.kind().is_configuration());
    assert!(err.detail().unwrap().contains("NOPE"));
    assert!(err.detail().unwrap().contains(Capability::Transform.as_str()));
}

#[tokio::test]
async fn unknown_source_type_fails_without_io() {
    init_test_tracing();

    let sink = MemorySink::new();
    let err = PipelineBuilder::new(registry(&sink))
        .build_from_value(json!({
            "source": {"type": "kafka"},
            "transforms": [],
            "sink": {"type": "memory"}
        }))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownComponentType);
    assert!(err.detail().unwrap().contains("kafka"));
    assert_eq!(sink.connect_calls().await, 0);
}

#[tokio::test]
async fn invalid_transform_is_rejected_at_build() {
    init_test_tracing();

    let sink = MemorySink::new();
    let err = PipelineBuilder::new(registry(&sink))
        .build_from_value(document(
            json!([]),
            json!([{"type": "FILTER", "field": "", "operator": "EXISTS"}]),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidTransformConfig);
}

#[tokio::test]
async fn registered_transform_receives_its_descriptor() {
    init_test_tracing();

    let sink = MemorySink::new();
    let registry = registry(&sink);
    registry.register_transform("TAG", |descriptor: &ComponentDescriptor| {
        let tag = descriptor.option_str("tag").unwrap_or("untagged").to_owned();
        Ok(Box::new(TagTransform { tag }) as Box<dyn Transform>)
    });

    let mut pipeline = PipelineBuilder::new(registry)
        .build_from_value(document(
            json!([{"id": 1}]),
            json!([
                {"type": "TAG", "options": {"tag": "crm"}},
                {"type": "MAP", "operations": [{"field": "tag", "operation": "TO_UPPER_CASE"}]}
            ]),
        ))
        .unwrap();

    assert_eq!(pipeline.chain().stage_names(), vec!["TAG", "MAP"]);

    pipeline.run().await.unwrap();

    assert_eq!(sink.records().await, vec![json!({"id": 1, "tag": "CRM"})]);
}

#[tokio::test]
async fn enrichment_uses_templates_headers_and_fallback() {
    init_test_tracing();

    let fetcher = Arc::new(TableFetcher {
        responses: BTreeMap::from([(
            "https://users.test/1".to_owned(),
            json!({"plan": "pro"}),
        )]),
        requests: Mutex::new(Vec::new()),
    });
    let sink = MemorySink::new();
    let mut pipeline = PipelineBuilder::new(registry(&sink))
        .with_fetcher(fetcher.clone())
        .build_from_value(document(
            json!([{"userId": 1}, {"userId": 2}]),
            json!([{
                "type": "ENRICH",
                "urlTemplate": "https://users.test/{{userId}}",
                "headers": {"Authorization": "Bearer token"},
                "merge": true,
                "onError": "fallback",
                "fallback": {"plan": "unknown"}
            }]),
        ))
        .unwrap();

    pipeline.run().await.unwrap();

    // The second record has no response, so the whole batch takes the fallback.
    assert_eq!(
        sink.records().await,
        vec![
            json!({"userId": 1, "plan": "unknown"}),
            json!({"userId": 2, "plan": "unknown"})
        ]
    );

    let requests = fetcher.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "https://users.test/1");
    assert_eq!(
        requests[0].1.get("Authorization").map(String::as_str),
        Some("Bearer token")
    );
}

#[tokio::test]
async fn enrichment_failure_without_policy_fails_the_run() {
    init_test_tracing();

    let fetcher = Arc::new(TableFetcher {
        responses: BTreeMap::new(),
        requests: Mutex::new(Vec::new()),
    });
    let sink = MemorySink::new();
    let mut pipeline = PipelineBuilder::new(registry(&sink))
        .with_fetcher(fetcher)
        .build_from_value(document(
            json!([{"userId": 1}]),
            json!([{"type": "ENRICH", "urlTemplate": "https://users.test/{{userId}}"}]),
        ))
        .unwrap();

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EnrichmentFailed);
    assert_eq!(sink.write_calls().await, 0);
    assert_eq!(sink.disconnect_calls().await, 1);
}

#[tokio::test]
async fn build_from_path_reads_document() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    std::fs::write(
        &path,
        serde_json::to_vec(&document(
            json!([{"email": " ADA@EXAMPLE.COM "}]),
            json!([{"type": "MAP", "operations": [
                {"field": "email", "operation": "TRIM"},
                {"field": "email", "operation": "TO_LOWER_CASE"}
            ]}]),
        ))
        .unwrap(),
    )
    .unwrap();

    let sink = MemorySink::new();
    let mut pipeline = PipelineBuilder::new(registry(&sink))
        .build_from_path(&path)
        .await
        .unwrap();

    assert_eq!(pipeline.name(), "test");
    pipeline.run().await.unwrap();

    assert_eq!(sink.records().await, vec![json!({"email": "ada@example.com"})]);
}

#[tokio::test]
async fn build_from_missing_path_is_config_error() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let sink = MemorySink::new();

    let err = PipelineBuilder::new(registry(&sink))
        .build_from_path(dir.path().join("missing.json"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigError);
}
