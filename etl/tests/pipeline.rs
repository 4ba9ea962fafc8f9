use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use etl::concurrency::shutdown::ShutdownTx;
use etl::error::{ErrorKind, EtlResult};
use etl::etl_error;
use etl::pipeline::{Pipeline, PipelineState};
use etl::registry::Capability;
use etl::sink::memory::MemorySink;
use etl::source::memory::MemorySource;
use etl::transform::fetcher::Fetcher;
use etl::transform::resolver::TransformResolver;
use etl::transform::{Transform, TransformChain};
use etl::types::Record;
use etl_config::shared::TransformConfig;
use etl_telemetry::tracing::init_test_tracing;
use serde_json::{Value, json};

fn chain(configs: Value) -> TransformChain {
    let configs: Vec<TransformConfig> = serde_json::from_value(configs).unwrap();
    let mut resolver = TransformResolver::new();
    let stages = configs
        .iter()
        .map(|config| resolver.resolve(config))
        .collect::<EtlResult<Vec<_>>>()
        .unwrap();

    TransformChain::new(stages)
}

fn pipeline(source: &MemorySource, chain: TransformChain, sink: &MemorySink) -> Pipeline {
    Pipeline::new(Box::new(source.clone()), chain, Box::new(sink.clone()))
}

/// Fails every record and counts the calls it receives.
struct Exploding {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Transform for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn transform_one(&self, _record: Record) -> EtlResult<Record> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(etl_error!(ErrorKind::InvalidData, "Record is malformed"))
    }
}

/// Serves the same body for every URL and counts requests.
struct CountingFetcher {
    body: Value,
    requests: AtomicUsize,
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch_json(
        &self,
        _url: &str,
        _headers: &BTreeMap<String, String>,
    ) -> EtlResult<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

/// Requests shutdown of the pipeline it runs in and passes records through.
struct ShutdownOnRecord {
    shutdown_tx: Arc<OnceLock<ShutdownTx>>,
}

#[async_trait]
impl Transform for ShutdownOnRecord {
    fn name(&self) -> &str {
        "shutdown_on_record"
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        if let Some(shutdown_tx) = self.shutdown_tx.get() {
            shutdown_tx.shutdown();
        }

        Ok(record)
    }
}

#[tokio::test]
async fn field_mapping_then_number_conversion() {
    init_test_tracing();

    let source = MemorySource::new(vec![json!({"firstName": "John", "age": "30"})]);
    let sink = MemorySink::new();
    let transforms = chain(json!([
        {"type": "FIELD_MAPPING", "fieldMap": {"firstName": "name"}},
        {"type": "MAP", "operations": [{"field": "age", "operation": "NUMBER"}]}
    ]));

    let report = pipeline(&source, transforms, &sink).run().await.unwrap();

    assert_eq!(sink.records().await, vec![json!({"name": "John", "age": 30})]);
    assert_eq!(report.records_read, 1);
    assert_eq!(report.records_written, 1);
}

#[tokio::test]
async fn filter_keeps_matching_records() {
    init_test_tracing();

    let source = MemorySource::new(vec![
        json!({"status": "active"}),
        json!({"status": "inactive"}),
    ]);
    let sink = MemorySink::new();
    let transforms = chain(json!([
        {"type": "FILTER", "field": "status", "operator": "EQUALS", "value": "active"}
    ]));

    let report = pipeline(&source, transforms, &sink).run().await.unwrap();

    assert_eq!(sink.records().await, vec![json!({"status": "active"})]);
    assert_eq!(report.records_read, 2);
    assert_eq!(report.records_written, 1);
}

#[tokio::test]
async fn empty_chain_writes_input_unchanged() {
    init_test_tracing();

    let records = vec![json!({"a": {"b": [1, 2]}}), json!("scalar"), json!(null)];
    let source = MemorySource::new(records.clone());
    let sink = MemorySink::new();

    pipeline(&source, TransformChain::new(vec![]), &sink)
        .run()
        .await
        .unwrap();

    assert_eq!(sink.records().await, records);
}

#[tokio::test]
async fn read_failure_still_disconnects_both_components() {
    init_test_tracing();

    let source = MemorySource::new(vec![json!({"a": 1})]);
    let sink = MemorySink::new();
    source.fail_read().await;
    source.fail_disconnect().await;
    sink.fail_disconnect().await;

    let mut pipeline = pipeline(&source, TransformChain::new(vec![]), &sink);
    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SourceReadFailed);
    assert_eq!(err.capability(), Some(Capability::Source));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(source.disconnect_calls().await, 1);
    assert_eq!(sink.disconnect_calls().await, 1);
    assert_eq!(sink.write_calls().await, 0);
}

#[tokio::test]
async fn connect_failure_still_disconnects() {
    init_test_tracing();

    let source = MemorySource::new(vec![json!({"a": 1})]);
    let sink = MemorySink::new();
    sink.fail_connect().await;

    let err = pipeline(&source, TransformChain::new(vec![]), &sink)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SinkConnectionFailed);
    assert_eq!(source.read_calls().await, 0);
    assert_eq!(source.disconnect_calls().await, 1);
    assert_eq!(sink.disconnect_calls().await, 1);
}

#[tokio::test]
async fn transform_error_aborts_batch_and_keeps_cause() {
    init_test_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let source = MemorySource::new(vec![json!({"a": 1}), json!({"a": 2})]);
    let sink = MemorySink::new();
    let transforms = TransformChain::new(vec![Box::new(Exploding {
        calls: calls.clone(),
    })]);

    let err = pipeline(&source, transforms, &sink)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransformFailed);
    assert!(err.detail().unwrap().contains("InvalidData"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.write_calls().await, 0);
    assert_eq!(sink.disconnect_calls().await, 1);
}

#[tokio::test]
async fn filtered_out_batch_skips_enrichment() {
    init_test_tracing();

    let fetcher = Arc::new(CountingFetcher {
        body: json!({"tier": "gold"}),
        requests: AtomicUsize::new(0),
    });
    let configs: Vec<TransformConfig> = serde_json::from_value(json!([
        {"type": "FILTER", "field": "active", "operator": "EXISTS"},
        {"type": "ENRICH", "urlTemplate": "https://api.test/{{id}}", "merge": true}
    ]))
    .unwrap();
    let mut resolver = TransformResolver::with_fetcher(fetcher.clone());
    let stages = configs
        .iter()
        .map(|config| resolver.resolve(config))
        .collect::<EtlResult<Vec<_>>>()
        .unwrap();

    let source = MemorySource::new(vec![json!({"id": 1, "active": false})]);
    let sink = MemorySink::new();

    let report = pipeline(&source, TransformChain::new(stages), &sink)
        .run()
        .await
        .unwrap();

    assert_eq!(report.records_written, 0);
    assert_eq!(fetcher.requests.load(Ordering::SeqCst), 0);
    assert_eq!(sink.write_calls().await, 1);
}

#[tokio::test]
async fn enrichment_merges_response_into_each_record() {
    init_test_tracing();

    let fetcher = Arc::new(CountingFetcher {
        body: json!({"tier": "gold"}),
        requests: AtomicUsize::new(0),
    });
    let configs: Vec<TransformConfig> = serde_json::from_value(json!([
        {"type": "ENRICH", "urlTemplate": "https://api.test/{{id}}", "merge": true}
    ]))
    .unwrap();
    let mut resolver = TransformResolver::with_fetcher(fetcher.clone());
    let stages = configs
        .iter()
        .map(|config| resolver.resolve(config))
        .collect::<EtlResult<Vec<_>>>()
        .unwrap();

    let source = MemorySource::new(vec![json!({"id": 1}), json!({"id": 2})]);
    let sink = MemorySink::new();

    pipeline(&source, TransformChain::new(stages), &sink)
        .run()
        .await
        .unwrap();

    assert_eq!(
        sink.records().await,
        vec![json!({"id": 1, "tier": "gold"}), json!({"id": 2, "tier": "gold"})]
    );
    assert_eq!(fetcher.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn batch_and_single_forms_agree() {
    init_test_tracing();

    let transforms = chain(json!([
        {"type": "FIELD_MAPPING", "fieldMap": {"first": "name.first", "last": "name.last"}},
        {"type": "ADD_FIELD", "field": "meta.source", "value": "crm"},
        {"type": "MAP", "operations": [
            {"field": "name.first", "operation": "TO_UPPER_CASE"},
            {"field": "score", "operation": "NUMBER"}
        ]}
    ]));
    let records = vec![
        json!({"first": "ada", "last": "lovelace", "score": "12.5"}),
        json!({"first": "alan", "score": 7}),
        json!({"last": "hopper"}),
    ];

    let mut singles = Vec::new();
    for record in records.clone() {
        singles.push(transforms.transform_one(record).await.unwrap());
    }
    let batch = transforms.transform_many(records).await.unwrap();

    assert_eq!(batch, singles);
    assert_eq!(
        batch[0],
        json!({
            "name": {"first": "ADA", "last": "lovelace"},
            "score": 12.5,
            "meta": {"source": "crm"}
        })
    );
}

#[tokio::test]
async fn disconnect_failures_do_not_fail_a_successful_run() {
    init_test_tracing();

    let source = MemorySource::new(vec![json!({"a": 1})]);
    let sink = MemorySink::new();
    source.fail_disconnect().await;
    sink.fail_disconnect().await;

    let mut pipeline = pipeline(&source, TransformChain::new(vec![]), &sink);
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.records_written, 1);
    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(sink.records().await, vec![json!({"a": 1})]);
    assert_eq!(source.disconnect_calls().await, 1);
    assert_eq!(sink.disconnect_calls().await, 1);
}

#[tokio::test]
async fn shutdown_during_transform_skips_remaining_stages() {
    init_test_tracing();

    let shutdown_slot = Arc::new(OnceLock::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let transforms = TransformChain::new(vec![
        Box::new(ShutdownOnRecord {
            shutdown_tx: shutdown_slot.clone(),
        }),
        Box::new(Exploding {
            calls: calls.clone(),
        }),
    ]);

    let source = MemorySource::new(vec![json!({"a": 1})]);
    let sink = MemorySink::new();
    let mut pipeline = pipeline(&source, transforms, &sink);
    shutdown_slot.set(pipeline.shutdown_tx()).unwrap();

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PipelineCancelled);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(source.read_calls().await, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.write_calls().await, 0);
    assert_eq!(source.disconnect_calls().await, 1);
    assert_eq!(sink.disconnect_calls().await, 1);
}

#[tokio::test]
async fn shutdown_in_last_stage_skips_write() {
    init_test_tracing();

    let shutdown_slot = Arc::new(OnceLock::new());
    let transforms = TransformChain::new(vec![Box::new(ShutdownOnRecord {
        shutdown_tx: shutdown_slot.clone(),
    })]);

    let source = MemorySource::new(vec![json!({"a": 1})]);
    let sink = MemorySink::new();
    let mut pipeline = pipeline(&source, transforms, &sink);
    shutdown_slot.set(pipeline.shutdown_tx()).unwrap();

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PipelineCancelled);
    assert_eq!(err.detail(), Some("shutdown requested before write"));
    assert_eq!(sink.write_calls().await, 0);
    assert_eq!(sink.disconnect_calls().await, 1);
}
