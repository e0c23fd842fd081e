//! End-to-end tests over the public API against the in-memory backend.

use bytes::Bytes;
use std::sync::Arc;
use storebridge::{
    BackendConfig, Bridge, CompressionType, Error, ErrorKind, ListCursor, ObjectReader,
    ObjectWriter, Outcome, RuntimeConfig, SubmitResult, Ticket,
};

fn memory() -> Arc<BackendConfig> {
    init_tracing();
    Arc::new(BackendConfig::Memory)
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "storebridge=debug".into()),
            )
            .try_init();
    });
}

fn small_thresholds() -> RuntimeConfig {
    RuntimeConfig {
        multipart_put_threshold: 128,
        multipart_get_threshold: 128,
        multipart_get_part_size: 64,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_put_get_head_delete_lifecycle() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();

    let written = bridge
        .put("data/object", Bytes::from_static(b"hello world"), &config)
        .await
        .unwrap();
    assert_eq!(written, 11);

    let data = bridge.get("data/object", 1024, &config).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"hello world"));

    let outcome = bridge
        .execute(Ticket::head("data/object", config.clone()))
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Head { size: 11 }));

    bridge.delete("data/object", &config).await.unwrap();
    let err = bridge.get("data/object", 1024, &config).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_get_capacity_semantics() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();
    bridge
        .put("data/sized", Bytes::from_static(b"0123456789"), &config)
        .await
        .unwrap();

    // Exact-sized and oversized destinations both succeed.
    let exact = bridge.get("data/sized", 10, &config).await.unwrap();
    assert_eq!(exact.len(), 10);
    let oversized = bridge.get("data/sized", 64, &config).await.unwrap();
    assert_eq!(oversized, exact);

    // An undersized destination is a terminal, non-retried failure.
    let err = bridge.get("data/sized", 9, &config).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::BufferTooSmall));
    assert!(err.to_string().contains("1 attempt(s)"));
}

#[tokio::test]
async fn test_ranged_get() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();
    bridge
        .put("data/ranged", Bytes::from_static(b"abcdefghij"), &config)
        .await
        .unwrap();

    let outcome = bridge
        .execute(Ticket::get_range("data/ranged", 2..7, config))
        .await
        .unwrap();
    let Outcome::Get { data } = outcome else {
        panic!("expected a get outcome");
    };
    assert_eq!(data, Bytes::from_static(b"cdefg"));
}

#[tokio::test]
async fn test_explicit_submission_flow() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();

    let ticket = Ticket::put("data/manual", Bytes::from_static(b"payload"), config.clone());
    let SubmitResult::Accepted(completion) = bridge.try_submit(ticket) else {
        panic!("empty queue refused a submission");
    };
    let outcome = completion.wait().await.unwrap();
    assert!(matches!(outcome, Outcome::Put { length: 7 }));

    let data = bridge.get("data/manual", 64, &config).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"payload"));
}

#[tokio::test]
async fn test_multipart_upload_matches_single_shot() {
    let bridge = Bridge::start(small_thresholds()).unwrap();
    let config = memory();
    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();

    // Streamed write crosses the threshold and takes the multipart path.
    let mut writer =
        ObjectWriter::new(&bridge, "data/streamed", config.clone(), CompressionType::None).unwrap();
    for chunk in payload.chunks(100) {
        writer.write(chunk).await.unwrap();
    }
    writer.close().await.unwrap();

    bridge
        .put("data/oneshot", Bytes::from(payload.clone()), &config)
        .await
        .unwrap();

    let streamed = bridge.get("data/streamed", 4096, &config).await.unwrap();
    let oneshot = bridge.get("data/oneshot", 4096, &config).await.unwrap();
    assert_eq!(streamed, oneshot);
    assert_eq!(streamed, Bytes::from(payload));
}

#[tokio::test]
async fn test_list_cursor_sees_streamed_objects() {
    let bridge = Bridge::start(small_thresholds()).unwrap();
    let config = memory();

    let keys: Vec<String> = (0..7).map(|i| format!("logs/part-{:03}", i)).collect();
    for key in &keys {
        let mut writer =
            ObjectWriter::new(&bridge, key.clone(), config.clone(), CompressionType::None).unwrap();
        writer.write(b"entry").await.unwrap();
        writer.close().await.unwrap();
    }

    let mut cursor = ListCursor::new(&bridge, "logs/", config, 3);
    let entries = cursor.collect_all().await.unwrap();
    let listed: Vec<&str> = entries.iter().map(|e| e.location.as_str()).collect();
    assert_eq!(listed, keys.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(entries.iter().all(|e| e.size == 5));
}

#[tokio::test]
async fn test_compressed_object_is_stored_compressed() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();
    let payload = b"a highly repetitive line of text\n".repeat(200);

    let mut writer = ObjectWriter::new(
        &bridge,
        "data/compressed",
        config.clone(),
        CompressionType::Zstd,
    )
    .unwrap();
    writer.write(&payload).await.unwrap();
    let logical = writer.close().await.unwrap();
    assert_eq!(logical, payload.len() as u64);

    // The stored bytes are the zstd stream, much smaller than the input.
    let stored = bridge
        .get("data/compressed", payload.len(), &config)
        .await
        .unwrap();
    assert!(stored.len() < payload.len() / 4);

    let mut reader = ObjectReader::open(&bridge, "data/compressed", config, CompressionType::Zstd)
        .await
        .unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    assert_eq!(out, payload);
}

#[tokio::test]
async fn test_metrics_accounting() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();

    bridge
        .put("m/a", Bytes::from_static(b"12345"), &config)
        .await
        .unwrap();
    bridge
        .put("m/b", Bytes::from_static(b"123"), &config)
        .await
        .unwrap();
    bridge.get("m/a", 64, &config).await.unwrap();
    bridge.get("m/missing", 64, &config).await.unwrap_err();

    let snapshot = bridge.metrics();
    assert_eq!(snapshot.submitted, 4);
    assert_eq!(snapshot.completed, 3);
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.abandoned, 0);
    assert_eq!(snapshot.bytes_uploaded, 8);
    assert_eq!(snapshot.bytes_downloaded, 5);
}

#[tokio::test]
async fn test_closed_bridge_is_terminal() {
    let bridge = Bridge::start(RuntimeConfig::default()).unwrap();
    let config = memory();
    bridge.close();

    let ticket = Ticket::put("x", Bytes::from_static(b"v"), config.clone());
    assert!(matches!(bridge.try_submit(ticket), SubmitResult::Closed(_)));
    assert!(matches!(
        bridge.put("x", Bytes::from_static(b"v"), &config).await,
        Err(Error::ChannelClosed)
    ));
}
