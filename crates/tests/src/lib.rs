//! # Integration Tests
//!
//! Cross-crate tests for the batch writer.
//!
//! Covers:
//! - Flush scenarios (capacity, ticker, backpressure, shutdown, sink faults)
//! - Record conservation and metric invariants under concurrency
//! - Config file -> writer -> file sink end to end

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use batch_writer::FnSink;
    use contracts::{BatchSink, ContractError};
    use tokio::sync::Notify;

    pub type Batches = Arc<Mutex<Vec<Vec<u32>>>>;

    pub fn recording_sink(batches: &Batches) -> FnSink<impl FnMut(&[u32]) + Send + 'static> {
        let batches = Arc::clone(batches);
        FnSink::new("recording", move |batch: &[u32]| {
            batches.lock().unwrap().push(batch.to_vec());
        })
    }

    /// Poll `check` until it holds or `timeout` elapses
    pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if check() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Sink that records batches, optionally waiting on a gate or failing
    /// its first `fail_first` calls
    pub struct ScriptedSink {
        pub batches: Batches,
        pub gate: Option<Arc<Notify>>,
        pub fail_first: usize,
        pub calls: Arc<AtomicUsize>,
    }

    impl ScriptedSink {
        pub fn new(batches: &Batches) -> Self {
            Self {
                batches: Arc::clone(batches),
                gate: None,
                fail_first: 0,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl BatchSink<u32> for ScriptedSink {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn write_batch(&mut self, batch: &[u32]) -> Result<(), ContractError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(batch.to_vec());
            if call < self.fail_first {
                return Err(ContractError::sink_write("scripted", "scripted failure"));
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use batch_writer::BatchWriter;
    use tokio::sync::Notify;

    use crate::support::{eventually, recording_sink, Batches, ScriptedSink};

    /// Three records into a writer of capacity three flush once, without
    /// waiting for the ticker
    #[tokio::test]
    async fn test_capacity_triggered_flush() {
        let batches = Batches::default();
        let writer = BatchWriter::<u32>::builder(3, Duration::from_secs(1))
            .sink(recording_sink(&batches))
            .build()
            .unwrap();

        for r in [1, 2, 3] {
            writer.enqueue(r).await.unwrap();
        }

        assert!(
            eventually(Duration::from_millis(500), || {
                writer.snapshot().records_processed == 3
            })
            .await
        );

        let snapshot = writer.snapshot();
        assert_eq!(snapshot.records_accepted, 3);
        assert_eq!(snapshot.flush_count, 1);

        let mut flushed = batches.lock().unwrap().clone();
        assert_eq!(flushed.len(), 1);
        flushed[0].sort_unstable();
        assert_eq!(flushed[0], vec![1, 2, 3]);

        writer.stop().await;
    }

    #[tokio::test]
    async fn test_timer_triggered_flush() {
        let batches = Batches::default();
        let writer = BatchWriter::<u32>::builder(10, Duration::from_millis(200))
            .sink(recording_sink(&batches))
            .build()
            .unwrap();

        writer.enqueue(1).await.unwrap();
        writer.enqueue(2).await.unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2]]);
        let snapshot = writer.snapshot();
        assert_eq!(snapshot.flush_count, 1);
        assert!(snapshot.last_flush_duration > Duration::ZERO);

        writer.stop().await;
    }

    /// Single-threaded runtime: the dispatcher cannot drain the queue
    /// between the four try_enqueue calls
    #[tokio::test]
    async fn test_backpressure_drops() {
        let batches = Batches::default();
        let gate = Arc::new(Notify::new());
        let mut sink = ScriptedSink::new(&batches);
        sink.gate = Some(Arc::clone(&gate));

        let writer = BatchWriter::<u32>::builder(2, Duration::from_secs(3600))
            .sink(sink)
            .queue_capacity(2)
            .build()
            .unwrap();

        let results: Vec<bool> = (1..=4).map(|r| writer.try_enqueue(r)).collect();
        assert!(results.iter().any(|ok| !ok));

        let snapshot = writer.snapshot();
        assert!(snapshot.records_dropped >= 1);
        assert_eq!(snapshot.records_accepted + snapshot.records_dropped, 4);

        gate.notify_one();
        writer.stop().await;
    }

    #[tokio::test]
    async fn test_stop_drains_pending_records() {
        let batches = Batches::default();
        let writer = BatchWriter::<u32>::builder(10, Duration::from_secs(1))
            .sink(recording_sink(&batches))
            .build()
            .unwrap();
        let metrics = Arc::clone(writer.metrics());

        writer.enqueue(1).await.unwrap();
        writer.enqueue(2).await.unwrap();
        writer.stop().await;

        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2]]);
        assert_eq!(metrics.snapshot().records_processed, 2);
    }

    #[tokio::test]
    async fn test_sink_fault_recovery() {
        let batches = Batches::default();
        let mut sink = ScriptedSink::new(&batches);
        sink.fail_first = 1;

        let writer = BatchWriter::<u32>::builder(3, Duration::from_secs(1))
            .sink(sink)
            .build()
            .unwrap();

        for r in [1, 2, 3] {
            writer.enqueue(r).await.unwrap();
        }
        assert!(
            eventually(Duration::from_millis(500), || {
                writer.snapshot().records_processed == 3
            })
            .await
        );
        assert_eq!(writer.snapshot().flush_count, 1);

        for r in [4, 5, 6] {
            writer.enqueue(r).await.unwrap();
        }
        assert!(
            eventually(Duration::from_millis(500), || {
                writer.snapshot().records_processed == 6
            })
            .await
        );
        assert_eq!(writer.snapshot().flush_count, 2);

        // Still responsive after the fault
        writer.enqueue(7).await.unwrap();
        assert_eq!(writer.flush_now().await, 1);

        writer.stop().await;
        assert_eq!(batches.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_flush_now() {
        let batches = Batches::default();
        let writer = BatchWriter::<u32>::builder(5, Duration::from_secs(60))
            .sink(recording_sink(&batches))
            .build()
            .unwrap();

        assert_eq!(writer.flush_now().await, 0);
        assert_eq!(writer.snapshot().flush_count, 0);

        writer.stop().await;
        assert!(batches.lock().unwrap().is_empty());
    }
}

#[cfg(test)]
mod invariant_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use batch_writer::{BatchWriter, BuildError, LogSink};

    use crate::support::{recording_sink, Batches};

    #[tokio::test]
    async fn test_construction_errors_in_order() {
        let none = BatchWriter::<u32>::builder::<LogSink>(0, Duration::ZERO).build();
        assert!(matches!(none, Err(BuildError::CapacityTooSmall(0))));

        let no_sink = BatchWriter::<u32>::builder::<LogSink>(1, Duration::ZERO).build();
        assert!(matches!(no_sink, Err(BuildError::NilSinkFunction)));

        let zero_interval = BatchWriter::<u32>::builder(1, Duration::ZERO)
            .sink(LogSink::new("log"))
            .build();
        assert!(matches!(
            zero_interval,
            Err(BuildError::InvalidFlushInterval(_))
        ));
    }

    /// Every accepted record reaches the sink exactly once, in batches of
    /// 1..=capacity, and per-producer order survives
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_conservation_across_producers() {
        const PRODUCERS: u32 = 8;
        const PER_PRODUCER: u32 = 500;
        const CAPACITY: usize = 16;

        let batches = Batches::default();
        let writer = BatchWriter::<u32>::builder(CAPACITY, Duration::from_millis(5))
            .sink(recording_sink(&batches))
            .queue_capacity(4)
            .build()
            .unwrap();
        let metrics = Arc::clone(writer.metrics());

        let mut handles = Vec::new();
        for p in 0..PRODUCERS {
            let producer = writer.producer();
            handles.push(tokio::spawn(async move {
                for i in 0..PER_PRODUCER {
                    producer.enqueue(p * PER_PRODUCER + i).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        writer.stop().await;

        let batches = batches.lock().unwrap();
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= CAPACITY));

        let all: Vec<u32> = batches.iter().flatten().copied().collect();
        let total = (PRODUCERS * PER_PRODUCER) as usize;
        assert_eq!(all.len(), total);

        let mut sorted = all.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), total);

        for p in 0..PRODUCERS {
            let range = p * PER_PRODUCER..(p + 1) * PER_PRODUCER;
            let own: Vec<u32> = all.iter().copied().filter(|r| range.contains(r)).collect();
            assert!(own.windows(2).all(|w| w[0] < w[1]), "producer {p} reordered");
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_accepted, total as u64);
        assert_eq!(snapshot.records_processed, total as u64);
        assert_eq!(snapshot.records_dropped, 0);
        assert_eq!(snapshot.records_in_buffer, 0);
        assert_eq!(snapshot.flush_count, batches.len() as u64);
    }

    #[tokio::test]
    async fn test_snapshots_are_monotonic() {
        let batches = Batches::default();
        let writer = BatchWriter::<u32>::builder(4, Duration::from_millis(10))
            .sink(recording_sink(&batches))
            .build()
            .unwrap();

        let mut previous = writer.snapshot();
        for r in 0..100 {
            writer.enqueue(r).await.unwrap();
            if r % 7 == 0 {
                tokio::time::sleep(Duration::from_millis(3)).await;
            }
            let current = writer.snapshot();
            assert!(current.records_accepted >= previous.records_accepted);
            assert!(current.records_processed >= previous.records_processed);
            assert!(current.flush_count >= previous.flush_count);
            assert!(current.total_flush_duration >= previous.total_flush_duration);
            assert!(current.records_processed <= current.records_accepted);
            previous = current;
        }

        writer.stop().await;
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use batch_writer::{create_writer, BatchWriter};
    use config_loader::ConfigLoader;
    use contracts::ContractError;

    /// Config file -> loader -> writer -> JSON lines on disk
    #[tokio::test]
    async fn test_file_sink_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out").join("batches.jsonl");

        let content = format!(
            r#"
name = "e2e"
capacity = 2
flush_interval_ms = 50

[sink]
name = "disk"
sink_type = "file"
params = {{ path = "{}" }}
"#,
            output.display()
        );
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        let writer: BatchWriter<u32> = create_writer(&config).unwrap();
        for r in 1..=5 {
            writer.enqueue(r).await.unwrap();
        }
        writer.stop().await;

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let records: Vec<u64> = lines
            .iter()
            .map(|v| v["record"].as_u64().unwrap())
            .collect();
        assert_eq!(records, vec![1, 2, 3, 4, 5]);
        assert!(lines.iter().all(|v| v["written_at"].is_string()));
    }

    #[test]
    fn test_invalid_file_sink_config() {
        let content = r#"{
            "capacity": 4,
            "flush_interval_ms": 100,
            "sink": { "name": "disk", "sink_type": "file" }
        }"#;
        let err = ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Json)
            .unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }
}
