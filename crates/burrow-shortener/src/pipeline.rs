use crate::error::{PipelineError, ShortenerError};
use crate::service::LinkService;
use async_trait::async_trait;
use burrow_core::{DeleteRequest, LinkStore};
use burrow_generator::Generator;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

/// One caller's ordered sequence of delete requests.
///
/// The worker drains a unit until every sender of it is dropped.
pub type WorkUnit = mpsc::Receiver<DeleteRequest>;

/// The batch soft-delete primitive the pipeline flushes into.
#[async_trait]
pub trait BatchDeleter: Send + Sync + 'static {
    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<(), ShortenerError>;
}

#[async_trait]
impl<S: LinkStore, G: Generator> BatchDeleter for LinkService<S, G> {
    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<(), ShortenerError> {
        LinkService::delete_batch(self, requests).await
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineSettings {
    /// How often the accumulated buffer is flushed.
    #[builder(default = Duration::from_secs(5))]
    pub flush_interval: Duration,
    /// How many work units may wait for the worker before `submit` blocks.
    #[builder(default = 10)]
    pub submission_capacity: usize,
    /// Attempt one last flush when the pipeline shuts down.
    #[builder(default = false)]
    pub flush_on_shutdown: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Fan-in batching worker for soft deletes.
///
/// Callers hand over [`WorkUnit`]s; a single background task drains them into
/// a private buffer and flushes it through a [`BatchDeleter`] on every timer
/// tick. A failed flush keeps the buffer for the next tick, so requests are
/// applied at least once while the process stays alive.
#[derive(Debug)]
pub struct DeletePipeline {
    submissions: Mutex<Option<mpsc::Sender<WorkUnit>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeletePipeline {
    /// Spawns the background worker on the current tokio runtime.
    pub fn spawn<D: BatchDeleter>(deleter: D, settings: PipelineSettings) -> Self {
        let (tx, rx) = mpsc::channel(settings.submission_capacity.max(1));
        let worker = Worker {
            deleter,
            buffer: Vec::new(),
            flush_on_shutdown: settings.flush_on_shutdown,
        };
        let handle = tokio::spawn(worker.run(rx, settings.flush_interval));
        info!(
            flush_interval_ms = settings.flush_interval.as_millis() as u64,
            capacity = settings.submission_capacity,
            "delete pipeline started"
        );

        Self {
            submissions: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Hands a work unit to the worker.
    ///
    /// Waits while the submission queue is full. Wrap the call in
    /// `tokio::time::timeout` to bound the wait.
    pub async fn submit(&self, unit: WorkUnit) -> Result<(), PipelineError> {
        let sender = self
            .submissions
            .lock()
            .clone()
            .ok_or(PipelineError::Closed)?;
        sender.send(unit).await.map_err(|_| PipelineError::Closed)
    }

    /// Submits already collected requests as one work unit.
    pub async fn submit_all(&self, requests: Vec<DeleteRequest>) -> Result<(), PipelineError> {
        if requests.is_empty() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(requests.len());
        for request in requests {
            tx.try_send(request).ok();
        }
        drop(tx);
        self.submit(rx).await
    }

    /// Stops accepting submissions and waits for the worker to finish.
    ///
    /// Work units already queued are still drained. Buffered requests are
    /// flushed one last time only when `flush_on_shutdown` is set.
    pub async fn shutdown(&self) {
        drop(self.submissions.lock().take());

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "delete pipeline worker panicked");
            }
        }
    }
}

struct Worker<D> {
    deleter: D,
    buffer: Vec<DeleteRequest>,
    flush_on_shutdown: bool,
}

impl<D: BatchDeleter> Worker<D> {
    async fn run(mut self, mut units: mpsc::Receiver<WorkUnit>, flush_interval: Duration) {
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                unit = units.recv() => match unit {
                    Some(unit) => self.drain(unit).await,
                    None => break,
                },
                _ = ticker.tick() => self.flush().await,
            }
        }

        if self.flush_on_shutdown {
            self.flush().await;
        }
        if !self.buffer.is_empty() {
            warn!(
                pending = self.buffer.len(),
                "delete pipeline stopped with unflushed requests"
            );
        }
        info!("delete pipeline stopped");
    }

    async fn drain(&mut self, mut unit: WorkUnit) {
        let before = self.buffer.len();
        while let Some(request) = unit.recv().await {
            self.buffer.push(request);
        }
        debug!(
            count = self.buffer.len() - before,
            buffered = self.buffer.len(),
            "drained delete work unit"
        );
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        match self.deleter.delete_batch(&self.buffer).await {
            Ok(()) => {
                debug!(count = self.buffer.len(), "flushed delete batch");
                self.buffer.clear();
            }
            Err(err) => {
                error!(
                    error = %err,
                    pending = self.buffer.len(),
                    "failed to flush delete batch, retrying on next tick"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::{ShortCode, StorageError};
    use burrow_generator::SeqGenerator;
    use burrow_storage::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn request(code: &str, owner: &str) -> DeleteRequest {
        DeleteRequest::new(ShortCode::new_unchecked(code), owner)
    }

    /// Records every successful batch; fails the first `failures` calls.
    #[derive(Debug, Clone, Default)]
    struct RecordingDeleter {
        batches: Arc<Mutex<Vec<Vec<DeleteRequest>>>>,
        calls: Arc<AtomicUsize>,
        failures: usize,
    }

    impl RecordingDeleter {
        fn failing(failures: usize) -> Self {
            Self {
                failures,
                ..Self::default()
            }
        }

        fn batches(&self) -> Vec<Vec<DeleteRequest>> {
            self.batches.lock().clone()
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BatchDeleter for RecordingDeleter {
        async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<(), ShortenerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ShortenerError::Storage {
                    op: "delete batch",
                    source: StorageError::Unavailable("backend down".to_string()),
                });
            }
            self.batches.lock().push(requests.to_vec());
            Ok(())
        }
    }

    fn settings(interval_ms: u64, flush_on_shutdown: bool) -> PipelineSettings {
        PipelineSettings::builder()
            .flush_interval(Duration::from_millis(interval_ms))
            .flush_on_shutdown(flush_on_shutdown)
            .build()
    }

    #[test]
    fn default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.flush_interval, Duration::from_secs(5));
        assert_eq!(settings.submission_capacity, 10);
        assert!(!settings.flush_on_shutdown);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submitted_requests_are_flushed_on_tick() {
        let deleter = RecordingDeleter::default();
        let pipeline = DeletePipeline::spawn(deleter.clone(), settings(50, false));

        pipeline
            .submit_all(vec![request("aaaaaaaa", "u1"), request("bbbbbbbb", "u1")])
            .await
            .unwrap();

        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(20))
            .until_async(|| async { !deleter.batches().is_empty() })
            .await;

        assert_eq!(
            deleter.batches(),
            vec![vec![request("aaaaaaaa", "u1"), request("bbbbbbbb", "u1")]]
        );
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn empty_buffer_is_never_flushed() {
        let deleter = RecordingDeleter::default();
        let pipeline = DeletePipeline::spawn(deleter.clone(), settings(10, true));

        tokio::time::sleep(Duration::from_millis(100)).await;
        pipeline.shutdown().await;

        assert_eq!(deleter.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_flush_keeps_buffer_for_next_tick() {
        let deleter = RecordingDeleter::failing(2);
        let pipeline = DeletePipeline::spawn(deleter.clone(), settings(30, false));

        pipeline
            .submit_all(vec![request("aaaaaaaa", "u1")])
            .await
            .unwrap();

        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(20))
            .until_async(|| async { !deleter.batches().is_empty() })
            .await;

        assert_eq!(deleter.calls(), 3);
        assert_eq!(deleter.batches(), vec![vec![request("aaaaaaaa", "u1")]]);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn units_are_coalesced_in_submission_order() {
        let deleter = RecordingDeleter::default();
        let pipeline = DeletePipeline::spawn(deleter.clone(), settings(60_000, true));

        let (tx, rx) = mpsc::channel(4);
        tx.send(request("aaaaaaaa", "u1")).await.unwrap();
        tx.send(request("bbbbbbbb", "u1")).await.unwrap();
        drop(tx);
        pipeline.submit(rx).await.unwrap();
        pipeline
            .submit_all(vec![request("cccccccc", "u2")])
            .await
            .unwrap();

        pipeline.shutdown().await;

        assert_eq!(
            deleter.batches(),
            vec![vec![
                request("aaaaaaaa", "u1"),
                request("bbbbbbbb", "u1"),
                request("cccccccc", "u2"),
            ]]
        );
    }

    #[tokio::test]
    async fn units_filled_after_submission_are_drained() {
        let deleter = RecordingDeleter::default();
        let pipeline = DeletePipeline::spawn(deleter.clone(), settings(60_000, true));

        let (tx, rx) = mpsc::channel(1);
        pipeline.submit(rx).await.unwrap();
        let producer = tokio::spawn(async move {
            for code in ["aaaaaaaa", "bbbbbbbb", "cccccccc"] {
                tx.send(request(code, "u1")).await.unwrap();
            }
        });
        producer.await.unwrap();

        pipeline.shutdown().await;

        assert_eq!(deleter.batches().concat().len(), 3);
    }

    #[tokio::test]
    async fn shutdown_without_flush_drops_buffered_requests() {
        let deleter = RecordingDeleter::default();
        let pipeline = DeletePipeline::spawn(deleter.clone(), settings(60_000, false));

        pipeline
            .submit_all(vec![request("aaaaaaaa", "u1")])
            .await
            .unwrap();
        pipeline.shutdown().await;

        assert_eq!(deleter.calls(), 0);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let pipeline = DeletePipeline::spawn(RecordingDeleter::default(), settings(50, false));

        pipeline.shutdown().await;
        pipeline.shutdown().await;

        let err = pipeline
            .submit_all(vec![request("aaaaaaaa", "u1")])
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::Closed);
        assert!(pipeline.submit_all(Vec::new()).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deletes_reach_the_store_through_the_service() {
        let service = LinkService::new(
            InMemoryStore::new(),
            SeqGenerator::with_prefix("wh").unwrap(),
        );
        let mine = service.create_link("http://a.test", "u1").await.unwrap();
        let theirs = service.create_link("http://b.test", "u2").await.unwrap();

        let pipeline = DeletePipeline::spawn(service.clone(), settings(50, false));
        pipeline
            .submit_all(vec![
                DeleteRequest::new(mine.record.short_code.clone(), "u1"),
                DeleteRequest::new(theirs.record.short_code.clone(), "u1"),
            ])
            .await
            .unwrap();

        let code = mine.record.short_code.clone();
        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(20))
            .until_async(|| async {
                service
                    .get_url(&code)
                    .await
                    .unwrap()
                    .is_some_and(|record| record.is_deleted)
            })
            .await;

        let theirs = service
            .get_url(&theirs.record.short_code)
            .await
            .unwrap()
            .unwrap();
        assert!(!theirs.is_deleted);
        pipeline.shutdown().await;
    }
}
