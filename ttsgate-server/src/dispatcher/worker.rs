//! Per-model bounded queue and the worker loops that drain it.
//!
//! Admission takes a slot from a semaphore sized to the queue capacity and
//! the slot travels with the task until the engine call returns, so
//! capacity bounds waiting and running tasks together. Once every slot is
//! taken further submissions fail fast with `QueueFull` instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use ttsgate_core::{SpeechEngine, SynthesisError, SynthesisOutput, SynthesisParams};

use super::error::DispatchError;
use super::metrics::DispatchMetrics;
use crate::metrics::prometheus as prom;

type SynthesisResult = Result<SynthesisOutput, SynthesisError>;

/// One admitted unit of work
struct SynthesisTask {
    params: SynthesisParams,
    reply: oneshot::Sender<SynthesisResult>,
    slot: OwnedSemaphorePermit,
    enqueued_at: Instant,
}

/// Queue plus consumer loops for a single model
pub struct ModelWorker {
    model: String,
    engine: Arc<dyn SpeechEngine>,
    sender: mpsc::Sender<SynthesisTask>,
    receiver: Arc<Mutex<mpsc::Receiver<SynthesisTask>>>,
    slots: Arc<Semaphore>,
    capacity: usize,
    workers: usize,
    started: AtomicBool,
    metrics: Arc<DispatchMetrics>,
}

impl ModelWorker {
    /// Build an idle worker. No loops run until [`ensure_started`](Self::ensure_started).
    pub fn new(
        model: impl Into<String>,
        engine: Arc<dyn SpeechEngine>,
        capacity: usize,
        workers: usize,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        let model: String = model.into();
        let capacity = capacity.max(1);
        let workers = workers.max(1);
        if workers > capacity {
            warn!(
                model = %model,
                workers,
                capacity,
                "More workers than queue capacity; at most {} tasks run at once",
                capacity
            );
        }

        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            model,
            engine,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            workers,
            started: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Upper bound on concurrent engine calls; a running task holds a slot too
    pub fn max_parallel(&self) -> usize {
        self.workers.min(self.capacity)
    }

    /// Tasks holding a slot (waiting or running)
    pub fn outstanding(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Spawn the worker loops once. Later calls are no-ops.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn ensure_started(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        for worker_id in 0..self.workers {
            tokio::spawn(worker_loop(
                worker_id,
                self.model.clone(),
                self.engine.clone(),
                self.receiver.clone(),
                self.metrics.clone(),
            ));
        }
        info!(
            model = %self.model,
            workers = self.workers,
            capacity = self.capacity,
            "Started model workers"
        );
    }

    /// Place a task on the queue without waiting, returning its completion slot
    pub fn enqueue(
        &self,
        params: SynthesisParams,
    ) -> Result<oneshot::Receiver<SynthesisResult>, DispatchError> {
        let slot = match self.slots.clone().try_acquire_owned() {
            Ok(slot) => slot,
            Err(_) => return Err(self.reject()),
        };

        let (reply, completion) = oneshot::channel();
        let task = SynthesisTask {
            params,
            reply,
            slot,
            enqueued_at: Instant::now(),
        };

        // Counted before the send; a worker may pick the task up immediately
        let depth = self.metrics.record_queued();
        match self.sender.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.cancel_queued();
                return Err(self.reject());
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.cancel_queued();
                return Err(DispatchError::WorkerStopped(self.model.clone()));
            }
        }

        prom::set_queue_depth(&self.model, depth);
        debug!(model = %self.model, queue_depth = depth, "Task enqueued");

        Ok(completion)
    }

    /// Enqueue and wait for the worker's answer
    pub async fn submit(&self, params: SynthesisParams) -> Result<SynthesisOutput, DispatchError> {
        let completion = self.enqueue(params)?;
        match completion.await {
            Ok(result) => result.map_err(DispatchError::from),
            Err(_) => Err(DispatchError::WorkerStopped(self.model.clone())),
        }
    }

    fn reject(&self) -> DispatchError {
        self.metrics.record_rejected();
        prom::record_rejected(&self.model);
        warn!(model = %self.model, capacity = self.capacity, "Queue full, rejecting task");
        DispatchError::QueueFull {
            model: self.model.clone(),
            capacity: self.capacity,
        }
    }
}

/// Run one engine call on the blocking pool. A panic becomes an error.
pub(crate) async fn run_blocking(
    engine: Arc<dyn SpeechEngine>,
    params: SynthesisParams,
) -> SynthesisResult {
    match tokio::task::spawn_blocking(move || engine.synthesize(&params)).await {
        Ok(result) => result,
        Err(e) => Err(SynthesisError::Panicked(e.to_string())),
    }
}

async fn worker_loop(
    worker_id: usize,
    model: String,
    engine: Arc<dyn SpeechEngine>,
    receiver: Arc<Mutex<mpsc::Receiver<SynthesisTask>>>,
    metrics: Arc<DispatchMetrics>,
) {
    debug!(model = %model, worker_id, "Worker loop running");

    loop {
        let next = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(task) = next else {
            break;
        };
        let SynthesisTask {
            params,
            reply,
            slot,
            enqueued_at,
        } = task;

        let depth = metrics.record_started(enqueued_at.elapsed());
        prom::set_queue_depth(&model, depth);
        prom::set_active_syntheses(&model, metrics.running_count());

        let started = Instant::now();
        let result = run_blocking(engine.clone(), params).await;
        let success = result.is_ok();
        metrics.record_finished(started.elapsed(), success);
        prom::set_active_syntheses(&model, metrics.running_count());

        if let Err(e) = &result {
            warn!(model = %model, worker_id, error = %e, "Synthesis failed");
        }

        drop(slot);
        if reply.send(result).is_err() {
            debug!(model = %model, worker_id, "Caller went away before completion");
        }
    }

    debug!(model = %model, worker_id, "Worker loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Records call order; fails on "fail", panics on "panic"
    #[derive(Default)]
    struct RecordingEngine {
        calls: StdMutex<Vec<String>>,
    }

    impl SpeechEngine for RecordingEngine {
        fn synthesize(&self, params: &SynthesisParams) -> SynthesisResult {
            self.calls.lock().unwrap().push(params.text.clone());
            match params.text.as_str() {
                "fail" => Err(SynthesisError::backend("requested failure")),
                "panic" => panic!("requested panic"),
                _ => Ok(SynthesisOutput::new(vec![0.1; 10], params.sample_rate)),
            }
        }
    }

    /// Blocks each call until released; dropping the release sender fails pending calls
    struct GatedEngine {
        entered: tokio::sync::mpsc::UnboundedSender<()>,
        release: StdMutex<std_mpsc::Receiver<()>>,
    }

    impl SpeechEngine for GatedEngine {
        fn synthesize(&self, params: &SynthesisParams) -> SynthesisResult {
            let _ = self.entered.send(());
            match self.release.lock().unwrap().recv() {
                Ok(()) => Ok(SynthesisOutput::new(vec![0.0; 4], params.sample_rate)),
                Err(_) => Err(SynthesisError::backend("gate dropped")),
            }
        }
    }

    fn gated() -> (
        Arc<GatedEngine>,
        tokio::sync::mpsc::UnboundedReceiver<()>,
        std_mpsc::Sender<()>,
    ) {
        let (entered_tx, entered_rx) = tokio::sync::mpsc::unbounded_channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let engine = Arc::new(GatedEngine {
            entered: entered_tx,
            release: StdMutex::new(release_rx),
        });
        (engine, entered_rx, release_tx)
    }

    fn worker(engine: Arc<dyn SpeechEngine>, capacity: usize) -> ModelWorker {
        ModelWorker::new("test-model", engine, capacity, 1, Arc::new(DispatchMetrics::new()))
    }

    #[tokio::test]
    async fn test_rejects_beyond_capacity() {
        let worker = worker(Arc::new(RecordingEngine::default()), 2);

        let _a = worker.enqueue(SynthesisParams::new("a")).unwrap();
        let _b = worker.enqueue(SynthesisParams::new("b")).unwrap();
        let err = worker.enqueue(SynthesisParams::new("c")).unwrap_err();

        assert!(matches!(err, DispatchError::QueueFull { capacity: 2, .. }));
        assert_eq!(worker.outstanding(), 2);
        assert_eq!(worker.metrics.snapshot().rejected, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fifo_with_single_worker() {
        let engine = Arc::new(RecordingEngine::default());
        let worker = worker(engine.clone(), 8);

        let texts = ["one", "two", "three", "four", "five"];
        let completions: Vec<_> = texts
            .iter()
            .map(|t| worker.enqueue(SynthesisParams::new(*t)).unwrap())
            .collect();
        worker.ensure_started();

        for completion in completions {
            assert!(completion.await.unwrap().is_ok());
        }
        assert_eq!(*engine.calls.lock().unwrap(), texts);
        assert_eq!(worker.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_does_not_stop_loop() {
        let engine = Arc::new(RecordingEngine::default());
        let worker = worker(engine.clone(), 4);
        worker.ensure_started();

        let err = worker.submit(SynthesisParams::new("fail")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Synthesis(SynthesisError::Backend(_))));

        let err = worker.submit(SynthesisParams::new("panic")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Synthesis(SynthesisError::Panicked(_))));

        let out = worker.submit(SynthesisParams::new("fine")).await.unwrap();
        assert_eq!(out.samples.len(), 10);

        let snap = worker.metrics.snapshot();
        assert_eq!(snap.failed, 2);
        assert_eq!(snap.completed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_running_task_holds_its_slot() {
        let (engine, mut entered, release) = gated();
        let worker = Arc::new(worker(engine, 1));
        worker.ensure_started();

        let first = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.submit(SynthesisParams::new("first")).await })
        };
        tokio::time::timeout(Duration::from_secs(5), entered.recv())
            .await
            .unwrap();

        let err = worker.submit(SynthesisParams::new("second")).await.unwrap_err();
        assert!(matches!(err, DispatchError::QueueFull { capacity: 1, .. }));

        release.send(()).unwrap();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(worker.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_workers_drain_shared_queue() {
        let (engine, mut entered, release) = gated();
        let metrics = Arc::new(DispatchMetrics::new());
        let worker = Arc::new(ModelWorker::new("test-model", engine, 4, 2, metrics.clone()));
        worker.ensure_started();

        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|text| {
                let worker = worker.clone();
                tokio::spawn(async move { worker.submit(SynthesisParams::new(text)).await })
            })
            .collect();

        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), entered.recv())
                .await
                .unwrap();
        }
        // Both loops are inside the engine at once
        assert_eq!(metrics.running_count(), 2);

        for _ in 0..4 {
            release.send(()).unwrap();
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.submitted, 4);
        assert_eq!(snap.completed, 4);
        assert_eq!(snap.failed, 0);
        assert_eq!(snap.running, 0);
        assert_eq!(worker.outstanding(), 0);

        // Each task reached the engine exactly once
        let mut engine_calls = 2;
        while entered.try_recv().is_ok() {
            engine_calls += 1;
        }
        assert_eq!(engine_calls, 4);
    }

    #[test]
    fn test_parallelism_capped_by_capacity() {
        let engine: Arc<dyn SpeechEngine> = Arc::new(RecordingEngine::default());
        let metrics = Arc::new(DispatchMetrics::new());

        let narrow = ModelWorker::new("m", engine.clone(), 1, 4, metrics.clone());
        assert_eq!(narrow.workers(), 4);
        assert_eq!(narrow.max_parallel(), 1);

        let wide = ModelWorker::new("m", engine, 8, 2, metrics);
        assert_eq!(wide.max_parallel(), 2);
    }

    #[tokio::test]
    async fn test_ensure_started_is_idempotent() {
        let worker = worker(Arc::new(RecordingEngine::default()), 1);
        assert!(!worker.is_started());
        worker.ensure_started();
        worker.ensure_started();
        assert!(worker.is_started());
    }
}
