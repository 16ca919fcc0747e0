//! jobs.rs
//!
//! Фоновая очередь задач после изменений данных.
//!
//! 1.  **JobQueue**: ограниченный канал. Постановка не блокирует: если очередь
//!     заполнена, задача отбрасывается и только пишется в лог.
//! 2.  **JobWorkers**: несколько воркеров разбирают очередь, каждый
//!     обрабатывает задачи последовательно с собственным таймаутом.
//!     Канал многопотребительский, у каждого воркера свой клон приёмника.
//!     Задача, не уложившаяся в таймаут, бросается без повтора.
//! 3.  **Notifier**: то, что получают обработчики HTTP. Если потребителя нет,
//!     в состояние кладётся `NoopNotifier`.

use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{info, warn};

/// Единица фоновой работы.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub data: Map<String, Value>,
    /// Объявлен, но воркеры его не учитывают: порядок FIFO.
    pub priority: i32,
}

impl Job {
    pub fn new(name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self { name: name.into(), data, priority: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Processed,
    Failed,
    TimedOut,
}

/// Уведомление о выполненном изменении. Результат вызывающему не важен.
pub trait Notifier: Send + Sync {
    fn notify(&self, job: Job);
}

/// Для сборок без фоновой обработки.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, job: Job) {
        tracing::debug!("No job consumer, discarding job: {}", job.name);
    }
}

/// Точка расширения: реальная работа по задаче.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> anyhow::Result<()>;
}

/// Заглушка: только пишет задачу в лог.
pub struct LoggingJobHandler;

#[async_trait]
impl JobHandler for LoggingJobHandler {
    async fn handle(&self, job: &Job) -> anyhow::Result<()> {
        info!("Processing job: {} {:?}", job.name, job.data);
        Ok(())
    }
}

#[derive(Clone)]
pub struct JobQueue {
    tx: Sender<Job>,
}

/// Приёмная сторона очереди. Клонируется на каждого воркера.
#[derive(Clone)]
pub struct JobReceiver {
    rx: Receiver<Job>,
}

impl JobReceiver {
    /// Ждёт следующую задачу, не занимая поток рантайма.
    /// `None`, когда все отправители закрыты и очередь пуста.
    async fn next(&self) -> Option<Job> {
        let rx = self.rx.clone();
        spawn_blocking(move || rx.recv().ok()).await.ok().flatten()
    }
}

impl JobQueue {
    pub fn bounded(capacity: usize) -> (Self, JobReceiver) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx }, JobReceiver { rx })
    }

    pub fn try_enqueue(&self, job: Job) -> EnqueueOutcome {
        match self.tx.try_send(job) {
            Ok(()) => EnqueueOutcome::Enqueued,
            Err(TrySendError::Full(job)) => {
                warn!("Job queue full, dropping job: {}", job.name);
                EnqueueOutcome::Dropped
            }
            Err(TrySendError::Disconnected(job)) => {
                warn!("Job queue closed, dropping job: {}", job.name);
                EnqueueOutcome::Dropped
            }
        }
    }
}

impl Notifier for JobQueue {
    fn notify(&self, job: Job) {
        let name = job.name.clone();
        if self.try_enqueue(job) == EnqueueOutcome::Enqueued {
            info!("Job enqueued: {}", name);
        }
    }
}

pub struct JobWorkers;

impl JobWorkers {
    pub fn start(
        receiver: JobReceiver,
        count: usize,
        handler: Arc<dyn JobHandler>,
        timeout: Duration,
    ) -> Vec<JoinHandle<()>> {
        (0..count.max(1))
            .map(|id| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    info!("Worker {} started", id);
                    while let Some(job) = receiver.next().await {
                        process_job(handler.as_ref(), &job, timeout).await;
                    }
                    info!("Worker {} stopped", id);
                })
            })
            .collect()
    }
}

pub async fn process_job(handler: &dyn JobHandler, job: &Job, timeout: Duration) -> JobOutcome {
    match tokio::time::timeout(timeout, handler.handle(job)).await {
        Ok(Ok(())) => {
            info!("Job processed: {}", job.name);
            JobOutcome::Processed
        }
        Ok(Err(e)) => {
            warn!("Job failed: {}: {:#}", job.name, e);
            JobOutcome::Failed
        }
        Err(_) => {
            warn!("Job timed out: {}", job.name);
            JobOutcome::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler(AtomicUsize);

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _job: &Job) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl JobHandler for SlowHandler {
        async fn handle(&self, _job: &Job) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl JobHandler for FailingHandler {
        async fn handle(&self, _job: &Job) -> anyhow::Result<()> {
            anyhow::bail!("mail server unavailable")
        }
    }

    fn job(n: usize) -> Job {
        Job::new(format!("SeatUpdated-{}", n), Map::new())
    }

    #[tokio::test]
    async fn overflow_is_dropped_and_never_processed() {
        let (queue, receiver) = JobQueue::bounded(3);
        let outcomes: Vec<_> = (0..5).map(|n| queue.try_enqueue(job(n))).collect();
        assert_eq!(outcomes.iter().filter(|o| **o == EnqueueOutcome::Enqueued).count(), 3);
        assert_eq!(outcomes[3..], [EnqueueOutcome::Dropped, EnqueueOutcome::Dropped]);

        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
        drop(queue);
        let workers = JobWorkers::start(receiver, 2, handler.clone(), Duration::from_secs(1));
        for worker in workers {
            worker.await.unwrap();
        }
        assert_eq!(handler.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn each_job_goes_to_exactly_one_worker() {
        let (queue, receiver) = JobQueue::bounded(20);
        for n in 0..20 {
            assert_eq!(queue.try_enqueue(job(n)), EnqueueOutcome::Enqueued);
        }
        drop(queue);

        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
        let workers = JobWorkers::start(receiver.clone(), 4, handler.clone(), Duration::from_secs(1));
        for worker in workers {
            worker.await.unwrap();
        }
        assert_eq!(handler.0.load(Ordering::SeqCst), 20);
        assert!(receiver.rx.is_empty());
    }

    #[tokio::test]
    async fn notifier_never_blocks_when_full() {
        let (queue, _receiver) = JobQueue::bounded(1);
        queue.notify(job(0));
        queue.notify(job(1));
        assert_eq!(queue.try_enqueue(job(2)), EnqueueOutcome::Dropped);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_job_times_out() {
        let outcome = process_job(&SlowHandler, &job(0), Duration::from_secs(10)).await;
        assert_eq!(outcome, JobOutcome::TimedOut);
    }

    #[tokio::test]
    async fn failing_job_is_not_retried() {
        let outcome = process_job(&FailingHandler, &job(0), Duration::from_secs(10)).await;
        assert_eq!(outcome, JobOutcome::Failed);
    }

    #[test]
    fn noop_notifier_swallows_jobs() {
        let notifier: Arc<dyn Notifier> = Arc::new(NoopNotifier);
        notifier.notify(job(0));
    }

    #[tokio::test]
    async fn logging_handler_processes() {
        let outcome = process_job(&LoggingJobHandler, &job(0), Duration::from_secs(1)).await;
        assert_eq!(outcome, JobOutcome::Processed);
    }
}
