//! Bounded record stream between concurrent probes and the single resolving
//! consumer, with problem aggregation on the producer side.

use crate::record::ServiceRecord;
use crate::transport::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sink half of a discovery pass. The engine guarantees `complete` is
/// reached exactly once per pass, after every probe has terminated.
#[async_trait]
pub trait DiscoveryResult: Send + Sync {
    /// Delivers one matching record. Applies backpressure when the consumer
    /// lags; delivery after `complete` is dropped.
    async fn add_match(&self, record: ServiceRecord);

    /// Records a non-fatal probe failure.
    fn report_problem(&self, problem: TransportError);

    /// Marks the stream finished. Idempotent.
    fn complete(&self);
}

struct QueueShared {
    problems: Mutex<Vec<TransportError>>,
    completed: AtomicBool,
}

/// Producer side of a [`ServicesQueue`], shared by every probe of one
/// discovery pass.
pub struct QueueSink {
    sender: Mutex<Option<mpsc::Sender<ServiceRecord>>>,
    shared: Arc<QueueShared>,
}

#[async_trait]
impl DiscoveryResult for QueueSink {
    async fn add_match(&self, record: ServiceRecord) {
        let sender = self.sender.lock().clone();
        if let Some(sender) = sender {
            // a closed consumer releases producers instead of erroring
            let _ = sender.send(record).await;
        }
    }

    fn report_problem(&self, problem: TransportError) {
        self.shared.problems.lock().push(problem);
    }

    fn complete(&self) {
        self.shared.completed.store(true, Ordering::Release);
        self.sender.lock().take();
    }
}

///
/// [`ServicesQueue`] is the consumer half: `take_service` yields records as
/// probes deliver them and returns `None` once the pass has completed and
/// the buffer is drained. Dropping the queue (or calling [`close`]) releases
/// any producer still waiting for capacity.
///
/// [`close`]: ServicesQueue::close
pub struct ServicesQueue {
    receiver: mpsc::Receiver<ServiceRecord>,
    shared: Arc<QueueShared>,
}

impl ServicesQueue {
    /// Creates a bounded queue and its producer sink.
    pub fn channel(capacity: usize) -> (Arc<QueueSink>, ServicesQueue) {
        let (sender, receiver) = mpsc::channel(capacity);
        let shared = Arc::new(QueueShared {
            problems: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
        });
        (
            Arc::new(QueueSink {
                sender: Mutex::new(Some(sender)),
                shared: Arc::clone(&shared),
            }),
            ServicesQueue { receiver, shared },
        )
    }

    /// Next record, or `None` when the pass completed and everything was
    /// drained. A stream that ends without completion aborted abnormally.
    pub async fn take_service(
        &mut self,
    ) -> Result<Option<ServiceRecord>, ServiceStreamInterrupted> {
        match self.receiver.recv().await {
            Some(record) => Ok(Some(record)),
            None if self.shared.completed.load(Ordering::Acquire) => Ok(None),
            None => Err(ServiceStreamInterrupted),
        }
    }

    /// Stops accepting records and releases blocked producers. Idempotent.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// The problems accumulated by producers so far.
    pub fn problems(&self) -> Vec<TransportError> {
        self.shared.problems.lock().clone()
    }
}

/// The record stream ended without the pass completing.
pub struct ServiceStreamInterrupted;

impl fmt::Debug for ServiceStreamInterrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceStreamInterrupted")
    }
}

impl fmt::Display for ServiceStreamInterrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("service record stream ended without completing")
    }
}

impl std::error::Error for ServiceStreamInterrupted {}

#[cfg(test)]
mod tests {
    use super::{DiscoveryResult, ServicesQueue};
    use crate::record::ServiceRecord;
    use crate::transport::TransportError;
    use std::sync::Arc;
    use url::Url;

    fn record(location: &str) -> ServiceRecord {
        ServiceRecord::new(Url::parse(location).expect("test uri"))
    }

    #[tokio::test]
    async fn drains_records_then_reports_completion() {
        let (sink, mut queue) = ServicesQueue::channel(4);
        sink.add_match(record("remote://h1:8080")).await;
        sink.add_match(record("remote://h2:8080")).await;
        sink.complete();

        let first = queue.take_service().await.expect("not interrupted");
        assert_eq!(
            first.expect("first record").location().as_str(),
            "remote://h1:8080"
        );
        let second = queue.take_service().await.expect("not interrupted");
        assert!(second.is_some());
        assert!(queue
            .take_service()
            .await
            .expect("not interrupted")
            .is_none());
    }

    #[tokio::test]
    async fn complete_is_idempotent_and_unblocks_consumer() {
        let (sink, mut queue) = ServicesQueue::channel(1);
        sink.complete();
        sink.complete();
        assert!(queue
            .take_service()
            .await
            .expect("not interrupted")
            .is_none());
    }

    #[tokio::test]
    async fn dropped_sink_without_completion_is_an_interruption() {
        let (sink, mut queue) = ServicesQueue::channel(1);
        drop(sink);
        assert!(queue.take_service().await.is_err());
    }

    #[tokio::test]
    async fn close_releases_a_blocked_producer() {
        let (sink, mut queue) = ServicesQueue::channel(1);
        sink.add_match(record("remote://h1:8080")).await;

        let producer = {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                // second send exceeds capacity and must not wedge
                sink.add_match(record("remote://h2:8080")).await;
            })
        };
        queue.close();
        producer.await.expect("producer released");
    }

    #[tokio::test]
    async fn problems_accumulate_across_producers() {
        let (sink, queue) = ServicesQueue::channel(1);
        let destination = Url::parse("remote://h1:8080").expect("test uri");
        sink.report_problem(TransportError::Connect {
            destination: destination.clone(),
            reason: "refused".to_string(),
        });
        sink.report_problem(TransportError::Channel {
            destination,
            reason: "no service".to_string(),
        });
        assert_eq!(queue.problems().len(), 2);
    }
}
