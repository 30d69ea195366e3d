//! Sequential batch start/stop.
//!
//! Items run one after another with a fixed pause between consecutive
//! items. Each result is sent back as soon as it arrives so the panel can
//! refresh rows while the batch is still running.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::errors::{ClientError, ClientResult};
use crate::models::booking::{Booking, BookingId};
use crate::services::backend::BookingBackend;

/// Default pause between two items of a batch
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Start,
    Stop,
}

impl BatchAction {
    pub fn label(&self) -> &'static str {
        match self {
            BatchAction::Start => "start",
            BatchAction::Stop => "stop",
        }
    }
}

/// Outcome of one item
#[derive(Debug)]
pub struct BatchItem<T> {
    pub index: usize,
    pub id: BookingId,
    pub result: ClientResult<T>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    delay: Duration,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_DELAY)
    }
}

impl BatchRunner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` for every id in order. Returns how many items succeeded.
    /// A closed receiver does not stop the batch.
    pub async fn run<T, F, Fut>(&self, ids: Vec<BookingId>, mut action: F, results: UnboundedSender<BatchItem<T>>) -> usize
    where
        F: FnMut(BookingId) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let total = ids.len();
        let mut succeeded = 0;

        for (index, id) in ids.into_iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let result = action(id.clone()).await;
            match &result {
                Ok(_) => {
                    succeeded += 1;
                    log::info!("Batch item {}/{} ({}) done", index + 1, total, id);
                }
                Err(err) => log::warn!("Batch item {}/{} ({}) failed: {}", index + 1, total, id, err),
            }

            if results.send(BatchItem { index, id, result }).is_err() {
                log::debug!("Batch results receiver dropped");
            }
        }

        succeeded
    }

    /// Start or stop bookings through a blocking backend
    pub async fn run_backend(
        &self,
        backend: Arc<dyn BookingBackend>,
        action: BatchAction,
        ids: Vec<BookingId>,
        results: UnboundedSender<BatchItem<Booking>>,
    ) -> usize {
        log::info!("Batch {} of {} bookings", action.label(), ids.len());
        self.run(
            ids,
            move |id| {
                let backend = Arc::clone(&backend);
                async move {
                    tokio::task::spawn_blocking(move || match action {
                        BatchAction::Start => backend.start_booking(&id),
                        BatchAction::Stop => backend.stop_booking(&id),
                    })
                    .await
                    .map_err(|err| ClientError::Transport(format!("Batch task failed: {}", err)))?
                }
            },
            results,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::MockBookingBackend;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn ids(list: &[&str]) -> Vec<BookingId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_run_in_order_with_delay() {
        let runner = BatchRunner::from_millis(1000);
        let started = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let done = runner
            .run(
                ids(&["a", "b", "c"]),
                |id| async move { Ok::<_, ClientError>((id, Instant::now())) },
                tx,
            )
            .await;
        assert_eq!(done, 3);

        let mut seen = Vec::new();
        while let Some(item) = rx.recv().await {
            let (id, at) = item.result.unwrap();
            seen.push((item.index, id, (at - started).as_millis()));
        }
        assert_eq!(
            seen,
            vec![
                (0, "a".to_string(), 0),
                (1, "b".to_string(), 1000),
                (2, "c".to_string(), 2000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_batch() {
        let runner = BatchRunner::from_millis(500);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let done = runner
            .run(
                ids(&["1", "2", "3"]),
                |id| async move {
                    if id == "2" {
                        Err(ClientError::Transport("busy".to_string()))
                    } else {
                        Ok(id)
                    }
                },
                tx,
            )
            .await;
        assert_eq!(done, 2);

        let mut failures = Vec::new();
        while let Some(item) = rx.recv().await {
            if item.result.is_err() {
                failures.push(item.id);
            }
        }
        assert_eq!(failures, vec!["2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_and_dropped_receiver() {
        let runner = BatchRunner::new(Duration::ZERO);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let started = Instant::now();
        let done = runner
            .run(ids(&["x", "y"]), |id| async move { Ok::<_, ClientError>(id) }, tx)
            .await;
        assert_eq!(done, 2);
        assert_eq!(Instant::now() - started, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_backend_stops_each_booking() {
        let mut backend = MockBookingBackend::new();
        backend
            .expect_stop_booking()
            .times(2)
            .returning(|id| {
                let mut booking = Booking::new(id, "CERNMCU");
                booking.status_message = "Stopped".to_string();
                Ok(booking)
            });
        backend.expect_start_booking().never();

        let runner = BatchRunner::new(Duration::from_millis(1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let done = runner
            .run_backend(Arc::new(backend), BatchAction::Stop, ids(&["4", "5"]), tx)
            .await;
        assert_eq!(done, 2);

        let mut stopped = Vec::new();
        while let Some(item) = rx.recv().await {
            let booking = item.result.unwrap();
            assert_eq!(booking.status_message, "Stopped");
            stopped.push(booking.id);
        }
        assert_eq!(stopped, vec!["4".to_string(), "5".to_string()]);
    }
}
