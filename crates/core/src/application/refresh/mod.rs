// Refresh Loop - polling trigger for session snapshots
//
// There is no server push: a client sees other clients' writes only after
// it re-reads. This loop re-reads on a fixed interval and publishes the
// resulting view to renderers.

use crate::application::constants::MIN_REFRESH_INTERVAL;
use crate::application::session::{BoardView, Session};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

/// Stops a running refresh loop
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the refresh loop between polls
#[derive(Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop was requested or the handle was dropped
    pub async fn stopped(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

/// Polls the store through a session and publishes each new view
pub struct RefreshLoop {
    session: Session,
    interval: Duration,
    views: watch::Sender<BoardView>,
}

impl RefreshLoop {
    /// Wrap a session. The receiver starts at the session's current view
    /// and is notified only when queue or question content changes.
    pub fn new(session: Session, interval: Duration) -> (Self, watch::Receiver<BoardView>) {
        let (views, rx) = watch::channel(session.view());
        let refresh_loop = Self {
            session,
            interval: interval.max(MIN_REFRESH_INTERVAL),
            views,
        };
        (refresh_loop, rx)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until stopped, then hand the session back
    pub async fn run(mut self, mut stop: StopSignal) -> Session {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Refresh loop started"
        );

        loop {
            if stop.is_stopped() {
                break;
            }

            match self.session.refresh().await {
                Ok(()) => self.publish(),
                Err(e) => warn!(error = %e, "Refresh failed, keeping last snapshot"),
            }

            tokio::select! {
                _ = sleep(self.interval) => {},
                _ = stop.stopped() => break,
            }
        }

        info!("Refresh loop stopped");
        self.session
    }

    fn publish(&self) {
        let view = self.session.view();
        self.views.send_if_modified(|current| {
            let changed = current.queue != view.queue || current.questions != view.questions;
            *current = view;
            changed
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::access_gate::AccessGate;
    use crate::application::session::WritePolicy;
    use crate::port::shared_store::mocks::InMemoryStore;
    use crate::port::time_provider::SystemTimeProvider;
    use std::sync::Arc;
    use tokio::time::timeout;

    fn session(store: &Arc<InMemoryStore>) -> Session {
        Session::new(
            store.clone(),
            Arc::new(SystemTimeProvider),
            AccessGate::default(),
            WritePolicy::LastWriteWins,
        )
    }

    #[tokio::test]
    async fn test_loop_publishes_other_clients_writes() {
        let store = Arc::new(InMemoryStore::new());
        let (refresh_loop, mut views) =
            RefreshLoop::new(session(&store), Duration::from_millis(10));
        assert_eq!(refresh_loop.interval(), MIN_REFRESH_INTERVAL);

        let (stop, signal) = stop_channel();
        let handle = tokio::spawn(refresh_loop.run(signal));

        let mut writer = session(&store);
        writer.queue().join("Ann").await.unwrap();

        timeout(Duration::from_secs(5), views.changed())
            .await
            .expect("view not published in time")
            .unwrap();
        assert_eq!(views.borrow().queue.entries()[0].name, "Ann");

        stop.stop();
        let session = timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.queue_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_loop_survives_store_outage() {
        let store = Arc::new(InMemoryStore::new());
        store.set_unavailable(true);
        let (refresh_loop, mut views) = RefreshLoop::new(session(&store), MIN_REFRESH_INTERVAL);
        let (stop, signal) = stop_channel();
        let handle = tokio::spawn(refresh_loop.run(signal));

        tokio::time::sleep(MIN_REFRESH_INTERVAL * 2).await;
        store.set_unavailable(false);
        session(&store).questions().post("Amy", "Why?").await.unwrap();

        timeout(Duration::from_secs(5), views.changed())
            .await
            .expect("loop did not recover")
            .unwrap();
        assert_eq!(views.borrow().questions.len(), 1);

        stop.stop();
        handle.await.unwrap();
    }

    #[test]
    fn test_stop_signal_wakes_waiter() {
        let (stop, mut signal) = stop_channel();
        let mut waiter = tokio_test::task::spawn(signal.stopped());
        tokio_test::assert_pending!(waiter.poll());

        stop.stop();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[test]
    fn test_dropped_handle_counts_as_stop() {
        let (stop, mut signal) = stop_channel();
        drop(stop);
        let mut waiter = tokio_test::task::spawn(signal.stopped());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_stop_before_run_returns_immediately() {
        let store = Arc::new(InMemoryStore::new());
        let (refresh_loop, _views) = RefreshLoop::new(session(&store), MIN_REFRESH_INTERVAL);
        let (stop, signal) = stop_channel();
        stop.stop();

        let session = timeout(Duration::from_secs(1), refresh_loop.run(signal))
            .await
            .unwrap();
        assert!(session.refreshed_at().is_none());
    }
}
