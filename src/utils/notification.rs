use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::engine::ordering::RequestFilter;
use crate::models::notification::{Notification, NotificationKind};

/// Request list filter a notification opens when selected.
pub fn route(kind: NotificationKind) -> RequestFilter {
    match kind {
        NotificationKind::RequestApproved => RequestFilter::Approved,
        NotificationKind::RequestDenied => RequestFilter::Denied,
        NotificationKind::ReturnRequest => RequestFilter::ReturnRequested,
        NotificationKind::ReturnConfirmed => RequestFilter::Returned,
        NotificationKind::OverdueReturn => RequestFilter::Overdue,
        NotificationKind::ReturnDueSoon => RequestFilter::Due,
        NotificationKind::Other => RequestFilter::All,
    }
}

/// Where the feed pulls notifications from.
#[async_trait]
pub trait NotificationSource: Send + Sync + 'static {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError>;
}

#[async_trait]
impl NotificationSource for ApiClient {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_notifications().await
    }
}

/// Latest state published by the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub notifications: Vec<Notification>,
    pub unread: usize,
    pub last_error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Completed refresh attempts, successful or not.
    pub refreshes: u64,
}

impl FeedSnapshot {
    fn apply(&mut self, result: Result<Vec<Notification>, ApiError>) {
        self.refreshes += 1;
        match result {
            Ok(notifications) => {
                self.unread = notifications.iter().filter(|n| !n.read).count();
                self.notifications = notifications;
                self.last_error = None;
                self.refreshed_at = Some(Utc::now());
            }
            Err(e) => {
                warn!("Error fetching notifications: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }
}

/// Background poller for the notification list. Dropping the handle stops it.
pub struct NotificationFeed {
    rx: watch::Receiver<FeedSnapshot>,
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl NotificationFeed {
    pub fn spawn<S: NotificationSource>(source: Arc<S>, period: Duration) -> Self {
        Self::spawn_with_token(source, period, CancellationToken::new())
    }

    /// Same as [`spawn`](Self::spawn) but stops when `cancel` (or any parent
    /// token) is cancelled.
    pub fn spawn_with_token<S: NotificationSource>(
        source: Arc<S>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = watch::channel(FeedSnapshot::default());
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(poll(
            source,
            period.max(Duration::from_millis(1)),
            cancel.clone(),
            refresh.clone(),
            tx,
        ));

        Self { rx, cancel, refresh, task: Some(task) }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.rx.borrow().clone()
    }

    /// Fetch again without waiting for the next tick, e.g. after marking read.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Notification feed task failed: {}", e);
            }
        }
    }
}

impl Drop for NotificationFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll<S: NotificationSource>(
    source: Arc<S>,
    period: Duration,
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    tx: watch::Sender<FeedSnapshot>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = refresh.notified() => ticker.reset(),
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.fetch_notifications() => result,
        };
        tx.send_modify(|snapshot| snapshot.apply(result));
    }

    debug!("Notification feed stopped");
}
