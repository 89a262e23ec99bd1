use crate::error::{Result, SakegramError};
use crate::settings::{Settings, SettingsStore};
use crate::store::PostStore;
use crate::types::{Post, PostStatus, PublishOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sakegram_graph::{GraphConfig, InstagramPublisher};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_secs(60);

/// Something that can put a post on Instagram.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the id of the published media.
    async fn publish(&self, post: &Post, settings: &Settings) -> Result<String>;
}

/// [`Publisher`] backed by the Graph API container protocol.
pub struct GraphPublisher {
    inner: InstagramPublisher,
}

impl GraphPublisher {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            inner: InstagramPublisher::new(config),
        }
    }
}

#[async_trait]
impl Publisher for GraphPublisher {
    async fn publish(&self, post: &Post, settings: &Settings) -> Result<String> {
        let media = self
            .inner
            .publish(
                &settings.graph_credentials(),
                &post.image_path,
                &post.caption,
            )
            .await?;
        Ok(media.media_id)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub posted: usize,
    pub failed: usize,
}

/// Publishes due posts and records the outcome of every attempt.
pub struct Dispatcher {
    store: Arc<PostStore>,
    settings: Arc<SettingsStore>,
    publisher: Arc<dyn Publisher>,
    /// Serialises the polling loop with manual retries so a post is never
    /// sent twice concurrently.
    publish_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<PostStore>,
        settings: Arc<SettingsStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            settings,
            publisher,
            publish_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &Arc<PostStore> {
        &self.store
    }

    /// Publish every post that is due at `now`, one after another.
    pub async fn run_once(&self, now: DateTime<Utc>) -> DispatchReport {
        let _guard = self.publish_lock.lock().await;
        let mut report = DispatchReport::default();

        for post in self.store.due(now) {
            // deleted or retried while an earlier post was publishing
            match self.store.get(post.id) {
                Some(current) if current.is_due(now) => {}
                _ => continue,
            }

            tracing::info!("[dispatch] Executing post {}", post.id);
            report.attempted += 1;
            let outcome = self.attempt(&post).await;
            if outcome.is_success() {
                report.posted += 1;
            } else {
                report.failed += 1;
            }

            match self.store.record_outcome(post.id, &outcome, Utc::now()) {
                Ok(_) => {}
                Err(SakegramError::PostNotFound(id)) => {
                    tracing::warn!("[dispatch] Post {} was deleted while publishing", id);
                }
                Err(e) => {
                    tracing::error!("[dispatch] Failed to record outcome for {}: {}", post.id, e);
                }
            }
        }

        report
    }

    /// Publish one post right now, whatever its schedule.
    pub async fn retry(&self, id: i64) -> Result<Post> {
        let _guard = self.publish_lock.lock().await;
        let post = self.store.get(id).ok_or(SakegramError::PostNotFound(id))?;
        if post.status == PostStatus::Posted {
            return Err(SakegramError::Conflict(format!(
                "Post {} is already published",
                id
            )));
        }

        tracing::info!("[dispatch] Manual retry of post {}", id);
        let outcome = self.attempt(&post).await;
        self.store.record_outcome(id, &outcome, Utc::now())
    }

    async fn attempt(&self, post: &Post) -> PublishOutcome {
        let settings = self.settings.snapshot();
        match self.publisher.publish(post, &settings).await {
            Ok(media_id) => {
                tracing::info!("[dispatch] Post {} published as {}", post.id, media_id);
                PublishOutcome::Published { media_id }
            }
            Err(e) => {
                tracing::warn!("[dispatch] Post {} failed: {}", post.id, e);
                PublishOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Polling loop. Ticks never overlap: a slow round delays the next one.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let report = self.run_once(Utc::now()).await;
            if report.attempted > 0 {
                tracing::info!(
                    "[dispatch] Round complete: {} attempted, {} posted, {} failed",
                    report.attempted,
                    report.posted,
                    report.failed
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewPost;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::Mutex as StdMutex;

    /// Publishes everything except captions starting with "fail".
    #[derive(Default)]
    struct FakePublisher {
        calls: StdMutex<Vec<i64>>,
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(&self, post: &Post, settings: &Settings) -> Result<String> {
            self.calls.lock().unwrap().push(post.id);
            if settings.access_token.is_none() {
                return Err(SakegramError::Publish("ACCESS_TOKEN is missing".into()));
            }
            if post.caption.starts_with("fail") {
                return Err(SakegramError::Publish("Media processing failed".into()));
            }
            Ok(format!("media-{}", post.id))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    struct Harness {
        _dir: tempfile::TempDir,
        store: Arc<PostStore>,
        publisher: Arc<FakePublisher>,
        dispatcher: Arc<Dispatcher>,
    }

    fn harness(with_token: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PostStore::open(dir.path().join("db.json")).unwrap());
        let mut settings = Settings::default();
        if with_token {
            settings.set(crate::settings::ACCESS_TOKEN, Some("tok".into()));
        }
        let settings = Arc::new(SettingsStore::with_settings(dir.path().join(".env"), settings));
        let publisher = Arc::new(FakePublisher::default());
        let dispatcher = Dispatcher::new(store.clone(), settings, publisher.clone());
        Harness {
            _dir: dir,
            store,
            publisher,
            dispatcher,
        }
    }

    fn schedule(store: &PostStore, caption: &str, at: DateTime<Utc>) -> Post {
        store
            .insert_at(
                NewPost {
                    image_path: "https://cdn.example.com/a.jpg".into(),
                    caption: caption.into(),
                    schedule_time: at,
                },
                t0() - ChronoDuration::hours(1),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_once_publishes_only_due_posts() {
        let h = harness(true);
        let due = schedule(&h.store, "ok", t0() - ChronoDuration::minutes(1));
        let later = schedule(&h.store, "later", t0() + ChronoDuration::minutes(1));
        let broken = schedule(&h.store, "fail me", t0());

        let report = h.dispatcher.run_once(t0()).await;
        assert_eq!(
            report,
            DispatchReport {
                attempted: 2,
                posted: 1,
                failed: 1
            }
        );

        let due = h.store.get(due.id).unwrap();
        assert_eq!(due.status, PostStatus::Posted);
        assert_eq!(due.media_id, Some(format!("media-{}", due.id)));
        assert!(due.posted_at.is_some());

        let broken = h.store.get(broken.id).unwrap();
        assert_eq!(broken.status, PostStatus::Failed);
        assert_eq!(broken.error.as_deref(), Some("Media processing failed"));

        assert_eq!(h.store.get(later.id).unwrap().status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_second_round_does_not_republish() {
        let h = harness(true);
        schedule(&h.store, "ok", t0());

        h.dispatcher.run_once(t0()).await;
        let report = h.dispatcher.run_once(t0() + ChronoDuration::minutes(1)).await;
        assert_eq!(report.attempted, 0);
        assert_eq!(h.publisher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_recorded_as_failure() {
        let h = harness(false);
        let post = schedule(&h.store, "ok", t0());

        h.dispatcher.run_once(t0()).await;
        let post = h.store.get(post.id).unwrap();
        assert_eq!(post.status, PostStatus::Failed);
        assert_eq!(post.error.as_deref(), Some("ACCESS_TOKEN is missing"));
    }

    #[tokio::test]
    async fn test_retry_failed_post() {
        let h = harness(false);
        let post = schedule(&h.store, "ok", t0());
        h.dispatcher.run_once(t0()).await;
        assert_eq!(h.store.get(post.id).unwrap().status, PostStatus::Failed);

        // fix the settings, then retry by hand
        h.dispatcher
            .settings
            .update(&crate::settings::SettingsUpdate {
                access_token: Some("tok".into()),
                ..Default::default()
            })
            .unwrap();
        let retried = h.dispatcher.retry(post.id).await.unwrap();
        assert_eq!(retried.status, PostStatus::Posted);
        assert_eq!(retried.error, None);
    }

    #[tokio::test]
    async fn test_retry_scheduled_post_ignores_schedule() {
        let h = harness(true);
        let post = schedule(&h.store, "ok", Utc::now() + ChronoDuration::days(7));
        let retried = h.dispatcher.retry(post.id).await.unwrap();
        assert_eq!(retried.status, PostStatus::Posted);
    }

    #[tokio::test]
    async fn test_retry_rejects_published_and_missing() {
        let h = harness(true);
        let post = schedule(&h.store, "ok", t0());
        h.dispatcher.run_once(t0()).await;

        assert!(matches!(
            h.dispatcher.retry(post.id).await,
            Err(SakegramError::Conflict(_))
        ));
        assert!(matches!(
            h.dispatcher.retry(12345).await,
            Err(SakegramError::PostNotFound(12345))
        ));
        assert_eq!(h.publisher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_dispatches_on_first_tick() {
        let h = harness(true);
        let post = schedule(&h.store, "ok", Utc::now() - ChronoDuration::seconds(1));

        let handle = tokio::spawn(h.dispatcher.clone().run(Duration::from_secs(60)));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_millis(10)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        handle.abort();

        assert_eq!(h.store.get(post.id).unwrap().status, PostStatus::Posted);
    }
}
