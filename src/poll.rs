//! Per-subscriber polling loop.
//!
//! One loop per active subscriber: fetch the latest results, detect a new
//! newest issue, request a prediction, hand the event to the delivery sink.
//! Every external-call failure is transient; the loop only ends when the
//! subscriber disappears from the registry.

use crate::feed::{next_issue, FeedSource, MAX_RESULTS};
use crate::predictor::Predictor;
use crate::registry::{SubscriberId, SubscriptionRegistry};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Structured payload handed to the delivery channel after a successful
/// prediction. Formatting into subscriber-facing text is the sink's job.
#[derive(Debug, Clone)]
pub struct DeliveryEvent {
    pub subscriber: SubscriberId,
    /// Next expected issue identifier (the period being predicted).
    pub next_issue: String,
    /// How many results backed the prediction.
    pub results_seen: usize,
    pub prediction: String,
}

/// Outward messaging channel, consumed by the poll loop.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, event: &DeliveryEvent) -> Result<()>;
}

/// A subscriber's polling task.
///
/// Cancellation is cooperative: the loop checks [`SubscriptionRegistry::is_active`]
/// once per iteration and exits when the subscriber has been unregistered, so
/// stop latency is bounded by the poll interval.
pub struct PollLoop {
    subscriber: SubscriberId,
    registry: Arc<SubscriptionRegistry>,
    feed: Arc<dyn FeedSource>,
    predictor: Arc<dyn Predictor>,
    sink: Arc<dyn DeliverySink>,
    interval: Duration,
}

impl PollLoop {
    pub fn new(
        subscriber: SubscriberId,
        registry: Arc<SubscriptionRegistry>,
        feed: Arc<dyn FeedSource>,
        predictor: Arc<dyn Predictor>,
        sink: Arc<dyn DeliverySink>,
        interval: Duration,
    ) -> Self {
        Self {
            subscriber,
            registry,
            feed,
            predictor,
            sink,
            interval,
        }
    }

    /// Spawn the loop onto the runtime. The caller must have registered the
    /// subscriber first; the returned handle resolves once the subscriber is
    /// unregistered.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!("Poll loop started for subscriber {}", self.subscriber);
        while self.registry.is_active(self.subscriber) {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
        info!("Poll loop stopped for subscriber {}", self.subscriber);
    }

    /// One poll tick. Each early return means "retry on the next tick".
    async fn tick(&self) {
        let results = match self.feed.fetch_latest(MAX_RESULTS).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Feed fetch failed for subscriber {}: {e:#}", self.subscriber);
                return;
            }
        };

        let Some(newest) = results.first().map(|r| r.issue_number.clone()) else {
            debug!("Feed returned no results for subscriber {}", self.subscriber);
            return;
        };

        let last = self.registry.last_seen(self.subscriber);
        if !is_newer(last.as_deref(), &newest) {
            debug!(
                "No new issue for subscriber {} (newest {newest})",
                self.subscriber
            );
            return;
        }

        // Advance before predicting: a failed prediction skips this issue for
        // good instead of being retried on the next tick.
        self.registry.set_last_seen(self.subscriber, &newest);

        let prediction = match self.predictor.predict(&results).await {
            Ok(prediction) => prediction,
            Err(e) => {
                warn!(
                    "Prediction failed for subscriber {} on issue {newest}: {e:#}",
                    self.subscriber
                );
                return;
            }
        };

        let event = DeliveryEvent {
            subscriber: self.subscriber,
            next_issue: next_issue(&newest).unwrap_or_else(|| newest.clone()),
            results_seen: results.len(),
            prediction,
        };

        if let Err(e) = self.sink.deliver(&event).await {
            warn!("Delivery failed for subscriber {}: {e:#}", self.subscriber);
        }
    }
}

/// Whether `newest` is strictly newer than the stored issue, per feed
/// ordering. Numeric comparison when both sides parse; a changed but
/// non-numeric identifier counts as new.
fn is_newer(last: Option<&str>, newest: &str) -> bool {
    let Some(last) = last else { return true };
    if last == newest {
        return false;
    }
    match (last.trim().parse::<u64>(), newest.trim().parse::<u64>()) {
        (Ok(prev), Ok(cur)) => cur > prev,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Color, DrawResult};
    use std::sync::Mutex;

    fn result(issue: &str) -> DrawResult {
        DrawResult {
            issue_number: issue.into(),
            number: 4,
            color: Color::Red,
        }
    }

    /// Returns the same batch on every fetch.
    struct StaticFeed {
        results: Vec<DrawResult>,
    }

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch_latest(&self, _max_results: usize) -> Result<Vec<DrawResult>> {
            Ok(self.results.clone())
        }
    }

    /// Returns scripted batches in order, repeating the last one.
    struct SequenceFeed {
        batches: Mutex<Vec<Vec<DrawResult>>>,
        last: Vec<DrawResult>,
    }

    #[async_trait]
    impl FeedSource for SequenceFeed {
        async fn fetch_latest(&self, _max_results: usize) -> Result<Vec<DrawResult>> {
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                Ok(self.last.clone())
            } else {
                Ok(batches.remove(0))
            }
        }
    }

    struct FailingFeed;

    #[async_trait]
    impl FeedSource for FailingFeed {
        async fn fetch_latest(&self, _max_results: usize) -> Result<Vec<DrawResult>> {
            anyhow::bail!("connection refused")
        }
    }

    struct OkPredictor;

    #[async_trait]
    impl Predictor for OkPredictor {
        async fn predict(&self, _results: &[DrawResult]) -> Result<String> {
            Ok("Number: 7".to_string())
        }
    }

    struct FailingPredictor;

    #[async_trait]
    impl Predictor for FailingPredictor {
        async fn predict(&self, _results: &[DrawResult]) -> Result<String> {
            anyhow::bail!("inference endpoint timed out")
        }
    }

    #[derive(Default)]
    struct CollectSink {
        events: Mutex<Vec<DeliveryEvent>>,
    }

    #[async_trait]
    impl DeliverySink for CollectSink {
        async fn deliver(&self, event: &DeliveryEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    const TICK: Duration = Duration::from_millis(1);

    fn spawn_loop(
        registry: &Arc<SubscriptionRegistry>,
        feed: Arc<dyn FeedSource>,
        predictor: Arc<dyn Predictor>,
        sink: Arc<dyn DeliverySink>,
    ) -> JoinHandle<()> {
        PollLoop::new(1, Arc::clone(registry), feed, predictor, sink, TICK).spawn()
    }

    async fn run_for_a_while(registry: &Arc<SubscriptionRegistry>, handle: JoinHandle<()>) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.unregister(1);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop did not stop after unregister")
            .unwrap();
    }

    #[tokio::test]
    async fn emits_exactly_one_event_per_new_issue() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(1);
        registry.set_last_seen(1, "1049");

        let sink = Arc::new(CollectSink::default());
        let feed = Arc::new(StaticFeed {
            results: vec![result("1050"), result("1049")],
        });
        let handle = spawn_loop(&registry, feed, Arc::new(OkPredictor), sink.clone());

        // Many ticks observe the same newest issue; dedup allows one event.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.last_seen(1).as_deref(), Some("1050"));
        run_for_a_while(&registry, handle).await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subscriber, 1);
        assert_eq!(events[0].next_issue, "1051");
        assert_eq!(events[0].results_seen, 2);
        assert_eq!(events[0].prediction, "Number: 7");
    }

    #[tokio::test]
    async fn consecutive_new_issues_deliver_in_feed_order() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(1);

        let sink = Arc::new(CollectSink::default());
        let feed = Arc::new(SequenceFeed {
            batches: Mutex::new(vec![vec![result("1049")]]),
            last: vec![result("1050"), result("1049")],
        });
        let handle = spawn_loop(&registry, feed, Arc::new(OkPredictor), sink.clone());
        run_for_a_while(&registry, handle).await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].next_issue, "1050");
        assert_eq!(events[1].next_issue, "1051");
    }

    #[tokio::test]
    async fn empty_fetch_emits_nothing_and_keeps_last_seen() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(1);
        registry.set_last_seen(1, "1049");

        let sink = Arc::new(CollectSink::default());
        let feed = Arc::new(StaticFeed { results: vec![] });
        let handle = spawn_loop(&registry, feed, Arc::new(OkPredictor), sink.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.last_seen(1).as_deref(), Some("1049"));
        run_for_a_while(&registry, handle).await;

        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_transient() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(1);

        let sink = Arc::new(CollectSink::default());
        let handle = spawn_loop(
            &registry,
            Arc::new(FailingFeed),
            Arc::new(OkPredictor),
            sink.clone(),
        );
        run_for_a_while(&registry, handle).await;

        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prediction_failure_skips_delivery_but_advances_last_seen() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(1);

        let sink = Arc::new(CollectSink::default());
        let feed = Arc::new(StaticFeed {
            results: vec![result("1050")],
        });
        let handle = spawn_loop(&registry, feed, Arc::new(FailingPredictor), sink.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        // The failed issue is not retried: last_seen already moved on.
        assert_eq!(registry.last_seen(1).as_deref(), Some("1050"));
        run_for_a_while(&registry, handle).await;

        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn feed_regression_does_not_move_last_seen_backwards() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(1);

        let sink = Arc::new(CollectSink::default());
        let feed = Arc::new(SequenceFeed {
            batches: Mutex::new(vec![vec![result("1050")]]),
            last: vec![result("1049")],
        });
        let handle = spawn_loop(&registry, feed, Arc::new(OkPredictor), sink.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.last_seen(1).as_deref(), Some("1050"));
        run_for_a_while(&registry, handle).await;

        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn is_newer_compares_numerically() {
        assert!(is_newer(None, "1050"));
        assert!(is_newer(Some("1049"), "1050"));
        assert!(!is_newer(Some("1050"), "1050"));
        assert!(!is_newer(Some("1050"), "1049"));
        // Non-numeric identifiers fall back to change detection.
        assert!(is_newer(Some("a"), "b"));
        assert!(!is_newer(Some("a"), "a"));
    }
}
