//! Timer-driven catalog poller.
//!
//! One spawned task per running poller. Ticks use `MissedTickBehavior::Delay`,
//! so a slow cycle pushes the next one back instead of overlapping it.
//! Stopping or changing the page URL bumps a generation counter; a cycle
//! that was already fetching sees the new generation and drops its result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::registry::ItemRegistry;
use crate::api::CatalogSource;
use crate::models::Item;

/// Receives items to display.
pub trait ItemSink: Send + Sync {
    /// Replace the whole view (first successful cycle).
    fn render_all(&self, items: &[Item]);
    /// Add newly found items at the top of the view.
    fn prepend(&self, items: &[Item]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Stopped,
    Running,
}

/// What one poll cycle ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First successful cycle; the full list was rendered.
    Rendered(usize),
    /// New items were prepended.
    Prepended(usize),
    /// Fetch succeeded but nothing new.
    NothingNew,
    /// Fetch failed; the next tick retries.
    Failed,
    /// The poller was stopped, restarted or navigated while fetching, or a
    /// manual cycle was requested while the timer runs.
    Discarded,
}

struct Shared {
    registry: ItemRegistry,
    page_url: String,
    generation: u64,
    rendered: bool,
    task: Option<JoinHandle<()>>,
}

/// Polls a catalog page and feeds new items to a sink.
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn CatalogSource>,
    sink: Arc<dyn ItemSink>,
    interval: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        sink: Arc<dyn ItemSink>,
        page_url: impl Into<String>,
        interval: Duration,
        max_items: usize,
    ) -> Self {
        Self {
            source,
            sink,
            interval,
            shared: Arc::new(Mutex::new(Shared {
                registry: ItemRegistry::new(max_items),
                page_url: page_url.into(),
                generation: 0,
                rendered: false,
                task: None,
            })),
        }
    }

    pub async fn state(&self) -> PollerState {
        if self.shared.lock().await.task.is_some() {
            PollerState::Running
        } else {
            PollerState::Stopped
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == PollerState::Running
    }

    /// Start polling: one cycle now, then one per interval. No-op when running.
    pub async fn start(&self) -> bool {
        let mut shared = self.shared.lock().await;
        if shared.task.is_some() {
            return false;
        }
        self.spawn(&mut shared);
        info!("Monitoring {}", shared.page_url);
        true
    }

    /// Stop polling. No-op when stopped.
    pub async fn stop(&self) -> bool {
        let mut shared = self.shared.lock().await;
        match shared.task.take() {
            Some(task) => {
                task.abort();
                shared.generation += 1;
                info!("Stopped monitoring {}", shared.page_url);
                true
            }
            None => false,
        }
    }

    /// Start when stopped, stop when running. Returns the new state.
    pub async fn toggle(&self) -> PollerState {
        if self.stop().await {
            PollerState::Stopped
        } else {
            self.start().await;
            PollerState::Running
        }
    }

    /// React to the monitored page address changing.
    ///
    /// A different URL clears seen ids and retained items. A running poller
    /// restarts from that clean state; a stopped one stays stopped.
    pub async fn navigate(&self, page_url: &str) -> bool {
        let mut shared = self.shared.lock().await;
        if shared.page_url == page_url {
            return false;
        }

        debug!("Catalog changed: {} -> {}", shared.page_url, page_url);
        shared.page_url = page_url.to_string();
        shared.registry.clear();
        shared.rendered = false;
        shared.generation += 1;

        if let Some(task) = shared.task.take() {
            task.abort();
            self.spawn(&mut shared);
        }
        true
    }

    /// Run a single cycle outside the timer.
    ///
    /// Only while stopped; a running poller returns `Discarded` without
    /// fetching.
    pub async fn poll_once(&self) -> CycleOutcome {
        let generation = {
            let shared = self.shared.lock().await;
            if shared.task.is_some() {
                return CycleOutcome::Discarded;
            }
            shared.generation
        };
        run_cycle(&*self.source, &*self.sink, &self.shared, generation).await
    }

    /// Retained items, newest first.
    pub async fn items(&self) -> Vec<Item> {
        self.shared.lock().await.registry.items().cloned().collect()
    }

    pub async fn page_url(&self) -> String {
        self.shared.lock().await.page_url.clone()
    }

    fn spawn(&self, shared: &mut Shared) {
        shared.generation += 1;
        let generation = shared.generation;
        let source = self.source.clone();
        let sink = self.sink.clone();
        let state = self.shared.clone();
        let interval = self.interval;

        shared.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if run_cycle(&*source, &*sink, &state, generation).await == CycleOutcome::Discarded {
                    break;
                }
            }
        }));
    }
}

async fn run_cycle(
    source: &dyn CatalogSource,
    sink: &dyn ItemSink,
    shared: &Mutex<Shared>,
    generation: u64,
) -> CycleOutcome {
    let page_url = shared.lock().await.page_url.clone();
    let result = source.fetch_new_items(&page_url).await;

    let mut state = shared.lock().await;
    if state.generation != generation {
        debug!("Dropping result of a superseded poll cycle");
        return CycleOutcome::Discarded;
    }

    let incoming = match result {
        Ok(items) => items,
        Err(e) if e.is_transient() => {
            warn!("Catalog poll failed, retrying next tick: {}", e);
            return CycleOutcome::Failed;
        }
        Err(e) => {
            error!("Catalog poll failed: {}", e);
            return CycleOutcome::Failed;
        }
    };
    if incoming.is_empty() {
        return CycleOutcome::NothingNew;
    }

    let fresh = state.registry.register_items(incoming);
    if !state.rendered {
        state.rendered = true;
        let all: Vec<Item> = state.registry.items().cloned().collect();
        sink.render_all(&all);
        return CycleOutcome::Rendered(all.len());
    }
    if fresh.is_empty() {
        return CycleOutcome::NothingNew;
    }

    info!("{} new item(s)", fresh.len());
    sink.prepend(&fresh);
    CycleOutcome::Prepended(fresh.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use crate::error::{Error, Result};

    const INTERVAL: Duration = Duration::from_secs(10);

    /// Returns a growing list of items, one more per call.
    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        async fn fetch_new_items(&self, _page_url: &str) -> Result<Vec<Item>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(Error::Network {
                    status: 503,
                    url: "catalog".into(),
                });
            }
            Ok((1..=n).rev().map(|i| Item::new(i.to_string(), "")).collect())
        }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        RenderAll(Vec<String>),
        Prepend(Vec<String>),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: StdMutex<Vec<Event>>,
    }

    impl RecordingSink {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    fn ids(items: &[Item]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    impl ItemSink for RecordingSink {
        fn render_all(&self, items: &[Item]) {
            self.events.lock().unwrap().push(Event::RenderAll(ids(items)));
        }

        fn prepend(&self, items: &[Item]) {
            self.events.lock().unwrap().push(Event::Prepend(ids(items)));
        }
    }

    fn poller(source: Arc<CountingSource>, sink: Arc<RecordingSink>) -> Poller {
        Poller::new(source, sink, "https://www.example.com/catalog?a=1", INTERVAL, 50)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_keeps_one_timer() {
        let source = CountingSource::new();
        let sink = Arc::new(RecordingSink::default());
        let poller = poller(source.clone(), sink.clone());

        assert!(poller.start().await);
        assert!(!poller.start().await);

        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(source.calls(), 2);

        assert_eq!(
            sink.take(),
            vec![
                Event::RenderAll(vec!["1".into()]),
                Event::Prepend(vec!["2".into()]),
            ]
        );
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_noop() {
        let source = CountingSource::new();
        let poller = poller(source.clone(), Arc::new(RecordingSink::default()));

        assert!(!poller.stop().await);
        assert_eq!(poller.state().await, PollerState::Stopped);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let source = CountingSource::new();
        let poller = poller(source.clone(), Arc::new(RecordingSink::default()));

        poller.start().await;
        tokio::time::sleep(INTERVAL / 2).await;
        assert!(poller.stop().await);
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle() {
        let poller = poller(CountingSource::new(), Arc::new(RecordingSink::default()));
        assert_eq!(poller.toggle().await, PollerState::Running);
        assert!(poller.is_running().await);
        assert_eq!(poller.toggle().await, PollerState::Stopped);
        assert!(!poller.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_discarded_after_stop() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(5),
            fail: false,
        });
        let sink = Arc::new(RecordingSink::default());
        let poller = poller(source.clone(), sink.clone());

        poller.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        poller.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(source.calls(), 1);
        assert!(sink.take().is_empty());
        assert!(poller.items().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_while_stopped_does_not_start() {
        let source = CountingSource::new();
        let poller = poller(source.clone(), Arc::new(RecordingSink::default()));

        poller.poll_once().await;
        assert_eq!(poller.items().await.len(), 1);

        assert!(poller.navigate("https://www.example.com/catalog?b=2").await);
        assert_eq!(poller.state().await, PollerState::Stopped);
        assert!(poller.items().await.is_empty());

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_while_running_restarts_clean() {
        let source = CountingSource::new();
        let sink = Arc::new(RecordingSink::default());
        let poller = poller(source.clone(), sink.clone());

        poller.start().await;
        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(sink.take(), vec![Event::RenderAll(vec!["1".into()])]);

        assert!(!poller.navigate("https://www.example.com/catalog?a=1").await);
        assert!(poller.navigate("https://www.example.com/catalog?b=2").await);
        tokio::time::sleep(INTERVAL / 2).await;

        assert!(poller.is_running().await);
        assert_eq!(poller.page_url().await, "https://www.example.com/catalog?b=2");
        assert_eq!(
            sink.take(),
            vec![Event::RenderAll(vec!["2".into(), "1".into()])]
        );
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_logged_and_retried_next_tick() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
        });
        let sink = Arc::new(RecordingSink::default());
        let poller = poller(source.clone(), sink.clone());

        assert_eq!(poller.poll_once().await, CycleOutcome::Failed);
        poller.start().await;
        tokio::time::sleep(INTERVAL + INTERVAL / 2).await;

        assert_eq!(source.calls(), 3);
        assert!(sink.take().is_empty());
        assert!(poller.is_running().await);
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_new_after_first_render() {
        struct Fixed;

        #[async_trait]
        impl CatalogSource for Fixed {
            async fn fetch_new_items(&self, _page_url: &str) -> Result<Vec<Item>> {
                Ok(vec![Item::new("9", "same")])
            }
        }

        let sink = Arc::new(RecordingSink::default());
        let poller = Poller::new(Arc::new(Fixed), sink.clone(), "https://x/catalog", INTERVAL, 5);
        assert_eq!(poller.poll_once().await, CycleOutcome::Rendered(1));
        assert_eq!(poller.poll_once().await, CycleOutcome::NothingNew);
        assert_eq!(sink.take().len(), 1);
    }

    /// Echoes the page it was asked for, after a delay.
    struct EchoSource;

    #[async_trait]
    impl CatalogSource for EchoSource {
        async fn fetch_new_items(&self, page_url: &str) -> Result<Vec<Item>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![Item::new(format!("from:{}", page_url), "")])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_while_stopped_drops_in_flight_cycle() {
        let sink = Arc::new(RecordingSink::default());
        let poller = Poller::new(
            Arc::new(EchoSource),
            sink.clone(),
            "https://x/catalog?old=1",
            INTERVAL,
            5,
        );

        let in_flight = tokio::spawn({
            let poller = poller.clone();
            async move { poller.poll_once().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(poller.navigate("https://x/catalog?new=2").await);

        assert_eq!(in_flight.await.unwrap(), CycleOutcome::Discarded);
        assert!(poller.items().await.is_empty());
        assert!(sink.take().is_empty());

        assert_eq!(poller.poll_once().await, CycleOutcome::Rendered(1));
        assert_eq!(
            ids(&poller.items().await),
            vec!["from:https://x/catalog?new=2".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_cycle_refused_while_running() {
        let source = CountingSource::new();
        let poller = poller(source.clone(), Arc::new(RecordingSink::default()));

        poller.start().await;
        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(source.calls(), 1);

        assert_eq!(poller.poll_once().await, CycleOutcome::Discarded);
        assert_eq!(source.calls(), 1);
        assert_eq!(poller.items().await.len(), 1);

        poller.stop().await;
        assert_eq!(poller.poll_once().await, CycleOutcome::Prepended(1));
        assert_eq!(source.calls(), 2);
    }
}
