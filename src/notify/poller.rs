//! Timer-driven inbox poller feeding a popup sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::tracker::InboxTracker;
use crate::error::Result;
use crate::messaging::MessagingClient;
use crate::models::ConversationSummary;
use crate::monitor::PollerState;

/// Supplies inbox snapshots.
#[async_trait]
pub trait InboxSource: Send + Sync {
    async fn fetch_inbox(&self) -> Result<Vec<ConversationSummary>>;
}

#[async_trait]
impl InboxSource for MessagingClient {
    async fn fetch_inbox(&self) -> Result<Vec<ConversationSummary>> {
        self.latest_inbox().await
    }
}

/// Displays and removes conversation popups.
pub trait PopupSink: Send + Sync + 'static {
    /// Whatever the sink needs to remove a popup later.
    type Handle: Send + 'static;

    fn show(&self, conversation: &ConversationSummary) -> Self::Handle;
    fn hide(&self, conversation_id: &str, handle: Self::Handle);
}

/// Result of one inbox cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxCycle {
    Applied { shown: usize, hidden: usize },
    Failed,
    Discarded,
}

struct Shared<H> {
    tracker: InboxTracker,
    popups: HashMap<String, H>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Polls the inbox and keeps one popup per unread conversation.
pub struct NotificationPoller<P: PopupSink> {
    source: Arc<dyn InboxSource>,
    sink: Arc<P>,
    interval: Duration,
    shared: Arc<Mutex<Shared<P::Handle>>>,
}

impl<P: PopupSink> Clone for NotificationPoller<P> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            sink: self.sink.clone(),
            interval: self.interval,
            shared: self.shared.clone(),
        }
    }
}

impl<P: PopupSink> NotificationPoller<P> {
    pub fn new(
        source: Arc<dyn InboxSource>,
        sink: Arc<P>,
        interval: Duration,
        show_unread_on_start: bool,
    ) -> Self {
        Self {
            source,
            sink,
            interval,
            shared: Arc::new(Mutex::new(Shared {
                tracker: InboxTracker::new(show_unread_on_start),
                popups: HashMap::new(),
                generation: 0,
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

    /// Start polling. No-op when running.
    pub async fn start(&self) -> bool {
        let mut shared = self.shared.lock().await;
        if shared.task.is_some() {
            return false;
        }

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
                if run_cycle(&*source, &*sink, &state, generation).await == InboxCycle::Discarded {
                    break;
                }
            }
        }));
        info!("Watching inbox every {:?}", interval);
        true
    }

    /// Stop polling. Displayed popups stay up. No-op when stopped.
    pub async fn stop(&self) -> bool {
        let mut shared = self.shared.lock().await;
        match shared.task.take() {
            Some(task) => {
                task.abort();
                shared.generation += 1;
                info!("Stopped watching inbox");
                true
            }
            None => false,
        }
    }

    pub async fn toggle(&self) -> PollerState {
        if self.stop().await {
            PollerState::Stopped
        } else {
            self.start().await;
            PollerState::Running
        }
    }

    /// Run a single cycle outside the timer. Refused with `Discarded` while
    /// the timer runs.
    pub async fn poll_once(&self) -> InboxCycle {
        let generation = {
            let shared = self.shared.lock().await;
            if shared.task.is_some() {
                return InboxCycle::Discarded;
            }
            shared.generation
        };
        run_cycle(&*self.source, &*self.sink, &self.shared, generation).await
    }

    /// Remove a popup the user closed.
    pub async fn dismiss(&self, conversation_id: &str) -> bool {
        let mut shared = self.shared.lock().await;
        shared.tracker.dismiss(conversation_id);
        match shared.popups.remove(conversation_id) {
            Some(handle) => {
                self.sink.hide(conversation_id, handle);
                true
            }
            None => false,
        }
    }

    /// Ids with a popup currently up, sorted.
    pub async fn displayed(&self) -> Vec<String> {
        let shared = self.shared.lock().await;
        let mut ids: Vec<String> = shared.popups.keys().cloned().collect();
        ids.sort();
        ids
    }
}

async fn run_cycle<P: PopupSink>(
    source: &dyn InboxSource,
    sink: &P,
    shared: &Mutex<Shared<P::Handle>>,
    generation: u64,
) -> InboxCycle {
    let result = source.fetch_inbox().await;

    let mut state = shared.lock().await;
    if state.generation != generation {
        debug!("Dropping result of a superseded inbox poll");
        return InboxCycle::Discarded;
    }

    let conversations = match result {
        Ok(conversations) => conversations,
        Err(e) => {
            warn!("Inbox poll failed: {}", e);
            return InboxCycle::Failed;
        }
    };

    let diff = state.tracker.observe(&conversations);
    let mut hidden = 0;
    for id in &diff.hide {
        if let Some(handle) = state.popups.remove(id) {
            sink.hide(id, handle);
            hidden += 1;
        }
    }

    let mut shown = 0;
    for conversation in &diff.show {
        if state.popups.contains_key(&conversation.id) {
            continue;
        }
        let handle = sink.show(conversation);
        state.popups.insert(conversation.id.clone(), handle);
        shown += 1;
    }

    if shown > 0 {
        info!("{} new unread conversation(s)", shown);
    }
    InboxCycle::Applied { shown, hidden }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use crate::error::Error;

    const INTERVAL: Duration = Duration::from_secs(15);

    fn conv(id: &str, unread: bool) -> ConversationSummary {
        ConversationSummary {
            id: id.to_string(),
            unread,
            description: None,
            opposite_user: None,
            item_title: None,
            updated_at: None,
        }
    }

    /// Replays snapshots, repeating the last one when exhausted.
    struct ScriptedInbox {
        snapshots: StdMutex<VecDeque<Option<Vec<ConversationSummary>>>>,
        last: StdMutex<Vec<ConversationSummary>>,
        calls: AtomicUsize,
    }

    impl ScriptedInbox {
        fn new(snapshots: Vec<Option<Vec<ConversationSummary>>>) -> Arc<Self> {
            Arc::new(Self {
                snapshots: StdMutex::new(snapshots.into()),
                last: StdMutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InboxSource for ScriptedInbox {
        async fn fetch_inbox(&self) -> Result<Vec<ConversationSummary>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.snapshots.lock().unwrap().pop_front();
            match next {
                Some(Some(snapshot)) => {
                    *self.last.lock().unwrap() = snapshot.clone();
                    Ok(snapshot)
                }
                Some(None) => Err(Error::Network {
                    status: 500,
                    url: "inbox".into(),
                }),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPopups {
        next: AtomicUsize,
        events: StdMutex<Vec<String>>,
    }

    impl RecordingPopups {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl PopupSink for RecordingPopups {
        type Handle = usize;

        fn show(&self, conversation: &ConversationSummary) -> usize {
            self.events.lock().unwrap().push(format!("show {}", conversation.id));
            self.next.fetch_add(1, Ordering::SeqCst)
        }

        fn hide(&self, conversation_id: &str, handle: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("hide {} #{}", conversation_id, handle));
        }
    }

    #[tokio::test]
    async fn test_popup_lifecycle() {
        let inbox = ScriptedInbox::new(vec![
            Some(vec![conv("1", false), conv("2", false)]),
            Some(vec![conv("1", true), conv("2", false)]),
            Some(vec![conv("1", true), conv("2", true)]),
            Some(vec![conv("1", false), conv("2", true)]),
            Some(vec![conv("1", false), conv("2", true)]),
        ]);
        let popups = Arc::new(RecordingPopups::default());
        let poller = NotificationPoller::new(inbox, popups.clone(), INTERVAL, false);

        assert_eq!(
            poller.poll_once().await,
            InboxCycle::Applied { shown: 0, hidden: 0 }
        );
        assert_eq!(
            poller.poll_once().await,
            InboxCycle::Applied { shown: 1, hidden: 0 }
        );
        assert_eq!(
            poller.poll_once().await,
            InboxCycle::Applied { shown: 1, hidden: 0 }
        );
        assert_eq!(
            poller.poll_once().await,
            InboxCycle::Applied { shown: 0, hidden: 1 }
        );
        assert_eq!(
            poller.poll_once().await,
            InboxCycle::Applied { shown: 0, hidden: 0 }
        );

        assert_eq!(popups.take(), vec!["show 1", "show 2", "hide 1 #0"]);
        assert_eq!(poller.displayed().await, vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_popups() {
        let inbox = ScriptedInbox::new(vec![
            Some(vec![conv("1", true)]),
            None,
            Some(vec![conv("1", true)]),
        ]);
        let popups = Arc::new(RecordingPopups::default());
        let poller = NotificationPoller::new(inbox, popups.clone(), INTERVAL, true);

        poller.poll_once().await;
        assert_eq!(poller.poll_once().await, InboxCycle::Failed);
        assert_eq!(
            poller.poll_once().await,
            InboxCycle::Applied { shown: 0, hidden: 0 }
        );
        assert_eq!(popups.take(), vec!["show 1"]);
    }

    #[tokio::test]
    async fn test_dismiss_hides_once() {
        let inbox = ScriptedInbox::new(vec![Some(vec![conv("5", true)])]);
        let popups = Arc::new(RecordingPopups::default());
        let poller = NotificationPoller::new(inbox, popups.clone(), INTERVAL, true);

        poller.poll_once().await;
        assert!(poller.dismiss("5").await);
        assert!(!poller.dismiss("5").await);
        poller.poll_once().await;
        assert_eq!(popups.take(), vec!["show 5", "hide 5 #0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_semantics() {
        let inbox = ScriptedInbox::new(vec![]);
        let popups = Arc::new(RecordingPopups::default());
        let poller = NotificationPoller::new(inbox.clone(), popups, INTERVAL, false);

        assert!(!poller.stop().await);
        assert!(poller.start().await);
        assert!(!poller.start().await);

        tokio::time::sleep(INTERVAL * 2 + INTERVAL / 2).await;
        assert_eq!(inbox.calls.load(Ordering::SeqCst), 3);

        assert_eq!(poller.toggle().await, PollerState::Stopped);
        tokio::time::sleep(INTERVAL * 4).await;
        assert_eq!(inbox.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_cycle_refused_while_running() {
        let inbox = ScriptedInbox::new(vec![]);
        let popups = Arc::new(RecordingPopups::default());
        let poller = NotificationPoller::new(inbox.clone(), popups, INTERVAL, false);

        poller.start().await;
        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(inbox.calls.load(Ordering::SeqCst), 1);

        assert_eq!(poller.poll_once().await, InboxCycle::Discarded);
        assert_eq!(inbox.calls.load(Ordering::SeqCst), 1);
        poller.stop().await;
    }
}
