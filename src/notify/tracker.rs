//! Unread-conversation diffing.

use std::collections::HashSet;

use crate::models::ConversationSummary;

/// Popups to create and remove after one inbox snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationDiff {
    pub show: Vec<ConversationSummary>,
    pub hide: Vec<String>,
}

impl NotificationDiff {
    pub fn is_empty(&self) -> bool {
        self.show.is_empty() && self.hide.is_empty()
    }
}

/// Tracks known and unread conversations across inbox polls.
///
/// A conversation counts as newly unread when it is unread now and was
/// either unknown or known-but-read at the previous snapshot. A
/// conversation that went unread, read and unread again between two polls
/// looks the same as one that stayed unread.
#[derive(Debug, Clone, Default)]
pub struct InboxTracker {
    show_unread_on_start: bool,
    initialized: bool,
    known: HashSet<String>,
    known_unread: HashSet<String>,
    displayed: HashSet<String>,
}

impl InboxTracker {
    pub fn new(show_unread_on_start: bool) -> Self {
        Self {
            show_unread_on_start,
            ..Self::default()
        }
    }

    /// Apply one inbox snapshot and return the popup changes.
    pub fn observe(&mut self, conversations: &[ConversationSummary]) -> NotificationDiff {
        let mut unread_now = Vec::new();
        let mut unread_ids = HashSet::new();
        for conversation in conversations.iter().filter(|c| c.unread) {
            if unread_ids.insert(conversation.id.clone()) {
                unread_now.push(conversation);
            }
        }

        let mut diff = NotificationDiff::default();

        if self.initialized {
            for conversation in &unread_now {
                let id = &conversation.id;
                let newly_unread = !self.known.contains(id) || !self.known_unread.contains(id);
                if newly_unread && self.displayed.insert(id.clone()) {
                    diff.show.push((*conversation).clone());
                }
            }
        } else {
            self.initialized = true;
            if self.show_unread_on_start {
                for conversation in &unread_now {
                    if self.displayed.insert(conversation.id.clone()) {
                        diff.show.push((*conversation).clone());
                    }
                }
            }
        }

        let mut stale: Vec<String> = self
            .displayed
            .iter()
            .filter(|id| !unread_ids.contains(*id))
            .cloned()
            .collect();
        stale.sort();
        for id in &stale {
            self.displayed.remove(id);
        }
        diff.hide = stale;

        self.known.extend(conversations.iter().map(|c| c.id.clone()));
        self.known_unread = unread_ids;

        diff
    }

    /// Forget a popup the user closed. It is shown again only after the
    /// conversation is read and becomes unread again.
    pub fn dismiss(&mut self, id: &str) -> bool {
        self.displayed.remove(id)
    }

    pub fn is_displayed(&self, id: &str) -> bool {
        self.displayed.contains(id)
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
