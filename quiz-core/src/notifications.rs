use quiz_types::Notification;
use tracing::debug;

/// Local copy of the user's notifications plus the unread badge count.
#[derive(Debug, Clone, Default)]
pub struct NotificationInbox {
    items: Vec<Notification>,
    unread: u32,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fetched page and the server's unread count.
    pub fn set(&mut self, items: Vec<Notification>, unread: u32) {
        self.items = items;
        self.unread = unread;
    }

    /// A pushed notification goes to the front. Duplicate ids are dropped.
    pub fn push_new(&mut self, notification: Notification) -> bool {
        if self.items.iter().any(|n| n.id == notification.id) {
            debug!("Duplicate notification {} ignored", notification.id);
            return false;
        }
        if !notification.is_read {
            self.unread += 1;
        }
        self.items.insert(0, notification);
        true
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                self.unread = self.unread.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.is_read = true;
        }
        self.unread = 0;
    }

    pub fn remove(&mut self, id: &str) -> Option<Notification> {
        let index = self.items.iter().position(|n| n.id == id)?;
        let removed = self.items.remove(index);
        if !removed.is_read {
            self.unread = self.unread.saturating_sub(1);
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.unread = 0;
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> u32 {
        self.unread
    }
}
