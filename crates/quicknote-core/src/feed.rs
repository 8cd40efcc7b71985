//! Client-side cached copy of the caller's messages.
//!
//! Reconciliation rules:
//! - after a create, the whole list is re-fetched so order, ids and
//!   timestamps always come from the server;
//! - a delete removes the item locally first and is not rolled back if the
//!   server call fails.

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::Message;

#[derive(Debug, Clone, Default)]
pub struct MessageFeed {
    messages: Vec<Message>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replace the cached list with the server's.
    pub async fn refresh(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        self.messages = api.list_messages().await?;
        debug!(count = self.messages.len(), "Message list refreshed");
        Ok(())
    }

    /// Create a message, then re-fetch the list. Returns the created message
    /// as the server reported it.
    ///
    /// If the create succeeds but the re-fetch fails, the error is returned
    /// and the cached list is left as it was.
    pub async fn create(&mut self, api: &ApiClient, text: &str) -> Result<Message, ApiError> {
        let created = api.create_message(text).await?;
        self.refresh(api).await?;
        Ok(created)
    }

    /// Drop a message from the cached list without contacting the server.
    /// Returns the removed message, if it was present.
    pub fn remove_local(&mut self, id: i64) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Optimistically remove a message, then delete it on the server.
    /// A failed delete is reported but the local removal stands.
    pub async fn delete(&mut self, api: &ApiClient, id: i64) -> Result<(), ApiError> {
        self.remove_local(id);
        if let Err(e) = api.delete_message(id).await {
            warn!(id, error = %e, "Delete failed after optimistic removal");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, text: &str) -> Message {
        Message {
            id,
            message: text.to_string(),
            created_at: "2024-03-01 10:15:00".to_string(),
        }
    }

    #[test]
    fn test_remove_local() {
        let mut feed = MessageFeed {
            messages: vec![message(3, "c"), message(2, "b"), message(1, "a")],
        };

        let removed = feed.remove_local(2);
        assert_eq!(removed.map(|m| m.message).as_deref(), Some("b"));
        assert_eq!(feed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 1]);

        assert!(feed.remove_local(42).is_none());
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_accessors() {
        let mut feed = MessageFeed::new();
        assert!(feed.is_empty());
        assert!(feed.get(0).is_none());

        feed.messages.push(message(1, "a"));
        assert_eq!(feed.get(0).map(|m| m.id), Some(1));
        assert_eq!(feed.messages().len(), 1);

        feed.clear();
        assert!(feed.is_empty());
    }
}
