use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, RwLock };
use crate::error::ChatError;
use crate::history::{ MessageStore, StoreLimits };
use crate::key::{ ConversationKey, UserId };
use crate::models::chat::{ window_bounds, Message, Page, PageRequest };

/// One conversation's log, locked independently of every other log.
#[derive(Default)]
struct ConversationLog {
    messages: RwLock<Vec<Message>>,
}

/// In-process store. The map shard is locked only while a log is looked up
/// or created; appends then hold just that log's write lock.
pub struct MemoryMessageStore {
    logs: DashMap<ConversationKey, Arc<ConversationLog>>,
    conversations: AtomicUsize,
    limits: StoreLimits,
}

impl MemoryMessageStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            logs: DashMap::new(),
            conversations: AtomicUsize::new(0),
            limits,
        }
    }

    fn log_for_append(&self, key: &ConversationKey) -> Result<Arc<ConversationLog>, ChatError> {
        if let Some(log) = self.logs.get(key) {
            return Ok(log.clone());
        }
        match self.logs.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let max = self.limits.max_conversations;
                self.conversations
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (max == 0 || n < max).then_some(n + 1)
                    })
                    .map_err(|_| {
                        ChatError::StoreFull(format!("conversation limit of {} reached", max))
                    })?;
                debug!("Creating conversation log {}", key);
                Ok(entry.insert(Arc::new(ConversationLog::default())).clone())
            }
        }
    }

    fn existing_log(&self, key: &ConversationKey) -> Option<Arc<ConversationLog>> {
        self.logs.get(key).map(|log| log.clone())
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

fn poisoned(key: &ConversationKey) -> ChatError {
    ChatError::Backend(format!("conversation log {} is poisoned", key))
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(
        &self,
        key: &ConversationKey,
        sender: &UserId,
        text: &str
    ) -> Result<u64, ChatError> {
        let log = self.log_for_append(key)?;
        let mut messages = log.messages.write().map_err(|_| poisoned(key))?;

        let max = self.limits.max_messages_per_conversation;
        if max > 0 && messages.len() >= max {
            return Err(ChatError::StoreFull(format!(
                "conversation {} reached its limit of {} messages",
                key, max
            )));
        }

        let sequence = (messages.len() as u64) + 1;
        messages.push(Message {
            sender: sender.to_string(),
            text: text.to_string(),
            sequence,
            send_time: Utc::now().timestamp_millis(),
        });
        Ok(sequence)
    }

    async fn page(&self, key: &ConversationKey, request: PageRequest) -> Result<Page, ChatError> {
        let Some(log) = self.existing_log(key) else {
            return Ok(Page::default());
        };
        let messages = log.messages.read().map_err(|_| poisoned(key))?;
        let (start, end, has_more) = window_bounds(messages.len(), &request);
        Ok(Page::from_window(messages[start..end].to_vec(), &request, has_more))
    }

    async fn conversation_count(&self) -> Result<usize, ChatError> {
        Ok(self.logs.len())
    }
}
