//! Ingest and query handlers shared by every transport.

use crate::cli::Args;
use crate::error::ChatError;
use crate::history::MessageStore;
use crate::key::{ ConversationKey, UserId };
use crate::models::api::{ PullParams, SendParams };
use crate::models::chat::{ Page, PageRequest };
use log::{ debug, info, warn };
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_text_bytes: usize,
    pub default_pull_limit: usize,
    pub max_pull_limit: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: 4096,
            default_pull_limit: 10,
            max_pull_limit: 100,
        }
    }
}

impl From<&Args> for RequestLimits {
    fn from(args: &Args) -> Self {
        Self {
            max_text_bytes: args.max_text_bytes,
            default_pull_limit: args.default_pull_limit,
            max_pull_limit: args.max_pull_limit,
        }
    }
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    limits: RequestLimits,
}

impl ChatService {
    pub fn new(store: Arc<dyn MessageStore>, limits: RequestLimits) -> Self {
        Self { store, limits }
    }

    /// Validates a message and appends it to the sender/receiver conversation.
    pub async fn send(&self, sender: &str, receiver: &str, text: &str) -> Result<u64, ChatError> {
        if sender.is_empty() || receiver.is_empty() {
            return Err(ChatError::Validation("sender and receiver cannot be empty".into()));
        }
        let sender = UserId::parse(sender)?;
        let receiver = UserId::parse(receiver)?;

        if text.is_empty() {
            return Err(ChatError::Validation("text cannot be empty".into()));
        }
        if text.len() > self.limits.max_text_bytes {
            return Err(ChatError::Validation(format!(
                "text is {} bytes, the maximum is {}",
                text.len(),
                self.limits.max_text_bytes
            )));
        }

        let key = ConversationKey::between(&sender, &receiver);
        let sequence = self.store.append(&key, &sender, text).await?;
        if sequence == 1 {
            match self.store.conversation_count().await {
                Ok(count) => info!("Started conversation {} ({} active)", key, count),
                Err(e) => warn!("Started conversation {}, count unavailable: {}", key, e),
            }
        } else {
            debug!("Stored message {} in {}", sequence, key);
        }
        Ok(sequence)
    }

    /// Returns a window of the conversation between two users.
    pub async fn pull(
        &self,
        a: &UserId,
        b: &UserId,
        limit: Option<usize>,
        cursor: usize,
        from_oldest: bool
    ) -> Result<Page, ChatError> {
        self.pull_key(&ConversationKey::between(a, b), limit, cursor, from_oldest).await
    }

    async fn pull_key(
        &self,
        key: &ConversationKey,
        limit: Option<usize>,
        cursor: usize,
        from_oldest: bool
    ) -> Result<Page, ChatError> {
        let limit = limit.unwrap_or(self.limits.default_pull_limit);
        if limit > self.limits.max_pull_limit {
            return Err(ChatError::Validation(format!(
                "max supported value of limit is {}",
                self.limits.max_pull_limit
            )));
        }
        self.store.page(key, PageRequest { cursor, limit, from_oldest }).await
    }

    pub async fn send_params(&self, params: &SendParams) -> Result<u64, ChatError> {
        self.send(
            params.sender.as_deref().unwrap_or(""),
            params.receiver.as_deref().unwrap_or(""),
            params.text.as_deref().unwrap_or("")
        ).await
    }

    pub async fn pull_params(&self, params: &PullParams) -> Result<Page, ChatError> {
        let chat = params.chat.as_deref().unwrap_or("");
        let key = ConversationKey::parse_chat(chat)?;
        let limit = parse_count("limit", params.limit.as_deref())?;
        let cursor = parse_count("cursor", params.cursor.as_deref())?.unwrap_or(0);
        let from_oldest = parse_reverse(params.reverse.as_deref())?;
        self.pull_key(&key, limit, cursor, from_oldest).await
    }
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>, ChatError> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) =>
            value
                .parse::<usize>()
                .map(Some)
                .map_err(|_| {
                    ChatError::Validation(
                        format!("{} of {} is not a non-negative integer", name, value)
                    )
                }),
    }
}

fn parse_reverse(raw: Option<&str>) -> Result<bool, ChatError> {
    match raw.map(|r| r.to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) =>
            Err(
                ChatError::Validation(
                    format!("invalid reverse parameter '{}', it should be either true or false", other)
                )
            ),
    }
}
