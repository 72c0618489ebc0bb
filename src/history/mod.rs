mod memory;
mod redis;

pub use memory::MemoryMessageStore;
pub use self::redis::RedisMessageStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::error::ChatError;
use crate::key::{ ConversationKey, UserId };
use crate::models::chat::{ Message, Page, PageRequest };

/// Append-only per-conversation message logs.
///
/// Appends to one key are serialized; appends to different keys never wait
/// on each other. Reads observe a consistent prefix of the log but may miss
/// an append that is still in flight.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a message and returns its sequence number (1-based).
    async fn append(
        &self,
        key: &ConversationKey,
        sender: &UserId,
        text: &str
    ) -> Result<u64, ChatError>;

    /// Returns a window of the log. A missing conversation is an empty page.
    async fn page(&self, key: &ConversationKey, request: PageRequest) -> Result<Page, ChatError>;

    async fn conversation_count(&self) -> Result<usize, ChatError>;

    /// Up to `limit` most recent messages, oldest first.
    async fn recent(&self, key: &ConversationKey, limit: usize) -> Result<Vec<Message>, ChatError> {
        Ok(self.page(key, PageRequest::latest(limit)).await?.messages)
    }
}

/// Capacity bounds shared by the store backends. 0 means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_conversations: usize,
    pub max_messages_per_conversation: usize,
}

impl From<&Args> for StoreLimits {
    fn from(args: &Args) -> Self {
        Self {
            max_conversations: args.max_conversations,
            max_messages_per_conversation: args.max_messages_per_conversation,
        }
    }
}

pub fn create_message_store(
    args: &Args
) -> Result<Arc<dyn MessageStore>, Box<dyn Error + Send + Sync>> {
    let limits = StoreLimits::from(args);
    match args.store_type.to_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemoryMessageStore::new(limits))),
        "redis" => {
            let store = RedisMessageStore::new(
                &args.store_redis_url,
                &args.store_redis_prefix,
                limits
            )?;
            Ok(Arc::new(store))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported message store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_message_store(
    args: &Args
) -> Result<Arc<dyn MessageStore>, Box<dyn Error + Send + Sync>> {
    if args.store_type.eq_ignore_ascii_case("redis") {
        info!("Messages will be stored in: redis at {}", args.store_redis_url);
    } else {
        info!("Messages will be stored in: {}", args.store_type);
    }
    create_message_store(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn factory_rejects_unknown_type() {
        let args = Args::try_parse_from(["pairchat", "--store-type", "cassandra"]).unwrap();
        assert!(create_message_store(&args).is_err());
    }

    #[tokio::test]
    async fn factory_builds_memory_store() {
        let args = Args::try_parse_from(["pairchat", "--store-type", "Memory"]).unwrap();
        let store = create_message_store(&args).unwrap();
        assert_eq!(store.conversation_count().await.unwrap(), 0);
    }
}
