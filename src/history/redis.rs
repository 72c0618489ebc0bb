use async_trait::async_trait;
use chrono::Utc;
use log::error;
use redis::{ Client, AsyncCommands, Script };
use crate::error::ChatError;
use crate::history::{ MessageStore, StoreLimits };
use crate::key::{ ConversationKey, UserId };
use crate::models::chat::{ Message, Page, PageRequest };

const FULL_CONVERSATION: i64 = -1;
const FULL_STORE: i64 = -2;

// KEYS[1] = sorted set of messages, KEYS[2] = sequence counter,
// KEYS[3] = set of conversation log keys.
// ARGV = sender, text, send_time, max messages, max conversations (0 = unbounded).
// Returns the new sequence, -1 when the conversation is full, -2 when no
// further conversation may be created.
const APPEND_SCRIPT: &str = r#"
local max_messages = tonumber(ARGV[4])
local max_conversations = tonumber(ARGV[5])
local len = redis.call('ZCARD', KEYS[1])
if max_messages > 0 and len >= max_messages then
    return -1
end
if len == 0 and max_conversations > 0
    and redis.call('SISMEMBER', KEYS[3], KEYS[1]) == 0
    and redis.call('SCARD', KEYS[3]) >= max_conversations then
    return -2
end
local seq = redis.call('INCR', KEYS[2])
local member = cjson.encode({
    sender = ARGV[1],
    text = ARGV[2],
    sequence = seq,
    send_time = tonumber(ARGV[3])
})
redis.call('ZADD', KEYS[1], seq, member)
if seq == 1 then
    redis.call('SADD', KEYS[3], KEYS[1])
end
return seq
"#;

/// Each conversation is a sorted set scored by sequence number, so a range
/// by rank is a range by arrival order.
pub struct RedisMessageStore {
    client: Client,
    key_prefix: String,
    limits: StoreLimits,
    append_script: Script,
}

impl RedisMessageStore {
    pub fn new(url: &str, key_prefix: &str, limits: StoreLimits) -> Result<Self, ChatError> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix: key_prefix.to_string(),
            limits,
            append_script: Script::new(APPEND_SCRIPT),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn log_key(&self, key: &ConversationKey) -> String {
        format!("{}log:{}", self.key_prefix, key)
    }

    fn seq_key(&self, key: &ConversationKey) -> String {
        format!("{}seq:{}", self.key_prefix, key)
    }

    fn conversations_key(&self) -> String {
        format!("{}conversations", self.key_prefix)
    }
}

/// Rank range `[start, stop]` (inclusive, one past the window) to read for
/// a request, or `None` when the window is empty by construction. Redis
/// reads negative ranks from the tail, so nothing here may exceed
/// `isize::MAX`.
fn range_bounds(request: &PageRequest) -> Option<(isize, isize)> {
    if request.limit == 0 {
        return None;
    }
    let start = isize::try_from(request.cursor).ok()?;
    let stop = isize::try_from(request.limit).map_or(isize::MAX, |limit| {
        start.saturating_add(limit)
    });
    Some((start, stop))
}

fn decode_messages(key: &ConversationKey, raw: Vec<String>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(raw.len());
    for entry in &raw {
        match serde_json::from_str::<Message>(entry) {
            Ok(msg) => messages.push(msg),
            Err(e) => error!("Error parsing message in {}: {}", key, e),
        }
    }
    messages
}

/// Turns a `limit + 1` range read into a page. Newest-first reads are
/// flipped so pages are always oldest first.
fn window_from_range(key: &ConversationKey, mut raw: Vec<String>, request: &PageRequest) -> Page {
    let has_more = raw.len() > request.limit;
    raw.truncate(request.limit);
    if !request.from_oldest {
        raw.reverse();
    }
    Page::from_window(decode_messages(key, raw), request, has_more)
}

#[async_trait]
impl MessageStore for RedisMessageStore {
    async fn append(
        &self,
        key: &ConversationKey,
        sender: &UserId,
        text: &str
    ) -> Result<u64, ChatError> {
        let mut conn = self.get_connection().await?;
        let seq: i64 = self.append_script
            .key(self.log_key(key))
            .key(self.seq_key(key))
            .key(self.conversations_key())
            .arg(sender.as_str())
            .arg(text)
            .arg(Utc::now().timestamp_millis())
            .arg(self.limits.max_messages_per_conversation)
            .arg(self.limits.max_conversations)
            .invoke_async(&mut conn).await?;

        match seq {
            FULL_CONVERSATION =>
                Err(ChatError::StoreFull(format!(
                    "conversation {} reached its limit of {} messages",
                    key,
                    self.limits.max_messages_per_conversation
                ))),
            FULL_STORE =>
                Err(ChatError::StoreFull(format!(
                    "conversation limit of {} reached",
                    self.limits.max_conversations
                ))),
            seq if seq > 0 => Ok(seq as u64),
            other => Err(ChatError::Backend(format!("append script returned {}", other))),
        }
    }

    async fn page(&self, key: &ConversationKey, request: PageRequest) -> Result<Page, ChatError> {
        let Some((start, stop)) = range_bounds(&request) else {
            return Ok(Page::from_window(Vec::new(), &request, false));
        };
        let mut conn = self.get_connection().await?;
        let log_key = self.log_key(key);

        // One extra element tells whether more lie beyond the window; a
        // single range command keeps the read consistent with appends.
        let raw: Vec<String> = if request.from_oldest {
            conn.zrange(&log_key, start, stop).await?
        } else {
            conn.zrevrange(&log_key, start, stop).await?
        };
        Ok(window_from_range(key, raw, &request))
    }

    async fn conversation_count(&self) -> Result<usize, ChatError> {
        let mut conn = self.get_connection().await?;
        Ok(conn.scard(self.conversations_key()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RedisMessageStore {
        RedisMessageStore::new("redis://127.0.0.1:6379", "chat:", StoreLimits::default()).unwrap()
    }

    fn key(chat: &str) -> ConversationKey {
        ConversationKey::parse_chat(chat).unwrap()
    }

    #[test]
    fn keys_are_prefixed_and_normalized() {
        let s = store();
        let a = UserId::parse("2").unwrap();
        let b = UserId::parse("1").unwrap();
        let key = ConversationKey::between(&a, &b);
        assert_eq!(s.log_key(&key), "chat:log:1:2");
        assert_eq!(s.seq_key(&key), "chat:seq:1:2");
        assert_eq!(s.conversations_key(), "chat:conversations");
    }

    #[test]
    fn user_named_seq_does_not_alias_counter() {
        let s = store();
        let k = key("a:seq");
        assert_ne!(s.log_key(&k), s.seq_key(&key("a:b")));
        assert!(!s.log_key(&k).starts_with("chat:seq:"));
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(matches!(
            RedisMessageStore::new("not a url", "chat:", StoreLimits::default()),
            Err(ChatError::Backend(_))
        ));
    }

    #[test]
    fn range_reads_one_past_the_window() {
        assert_eq!(range_bounds(&PageRequest::latest(10)), Some((0, 10)));
        let req = PageRequest { cursor: 20, limit: 5, from_oldest: true };
        assert_eq!(range_bounds(&req), Some((20, 25)));
    }

    #[test]
    fn zero_limit_reads_nothing() {
        assert_eq!(range_bounds(&PageRequest::latest(0)), None);
    }

    #[test]
    fn huge_cursor_never_becomes_a_tail_rank() {
        let req = PageRequest { cursor: usize::MAX - 1, limit: 10, from_oldest: false };
        assert_eq!(range_bounds(&req), None);

        let req = PageRequest { cursor: isize::MAX as usize, limit: 10, from_oldest: false };
        assert_eq!(range_bounds(&req), Some((isize::MAX, isize::MAX)));

        let req = PageRequest { cursor: 3, limit: usize::MAX, from_oldest: true };
        assert_eq!(range_bounds(&req), Some((3, isize::MAX)));
    }

    #[test]
    fn decodes_script_encoded_members_and_skips_garbage() {
        let raw = vec![
            r#"{"send_time":1700000000000,"sender":"1","text":"Hi!","sequence":1}"#.to_string(),
            "garbage".to_string(),
        ];
        let messages = decode_messages(&key("1:2"), raw);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "Hi!");
        assert_eq!(messages[0].sequence, 1);
    }

    fn member(seq: u64) -> String {
        format!(r#"{{"sender":"1","text":"m{}","sequence":{},"send_time":0}}"#, seq, seq)
    }

    #[test]
    fn newest_first_range_becomes_chronological_page() {
        let request = PageRequest::latest(2);
        let raw = vec![member(5), member(4), member(3)];
        let page = window_from_range(&key("1:2"), raw, &request);
        let seqs: Vec<u64> = page.messages.iter().map(|m| m.sequence).collect();
        assert_eq!(seqs, [4, 5]);
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(2));
    }

    #[test]
    fn short_range_has_no_more() {
        let request = PageRequest { cursor: 0, limit: 10, from_oldest: true };
        let page = window_from_range(&key("1:2"), vec![member(1), member(2)], &request);
        let seqs: Vec<u64> = page.messages.iter().map(|m| m.sequence).collect();
        assert_eq!(seqs, [1, 2]);
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    /// Needs a live server: `REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn live_append_page_and_limits() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let prefix = format!("pairchat-test:{}:", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let store = RedisMessageStore::new(&url, &prefix, StoreLimits {
            max_conversations: 2,
            max_messages_per_conversation: 3,
        }).unwrap();
        let one = UserId::parse("1").unwrap();

        for i in 1..=3u64 {
            assert_eq!(store.append(&key("1:2"), &one, &format!("m{}", i)).await.unwrap(), i);
        }
        assert!(matches!(
            store.append(&key("2:1"), &one, "over").await,
            Err(ChatError::StoreFull(_))
        ));

        let latest = store.page(&key("2:1"), PageRequest::latest(2)).await.unwrap();
        let seqs: Vec<u64> = latest.messages.iter().map(|m| m.sequence).collect();
        assert_eq!(seqs, [2, 3]);
        assert!(latest.has_more);

        let past_end = PageRequest { cursor: usize::MAX - 1, limit: 10, from_oldest: false };
        assert!(store.page(&key("1:2"), past_end).await.unwrap().messages.is_empty());
        assert!(store.recent(&key("5:6"), 10).await.unwrap().is_empty());

        store.append(&key("1:seq"), &one, "x").await.unwrap();
        assert_eq!(store.conversation_count().await.unwrap(), 2);
        assert!(matches!(
            store.append(&key("1:3"), &one, "x").await,
            Err(ChatError::StoreFull(_))
        ));
    }
}
