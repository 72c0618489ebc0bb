//! Canonical naming of two-party conversations.
//!
//! A conversation between `a` and `b` is stored under `min(a,b):max(a,b)`.
//! User ids may not contain the separator, which keeps keys collision-free.

use crate::error::ChatError;
use serde::Serialize;
use std::fmt;

pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, ChatError> {
        if raw.is_empty() {
            return Err(ChatError::InvalidIdentifier("user id cannot be empty".into()));
        }
        if raw.contains(SEPARATOR) {
            return Err(ChatError::InvalidIdentifier(format!(
                "user id '{}' cannot contain the character {}",
                raw, SEPARATOR
            )));
        }
        Ok(UserId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        ConversationKey(format!("{}{}{}", lo, SEPARATOR, hi))
    }

    /// Parses the `<member1>:<member2>` form used by the pull endpoint.
    pub fn parse_chat(chat: &str) -> Result<Self, ChatError> {
        if chat.matches(SEPARATOR).count() != 1 {
            return Err(ChatError::Validation(
                "chat parameter should be in the form <member1>:<member2>".into(),
            ));
        }
        let (a, b) = chat.split_once(SEPARATOR).unwrap_or((chat, ""));
        Ok(Self::between(&UserId::parse(a)?, &UserId::parse(b)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn key_is_commutative() {
        for (a, b) in [("1", "2"), ("alice", "bob"), ("10", "9"), ("x", "x")] {
            assert_eq!(
                ConversationKey::between(&uid(a), &uid(b)),
                ConversationKey::between(&uid(b), &uid(a))
            );
        }
    }

    #[test]
    fn key_orders_lexicographically() {
        assert_eq!(ConversationKey::between(&uid("9"), &uid("10")).as_str(), "10:9");
        assert_eq!(ConversationKey::between(&uid("bob"), &uid("alice")).as_str(), "alice:bob");
    }

    #[test]
    fn rejects_empty_and_separator() {
        assert!(matches!(UserId::parse(""), Err(ChatError::InvalidIdentifier(_))));
        assert!(matches!(UserId::parse("a:b"), Err(ChatError::InvalidIdentifier(_))));
    }

    #[test]
    fn distinct_pairs_do_not_collide() {
        let k1 = ConversationKey::between(&uid("a"), &uid("bc"));
        let k2 = ConversationKey::between(&uid("ab"), &uid("c"));
        assert_ne!(k1, k2);
    }

    #[test]
    fn parse_chat_normalizes() {
        assert_eq!(
            ConversationKey::parse_chat("2:1").unwrap(),
            ConversationKey::parse_chat("1:2").unwrap()
        );
        assert_eq!(ConversationKey::parse_chat("5:6").unwrap().as_str(), "5:6");
    }

    #[test]
    fn parse_chat_rejects_malformed() {
        assert!(matches!(ConversationKey::parse_chat("12"), Err(ChatError::Validation(_))));
        assert!(matches!(ConversationKey::parse_chat("1:2:3"), Err(ChatError::Validation(_))));
        assert!(matches!(
            ConversationKey::parse_chat(":2"),
            Err(ChatError::InvalidIdentifier(_))
        ));
    }
}
