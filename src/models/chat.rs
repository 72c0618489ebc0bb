use serde::{ Serialize, Deserialize };

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub text: String,
    pub sequence: u64,
    /// Unix milliseconds, stamped by the store on append.
    pub send_time: i64,
}

/// Selects a window of a conversation log.
///
/// `cursor` counts messages skipped from the newest end, or from the oldest
/// end when `from_oldest` is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: usize,
    pub limit: usize,
    pub from_oldest: bool,
}

impl PageRequest {
    pub fn latest(limit: usize) -> Self {
        Self { cursor: 0, limit, from_oldest: false }
    }
}

/// A window of messages, always listed oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub next_cursor: Option<usize>,
}

impl Page {
    /// Builds a page from a window plus whether anything lies beyond it.
    pub fn from_window(messages: Vec<Message>, request: &PageRequest, has_more: bool) -> Self {
        Self {
            messages,
            has_more,
            next_cursor: has_more.then(|| request.cursor.saturating_add(request.limit)),
        }
    }
}

/// Index range `[start, end)` of the window a request selects in a log of
/// `len` messages, plus whether more messages exist past it.
pub fn window_bounds(len: usize, request: &PageRequest) -> (usize, usize, bool) {
    let skip = request.cursor.min(len);
    let take = request.limit.min(len - skip);
    let has_more = request.limit > 0 && skip + take < len;
    if request.from_oldest {
        (skip, skip + take, has_more)
    } else {
        let end = len - skip;
        (end - take, end, has_more)
    }
}
