use crate::error::ChatError;
use crate::models::chat::{ Message, Page };
use serde::{ Serialize, Deserialize };

/// Query string of `POST /api/send`. Fields stay optional so that a missing
/// parameter is reported as a `ValidationError` instead of an extractor
/// rejection.
#[derive(Deserialize, Debug, Default)]
pub struct SendParams {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub text: Option<String>,
}

/// Query string of `GET /api/pull`. Numbers arrive as text and are parsed by
/// the service so bad values get a machine-readable error.
#[derive(Deserialize, Debug, Default)]
pub struct PullParams {
    pub chat: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub reverse: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SendResponse {
    pub sequence: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PullResponse {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub next_cursor: Option<usize>,
}

impl From<Page> for PullResponse {
    fn from(page: Page) -> Self {
        Self {
            messages: page.messages,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&ChatError> for ErrorResponse {
    fn from(err: &ChatError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
